use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use fleetops_auth::AuthzError;
use fleetops_cargo::CargoError;
use fleetops_infra::LedgerServiceError;

pub fn service_error_to_response(err: LedgerServiceError) -> axum::response::Response {
    match err {
        LedgerServiceError::Cargo(e) => cargo_error_to_response(e),
        LedgerServiceError::NotFound(id) => json_error(
            StatusCode::NOT_FOUND,
            "not_found",
            format!("cargo ledger '{id}' not found"),
        ),
        LedgerServiceError::AlreadyExists(id) => json_error(
            StatusCode::CONFLICT,
            "already_exists",
            format!("cargo ledger '{id}' already exists"),
        ),
        LedgerServiceError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        LedgerServiceError::Repository(e) => json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "store_error",
            e.to_string(),
        ),
    }
}

pub fn cargo_error_to_response(err: CargoError) -> axum::response::Response {
    let status = match &err {
        CargoError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
        CargoError::CapacityExceeded { .. } => StatusCode::CONFLICT,
        CargoError::ItemNotFound(_) => StatusCode::NOT_FOUND,
        CargoError::InsufficientQuantity { .. } => StatusCode::CONFLICT,
    };
    json_error(status, err.code(), err.to_string())
}

pub fn authz_error_to_response(err: AuthzError) -> axum::response::Response {
    json_error(StatusCode::FORBIDDEN, "forbidden", err.to_string())
}

pub fn json_rejection_to_response(rejection: JsonRejection) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, "invalid_body", rejection.body_text())
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
