use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};

use fleetops_cargo::CargoId;
use fleetops_infra::LedgerUpdate;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::authz::{authorize_action, CargoAction};
use crate::context::{PrincipalContext, TenantContext};

pub fn router() -> Router {
    Router::new()
        .route("/", post(open_ledger).get(list_ledgers))
        .route("/:id", get(get_ledger).patch(update_ledger).delete(delete_ledger))
        .route("/:id/items", post(add_item))
        .route("/:id/items/:name", delete(remove_item))
}

fn parse_id(raw: &str) -> Result<CargoId, Response> {
    raw.parse()
        .map_err(|e: fleetops_core::DomainError| errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", e.to_string()))
}

fn guard(tenant: &TenantContext, principal: &PrincipalContext, action: CargoAction) -> Result<(), Response> {
    authorize_action(tenant, principal, action).map_err(errors::authz_error_to_response)
}

fn body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, Response> {
    body.map(|Json(inner)| inner)
        .map_err(errors::json_rejection_to_response)
}

pub async fn open_ledger(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    req: Result<Json<dto::OpenLedgerRequest>, JsonRejection>,
) -> Response {
    if let Err(resp) = guard(&tenant, &principal, CargoAction::Write) {
        return resp;
    }
    let req = match body(req) {
        Ok(req) => req,
        Err(resp) => return resp,
    };
    let id = match req.id.as_deref().map(parse_id).transpose() {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services
        .ledgers
        .open_ledger(tenant.tenant_id(), id, req.owner_label, req.capacity)
        .await
    {
        Ok(ledger) => (StatusCode::CREATED, Json(dto::ledger_to_json(&ledger))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn list_ledgers(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
) -> Response {
    if let Err(resp) = guard(&tenant, &principal, CargoAction::Read) {
        return resp;
    }

    match services.ledgers.list_ledgers(tenant.tenant_id()).await {
        Ok(ledgers) => {
            let items: Vec<_> = ledgers.iter().map(dto::ledger_to_json).collect();
            Json(serde_json::json!({ "items": items })).into_response()
        }
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_ledger(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Response {
    if let Err(resp) = guard(&tenant, &principal, CargoAction::Read) {
        return resp;
    }
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.ledgers.get_ledger(tenant.tenant_id(), &id).await {
        Ok(ledger) => Json(dto::ledger_to_json(&ledger)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn update_ledger(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    req: Result<Json<dto::UpdateLedgerRequest>, JsonRejection>,
) -> Response {
    if let Err(resp) = guard(&tenant, &principal, CargoAction::Write) {
        return resp;
    }
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let req = match body(req) {
        Ok(req) => req,
        Err(resp) => return resp,
    };

    let update = LedgerUpdate {
        owner_label: req.owner_label,
        capacity: req.capacity,
    };
    match services.ledgers.update_ledger(tenant.tenant_id(), &id, update).await {
        Ok(ledger) => Json(dto::ledger_to_json(&ledger)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn delete_ledger(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Response {
    if let Err(resp) = guard(&tenant, &principal, CargoAction::Delete) {
        return resp;
    }
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.ledgers.delete_ledger(tenant.tenant_id(), &id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn add_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    req: Result<Json<dto::AddItemRequest>, JsonRejection>,
) -> Response {
    if let Err(resp) = guard(&tenant, &principal, CargoAction::ItemsWrite) {
        return resp;
    }
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let req = match body(req) {
        Ok(req) => req,
        Err(resp) => return resp,
    };

    match services
        .ledgers
        .add_item(tenant.tenant_id(), &id, &req.name, req.amount, req.unit_weight)
        .await
    {
        Ok(ledger) => (StatusCode::CREATED, Json(dto::ledger_to_json(&ledger))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn remove_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path((id, name)): Path<(String, String)>,
    req: Result<Json<dto::RemoveItemRequest>, JsonRejection>,
) -> Response {
    if let Err(resp) = guard(&tenant, &principal, CargoAction::ItemsWrite) {
        return resp;
    }
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let req = match body(req) {
        Ok(req) => req,
        Err(resp) => return resp,
    };

    match services
        .ledgers
        .remove_item(tenant.tenant_id(), &id, &name, req.amount, req.unit_weight)
        .await
    {
        Ok(ledger) => Json(dto::ledger_to_json(&ledger)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
