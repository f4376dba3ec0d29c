use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use fleetops_auth::JwtValidator;

use crate::app::errors::json_error;
use crate::context::contexts_from_claims;

#[derive(Clone)]
pub struct AuthState {
    pub jwt: Arc<dyn JwtValidator>,
}

/// Require a valid bearer token and attach tenant/principal context.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let token = match extract_bearer(req.headers()) {
        Ok(token) => token,
        Err(reason) => return unauthorized(reason),
    };

    let claims = match state.jwt.validate(token, Utc::now()) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::debug!(error = %e, "bearer token rejected");
            return unauthorized("invalid or expired token");
        }
    };

    let (tenant, principal) = contexts_from_claims(claims);
    req.extensions_mut().insert(tenant);
    req.extensions_mut().insert(principal);

    next.run(req).await
}

fn unauthorized(reason: &'static str) -> Response {
    json_error(StatusCode::UNAUTHORIZED, "unauthorized", reason)
}

fn extract_bearer(headers: &HeaderMap) -> Result<&str, &'static str> {
    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or("missing Authorization header")?;

    let header = header.to_str().map_err(|_| "malformed Authorization header")?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or("expected a Bearer token")?
        .trim();

    if token.is_empty() {
        return Err("empty bearer token");
    }

    Ok(token)
}
