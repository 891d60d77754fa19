use std::sync::Arc;

use axum::{
    extract::State,
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use hrdesk_auth::AuthorizationGate;

use crate::app::errors;

#[derive(Clone)]
pub struct AuthState {
    pub gate: Arc<AuthorizationGate>,
}

/// Decode the bearer access token and attach the actor snapshot to the request.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, Response> {
    let token = extract_bearer(req.headers()).ok_or_else(errors::unauthenticated)?;

    let actor = state.gate.authenticate(token).map_err(|e| {
        tracing::debug!(error = %e, "rejected bearer token");
        errors::gate_error(e)
    })?;

    req.extensions_mut().insert(actor);

    Ok(next.run(req).await)
}

pub(crate) fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let header = headers.get(axum::http::header::AUTHORIZATION)?;
    let header = header.to_str().ok()?;
    let token = header.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        return None;
    }
    Some(token)
}
