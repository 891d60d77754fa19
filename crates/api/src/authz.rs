//! Per-operation authorization for handlers.
//!
//! The middleware only authenticates; each handler names its operation and
//! the addressed user (if any) here before touching a store.

use axum::response::Response;

use hrdesk_auth::ActorSnapshot;
use hrdesk_core::UserId;

use crate::app::errors;
use crate::app::services::AppServices;

/// Run the permission and target checks for `operation`.
pub async fn authorize(
    services: &AppServices,
    operation: &str,
    actor: &ActorSnapshot,
    target: Option<UserId>,
) -> Result<(), Response> {
    services
        .gate
        .authorize(operation, actor.clone(), target, &services.subjects)
        .await
        .map(|_| ())
        .map_err(errors::gate_error)
}
