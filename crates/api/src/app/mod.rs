//! HTTP application wiring (Axum router + service wiring).
//!
//! - `services.rs`: store selection, gate and service construction
//! - `operations.rs`: operation → permission table fed to the gate
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Extension, Router,
};
use tower::ServiceBuilder;

use crate::config::ApiConfig;
use crate::middleware;

pub mod errors;
pub mod operations;
pub mod routes;
pub mod services;

pub use services::StartupError;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub async fn build_app(config: &ApiConfig) -> Result<Router, StartupError> {
    let services = Arc::new(services::build_services(config).await?);
    let auth_state = middleware::AuthState {
        gate: services.gate.clone(),
    };

    let protected = routes::router().layer(axum::middleware::from_fn_with_state(
        auth_state,
        middleware::auth_middleware,
    ));

    let public = Router::new()
        .route("/health", get(routes::system::health))
        .route("/users/create", post(routes::users::create_user))
        .nest("/auth", routes::auth::router());

    Ok(Router::new()
        .merge(public)
        .merge(protected)
        .layer(ServiceBuilder::new().layer(Extension(services))))
}
