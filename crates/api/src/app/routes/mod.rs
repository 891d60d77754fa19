use axum::{routing::get, Router};

pub mod attendance;
pub mod auth;
pub mod departments;
pub mod leave;
pub mod roles;
pub mod system;
pub mod users;

/// Router for all endpoints that require an access token.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .nest("/departments", departments::router())
        .nest("/roles", roles::router())
        .nest("/permissions", roles::permissions_router())
        .nest("/users", users::router())
        .nest("/leave", leave::router())
        .nest("/timelog", attendance::router())
}
