use axum::{extract::Extension, http::StatusCode, Json};
use serde_json::{json, Value};

use hrdesk_auth::ActorSnapshot;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

/// The caller's decoded snapshot.
pub async fn whoami(Extension(actor): Extension<ActorSnapshot>) -> Json<Value> {
    Json(json!({
        "user_id": actor.user_id,
        "roles": actor.role_names,
        "hierarchy_level": actor.hierarchy_level,
        "can_cross_departments": actor.can_cross_departments,
        "department": actor.department,
        "permissions": actor.permissions,
    }))
}
