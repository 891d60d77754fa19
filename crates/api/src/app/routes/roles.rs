use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};

use hrdesk_auth::ActorSnapshot;
use hrdesk_directory::{AssignPermissions, CreateRole, PermissionRecord, Role, UpdateRole};

use crate::app::errors;
use crate::app::services::AppServices;
use crate::authz::authorize;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_roles))
        .route("/create", post(create_role))
        .route("/update", put(update_role))
        .route("/deleteByName/:role_name", delete(delete_role))
}

pub fn permissions_router() -> Router {
    Router::new()
        .route("/", get(list_permissions))
        .route("/assign", post(assign_permissions))
}

pub async fn create_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorSnapshot>,
    Json(body): Json<CreateRole>,
) -> Result<Response, Response> {
    authorize(&services, "create_role", &actor, None).await?;

    let role = Role::create(body).map_err(errors::domain_error)?;
    let role = services.directory.insert_role(role).await.map_err(errors::store_error)?;
    tracing::info!(role_id = %role.id, name = %role.name, level = role.hierarchy_level, "role created");
    Ok((StatusCode::CREATED, Json(role)).into_response())
}

pub async fn list_roles(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorSnapshot>,
) -> Result<Json<Vec<Role>>, Response> {
    authorize(&services, "get_all_roles", &actor, None).await?;
    services.directory.list_roles().await.map(Json).map_err(errors::store_error)
}

pub async fn update_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorSnapshot>,
    Json(body): Json<UpdateRole>,
) -> Result<Json<Role>, Response> {
    authorize(&services, "update_role", &actor, None).await?;
    services.directory.update_role(&body).await.map(Json).map_err(errors::store_error)
}

pub async fn delete_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorSnapshot>,
    Path(role_name): Path<String>,
) -> Result<Json<Role>, Response> {
    authorize(&services, "delete_role", &actor, None).await?;
    let role = services.directory.delete_role(&role_name).await.map_err(errors::store_error)?;
    tracing::info!(role_id = %role.id, "role deleted");
    Ok(Json(role))
}

// ─────────────────────────────────────────────────────────────────────────────
// Permissions
// ─────────────────────────────────────────────────────────────────────────────

pub async fn list_permissions(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorSnapshot>,
) -> Result<Json<Vec<PermissionRecord>>, Response> {
    authorize(&services, "get_all_permissions", &actor, None).await?;
    services.directory.list_permissions().await.map(Json).map_err(errors::store_error)
}

/// Replace a role's permission set.
pub async fn assign_permissions(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorSnapshot>,
    Json(body): Json<AssignPermissions>,
) -> Result<Json<Vec<PermissionRecord>>, Response> {
    authorize(&services, "assign_permissions", &actor, None).await?;
    let assigned = services
        .directory
        .assign_permissions(body.role_id, &body.permissions)
        .await
        .map_err(errors::store_error)?;
    tracing::info!(role_id = %body.role_id, count = assigned.len(), "role permissions replaced");
    Ok(Json(assigned))
}
