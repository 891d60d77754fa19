use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use chrono::Utc;

use hrdesk_auth::ActorSnapshot;
use hrdesk_directory::{CreateDepartment, Department, UpdateDepartment};

use crate::app::errors;
use crate::app::services::AppServices;
use crate::authz::authorize;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_departments))
        .route("/create", post(create_department))
        .route("/update", put(update_department))
        .route("/deleteByName/:name", delete(delete_department))
}

pub async fn create_department(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorSnapshot>,
    Json(body): Json<CreateDepartment>,
) -> Result<Response, Response> {
    authorize(&services, "create_department", &actor, None).await?;

    let department = Department::create(body, Utc::now()).map_err(errors::domain_error)?;
    let department = services
        .directory
        .insert_department(department)
        .await
        .map_err(errors::store_error)?;
    tracing::info!(department_id = %department.id, name = %department.name, "department created");
    Ok((StatusCode::CREATED, Json(department)).into_response())
}

pub async fn list_departments(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorSnapshot>,
) -> Result<Json<Vec<Department>>, Response> {
    authorize(&services, "get_all_departments", &actor, None).await?;
    services.directory.list_departments().await.map(Json).map_err(errors::store_error)
}

pub async fn update_department(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorSnapshot>,
    Json(body): Json<UpdateDepartment>,
) -> Result<Json<Department>, Response> {
    authorize(&services, "update_department", &actor, None).await?;
    services.directory.update_department(&body).await.map(Json).map_err(errors::store_error)
}

pub async fn delete_department(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorSnapshot>,
    Path(name): Path<String>,
) -> Result<Json<Department>, Response> {
    authorize(&services, "delete_department", &actor, None).await?;
    let department = services.directory.delete_department(&name).await.map_err(errors::store_error)?;
    tracing::info!(department_id = %department.id, "department deleted");
    Ok(Json(department))
}
