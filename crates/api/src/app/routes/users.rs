use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, put},
    Json, Router,
};
use chrono::Utc;

use hrdesk_auth::ActorSnapshot;
use hrdesk_core::UserId;
use hrdesk_directory::{CreateUser, UpdateUser, UserProfile};

use crate::app::errors;
use crate::app::services::AppServices;
use crate::authz::authorize;

/// Authenticated user routes. Registration is mounted separately.
pub fn router() -> Router {
    Router::new()
        .route("/", get(list_users))
        .route("/accessible", get(accessible_users))
        .route("/update", put(update_user))
        .route("/:id", get(get_user))
}

/// Open registration; no token required. Roles are not accepted here.
pub async fn create_user(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<CreateUser>,
) -> Result<Response, Response> {
    let profile = services
        .accounts
        .self_register(body, Utc::now())
        .await
        .map_err(errors::account_error)?;
    Ok((StatusCode::CREATED, Json(profile)).into_response())
}

pub async fn list_users(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorSnapshot>,
) -> Result<Json<Vec<UserProfile>>, Response> {
    authorize(&services, "get_all_users", &actor, None).await?;
    services.directory.list_profiles().await.map(Json).map_err(errors::store_error)
}

pub async fn get_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorSnapshot>,
    Path(id): Path<UserId>,
) -> Result<Json<UserProfile>, Response> {
    authorize(&services, "get_user", &actor, Some(id)).await?;
    services
        .directory
        .find_profile(id)
        .await
        .map_err(errors::store_error)?
        .map(Json)
        .ok_or_else(|| errors::json_error(StatusCode::NOT_FOUND, "not_found", "user not found"))
}

/// Update the user named by `email`; that user is the gate target.
///
/// The permission is checked before the email is resolved so callers
/// without it cannot learn which addresses are registered.
pub async fn update_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorSnapshot>,
    Json(body): Json<UpdateUser>,
) -> Result<Json<UserProfile>, Response> {
    authorize(&services, "update_user", &actor, None).await?;
    let target = services
        .directory
        .find_profile_by_email(&body.email)
        .await
        .map_err(errors::store_error)?
        .ok_or_else(|| errors::json_error(StatusCode::NOT_FOUND, "not_found", "user not found"))?;

    authorize(&services, "update_user", &actor, Some(target.user.id)).await?;
    services.accounts.update(body).await.map(Json).map_err(errors::account_error)
}

pub async fn accessible_users(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorSnapshot>,
) -> Result<Json<Vec<UserProfile>>, Response> {
    authorize(&services, "get_accessible_users", &actor, None).await?;
    services.accounts.accessible(&actor).await.map(Json).map_err(errors::account_error)
}
