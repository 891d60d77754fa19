use std::sync::Arc;

use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Form, Json, Router,
};
use serde::Deserialize;

use crate::app::errors;
use crate::app::services::AppServices;
use crate::middleware::extract_bearer;

pub fn router() -> Router {
    Router::new()
        .route("/token", post(login))
        .route("/refresh", post(refresh))
}

/// Password grant form; `username` is the account email.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    Form(form): Form<LoginForm>,
) -> Result<Response, Response> {
    let pair = services
        .accounts
        .login(&form.username, &form.password)
        .await
        .map_err(errors::account_error)?;
    Ok((StatusCode::CREATED, Json(pair)).into_response())
}

/// Exchange the refresh token carried as bearer for a new access token.
pub async fn refresh(
    Extension(services): Extension<Arc<AppServices>>,
    headers: HeaderMap,
) -> Result<Response, Response> {
    let token = extract_bearer(&headers).ok_or_else(errors::unauthenticated)?;
    let access = services.accounts.refresh(token).await.map_err(errors::account_error)?;
    Ok((StatusCode::CREATED, Json(access)).into_response())
}
