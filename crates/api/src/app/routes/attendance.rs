use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;

use hrdesk_attendance::TimeLog;
use hrdesk_auth::ActorSnapshot;
use hrdesk_core::UserId;

use crate::app::errors;
use crate::app::services::AppServices;
use crate::authz::authorize;

pub fn router() -> Router {
    Router::new()
        .route("/punch-in", post(punch_in))
        .route("/punch-out", post(punch_out))
        .route("/day-end", post(day_end))
        .route("/user-logs", get(user_logs))
}

pub async fn punch_in(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorSnapshot>,
) -> Result<Response, Response> {
    authorize(&services, "punch_in", &actor, None).await?;
    let log = services
        .attendance
        .punch_in(actor.user_id, Utc::now())
        .await
        .map_err(errors::store_error)?;
    Ok((StatusCode::CREATED, Json(log)).into_response())
}

pub async fn punch_out(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorSnapshot>,
) -> Result<Json<TimeLog>, Response> {
    authorize(&services, "punch_out", &actor, None).await?;
    services
        .attendance
        .punch_out(actor.user_id, Utc::now())
        .await
        .map(Json)
        .map_err(errors::store_error)
}

pub async fn day_end(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorSnapshot>,
) -> Result<Response, Response> {
    authorize(&services, "day_end", &actor, None).await?;
    let summary = services
        .attendance
        .day_end(actor.user_id, Utc::now())
        .await
        .map_err(errors::store_error)?;
    Ok((StatusCode::CREATED, Json(summary)).into_response())
}

#[derive(Debug, Deserialize)]
pub struct LogQuery {
    pub date_param: Option<NaiveDate>,
    /// Another user's logs; gated as a target.
    pub user_id: Option<UserId>,
}

pub async fn user_logs(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorSnapshot>,
    Query(query): Query<LogQuery>,
) -> Result<Json<Vec<TimeLog>>, Response> {
    authorize(&services, "view_time_logs", &actor, query.user_id).await?;

    let user_id = query.user_id.unwrap_or(actor.user_id);
    let date = query.date_param.unwrap_or_else(|| Utc::now().date_naive());
    services
        .attendance
        .time_logs(user_id, date)
        .await
        .map(Json)
        .map_err(errors::store_error)
}
