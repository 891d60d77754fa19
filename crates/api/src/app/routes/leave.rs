use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;

use hrdesk_auth::ActorSnapshot;
use hrdesk_core::UserId;
use hrdesk_infra::BalanceView;
use hrdesk_leave::{
    CreateLeaveType, LeaveBalance, LeavePeriod, LeaveRequest, LeaveType, NewLeaveRequest, SetLeaveBalance,
    StatusUpdate,
};

use crate::app::errors;
use crate::app::services::AppServices;
use crate::authz::authorize;

pub fn router() -> Router {
    Router::new()
        .route("/types", get(list_leave_types).post(create_leave_type))
        .route("/balance", post(set_leave_balance))
        .route("/balance/:user_id", get(view_leave_balance))
        .route("/requests/:user_id", get(view_leave_requests))
        .route("/request/:user_id", post(create_leave_request))
        .route("/update/:user_id", put(update_leave_status))
}

/// Creates a pending request for `user_id`.
pub async fn create_leave_request(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorSnapshot>,
    Path(user_id): Path<UserId>,
    Json(body): Json<NewLeaveRequest>,
) -> Result<Response, Response> {
    authorize(&services, "create_leave_request", &actor, Some(user_id)).await?;
    let request = services
        .ledger
        .submit(user_id, body, Utc::now())
        .await
        .map_err(errors::ledger_error)?;
    Ok((StatusCode::CREATED, Json(request)).into_response())
}

/// Approve, reject or cancel a request owned by `user_id`.
pub async fn update_leave_status(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorSnapshot>,
    Path(user_id): Path<UserId>,
    Json(body): Json<StatusUpdate>,
) -> Result<Json<LeaveRequest>, Response> {
    authorize(&services, "leave_status_updates", &actor, Some(user_id)).await?;
    services
        .ledger
        .transition(user_id, body, actor.user_id, Utc::now())
        .await
        .map(Json)
        .map_err(errors::ledger_error)
}

#[derive(Debug, Deserialize)]
pub struct PeriodQuery {
    pub year: Option<i32>,
    pub quarter: Option<u8>,
}

/// Balances for one quarter; defaults to the current one.
pub async fn view_leave_balance(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorSnapshot>,
    Path(user_id): Path<UserId>,
    Query(query): Query<PeriodQuery>,
) -> Result<Json<Vec<BalanceView>>, Response> {
    authorize(&services, "view_leave_balance", &actor, Some(user_id)).await?;

    let current = LeavePeriod::containing(Utc::now().date_naive());
    let period = LeavePeriod::new(query.year.unwrap_or(current.year), query.quarter.unwrap_or(current.quarter))
        .map_err(errors::ledger_error)?;
    services
        .ledger
        .balances(user_id, period)
        .await
        .map(Json)
        .map_err(errors::store_error)
}

#[derive(Debug, Deserialize)]
pub struct WindowQuery {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

pub async fn view_leave_requests(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorSnapshot>,
    Path(user_id): Path<UserId>,
    Query(window): Query<WindowQuery>,
) -> Result<Json<Vec<LeaveRequest>>, Response> {
    authorize(&services, "view_leave_requests", &actor, Some(user_id)).await?;
    services
        .ledger
        .requests(user_id, window.from, window.to)
        .await
        .map(Json)
        .map_err(errors::ledger_error)
}

// ─────────────────────────────────────────────────────────────────────────────
// Administration
// ─────────────────────────────────────────────────────────────────────────────

pub async fn create_leave_type(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorSnapshot>,
    Json(body): Json<CreateLeaveType>,
) -> Result<Response, Response> {
    authorize(&services, "create_leave_type", &actor, None).await?;
    let leave_type = services.ledger.create_leave_type(body).await.map_err(errors::store_error)?;
    Ok((StatusCode::CREATED, Json(leave_type)).into_response())
}

/// Open to every authenticated user.
pub async fn list_leave_types(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorSnapshot>,
) -> Result<Json<Vec<LeaveType>>, Response> {
    authorize(&services, "list_leave_types", &actor, None).await?;
    services.ledger.leave_types().await.map(Json).map_err(errors::store_error)
}

/// Seed a balance row for (user, leave type, year, quarter).
pub async fn set_leave_balance(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorSnapshot>,
    Json(body): Json<SetLeaveBalance>,
) -> Result<Response, Response> {
    authorize(&services, "set_leave_balance", &actor, Some(body.user_id)).await?;
    let balance: LeaveBalance = services
        .ledger
        .set_balance(body, Utc::now())
        .await
        .map_err(errors::ledger_error)?;
    Ok((StatusCode::CREATED, Json(balance)).into_response())
}
