use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool, Postgres, Row, Transaction};
use tracing::instrument;
use uuid::Uuid;

use hrdesk_core::{LeaveRequestId, LeaveTypeId, UserId};
use hrdesk_leave::{
    Approval, LeaveBalance, LeavePeriod, LeaveRequest, LeaveStatus, LeaveType, LedgerError, Transition, ledger,
};

use super::{Db, decode_error, map_sqlx_error};
use crate::error::{StoreError, StoreResult};
use crate::store::{BalanceView, LeaveStore};

const BALANCE_COLUMNS: &str =
    "id, user_id, leave_type_id, year, quarter, available, taken, requested, created_at, updated_at";
const REQUEST_COLUMNS: &str = "id, user_id, leave_type_id, application_date, leave_from, leave_to, reason, \
     status, approver_id, comment, decided_at";

#[derive(Debug, Clone)]
pub struct PgLeaveStore {
    pool: PgPool,
}

impl PgLeaveStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run `work` in a transaction: commit on success, roll back on any error.
    async fn in_transaction<T, F>(&self, operation: &'static str, work: F) -> Result<T, LedgerError>
    where
        F: for<'t> FnOnce(
                &'t mut Transaction<'static, Postgres>,
            ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<T, LedgerError>> + Send + 't>>
            + Send,
        T: Send,
    {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| LedgerError::from(map_sqlx_error("begin_transaction", e)))?;

        match work(&mut tx).await {
            Ok(value) => {
                tx.commit()
                    .await
                    .map_err(|e| LedgerError::from(map_sqlx_error("commit", e)))?;
                Ok(value)
            }
            Err(err) => {
                if let Err(e) = tx.rollback().await {
                    tracing::warn!(operation, error = %e, "rollback failed");
                }
                Err(err)
            }
        }
    }
}

#[async_trait]
impl LeaveStore for PgLeaveStore {
    async fn insert_leave_type(&self, leave_type: LeaveType) -> StoreResult<LeaveType> {
        sqlx::query("INSERT INTO leave_types (id, title, carry_forward) VALUES ($1, $2, $3)")
            .bind(leave_type.id.as_uuid())
            .bind(&leave_type.title)
            .bind(leave_type.carry_forward)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("insert_leave_type", e))?;
        Ok(leave_type)
    }

    async fn list_leave_types(&self) -> StoreResult<Vec<LeaveType>> {
        let rows = sqlx::query_as::<_, Db<LeaveType>>("SELECT id, title, carry_forward FROM leave_types ORDER BY title")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_leave_types", e))?;
        Ok(rows.into_iter().map(|Db(t)| t).collect())
    }

    async fn insert_balance(&self, balance: LeaveBalance) -> StoreResult<LeaveBalance> {
        sqlx::query(
            r#"
            INSERT INTO leave_balances
                (id, user_id, leave_type_id, year, quarter, available, taken, requested, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(balance.id.as_uuid())
        .bind(balance.user_id.as_uuid())
        .bind(balance.leave_type_id.as_uuid())
        .bind(balance.period.year)
        .bind(i16::from(balance.period.quarter))
        .bind(balance.available)
        .bind(balance.taken)
        .bind(balance.requested)
        .bind(balance.created_at)
        .bind(balance.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match map_sqlx_error("insert_balance", e) {
            StoreError::Conflict(_) => StoreError::conflict(format!(
                "balance for this leave type already exists in {}",
                balance.period
            )),
            other => other,
        })?;
        Ok(balance)
    }

    async fn list_balances(&self, user_id: UserId, period: LeavePeriod) -> StoreResult<Vec<BalanceView>> {
        let rows = sqlx::query(
            r#"
            SELECT b.id, b.user_id, b.leave_type_id, b.year, b.quarter, b.available, b.taken, b.requested,
                   b.created_at, b.updated_at, t.title
            FROM leave_balances b
            JOIN leave_types t ON t.id = b.leave_type_id
            WHERE b.user_id = $1 AND b.year = $2 AND b.quarter = $3
            ORDER BY t.title
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(period.year)
        .bind(i16::from(period.quarter))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_balances", e))?;

        rows.iter()
            .map(|row| {
                let Db(balance) = Db::<LeaveBalance>::from_row(row)?;
                Ok(BalanceView { leave_type: row.try_get("title")?, balance })
            })
            .collect::<Result<_, sqlx::Error>>()
            .map_err(|e| map_sqlx_error("list_balances", e))
    }

    async fn balance_for(
        &self,
        user_id: UserId,
        leave_type_id: LeaveTypeId,
        period: LeavePeriod,
    ) -> StoreResult<Option<LeaveBalance>> {
        let sql = format!(
            "SELECT {BALANCE_COLUMNS} FROM leave_balances \
             WHERE user_id = $1 AND leave_type_id = $2 AND year = $3 AND quarter = $4"
        );
        let row = sqlx::query_as::<_, Db<LeaveBalance>>(&sql)
            .bind(user_id.as_uuid())
            .bind(leave_type_id.as_uuid())
            .bind(period.year)
            .bind(i16::from(period.quarter))
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("balance_for", e))?;
        Ok(row.map(|Db(b)| b))
    }

    async fn find_request(&self, id: LeaveRequestId) -> StoreResult<Option<LeaveRequest>> {
        let sql = format!("SELECT {REQUEST_COLUMNS} FROM leave_requests WHERE id = $1");
        let row = sqlx::query_as::<_, Db<LeaveRequest>>(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_request", e))?;
        Ok(row.map(|Db(r)| r))
    }

    async fn list_requests(&self, user_id: UserId, from: NaiveDate, to: NaiveDate) -> StoreResult<Vec<LeaveRequest>> {
        let sql = format!(
            "SELECT {REQUEST_COLUMNS} FROM leave_requests \
             WHERE user_id = $1 AND leave_from >= $2 AND leave_to <= $3 ORDER BY leave_from"
        );
        let rows = sqlx::query_as::<_, Db<LeaveRequest>>(&sql)
            .bind(user_id.as_uuid())
            .bind(from)
            .bind(to)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_requests", e))?;
        Ok(rows.into_iter().map(|Db(r)| r).collect())
    }

    #[instrument(skip_all, fields(request_id = %request.id, user_id = %request.user_id), err)]
    async fn submit_request(&self, request: LeaveRequest, now: DateTime<Utc>) -> Result<Transition, LedgerError> {
        self.in_transaction("submit_request", move |tx| {
            Box::pin(async move {
                // Serialise all submissions of one user so the overlap check sees committed rows.
                let user = sqlx::query("SELECT 1 FROM users WHERE id = $1 FOR UPDATE")
                    .bind(request.user_id.as_uuid())
                    .fetch_optional(&mut **tx)
                    .await
                    .map_err(|e| map_sqlx_error("lock_user", e))?;
                if user.is_none() {
                    return Err(LedgerError::NotFound("user"));
                }

                let leave_type = sqlx::query("SELECT 1 FROM leave_types WHERE id = $1")
                    .bind(request.leave_type_id.as_uuid())
                    .fetch_optional(&mut **tx)
                    .await
                    .map_err(|e| map_sqlx_error("find_leave_type", e))?;
                if leave_type.is_none() {
                    return Err(LedgerError::NotFound("leave type"));
                }

                let mut balance = lock_balance(tx, request.user_id, request.leave_type_id, request.period())
                    .await?
                    .ok_or_else(|| LedgerError::conflict("leave balance not sufficient for the given leave type"))?;

                let sql = format!("SELECT {REQUEST_COLUMNS} FROM leave_requests WHERE user_id = $1");
                let existing: Vec<LeaveRequest> = sqlx::query_as::<_, Db<LeaveRequest>>(&sql)
                    .bind(request.user_id.as_uuid())
                    .fetch_all(&mut **tx)
                    .await
                    .map_err(|e| map_sqlx_error("load_requests", e))?
                    .into_iter()
                    .map(|Db(r)| r)
                    .collect();

                let transition = ledger::open_request(&mut balance, &request, &existing, now)?;

                write_balance(tx, &balance).await?;
                sqlx::query(
                    r#"
                    INSERT INTO leave_requests
                        (id, user_id, leave_type_id, application_date, leave_from, leave_to, reason, status)
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                    "#,
                )
                .bind(request.id.as_uuid())
                .bind(request.user_id.as_uuid())
                .bind(request.leave_type_id.as_uuid())
                .bind(request.application_date)
                .bind(request.leave_from)
                .bind(request.leave_to)
                .bind(&request.reason)
                .bind(request.status.as_str())
                .execute(&mut **tx)
                .await
                .map_err(|e| map_sqlx_error("insert_request", e))?;

                Ok(transition)
            })
        })
        .await
    }

    #[instrument(skip(self, comment, now), err)]
    async fn transition_request(
        &self,
        request_id: LeaveRequestId,
        target: LeaveStatus,
        approver: UserId,
        comment: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(LeaveRequest, Transition), LedgerError> {
        self.in_transaction("transition_request", move |tx| {
            Box::pin(async move {
                let sql = format!("SELECT {REQUEST_COLUMNS} FROM leave_requests WHERE id = $1 FOR UPDATE");
                let Db(mut request) = sqlx::query_as::<_, Db<LeaveRequest>>(&sql)
                    .bind(request_id.as_uuid())
                    .fetch_optional(&mut **tx)
                    .await
                    .map_err(|e| map_sqlx_error("lock_request", e))?
                    .ok_or(LedgerError::NotFound("leave request"))?;

                let mut balance = lock_balance(tx, request.user_id, request.leave_type_id, request.period())
                    .await?
                    .ok_or_else(|| LedgerError::consistency(format!("no balance row for leave request {request_id}")))?;

                let transition = ledger::decide(&mut balance, &mut request, target, approver, comment, now)?;

                write_balance(tx, &balance).await?;
                let approval = request.approval.as_ref();
                sqlx::query(
                    "UPDATE leave_requests SET status = $2, approver_id = $3, comment = $4, decided_at = $5 WHERE id = $1",
                )
                .bind(request.id.as_uuid())
                .bind(request.status.as_str())
                .bind(approval.map(|a| *a.approver_id.as_uuid()))
                .bind(approval.and_then(|a| a.comment.clone()))
                .bind(approval.map(|a| a.decided_at))
                .execute(&mut **tx)
                .await
                .map_err(|e| map_sqlx_error("update_request", e))?;

                Ok((request, transition))
            })
        })
        .await
    }
}

async fn lock_balance(
    tx: &mut Transaction<'static, Postgres>,
    user_id: UserId,
    leave_type_id: LeaveTypeId,
    period: LeavePeriod,
) -> Result<Option<LeaveBalance>, LedgerError> {
    let sql = format!(
        "SELECT {BALANCE_COLUMNS} FROM leave_balances \
         WHERE user_id = $1 AND leave_type_id = $2 AND year = $3 AND quarter = $4 FOR UPDATE"
    );
    let row = sqlx::query_as::<_, Db<LeaveBalance>>(&sql)
        .bind(user_id.as_uuid())
        .bind(leave_type_id.as_uuid())
        .bind(period.year)
        .bind(i16::from(period.quarter))
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("lock_balance", e))?;
    Ok(row.map(|Db(b)| b))
}

async fn write_balance(tx: &mut Transaction<'static, Postgres>, balance: &LeaveBalance) -> Result<(), LedgerError> {
    let updated = sqlx::query(
        "UPDATE leave_balances SET available = $2, taken = $3, requested = $4, updated_at = $5 WHERE id = $1",
    )
    .bind(balance.id.as_uuid())
    .bind(balance.available)
    .bind(balance.taken)
    .bind(balance.requested)
    .bind(balance.updated_at)
    .execute(&mut **tx)
    .await
    .map_err(|e| match map_sqlx_error("write_balance", e) {
        // A CHECK (counter >= 0) violation here means the arithmetic went wrong.
        StoreError::Validation(msg) => LedgerError::consistency(msg),
        other => other.into(),
    })?;
    if updated.rows_affected() != 1 {
        return Err(LedgerError::consistency(format!("balance {} vanished mid-transaction", balance.id)));
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Row decoding
// ─────────────────────────────────────────────────────────────────────────────

impl<'r> FromRow<'r, PgRow> for Db<LeaveType> {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Db(LeaveType {
            id: row.try_get::<Uuid, _>("id")?.into(),
            title: row.try_get("title")?,
            carry_forward: row.try_get("carry_forward")?,
        }))
    }
}

impl<'r> FromRow<'r, PgRow> for Db<LeaveBalance> {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let year: i32 = row.try_get("year")?;
        let quarter: i16 = row.try_get("quarter")?;
        let quarter = u8::try_from(quarter).map_err(|e| decode_error("quarter", e))?;
        Ok(Db(LeaveBalance {
            id: row.try_get::<Uuid, _>("id")?.into(),
            user_id: row.try_get::<Uuid, _>("user_id")?.into(),
            leave_type_id: row.try_get::<Uuid, _>("leave_type_id")?.into(),
            period: LeavePeriod::new(year, quarter).map_err(|e| decode_error("quarter", e))?,
            available: row.try_get("available")?,
            taken: row.try_get("taken")?,
            requested: row.try_get("requested")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        }))
    }
}

impl<'r> FromRow<'r, PgRow> for Db<LeaveRequest> {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let status: String = row.try_get("status")?;
        let approver: Option<Uuid> = row.try_get("approver_id")?;
        let decided_at: Option<DateTime<Utc>> = row.try_get("decided_at")?;
        let approval = match (approver, decided_at) {
            (Some(approver), Some(decided_at)) => Some(Approval {
                approver_id: approver.into(),
                comment: row.try_get("comment")?,
                decided_at,
            }),
            _ => None,
        };
        Ok(Db(LeaveRequest {
            id: row.try_get::<Uuid, _>("id")?.into(),
            user_id: row.try_get::<Uuid, _>("user_id")?.into(),
            leave_type_id: row.try_get::<Uuid, _>("leave_type_id")?.into(),
            application_date: row.try_get("application_date")?,
            leave_from: row.try_get("leave_from")?,
            leave_to: row.try_get("leave_to")?,
            reason: row.try_get("reason")?,
            status: status.parse().map_err(|e| decode_error("status", e))?,
            approval,
        }))
    }
}
