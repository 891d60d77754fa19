use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool, Row};
use uuid::Uuid;

use hrdesk_attendance::{TimeLog, TimeSummary, WorkPolicy, day_bounds};
use hrdesk_core::UserId;

use super::{Db, map_sqlx_error};
use crate::error::{StoreError, StoreResult};
use crate::store::AttendanceStore;

const LOG_COLUMNS: &str = "id, user_id, punch_in, punch_out, duration_seconds";

#[derive(Debug, Clone)]
pub struct PgAttendanceStore {
    pool: PgPool,
}

impl PgAttendanceStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AttendanceStore for PgAttendanceStore {
    async fn punch_in(&self, user_id: UserId, now: DateTime<Utc>) -> StoreResult<TimeLog> {
        let log = TimeLog::punch_in(user_id, None, now)?;
        // The partial unique index allows one open log per user.
        sqlx::query("INSERT INTO time_logs (id, user_id, punch_in) VALUES ($1, $2, $3)")
            .bind(log.id.as_uuid())
            .bind(user_id.as_uuid())
            .bind(log.punch_in)
            .execute(&self.pool)
            .await
            .map_err(|e| match map_sqlx_error("punch_in", e) {
                StoreError::Conflict(_) => StoreError::conflict("you already have an open time log"),
                other => other,
            })?;
        Ok(log)
    }

    async fn punch_out(&self, user_id: UserId, now: DateTime<Utc>) -> StoreResult<TimeLog> {
        let mut tx = self.pool.begin().await.map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let sql = format!("SELECT {LOG_COLUMNS} FROM time_logs WHERE user_id = $1 AND punch_out IS NULL FOR UPDATE");
        let Db(mut log) = sqlx::query_as::<_, Db<TimeLog>>(&sql)
            .bind(user_id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("punch_out", e))?
            .ok_or_else(|| StoreError::conflict("you do not have an open time log"))?;

        log.punch_out(now)?;
        sqlx::query("UPDATE time_logs SET punch_out = $2, duration_seconds = $3 WHERE id = $1")
            .bind(log.id.as_uuid())
            .bind(log.punch_out)
            .bind(log.duration_seconds)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("punch_out", e))?;
        tx.commit().await.map_err(|e| map_sqlx_error("commit", e))?;
        Ok(log)
    }

    async fn logs_between(&self, user_id: UserId, start: DateTime<Utc>, end: DateTime<Utc>) -> StoreResult<Vec<TimeLog>> {
        let sql = format!(
            "SELECT {LOG_COLUMNS} FROM time_logs WHERE user_id = $1 AND punch_in >= $2 AND punch_in < $3 ORDER BY punch_in"
        );
        let rows = sqlx::query_as::<_, Db<TimeLog>>(&sql)
            .bind(user_id.as_uuid())
            .bind(start)
            .bind(end)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("logs_between", e))?;
        Ok(rows.into_iter().map(|Db(l)| l).collect())
    }

    async fn close_day(
        &self,
        user_id: UserId,
        date: NaiveDate,
        policy: WorkPolicy,
        now: DateTime<Utc>,
    ) -> StoreResult<TimeSummary> {
        let (start, end) = day_bounds(date);
        let logs = self.logs_between(user_id, start, end).await?;
        let summary = TimeSummary::close_day(user_id, date, &logs, None, policy, now)?;

        // UNIQUE (user_id, date) rejects a second summary.
        sqlx::query(
            r#"
            INSERT INTO time_summaries
                (id, user_id, date, actual_seconds, min_seconds, overtime_seconds, day_start, day_end)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(summary.id.as_uuid())
        .bind(user_id.as_uuid())
        .bind(summary.date)
        .bind(summary.actual_seconds)
        .bind(summary.min_seconds)
        .bind(summary.overtime_seconds)
        .bind(summary.day_start)
        .bind(summary.day_end)
        .execute(&self.pool)
        .await
        .map_err(|e| match map_sqlx_error("close_day", e) {
            StoreError::Conflict(_) => StoreError::conflict("summary already exists for today"),
            other => other,
        })?;
        Ok(summary)
    }
}

impl<'r> FromRow<'r, PgRow> for Db<TimeLog> {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Db(TimeLog {
            id: row.try_get::<Uuid, _>("id")?.into(),
            user_id: row.try_get::<Uuid, _>("user_id")?.into(),
            punch_in: row.try_get("punch_in")?,
            punch_out: row.try_get("punch_out")?,
            duration_seconds: row.try_get("duration_seconds")?,
        }))
    }
}
