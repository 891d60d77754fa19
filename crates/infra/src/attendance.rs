//! Punch-in/punch-out and day-end summaries.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};

use hrdesk_attendance::{TimeLog, TimeSummary, WorkPolicy, day_bounds};
use hrdesk_core::UserId;

use crate::error::StoreResult;
use crate::store::AttendanceStore;

#[derive(Clone)]
pub struct AttendanceService {
    store: Arc<dyn AttendanceStore>,
    policy: WorkPolicy,
}

impl AttendanceService {
    pub fn new(store: Arc<dyn AttendanceStore>, policy: WorkPolicy) -> Self {
        Self { store, policy }
    }

    pub async fn punch_in(&self, user_id: UserId, now: DateTime<Utc>) -> StoreResult<TimeLog> {
        let log = self.store.punch_in(user_id, now).await?;
        tracing::info!(%user_id, log_id = %log.id, "punched in");
        Ok(log)
    }

    pub async fn punch_out(&self, user_id: UserId, now: DateTime<Utc>) -> StoreResult<TimeLog> {
        let log = self.store.punch_out(user_id, now).await?;
        tracing::info!(%user_id, log_id = %log.id, seconds = log.duration_seconds, "punched out");
        Ok(log)
    }

    /// Close the current UTC day for `user_id`.
    pub async fn day_end(&self, user_id: UserId, now: DateTime<Utc>) -> StoreResult<TimeSummary> {
        let summary = self.store.close_day(user_id, now.date_naive(), self.policy, now).await?;
        tracing::info!(
            %user_id,
            date = %summary.date,
            actual_seconds = summary.actual_seconds,
            overtime_seconds = summary.overtime_seconds,
            "day closed"
        );
        Ok(summary)
    }

    pub async fn time_logs(&self, user_id: UserId, date: NaiveDate) -> StoreResult<Vec<TimeLog>> {
        let (start, end) = day_bounds(date);
        self.store.logs_between(user_id, start, end).await
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;
    use crate::error::StoreError;
    use crate::memory::InMemoryAttendanceStore;

    fn service() -> AttendanceService {
        AttendanceService::new(Arc::new(InMemoryAttendanceStore::new()), WorkPolicy { min_work_hours: 4 })
    }

    #[tokio::test]
    async fn logs_are_scoped_to_one_day() {
        let svc = service();
        let user = UserId::new();
        let day1 = Utc.with_ymd_and_hms(2025, 4, 10, 22, 0, 0).unwrap();

        svc.punch_in(user, day1).await.unwrap();
        svc.punch_out(user, day1 + Duration::hours(1)).await.unwrap();
        svc.punch_in(user, day1 + Duration::hours(3)).await.unwrap();

        assert_eq!(svc.time_logs(user, day1.date_naive()).await.unwrap().len(), 1);
        let next = svc.time_logs(user, day1.date_naive().succ_opt().unwrap()).await.unwrap();
        assert_eq!(next.len(), 1);
        assert!(next[0].is_open());
    }

    #[tokio::test]
    async fn day_end_uses_configured_minimum() {
        let svc = service();
        let user = UserId::new();
        let start = Utc.with_ymd_and_hms(2025, 4, 10, 8, 0, 0).unwrap();

        svc.punch_in(user, start).await.unwrap();
        svc.punch_out(user, start + Duration::hours(5)).await.unwrap();

        let summary = svc.day_end(user, start + Duration::hours(6)).await.unwrap();
        assert_eq!(summary.min_seconds, 4 * 3600);
        assert_eq!(summary.overtime_seconds, 3600);
    }

    #[tokio::test]
    async fn day_end_without_logs_is_rejected() {
        let svc = service();
        let err = svc.day_end(UserId::new(), Utc::now()).await.unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }
}
