use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use hrdesk_core::{DomainError, DomainResult, Entity, TimeSummaryId, UserId};

use crate::time_log::TimeLog;

/// Minimum working time per day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkPolicy {
    pub min_work_hours: u32,
}

impl WorkPolicy {
    pub fn min_seconds(&self) -> i64 {
        i64::from(self.min_work_hours) * 3600
    }
}

impl Default for WorkPolicy {
    fn default() -> Self {
        Self { min_work_hours: 8 }
    }
}

/// Day-end aggregate of one user's logs; one per (user, date), never rewritten.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSummary {
    pub id: TimeSummaryId,
    pub user_id: UserId,
    pub date: NaiveDate,
    pub actual_seconds: i64,
    pub min_seconds: i64,
    pub overtime_seconds: i64,
    pub day_start: DateTime<Utc>,
    pub day_end: DateTime<Utc>,
}

impl TimeSummary {
    /// Summarise `logs` (the user's logs punched in on `date`).
    ///
    /// Open logs count as ending `now` for `day_end` and add no worked time.
    pub fn close_day(
        user_id: UserId,
        date: NaiveDate,
        logs: &[TimeLog],
        existing: Option<&TimeSummary>,
        policy: WorkPolicy,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if existing.is_some() {
            return Err(DomainError::conflict("summary already exists for today"));
        }
        let day_start = logs
            .iter()
            .map(|l| l.punch_in)
            .min()
            .ok_or_else(|| DomainError::validation("no punch logs found for today"))?;
        let day_end = logs
            .iter()
            .map(|l| l.punch_out.unwrap_or(now))
            .max()
            .unwrap_or(now);

        let actual_seconds: i64 = logs.iter().filter_map(|l| l.duration_seconds).sum();
        let min_seconds = policy.min_seconds();

        Ok(Self {
            id: TimeSummaryId::new(),
            user_id,
            date,
            actual_seconds,
            min_seconds,
            overtime_seconds: (actual_seconds - min_seconds).max(0),
            day_start,
            day_end,
        })
    }
}

impl Entity for TimeSummary {
    type Id = TimeSummaryId;
    const KIND: &'static str = "time summary";

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn closed(user: UserId, start: DateTime<Utc>, hours: i64) -> TimeLog {
        let mut log = TimeLog::punch_in(user, None, start).unwrap();
        log.punch_out(start + Duration::hours(hours)).unwrap();
        log
    }

    #[test]
    fn overtime_is_worked_time_beyond_minimum() {
        let user = UserId::new();
        let morning = Utc.with_ymd_and_hms(2025, 4, 10, 8, 0, 0).unwrap();
        let logs = vec![closed(user, morning, 4), closed(user, morning + Duration::hours(5), 5)];
        let date = morning.date_naive();

        let summary = TimeSummary::close_day(user, date, &logs, None, WorkPolicy::default(), Utc::now()).unwrap();

        assert_eq!(summary.actual_seconds, 9 * 3600);
        assert_eq!(summary.min_seconds, 8 * 3600);
        assert_eq!(summary.overtime_seconds, 3600);
        assert_eq!(summary.day_start, morning);
        assert_eq!(summary.day_end, morning + Duration::hours(10));
    }

    #[test]
    fn short_days_have_no_negative_overtime() {
        let user = UserId::new();
        let start = Utc.with_ymd_and_hms(2025, 4, 10, 8, 0, 0).unwrap();
        let logs = vec![closed(user, start, 2)];
        let summary =
            TimeSummary::close_day(user, start.date_naive(), &logs, None, WorkPolicy::default(), Utc::now()).unwrap();
        assert_eq!(summary.overtime_seconds, 0);
    }

    #[test]
    fn open_log_ends_now_but_adds_no_time() {
        let user = UserId::new();
        let start = Utc.with_ymd_and_hms(2025, 4, 10, 8, 0, 0).unwrap();
        let now = start + Duration::hours(3);
        let open = TimeLog::punch_in(user, None, start).unwrap();

        let summary =
            TimeSummary::close_day(user, start.date_naive(), &[open], None, WorkPolicy::default(), now).unwrap();
        assert_eq!(summary.day_end, now);
        assert_eq!(summary.actual_seconds, 0);
    }

    #[test]
    fn empty_day_and_duplicates_are_rejected() {
        let user = UserId::new();
        let date = NaiveDate::from_ymd_opt(2025, 4, 10).unwrap();
        assert!(TimeSummary::close_day(user, date, &[], None, WorkPolicy::default(), Utc::now()).is_err());

        let start = Utc.with_ymd_and_hms(2025, 4, 10, 8, 0, 0).unwrap();
        let logs = vec![closed(user, start, 1)];
        let first = TimeSummary::close_day(user, date, &logs, None, WorkPolicy::default(), Utc::now()).unwrap();
        let err = TimeSummary::close_day(user, date, &logs, Some(&first), WorkPolicy::default(), Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }
}
