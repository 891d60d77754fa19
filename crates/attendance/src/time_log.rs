use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use hrdesk_core::{DomainError, DomainResult, Entity, TimeLogId, UserId};

/// One punch-in/punch-out interval. At most one open log per user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeLog {
    pub id: TimeLogId,
    pub user_id: UserId,
    pub punch_in: DateTime<Utc>,
    pub punch_out: Option<DateTime<Utc>>,
    /// Whole seconds, set on punch-out.
    pub duration_seconds: Option<i64>,
}

impl TimeLog {
    /// Open a new log. Fails if `open` (the user's current open log) exists.
    pub fn punch_in(user_id: UserId, open: Option<&TimeLog>, now: DateTime<Utc>) -> DomainResult<Self> {
        if open.is_some() {
            return Err(DomainError::conflict("you already have an open time log"));
        }
        Ok(Self {
            id: TimeLogId::new(),
            user_id,
            punch_in: now,
            punch_out: None,
            duration_seconds: None,
        })
    }

    /// Close this log at `now`.
    pub fn punch_out(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        if !self.is_open() {
            return Err(DomainError::conflict("time log is already closed"));
        }
        if now < self.punch_in {
            return Err(DomainError::invariant("punch-out precedes punch-in"));
        }
        self.punch_out = Some(now);
        self.duration_seconds = Some((now - self.punch_in).num_seconds());
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.punch_out.is_none()
    }
}

impl Entity for TimeLog {
    type Id = TimeLogId;
    const KIND: &'static str = "time log";

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// `[start, end)` of a UTC calendar day.
pub fn day_bounds(date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = date.and_time(NaiveTime::MIN).and_utc();
    (start, start + Duration::days(1))
}
