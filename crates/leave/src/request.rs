use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use hrdesk_core::{Entity, LeaveRequestId, LeaveTypeId, UserId};

use crate::error::LedgerError;
use crate::period::{self, LeavePeriod};
use crate::status::LeaveStatus;

const MAX_REASON_LEN: usize = 255;
const MAX_COMMENT_LEN: usize = 40;

/// Approval metadata recorded by every decision (approve, reject, cancel).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Approval {
    pub approver_id: UserId,
    pub comment: Option<String>,
    pub decided_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveRequest {
    pub id: LeaveRequestId,
    pub user_id: UserId,
    pub leave_type_id: LeaveTypeId,
    pub application_date: DateTime<Utc>,
    pub leave_from: NaiveDate,
    pub leave_to: NaiveDate,
    pub reason: String,
    pub status: LeaveStatus,
    pub approval: Option<Approval>,
}

impl LeaveRequest {
    /// Build a pending request for `user_id` from validated input.
    pub fn pending(user_id: UserId, input: NewLeaveRequest, now: DateTime<Utc>) -> Result<Self, LedgerError> {
        period::leave_days(input.leave_from, input.leave_to)?;
        let reason = input.reason.trim().to_string();
        if reason.is_empty() || reason.chars().count() > MAX_REASON_LEN {
            return Err(LedgerError::Validation(format!(
                "reason must be 1..={MAX_REASON_LEN} characters"
            )));
        }
        Ok(Self {
            id: LeaveRequestId::new(),
            user_id,
            leave_type_id: input.leave_type_id,
            application_date: input.application_date.unwrap_or(now),
            leave_from: input.leave_from,
            leave_to: input.leave_to,
            reason,
            status: LeaveStatus::Pending,
            approval: None,
        })
    }

    pub fn days(&self) -> Result<i32, LedgerError> {
        period::leave_days(self.leave_from, self.leave_to)
    }

    /// Balance period, derived from the application date.
    pub fn period(&self) -> LeavePeriod {
        LeavePeriod::containing(self.application_date.date_naive())
    }

    pub fn overlaps(&self, other: &LeaveRequest) -> bool {
        self.user_id == other.user_id
            && period::ranges_overlap((self.leave_from, self.leave_to), (other.leave_from, other.leave_to))
    }

    /// Whether the request lies completely inside `[from, to]`.
    pub fn within(&self, from: NaiveDate, to: NaiveDate) -> bool {
        self.leave_from >= from && self.leave_to <= to
    }
}

impl Entity for LeaveRequest {
    type Id = LeaveRequestId;
    const KIND: &'static str = "leave request";

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Submission input. The owner comes from the addressed user, not the body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLeaveRequest {
    #[serde(alias = "leave_type")]
    pub leave_type_id: LeaveTypeId,
    #[serde(default)]
    pub application_date: Option<DateTime<Utc>>,
    pub leave_from: NaiveDate,
    pub leave_to: NaiveDate,
    #[serde(alias = "leave_reason")]
    pub reason: String,
}

/// Decision input for an existing request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusUpdate {
    #[serde(alias = "leave_id")]
    pub request_id: LeaveRequestId,
    pub status: LeaveStatus,
    #[serde(default, alias = "comments")]
    pub comment: Option<String>,
}

impl StatusUpdate {
    pub fn validate(&self) -> Result<(), LedgerError> {
        match &self.comment {
            Some(c) if c.chars().count() > MAX_COMMENT_LEN => Err(LedgerError::Validation(format!(
                "comment must be at most {MAX_COMMENT_LEN} characters"
            ))),
            _ => Ok(()),
        }
    }
}
