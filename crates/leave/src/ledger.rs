//! Ledger arithmetic: request creation and status transitions applied to the
//! matching balance row.
//!
//! Both functions either fully apply (request + balance) or leave every
//! argument untouched. Callers run them inside one transactional scope.

use chrono::{DateTime, Utc};
use serde::Serialize;

use hrdesk_core::{LeaveRequestId, UserId};

use crate::balance::{BalanceEffect, LeaveBalance};
use crate::error::LedgerError;
use crate::request::{Approval, LeaveRequest};
use crate::status::LeaveStatus;

/// Record of an applied transition, used for logging and responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Transition {
    pub request_id: LeaveRequestId,
    pub from: Option<LeaveStatus>,
    pub to: LeaveStatus,
    pub days: i32,
}

/// Open a pending request against `balance`.
///
/// `existing` must hold every request of the same user regardless of status.
pub fn open_request<'a, I>(
    balance: &mut LeaveBalance,
    request: &LeaveRequest,
    existing: I,
    now: DateTime<Utc>,
) -> Result<Transition, LedgerError>
where
    I: IntoIterator<Item = &'a LeaveRequest>,
{
    if request.status != LeaveStatus::Pending {
        return Err(LedgerError::Validation("new requests must be pending".into()));
    }
    ensure_matches(balance, request)?;

    if existing.into_iter().any(|other| other.id != request.id && other.overlaps(request)) {
        return Err(LedgerError::conflict("overlapping leave request exists"));
    }

    let days = request.days()?;
    if !balance.can_cover(days) {
        return Err(LedgerError::conflict("leave balance not sufficient for the given leave type"));
    }

    balance.apply(BalanceEffect::open(days), now)?;
    Ok(Transition { request_id: request.id, from: None, to: LeaveStatus::Pending, days })
}

/// Move `request` to `target`, adjusting `balance` per the transition table.
pub fn decide(
    balance: &mut LeaveBalance,
    request: &mut LeaveRequest,
    target: LeaveStatus,
    approver: UserId,
    comment: Option<String>,
    now: DateTime<Utc>,
) -> Result<Transition, LedgerError> {
    ensure_matches(balance, request)?;

    let days = request.days()?;
    let from = request.status;
    let effect = from.transition(target, days)?;

    balance.apply(effect, now)?;
    request.status = target;
    request.approval = Some(Approval { approver_id: approver, comment, decided_at: now });

    Ok(Transition { request_id: request.id, from: Some(from), to: target, days })
}

fn ensure_matches(balance: &LeaveBalance, request: &LeaveRequest) -> Result<(), LedgerError> {
    if balance.user_id != request.user_id
        || balance.leave_type_id != request.leave_type_id
        || balance.period != request.period()
    {
        return Err(LedgerError::consistency(format!(
            "balance {} does not belong to leave request {}",
            balance.id, request.id
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone};

    use hrdesk_core::LeaveTypeId;

    use super::*;
    use crate::balance::SetLeaveBalance;
    use crate::request::NewLeaveRequest;

    const NO_OTHERS: &[LeaveRequest] = &[];

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, day).unwrap()
    }

    fn fixture(available: i32) -> (LeaveBalance, UserId, LeaveTypeId) {
        let user = UserId::new();
        let leave_type = LeaveTypeId::new();
        let balance = LeaveBalance::seed(
            &SetLeaveBalance { user_id: user, leave_type_id: leave_type, year: 2025, quarter: 2, available },
            Utc::now(),
        )
        .unwrap();
        (balance, user, leave_type)
    }

    fn request(user: UserId, leave_type: LeaveTypeId, from: NaiveDate, to: NaiveDate) -> LeaveRequest {
        LeaveRequest::pending(
            user,
            NewLeaveRequest {
                leave_type_id: leave_type,
                application_date: Some(Utc.with_ymd_and_hms(2025, 4, 1, 9, 0, 0).unwrap()),
                leave_from: from,
                leave_to: to,
                reason: "family trip".into(),
            },
            Utc::now(),
        )
        .unwrap()
    }

    fn counters(b: &LeaveBalance) -> (i32, i32, i32) {
        (b.available, b.taken, b.requested)
    }

    #[test]
    fn create_approve_cancel_scenario() {
        let (mut balance, user, lt) = fixture(10);
        let mut req = request(user, lt, d(4, 10), d(4, 12));
        let approver = UserId::new();

        let t = open_request(&mut balance, &req, NO_OTHERS, Utc::now()).unwrap();
        assert_eq!(t.days, 3);
        assert_eq!(req.status, LeaveStatus::Pending);
        assert_eq!(counters(&balance), (7, 0, 3));

        decide(&mut balance, &mut req, LeaveStatus::Approved, approver, Some("ok".into()), Utc::now()).unwrap();
        assert_eq!(req.status, LeaveStatus::Approved);
        assert_eq!(counters(&balance), (7, 3, 0));
        assert_eq!(req.approval.as_ref().map(|a| a.approver_id), Some(approver));

        let t = decide(&mut balance, &mut req, LeaveStatus::Cancelled, approver, None, Utc::now()).unwrap();
        assert_eq!(t.from, Some(LeaveStatus::Approved));
        assert_eq!(req.status, LeaveStatus::Cancelled);
        assert_eq!(counters(&balance), (10, 0, 0));
    }

    #[test]
    fn repeating_a_status_does_not_double_apply() {
        let (mut balance, user, lt) = fixture(10);
        let mut req = request(user, lt, d(4, 10), d(4, 12));
        open_request(&mut balance, &req, NO_OTHERS, Utc::now()).unwrap();
        decide(&mut balance, &mut req, LeaveStatus::Approved, UserId::new(), None, Utc::now()).unwrap();

        let snapshot = (balance.clone(), req.clone());
        let err = decide(&mut balance, &mut req, LeaveStatus::Approved, UserId::new(), None, Utc::now()).unwrap_err();

        assert!(matches!(err, LedgerError::Conflict(_)));
        assert_eq!((balance, req), snapshot);
    }

    #[test]
    fn rejecting_returns_days_to_available() {
        let (mut balance, user, lt) = fixture(10);
        let mut req = request(user, lt, d(4, 10), d(4, 11));
        open_request(&mut balance, &req, NO_OTHERS, Utc::now()).unwrap();
        decide(&mut balance, &mut req, LeaveStatus::Rejected, UserId::new(), None, Utc::now()).unwrap();
        assert_eq!(counters(&balance), (10, 0, 0));

        let err = decide(&mut balance, &mut req, LeaveStatus::Cancelled, UserId::new(), None, Utc::now()).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidTransition { .. }));
    }

    #[test]
    fn insufficient_balance_is_a_conflict() {
        let (mut balance, user, lt) = fixture(2);
        let req = request(user, lt, d(4, 10), d(4, 12));
        let err = open_request(&mut balance, &req, NO_OTHERS, Utc::now()).unwrap_err();
        assert!(matches!(err, LedgerError::Conflict(ref m) if m.contains("not sufficient")));
        assert_eq!(counters(&balance), (2, 0, 0));
    }

    #[test]
    fn overlap_checks_every_status() {
        let (mut balance, user, lt) = fixture(10);
        let mut old = request(user, lt, d(4, 1), d(4, 3));
        old.status = LeaveStatus::Cancelled;
        let new = request(user, lt, d(4, 3), d(4, 4));

        let err = open_request(&mut balance, &new, [&old], Utc::now()).unwrap_err();
        assert!(matches!(err, LedgerError::Conflict(ref m) if m.contains("overlapping")));
    }

    #[test]
    fn mismatched_balance_row_is_a_consistency_failure() {
        let (mut balance, _, lt) = fixture(10);
        let req = request(UserId::new(), lt, d(4, 10), d(4, 12));
        let err = open_request(&mut balance, &req, NO_OTHERS, Utc::now()).unwrap_err();
        assert!(matches!(err, LedgerError::Consistency(_)));
    }
}
