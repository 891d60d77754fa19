//! Leave Balance Ledger service.
//!
//! Validates input, builds the domain objects and hands them to the
//! [`LeaveStore`], which applies the ledger arithmetic inside one transaction.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};

use hrdesk_core::UserId;
use hrdesk_leave::{
    CreateLeaveType, LeaveBalance, LeavePeriod, LeaveRequest, LeaveType, LedgerError, NewLeaveRequest,
    SetLeaveBalance, StatusUpdate, Transition,
};

use crate::error::StoreResult;
use crate::store::{BalanceView, LeaveStore};

pub struct LeaveLedger<S: LeaveStore + ?Sized> {
    store: Arc<S>,
}

impl<S: LeaveStore + ?Sized> Clone for LeaveLedger<S> {
    fn clone(&self) -> Self {
        Self { store: Arc::clone(&self.store) }
    }
}

impl<S: LeaveStore + ?Sized> LeaveLedger<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn create_leave_type(&self, input: CreateLeaveType) -> StoreResult<LeaveType> {
        let leave_type = LeaveType::create(input)?;
        self.store.insert_leave_type(leave_type).await
    }

    pub async fn leave_types(&self) -> StoreResult<Vec<LeaveType>> {
        self.store.list_leave_types().await
    }

    /// Seed the balance row for one (user, type, year, quarter).
    pub async fn set_balance(&self, input: SetLeaveBalance, now: DateTime<Utc>) -> Result<LeaveBalance, LedgerError> {
        let balance = LeaveBalance::seed(&input, now)?;
        Ok(self.store.insert_balance(balance).await?)
    }

    pub async fn balances(&self, user_id: UserId, period: LeavePeriod) -> StoreResult<Vec<BalanceView>> {
        self.store.list_balances(user_id, period).await
    }

    pub async fn requests(&self, user_id: UserId, from: NaiveDate, to: NaiveDate) -> Result<Vec<LeaveRequest>, LedgerError> {
        if from > to {
            return Err(LedgerError::Validation("from must not be after to".into()));
        }
        Ok(self.store.list_requests(user_id, from, to).await?)
    }

    /// Open a pending request for `user_id`, reserving its days.
    pub async fn submit(
        &self,
        user_id: UserId,
        input: NewLeaveRequest,
        now: DateTime<Utc>,
    ) -> Result<LeaveRequest, LedgerError> {
        let request = LeaveRequest::pending(user_id, input, now)?;
        let transition = self.store.submit_request(request.clone(), now).await?;
        log_transition(user_id, &transition);
        Ok(request)
    }

    /// Decide a request owned by `owner`.
    ///
    /// A request that does not belong to `owner` is reported as missing.
    pub async fn transition(
        &self,
        owner: UserId,
        update: StatusUpdate,
        approver: UserId,
        now: DateTime<Utc>,
    ) -> Result<LeaveRequest, LedgerError> {
        update.validate()?;
        match self.store.find_request(update.request_id).await? {
            Some(request) if request.user_id == owner => {}
            _ => return Err(LedgerError::NotFound("leave request")),
        }

        let (request, transition) = self
            .store
            .transition_request(update.request_id, update.status, approver, update.comment, now)
            .await
            .inspect_err(|e| {
                if matches!(e, LedgerError::Consistency(_)) {
                    tracing::error!(request_id = %update.request_id, error = %e, "leave transition rolled back");
                }
            })?;
        log_transition(owner, &transition);
        Ok(request)
    }
}

fn log_transition(user_id: UserId, t: &Transition) {
    tracing::info!(
        %user_id,
        request_id = %t.request_id,
        from = t.from.map(|s| s.as_str()).unwrap_or("none"),
        to = t.to.as_str(),
        days = t.days,
        "leave ledger transition applied"
    );
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use hrdesk_core::LeaveTypeId;
    use hrdesk_leave::LeaveStatus;

    use super::*;
    use crate::memory::InMemoryLeaveStore;

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, day).unwrap()
    }

    async fn seeded(available: i32) -> (LeaveLedger<InMemoryLeaveStore>, UserId, LeaveTypeId) {
        let ledger = LeaveLedger::new(Arc::new(InMemoryLeaveStore::new()));
        let lt = ledger
            .create_leave_type(CreateLeaveType { title: "casual".into(), carry_forward: false })
            .await
            .unwrap();
        let user = UserId::new();
        ledger
            .set_balance(
                SetLeaveBalance { user_id: user, leave_type_id: lt.id, year: 2025, quarter: 2, available },
                Utc::now(),
            )
            .await
            .unwrap();
        (ledger, user, lt.id)
    }

    fn input(leave_type: LeaveTypeId, from: NaiveDate, to: NaiveDate) -> NewLeaveRequest {
        NewLeaveRequest {
            leave_type_id: leave_type,
            application_date: Some(Utc.with_ymd_and_hms(2025, 4, 20, 9, 0, 0).unwrap()),
            leave_from: from,
            leave_to: to,
            reason: "family".into(),
        }
    }

    async fn counters(ledger: &LeaveLedger<InMemoryLeaveStore>, user: UserId, lt: LeaveTypeId) -> (i32, i32, i32) {
        let b = ledger
            .store()
            .balance_for(user, lt, LeavePeriod::new(2025, 2).unwrap())
            .await
            .unwrap()
            .unwrap();
        (b.available, b.taken, b.requested)
    }

    #[tokio::test]
    async fn approve_then_cancel_restores_the_balance() {
        let (ledger, user, lt) = seeded(10).await;
        let approver = UserId::new();

        let request = ledger.submit(user, input(lt, d(5, 5), d(5, 7)), Utc::now()).await.unwrap();
        assert_eq!(counters(&ledger, user, lt).await, (7, 0, 3));

        let approve = StatusUpdate { request_id: request.id, status: LeaveStatus::Approved, comment: None };
        ledger.transition(user, approve, approver, Utc::now()).await.unwrap();
        assert_eq!(counters(&ledger, user, lt).await, (7, 3, 0));

        let cancel = StatusUpdate { request_id: request.id, status: LeaveStatus::Cancelled, comment: Some("plans changed".into()) };
        let cancelled = ledger.transition(user, cancel, approver, Utc::now()).await.unwrap();
        assert_eq!(cancelled.status, LeaveStatus::Cancelled);
        assert_eq!(counters(&ledger, user, lt).await, (10, 0, 0));
    }

    #[tokio::test]
    async fn decisions_are_scoped_to_the_owner() {
        let (ledger, user, lt) = seeded(10).await;
        let request = ledger.submit(user, input(lt, d(5, 5), d(5, 5)), Utc::now()).await.unwrap();

        let update = StatusUpdate { request_id: request.id, status: LeaveStatus::Rejected, comment: None };
        let err = ledger.transition(UserId::new(), update, UserId::new(), Utc::now()).await.unwrap_err();
        assert_eq!(err, LedgerError::NotFound("leave request"));
        assert_eq!(counters(&ledger, user, lt).await, (9, 0, 1));
    }

    #[tokio::test]
    async fn overlong_comment_is_rejected_before_any_write() {
        let (ledger, user, lt) = seeded(10).await;
        let request = ledger.submit(user, input(lt, d(5, 5), d(5, 5)), Utc::now()).await.unwrap();

        let update = StatusUpdate { request_id: request.id, status: LeaveStatus::Approved, comment: Some("x".repeat(41)) };
        assert!(matches!(ledger.transition(user, update, user, Utc::now()).await, Err(LedgerError::Validation(_))));
        assert_eq!(counters(&ledger, user, lt).await, (9, 0, 1));
    }

    #[tokio::test]
    async fn concurrent_submissions_cannot_overdraw() {
        let (ledger, user, lt) = seeded(3).await;

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let ledger = ledger.clone();
                let day = d(6, 2 + i * 2);
                tokio::spawn(async move { ledger.submit(user, input(lt, day, day.succ_opt().unwrap()), Utc::now()).await })
            })
            .collect();

        let mut accepted = 0;
        for h in handles {
            if h.await.unwrap().is_ok() {
                accepted += 1;
            }
        }

        assert_eq!(accepted, 1);
        let (available, taken, requested) = counters(&ledger, user, lt).await;
        assert_eq!((available, taken, requested), (1, 0, 2));
    }

    #[tokio::test]
    async fn listing_rejects_inverted_ranges() {
        let (ledger, user, lt) = seeded(10).await;
        ledger.submit(user, input(lt, d(5, 5), d(5, 6)), Utc::now()).await.unwrap();

        assert_eq!(ledger.requests(user, d(5, 1), d(5, 31)).await.unwrap().len(), 1);
        assert!(ledger.requests(user, d(5, 31), d(5, 1)).await.is_err());
    }
}
