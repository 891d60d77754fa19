use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use hrdesk_core::{Entity, LeaveBalanceId, LeaveTypeId, UserId};

use crate::error::LedgerError;
use crate::period::LeavePeriod;

/// Day counters for one (user, leave type, year, quarter).
///
/// Mutated only through [`LeaveBalance::apply`]; every counter stays >= 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveBalance {
    pub id: LeaveBalanceId,
    pub user_id: UserId,
    pub leave_type_id: LeaveTypeId,
    pub period: LeavePeriod,
    pub available: i32,
    pub taken: i32,
    pub requested: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Signed counter deltas of a single transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BalanceEffect {
    pub available: i32,
    pub taken: i32,
    pub requested: i32,
}

impl BalanceEffect {
    pub const NONE: BalanceEffect = BalanceEffect { available: 0, taken: 0, requested: 0 };

    /// Effect of opening a pending request.
    pub fn open(days: i32) -> Self {
        Self { available: -days, requested: days, ..Self::NONE }
    }
}

impl LeaveBalance {
    pub fn seed(input: &SetLeaveBalance, now: DateTime<Utc>) -> Result<Self, LedgerError> {
        if input.available < 0 {
            return Err(LedgerError::Validation("available days cannot be negative".into()));
        }
        Ok(Self {
            id: LeaveBalanceId::new(),
            user_id: input.user_id,
            leave_type_id: input.leave_type_id,
            period: LeavePeriod::new(input.year, input.quarter)?,
            available: input.available,
            taken: 0,
            requested: 0,
            created_at: now,
            updated_at: None,
        })
    }

    /// Creation-time availability test: `available - taken >= days`.
    ///
    /// `requested` is not part of the test.
    pub fn can_cover(&self, days: i32) -> bool {
        self.available - self.taken >= days
    }

    /// Apply `effect`, failing without mutation if any counter would go negative.
    pub fn apply(&mut self, effect: BalanceEffect, now: DateTime<Utc>) -> Result<(), LedgerError> {
        let available = checked(self.available, effect.available, "available")?;
        let taken = checked(self.taken, effect.taken, "taken")?;
        let requested = checked(self.requested, effect.requested, "requested")?;

        self.available = available;
        self.taken = taken;
        self.requested = requested;
        self.updated_at = Some(now);
        Ok(())
    }
}

fn checked(current: i32, delta: i32, counter: &str) -> Result<i32, LedgerError> {
    match current.checked_add(delta) {
        Some(v) if v >= 0 => Ok(v),
        _ => Err(LedgerError::consistency(format!(
            "{counter} would become negative ({current} + {delta})"
        ))),
    }
}

impl Entity for LeaveBalance {
    type Id = LeaveBalanceId;
    const KIND: &'static str = "leave balance";

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Administrative seeding of a balance row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetLeaveBalance {
    pub user_id: UserId,
    pub leave_type_id: LeaveTypeId,
    pub year: i32,
    pub quarter: u8,
    pub available: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn balance(available: i32) -> LeaveBalance {
        LeaveBalance::seed(
            &SetLeaveBalance {
                user_id: UserId::new(),
                leave_type_id: LeaveTypeId::new(),
                year: 2025,
                quarter: 2,
                available,
            },
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn negative_counters_fail_without_clamping() {
        let mut b = balance(2);
        let before = b.clone();
        let err = b.apply(BalanceEffect { taken: -1, ..BalanceEffect::NONE }, Utc::now()).unwrap_err();

        assert!(matches!(err, LedgerError::Consistency(_)));
        assert_eq!(b, before);
    }

    #[test]
    fn coverage_ignores_requested() {
        let mut b = balance(5);
        b.apply(BalanceEffect::open(4), Utc::now()).unwrap();
        // available=1, requested=4
        assert!(b.can_cover(1));
        assert!(!b.can_cover(2));
    }
}
