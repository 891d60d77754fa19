use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::balance::BalanceEffect;
use crate::error::LedgerError;

/// Leave request lifecycle.
///
/// ```text
/// pending ─▶ approved ─▶ cancelled
///    │
///    ├─▶ rejected
///    └─▶ cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

impl LeaveStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeaveStatus::Pending => "pending",
            LeaveStatus::Approved => "approved",
            LeaveStatus::Rejected => "rejected",
            LeaveStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, LeaveStatus::Rejected | LeaveStatus::Cancelled)
    }

    /// Validate `self → to` and return the balance effect for `days`.
    pub fn transition(self, to: LeaveStatus, days: i32) -> Result<BalanceEffect, LedgerError> {
        if self == to {
            return Err(LedgerError::conflict(format!("leave is already {to}")));
        }
        if self == LeaveStatus::Cancelled {
            return Err(LedgerError::conflict("cancelled leaves can't be processed"));
        }

        use LeaveStatus::*;
        let effect = match (self, to) {
            (Pending, Approved) => BalanceEffect { taken: days, requested: -days, ..BalanceEffect::NONE },
            (Pending, Rejected) | (Pending, Cancelled) => {
                BalanceEffect { available: days, requested: -days, ..BalanceEffect::NONE }
            }
            (Approved, Cancelled) => BalanceEffect { available: days, taken: -days, ..BalanceEffect::NONE },
            (from, to) => return Err(LedgerError::InvalidTransition { from, to }),
        };
        Ok(effect)
    }
}

impl core::fmt::Display for LeaveStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LeaveStatus {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(LeaveStatus::Pending),
            "approved" => Ok(LeaveStatus::Approved),
            "rejected" => Ok(LeaveStatus::Rejected),
            "cancelled" => Ok(LeaveStatus::Cancelled),
            other => Err(LedgerError::Validation(format!("unknown leave status '{other}'"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use LeaveStatus::*;

    const ALL: [LeaveStatus; 4] = [Pending, Approved, Rejected, Cancelled];

    #[test]
    fn repeated_status_is_a_conflict() {
        for s in ALL {
            assert!(matches!(s.transition(s, 3), Err(LedgerError::Conflict(_))));
        }
    }

    #[test]
    fn nothing_leaves_cancelled() {
        for to in [Pending, Approved, Rejected] {
            assert!(matches!(Cancelled.transition(to, 1), Err(LedgerError::Conflict(_))));
        }
    }

    #[test]
    fn rejected_is_terminal_and_nothing_returns_to_pending() {
        assert_eq!(
            Rejected.transition(Cancelled, 1),
            Err(LedgerError::InvalidTransition { from: Rejected, to: Cancelled })
        );
        assert_eq!(
            Approved.transition(Pending, 1),
            Err(LedgerError::InvalidTransition { from: Approved, to: Pending })
        );
        assert_eq!(
            Approved.transition(Rejected, 1),
            Err(LedgerError::InvalidTransition { from: Approved, to: Rejected })
        );
    }

    #[test]
    fn effects_match_the_transition_table() {
        assert_eq!(Pending.transition(Approved, 3).unwrap(), BalanceEffect { available: 0, taken: 3, requested: -3 });
        assert_eq!(Pending.transition(Rejected, 3).unwrap(), BalanceEffect { available: 3, taken: 0, requested: -3 });
        assert_eq!(Pending.transition(Cancelled, 3).unwrap(), BalanceEffect { available: 3, taken: 0, requested: -3 });
        assert_eq!(Approved.transition(Cancelled, 3).unwrap(), BalanceEffect { available: 3, taken: -3, requested: 0 });
    }

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("APPROVED".parse::<LeaveStatus>().unwrap(), Approved);
        assert!("maybe".parse::<LeaveStatus>().is_err());
    }
}
