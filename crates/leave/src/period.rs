use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

/// Accounting period of a leave balance: calendar year and quarter (1..=4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LeavePeriod {
    pub year: i32,
    pub quarter: u8,
}

impl LeavePeriod {
    pub fn new(year: i32, quarter: u8) -> Result<Self, LedgerError> {
        if !(1..=4).contains(&quarter) {
            return Err(LedgerError::Validation(format!("quarter must be 1..=4, got {quarter}")));
        }
        Ok(Self { year, quarter })
    }

    /// Period containing `date`.
    pub fn containing(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            quarter: ((date.month0() / 3) + 1) as u8,
        }
    }
}

impl core::fmt::Display for LeavePeriod {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}-Q{}", self.year, self.quarter)
    }
}

/// Inclusive day count of `from..=to`.
pub fn leave_days(from: NaiveDate, to: NaiveDate) -> Result<i32, LedgerError> {
    if to < from {
        return Err(LedgerError::Validation(format!("leave_to {to} is before leave_from {from}")));
    }
    let days = (to - from).num_days() + 1;
    i32::try_from(days).map_err(|_| LedgerError::Validation(format!("leave range of {days} days is too long")))
}

/// Closed-interval overlap.
pub fn ranges_overlap(a: (NaiveDate, NaiveDate), b: (NaiveDate, NaiveDate)) -> bool {
    a.0 <= b.1 && a.1 >= b.0
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn quarters_follow_calendar_months() {
        assert_eq!(LeavePeriod::containing(d(2025, 1, 1)).quarter, 1);
        assert_eq!(LeavePeriod::containing(d(2025, 3, 31)).quarter, 1);
        assert_eq!(LeavePeriod::containing(d(2025, 4, 10)), LeavePeriod { year: 2025, quarter: 2 });
        assert_eq!(LeavePeriod::containing(d(2025, 12, 31)).quarter, 4);
        assert!(LeavePeriod::new(2025, 5).is_err());
    }

    #[test]
    fn days_are_inclusive() {
        assert_eq!(leave_days(d(2025, 4, 10), d(2025, 4, 12)).unwrap(), 3);
        assert_eq!(leave_days(d(2025, 4, 10), d(2025, 4, 10)).unwrap(), 1);
        assert!(leave_days(d(2025, 4, 12), d(2025, 4, 10)).is_err());
    }

    #[test]
    fn touching_ranges_overlap() {
        let a = (d(2025, 4, 10), d(2025, 4, 12));
        assert!(ranges_overlap(a, (d(2025, 4, 12), d(2025, 4, 14))));
        assert!(!ranges_overlap(a, (d(2025, 4, 13), d(2025, 4, 14))));
    }

    proptest! {
        #[test]
        fn overlap_is_symmetric(a in 0i64..60, alen in 0i64..10, b in 0i64..60, blen in 0i64..10) {
            let base = d(2025, 1, 1);
            let ra = (base + chrono::Duration::days(a), base + chrono::Duration::days(a + alen));
            let rb = (base + chrono::Duration::days(b), base + chrono::Duration::days(b + blen));
            prop_assert_eq!(ranges_overlap(ra, rb), ranges_overlap(rb, ra));
        }
    }
}
