//! Leave domain module (leave types, quarterly balances, requests).
//!
//! Pure domain logic: the status machine, day/quarter arithmetic and the
//! balance effects of each transition. The transactional boundary around these
//! rules lives in `hrdesk-infra`.

pub mod balance;
pub mod error;
pub mod ledger;
pub mod leave_type;
pub mod period;
pub mod request;
pub mod status;

pub use balance::{BalanceEffect, LeaveBalance, SetLeaveBalance};
pub use error::LedgerError;
pub use ledger::{Transition, decide, open_request};
pub use leave_type::{CreateLeaveType, LeaveType};
pub use period::{LeavePeriod, leave_days, ranges_overlap};
pub use request::{Approval, LeaveRequest, NewLeaveRequest, StatusUpdate};
pub use status::LeaveStatus;
