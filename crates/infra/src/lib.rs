//! Infrastructure layer: persistence collaborators and the services that need
//! transactional scope (leave ledger, accounts, attendance, reconciliation).

pub mod accounts;
pub mod attendance;
pub mod error;
pub mod ledger;
pub mod memory;
pub mod reconcile;
pub mod store;
pub mod subjects;

#[cfg(feature = "postgres")]
pub mod postgres;

pub use accounts::{AccountError, AccountService};
pub use attendance::AttendanceService;
pub use error::{StoreError, StoreResult};
pub use ledger::LeaveLedger;
pub use memory::{InMemoryAttendanceStore, InMemoryDirectoryStore, InMemoryLeaveStore};
pub use reconcile::reconcile_permissions;
pub use store::{AttendanceStore, BalanceView, DirectoryStore, LeaveStore, ReconcileReport};
pub use subjects::StoreSubjects;

pub use hrdesk_leave::LedgerError;
