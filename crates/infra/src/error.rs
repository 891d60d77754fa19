use thiserror::Error;

use hrdesk_core::DomainError;
use hrdesk_leave::LedgerError;

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence-level failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("validation failed: {0}")]
    Validation(String),

    /// A write left (or would leave) related rows inconsistent.
    #[error("consistency failure: {0}")]
    Consistency(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }

    /// Error for a poisoned in-memory lock.
    pub(crate) fn poisoned(what: &str) -> Self {
        Self::Backend(format!("{what} lock poisoned"))
    }
}

impl From<DomainError> for StoreError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(m) | DomainError::InvalidId(m) => StoreError::Validation(m),
            DomainError::Conflict(m) => StoreError::Conflict(m),
            DomainError::InvariantViolation(m) => StoreError::Consistency(m),
        }
    }
}

impl From<StoreError> for LedgerError {
    /// Every store failure inside a ledger operation is a rolled-back
    /// consistency failure, except the domain-level outcomes.
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => LedgerError::NotFound(what),
            StoreError::Conflict(m) => LedgerError::Conflict(m),
            StoreError::Validation(m) => LedgerError::Validation(m),
            StoreError::Consistency(m) | StoreError::Backend(m) => LedgerError::Consistency(m),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_failures_keep_their_category() {
        assert_eq!(StoreError::from(DomainError::invalid_id("UserId: bad")), StoreError::Validation("UserId: bad".into()));
        assert_eq!(StoreError::from(DomainError::conflict("open log")), StoreError::Conflict("open log".into()));
        assert!(matches!(StoreError::from(DomainError::invariant("clock")), StoreError::Consistency(_)));
    }

    #[test]
    fn backend_failures_become_ledger_consistency() {
        assert!(matches!(LedgerError::from(StoreError::backend("down")), LedgerError::Consistency(_)));
        assert_eq!(LedgerError::from(StoreError::NotFound("leave type")), LedgerError::NotFound("leave type"));
    }
}
