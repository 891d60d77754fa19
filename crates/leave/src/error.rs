use thiserror::Error;

use crate::status::LeaveStatus;

/// Failures of a ledger operation (request creation or status transition).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Overlapping range, insufficient balance, repeated status, cancelled request.
    #[error("{0}")]
    Conflict(String),

    #[error("invalid leave input: {0}")]
    Validation(String),

    #[error("cannot move a {from} leave to {to}")]
    InvalidTransition { from: LeaveStatus, to: LeaveStatus },

    /// Broken balance invariants or a failed transactional write.
    #[error("ledger consistency failure: {0}")]
    Consistency(String),
}

impl LedgerError {
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn consistency(msg: impl Into<String>) -> Self {
        Self::Consistency(msg.into())
    }
}
