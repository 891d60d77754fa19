//! Errors raised while building or mutating domain values.

use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

/// A rule the domain itself enforces was broken.
///
/// Lookups and access decisions fail in the stores and the gate, so neither
/// has a variant here.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Malformed or out-of-range input.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A value would leave a consistent state, e.g. a punch-out before its punch-in.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// Duplicate name or a state that already exists.
    #[error("conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_their_detail() {
        assert_eq!(DomainError::validation("name is empty").to_string(), "validation failed: name is empty");
        assert_eq!(DomainError::conflict("role exists").to_string(), "conflict: role exists");
        assert_eq!(
            DomainError::invariant("punch-out precedes punch-in"),
            DomainError::InvariantViolation("punch-out precedes punch-in".into())
        );
    }
}
