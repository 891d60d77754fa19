//! Authentication error types.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("account is inactive")]
    AccountInactive,

    #[error("token has expired")]
    TokenExpired,

    #[error("invalid token: {0}")]
    TokenInvalid(String),

    #[error("signing secret '{0}' is not configured")]
    MissingSecret(&'static str),

    #[error("cryptography error: {0}")]
    Crypto(String),
}

impl AuthError {
    /// True for failures that must surface as "unauthenticated" to callers.
    pub fn is_unauthenticated(&self) -> bool {
        matches!(
            self,
            AuthError::InvalidCredentials
                | AuthError::AccountInactive
                | AuthError::TokenExpired
                | AuthError::TokenInvalid(_)
        )
    }
}
