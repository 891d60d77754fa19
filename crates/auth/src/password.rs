//! Password hashing and verification using Argon2id.

use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use argon2::{Argon2, PasswordHasher, PasswordVerifier};

use crate::error::AuthError;

/// One-way, salted credential hashing capability.
///
/// Implementations must never compare plaintexts directly.
pub trait CredentialHasher: Send + Sync {
    /// Hash `password` into an opaque, self-describing credential string.
    fn hash(&self, password: &str) -> Result<String, AuthError>;

    /// Returns `Ok(true)` on match, `Ok(false)` on mismatch, or
    /// `Err(AuthError::Crypto)` if the stored credential is malformed.
    fn verify(&self, password: &str, credential: &str) -> Result<bool, AuthError>;
}

/// Argon2id hasher producing PHC-format strings.
#[derive(Debug, Clone, Copy, Default)]
pub struct Argon2Hasher;

impl Argon2Hasher {
    pub fn new() -> Self {
        Self
    }
}

impl CredentialHasher for Argon2Hasher {
    fn hash(&self, password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|e| AuthError::Crypto(format!("hash error: {e}")))
    }

    fn verify(&self, password: &str, credential: &str) -> Result<bool, AuthError> {
        let parsed = argon2::PasswordHash::new(credential)
            .map_err(|e| AuthError::Crypto(format!("invalid hash format: {e}")))?;

        match Argon2::default().verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(AuthError::Crypto(format!("verify error: {e}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn correct_password_matches() {
        let hasher = Argon2Hasher::new();
        let hash = hasher.hash("hunter2").unwrap();
        assert!(hasher.verify("hunter2", &hash).unwrap());
    }

    #[test]
    fn wrong_password_does_not_match() {
        let hasher = Argon2Hasher::new();
        let hash = hasher.hash("hunter2").unwrap();
        assert!(!hasher.verify("wrong", &hash).unwrap());
    }

    #[test]
    fn hashes_are_salted() {
        let hasher = Argon2Hasher::new();
        assert_ne!(hasher.hash("same").unwrap(), hasher.hash("same").unwrap());
    }

    #[test]
    fn hashes_are_argon2id_phc_strings() {
        let hash = Argon2Hasher::new().hash("hunter2").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(!hash.contains("hunter2"));
    }

    #[test]
    fn malformed_hash_returns_error() {
        let result = Argon2Hasher::new().verify("pw", "not-a-hash");
        assert!(matches!(result, Err(AuthError::Crypto(_))));
    }
}
