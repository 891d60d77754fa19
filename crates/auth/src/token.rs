//! HS256 access/refresh token issuance and verification.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::Serialize;
use serde::de::DeserializeOwned;

use hrdesk_core::UserId;

use crate::claims::{AccessClaims, RefreshClaims};
use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::principal::{ActorSnapshot, Identity};

/// Token pair returned by a successful login.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
}

/// A freshly issued access token (refresh flow).
#[derive(Debug, Clone, Serialize)]
pub struct AccessToken {
    pub access_token: String,
    pub token_type: &'static str,
}

struct KeyPair {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl KeyPair {
    fn from_secret(name: &'static str, secret: &str) -> Result<Self, AuthError> {
        if secret.trim().is_empty() {
            return Err(AuthError::MissingSecret(name));
        }
        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        })
    }
}

/// Issues and validates signed tokens.
///
/// Access and refresh tokens are signed with distinct secrets, so one can never
/// be replayed as the other. Verification is CPU-bound and synchronous.
pub struct TokenService {
    access: KeyPair,
    refresh: KeyPair,
    access_ttl: Duration,
    refresh_ttl: Duration,
    validation: Validation,
}

impl core::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TokenService")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    /// Build the service; an empty secret is a fatal configuration error.
    pub fn new(config: &AuthConfig) -> Result<Self, AuthError> {
        let access = KeyPair::from_secret("JWT_ACCESS_SECRET", &config.access_secret)?;
        let refresh = KeyPair::from_secret("JWT_REFRESH_SECRET", &config.refresh_secret)?;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["sub", "exp", "iat"]);

        Ok(Self {
            access,
            refresh,
            access_ttl: Duration::minutes(config.access_token_minutes),
            refresh_ttl: Duration::minutes(config.refresh_token_minutes),
            validation,
        })
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    pub fn issue_pair(&self, identity: &Identity) -> Result<TokenPair, AuthError> {
        self.issue_pair_at(identity, Utc::now())
    }

    pub fn issue_pair_at(&self, identity: &Identity, now: DateTime<Utc>) -> Result<TokenPair, AuthError> {
        let access_token = self.issue_access_at(identity, now)?;
        let refresh_token = self.issue_refresh_at(identity.user_id, now)?;
        Ok(TokenPair {
            access_token,
            refresh_token,
            token_type: "Bearer",
        })
    }

    pub fn issue_access(&self, identity: &Identity) -> Result<AccessToken, AuthError> {
        Ok(AccessToken {
            access_token: self.issue_access_at(identity, Utc::now())?,
            token_type: "Bearer",
        })
    }

    pub fn issue_access_at(&self, identity: &Identity, now: DateTime<Utc>) -> Result<String, AuthError> {
        let claims = AccessClaims::for_identity(identity, now, now + self.access_ttl);
        encode(&claims, &self.access.encoding)
    }

    pub fn issue_refresh_at(&self, user_id: UserId, now: DateTime<Utc>) -> Result<String, AuthError> {
        let claims = RefreshClaims {
            sub: user_id,
            iat: now.timestamp(),
            exp: (now + self.refresh_ttl).timestamp(),
        };
        encode(&claims, &self.refresh.encoding)
    }

    /// Verify an access token and decode the actor snapshot it carries.
    pub fn decode_access(&self, token: &str) -> Result<ActorSnapshot, AuthError> {
        let claims: AccessClaims = decode(token, &self.access.decoding, &self.validation)?;
        claims.into_snapshot()
    }

    /// Verify a refresh token and return only its subject.
    ///
    /// Callers must re-derive the identity from current state before issuing a
    /// new access token.
    pub fn decode_refresh(&self, token: &str) -> Result<UserId, AuthError> {
        let claims: RefreshClaims = decode(token, &self.refresh.decoding, &self.validation)?;
        Ok(claims.sub)
    }
}

fn encode<T: Serialize>(claims: &T, key: &EncodingKey) -> Result<String, AuthError> {
    jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, key)
        .map_err(|e| AuthError::Crypto(format!("JWT encode: {e}")))
}

fn decode<T: DeserializeOwned>(
    token: &str,
    key: &DecodingKey,
    validation: &Validation,
) -> Result<T, AuthError> {
    jsonwebtoken::decode::<T>(token, key, validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::TokenInvalid(e.to_string()),
        })
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::roles::RoleGrant;
    use crate::Permission;

    fn test_config() -> AuthConfig {
        AuthConfig {
            access_secret: "access-test-secret".into(),
            refresh_secret: "refresh-test-secret".into(),
            ..AuthConfig::default()
        }
    }

    fn identity() -> Identity {
        Identity {
            user_id: UserId::new(),
            roles: vec![
                RoleGrant::new("manager", 2, false),
                RoleGrant::new("hr", 2, true),
                RoleGrant::new("employee", 5, false),
            ],
            permissions: BTreeSet::from([
                Permission::new("punch_in"),
                Permission::new("leave_status_updates"),
            ]),
            department: Some("engineering".into()),
            reports_to: Some(UserId::new()),
        }
    }

    #[test]
    fn access_roundtrip_reproduces_snapshot() {
        let service = TokenService::new(&test_config()).unwrap();
        let id = identity();

        let pair = service.issue_pair(&id).unwrap();
        let actor = service.decode_access(&pair.access_token).unwrap();

        assert_eq!(pair.token_type, "Bearer");
        assert_eq!(actor.user_id, id.user_id);
        assert_eq!(actor.permissions, id.permissions);
        assert_eq!(actor.hierarchy_level, 2);
        assert!(actor.can_cross_departments);
        assert_eq!(actor.role_names, vec!["manager", "hr", "employee"]);
        assert_eq!(actor.access_context, id.roles);
        assert_eq!(actor.department.as_deref(), Some("engineering"));
        assert_eq!(actor.reports_to, id.reports_to);
        assert_eq!(actor.expires_at - actor.issued_at, Duration::minutes(15));
    }

    #[test]
    fn refresh_carries_only_subject() {
        let service = TokenService::new(&test_config()).unwrap();
        let id = identity();
        let pair = service.issue_pair(&id).unwrap();

        assert_eq!(service.decode_refresh(&pair.refresh_token).unwrap(), id.user_id);
    }

    #[test]
    fn tokens_are_not_interchangeable() {
        let service = TokenService::new(&test_config()).unwrap();
        let pair = service.issue_pair(&identity()).unwrap();

        assert!(matches!(
            service.decode_access(&pair.refresh_token),
            Err(AuthError::TokenInvalid(_))
        ));
        assert!(matches!(
            service.decode_refresh(&pair.access_token),
            Err(AuthError::TokenInvalid(_))
        ));
    }

    #[test]
    fn expired_access_token_is_reported_as_expired() {
        let service = TokenService::new(&test_config()).unwrap();
        let issued = Utc::now() - Duration::hours(2);
        let token = service.issue_access_at(&identity(), issued).unwrap();

        let err = service.decode_access(&token).unwrap_err();
        assert_eq!(err, AuthError::TokenExpired);
        assert!(err.is_unauthenticated());
    }

    #[test]
    fn tampered_or_foreign_tokens_are_invalid() {
        let service = TokenService::new(&test_config()).unwrap();
        let other = TokenService::new(&AuthConfig {
            access_secret: "someone-else".into(),
            refresh_secret: "someone-else-refresh".into(),
            ..AuthConfig::default()
        })
        .unwrap();

        let foreign = other.issue_pair(&identity()).unwrap();
        assert!(matches!(
            service.decode_access(&foreign.access_token),
            Err(AuthError::TokenInvalid(_))
        ));
        assert!(matches!(
            service.decode_access("not.a.jwt"),
            Err(AuthError::TokenInvalid(_))
        ));
    }

    #[test]
    fn empty_secret_is_fatal() {
        let err = TokenService::new(&AuthConfig {
            access_secret: "set".into(),
            refresh_secret: "  ".into(),
            ..AuthConfig::default()
        })
        .unwrap_err();
        assert_eq!(err, AuthError::MissingSecret("JWT_REFRESH_SECRET"));
    }
}
