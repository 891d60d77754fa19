use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use hrdesk_core::UserId;

use crate::error::AuthError;
use crate::principal::{ActorSnapshot, Identity};
use crate::roles::{self, RoleGrant};
use crate::Permission;

/// Claim set of an access token (wire format).
///
/// Optional claims default when absent so that older tokens decode into a
/// fully populated [`ActorSnapshot`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sub: UserId,
    pub exp: i64,
    pub iat: i64,

    #[serde(default)]
    pub roles: Vec<String>,

    #[serde(default)]
    pub permissions: Vec<Permission>,

    #[serde(default)]
    pub access_context: Vec<RoleGrant>,

    #[serde(default)]
    pub hierarchy_level: Option<i32>,

    #[serde(default)]
    pub can_cross_departments: Option<bool>,

    #[serde(default)]
    pub department: Option<String>,

    #[serde(default)]
    pub reports_to: Option<UserId>,
}

/// Claim set of a refresh token: identity only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub sub: UserId,
    pub exp: i64,
    pub iat: i64,
}

impl AccessClaims {
    pub fn for_identity(identity: &Identity, issued_at: DateTime<Utc>, expires_at: DateTime<Utc>) -> Self {
        Self {
            sub: identity.user_id,
            exp: expires_at.timestamp(),
            iat: issued_at.timestamp(),
            roles: identity.roles.iter().map(|g| g.role.clone()).collect(),
            permissions: identity.permissions.iter().cloned().collect(),
            access_context: identity.roles.clone(),
            hierarchy_level: Some(roles::min_hierarchy_level(&identity.roles)),
            can_cross_departments: Some(roles::can_cross_at_min_level(&identity.roles)),
            department: identity.department.clone(),
            reports_to: identity.reports_to,
        }
    }

    /// Convert verified claims into the typed actor snapshot.
    pub fn into_snapshot(self) -> Result<ActorSnapshot, AuthError> {
        let (issued_at, expires_at) = time_window(self.iat, self.exp)?;

        let hierarchy_level = self
            .hierarchy_level
            .unwrap_or_else(|| roles::min_hierarchy_level(&self.access_context));
        let can_cross_departments = self
            .can_cross_departments
            .unwrap_or_else(|| roles::can_cross_at_min_level(&self.access_context));

        Ok(ActorSnapshot {
            user_id: self.sub,
            role_names: self.roles,
            access_context: self.access_context,
            hierarchy_level,
            can_cross_departments,
            department: self.department,
            permissions: self.permissions.into_iter().collect::<BTreeSet<_>>(),
            reports_to: self.reports_to,
            issued_at,
            expires_at,
        })
    }
}

fn time_window(iat: i64, exp: i64) -> Result<(DateTime<Utc>, DateTime<Utc>), AuthError> {
    let issued_at = DateTime::<Utc>::from_timestamp(iat, 0)
        .ok_or_else(|| AuthError::TokenInvalid("iat out of range".to_string()))?;
    let expires_at = DateTime::<Utc>::from_timestamp(exp, 0)
        .ok_or_else(|| AuthError::TokenInvalid("exp out of range".to_string()))?;
    if expires_at <= issued_at {
        return Err(AuthError::TokenInvalid(
            "invalid token time window (exp <= iat)".to_string(),
        ));
    }
    Ok((issued_at, expires_at))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims_json(extra: serde_json::Value) -> serde_json::Value {
        let mut base = serde_json::json!({
            "sub": UserId::new(),
            "iat": 1_700_000_000,
            "exp": 1_700_000_900,
        });
        if let (Some(base), Some(extra)) = (base.as_object_mut(), extra.as_object()) {
            for (k, v) in extra {
                base.insert(k.clone(), v.clone());
            }
        }
        base
    }

    #[test]
    fn absent_claims_default_to_least_privilege() {
        let claims: AccessClaims = serde_json::from_value(claims_json(serde_json::json!({}))).unwrap();
        let actor = claims.into_snapshot().unwrap();

        assert!(actor.permissions.is_empty());
        assert_eq!(actor.hierarchy_level, roles::LEAST_PRIVILEGED_LEVEL);
        assert!(!actor.can_cross_departments);
        assert!(actor.department.is_none());
    }

    #[test]
    fn hierarchy_is_derived_from_context_when_missing() {
        let claims: AccessClaims = serde_json::from_value(claims_json(serde_json::json!({
            "access_context": [
                {"role": "lead", "hierarchy_level": 3, "can_cross_departments": true},
                {"role": "staff", "hierarchy_level": 5, "can_cross_departments": false}
            ]
        })))
        .unwrap();
        let actor = claims.into_snapshot().unwrap();

        assert_eq!(actor.hierarchy_level, 3);
        assert!(actor.can_cross_departments);
    }

    #[test]
    fn inverted_time_window_is_invalid() {
        let claims: AccessClaims = serde_json::from_value(claims_json(serde_json::json!({
            "iat": 1_700_000_900,
            "exp": 1_700_000_000,
        })))
        .unwrap();
        assert!(matches!(claims.into_snapshot(), Err(AuthError::TokenInvalid(_))));
    }
}
