//! Process configuration read from environment variables.

use hrdesk_attendance::WorkPolicy;
use hrdesk_auth::AuthConfig;
use thiserror::Error;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set to a non-empty value")]
    MissingSecret(&'static str),

    #[error("{var} has an invalid value '{value}'")]
    Invalid { var: &'static str, value: String },
}

/// Credentials for the administrator ensured at startup.
#[derive(Clone, PartialEq, Eq)]
pub struct BootstrapAdmin {
    pub email: String,
    pub password: String,
}

impl core::fmt::Debug for BootstrapAdmin {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BootstrapAdmin")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub auth: AuthConfig,
    pub work_policy: WorkPolicy,
    pub prune_orphan_permissions: bool,
    pub use_persistent_stores: bool,
    pub database_url: Option<String>,
    pub bind_addr: String,
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let access_secret = get("JWT_ACCESS_SECRET").ok_or(ConfigError::MissingSecret("JWT_ACCESS_SECRET"))?;
        let refresh_secret = get("JWT_REFRESH_SECRET").ok_or(ConfigError::MissingSecret("JWT_REFRESH_SECRET"))?;

        let defaults = AuthConfig::default();
        let auth = AuthConfig {
            access_secret,
            refresh_secret,
            access_token_minutes: parse_or("ACCESS_TOKEN_EXPIRE_MINUTES", get("ACCESS_TOKEN_EXPIRE_MINUTES"), defaults.access_token_minutes)?,
            refresh_token_minutes: parse_or("REFRESH_TOKEN_EXPIRE_MINUTES", get("REFRESH_TOKEN_EXPIRE_MINUTES"), defaults.refresh_token_minutes)?,
        };

        let work_policy = WorkPolicy {
            min_work_hours: parse_or("MIN_WORK_HOURS_PER_DAY", get("MIN_WORK_HOURS_PER_DAY"), WorkPolicy::default().min_work_hours)?,
        };

        let bootstrap_admin = match (get("BOOTSTRAP_ADMIN_EMAIL"), get("BOOTSTRAP_ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(BootstrapAdmin { email, password }),
            (Some(_), None) => {
                tracing::warn!("BOOTSTRAP_ADMIN_EMAIL set without BOOTSTRAP_ADMIN_PASSWORD; skipping bootstrap");
                None
            }
            _ => None,
        };

        Ok(Self {
            auth,
            work_policy,
            prune_orphan_permissions: parse_or("PRUNE_ORPHAN_PERMISSIONS", get("PRUNE_ORPHAN_PERMISSIONS"), false)?,
            use_persistent_stores: parse_or("USE_PERSISTENT_STORES", get("USE_PERSISTENT_STORES"), false)?,
            database_url: get("DATABASE_URL"),
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            bootstrap_admin,
        })
    }
}

fn parse_or<T: core::str::FromStr>(var: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value.parse().map_err(|_| ConfigError::Invalid { var, value }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |k| map.get(k).cloned()
    }

    const SECRETS: [(&str, &str); 2] = [("JWT_ACCESS_SECRET", "a"), ("JWT_REFRESH_SECRET", "r")];

    #[test]
    fn defaults_apply_when_only_secrets_are_set() {
        let cfg = ApiConfig::from_lookup(lookup(&SECRETS)).unwrap();
        assert_eq!(cfg.auth.access_token_minutes, 15);
        assert_eq!(cfg.auth.refresh_token_minutes, 1440);
        assert_eq!(cfg.work_policy.min_work_hours, 8);
        assert!(!cfg.prune_orphan_permissions);
        assert!(!cfg.use_persistent_stores);
        assert_eq!(cfg.bind_addr, "0.0.0.0:8080");
        assert!(cfg.bootstrap_admin.is_none());
        assert!(cfg.database_url.is_none());
    }

    #[test]
    fn blank_secret_is_fatal() {
        let err = ApiConfig::from_lookup(lookup(&[("JWT_ACCESS_SECRET", "  "), ("JWT_REFRESH_SECRET", "r")])).unwrap_err();
        assert_eq!(err, ConfigError::MissingSecret("JWT_ACCESS_SECRET"));

        let err = ApiConfig::from_lookup(lookup(&[("JWT_ACCESS_SECRET", "a")])).unwrap_err();
        assert_eq!(err, ConfigError::MissingSecret("JWT_REFRESH_SECRET"));
    }

    #[test]
    fn overrides_are_parsed() {
        let mut pairs = SECRETS.to_vec();
        pairs.extend([
            ("ACCESS_TOKEN_EXPIRE_MINUTES", "5"),
            ("MIN_WORK_HOURS_PER_DAY", "6"),
            ("PRUNE_ORPHAN_PERMISSIONS", "true"),
            ("BOOTSTRAP_ADMIN_EMAIL", "root@example.com"),
            ("BOOTSTRAP_ADMIN_PASSWORD", "pw"),
        ]);
        let cfg = ApiConfig::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(cfg.auth.access_token_minutes, 5);
        assert_eq!(cfg.work_policy.min_work_hours, 6);
        assert!(cfg.prune_orphan_permissions);
        assert_eq!(cfg.bootstrap_admin.unwrap().email, "root@example.com");
    }

    #[test]
    fn malformed_number_is_rejected() {
        let mut pairs = SECRETS.to_vec();
        pairs.push(("REFRESH_TOKEN_EXPIRE_MINUTES", "soon"));
        let err = ApiConfig::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "REFRESH_TOKEN_EXPIRE_MINUTES", .. }));
    }
}
