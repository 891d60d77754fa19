//! Authentication configuration.

/// Token settings for the [`TokenService`](crate::TokenService).
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// HS256 secret for access tokens.
    pub access_secret: String,
    /// HS256 secret for refresh tokens; must differ from the access secret.
    pub refresh_secret: String,
    /// Access token lifetime in minutes (default: 15).
    pub access_token_minutes: i64,
    /// Refresh token lifetime in minutes (default: 1440).
    pub refresh_token_minutes: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            access_secret: String::new(),
            refresh_secret: String::new(),
            access_token_minutes: 15,
            refresh_token_minutes: 1440,
        }
    }
}
