//! Account lifecycle: registration, login, token refresh and user updates.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;

use hrdesk_auth::access::accessible_users;
use hrdesk_auth::{AccessToken, ActorSnapshot, AuthError, CredentialHasher, TokenPair, TokenService, UNRESTRICTED_LEVEL};
use hrdesk_core::DomainError;
use hrdesk_directory::{CreateRole, CreateUser, Role, UpdateUser, User, UserProfile};

use crate::error::StoreError;
use crate::store::DirectoryStore;

const BOOTSTRAP_ROLE: &str = "admin";
const BOOTSTRAP_DEPARTMENT: &str = "general";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AccountError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<DomainError> for AccountError {
    fn from(err: DomainError) -> Self {
        AccountError::Store(err.into())
    }
}

#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn DirectoryStore>,
    hasher: Arc<dyn CredentialHasher>,
    tokens: Arc<TokenService>,
}

impl AccountService {
    pub fn new(store: Arc<dyn DirectoryStore>, hasher: Arc<dyn CredentialHasher>, tokens: Arc<TokenService>) -> Self {
        Self { store, hasher, tokens }
    }

    /// Open registration for unauthenticated callers.
    ///
    /// Roles are never granted here; an administrator assigns them through
    /// `update`.
    pub async fn self_register(&self, input: CreateUser, now: DateTime<Utc>) -> Result<UserProfile, AccountError> {
        if !input.roles.is_empty() {
            tracing::warn!(roles = ?input.roles, "self-registration named roles");
            return Err(DomainError::validation("roles can only be granted by an administrator").into());
        }
        self.register(input, now).await
    }

    /// Create an active user. Missing roles and department are created on the fly.
    pub async fn register(&self, input: CreateUser, now: DateTime<Utc>) -> Result<UserProfile, AccountError> {
        if input.password.is_empty() {
            return Err(DomainError::validation("password cannot be empty").into());
        }
        let hash = self.hash_password(input.password.clone()).await?;
        let user = User::register(&input, hash, None, now)?;

        let profile = self
            .store
            .create_user(user, input.department_name.as_deref(), &input.roles)
            .await?;
        tracing::info!(user_id = %profile.user.id, roles = profile.roles.len(), "user registered");
        Ok(profile)
    }

    /// Exchange credentials for a token pair.
    ///
    /// Unknown email and wrong password are indistinguishable to the caller.
    pub async fn login(&self, email: &str, password: &str) -> Result<TokenPair, AccountError> {
        let Some(profile) = self.store.find_profile_by_email(email).await? else {
            tracing::debug!("login for unknown email");
            return Err(AuthError::InvalidCredentials.into());
        };
        let valid = self
            .verify_password(password.to_string(), profile.user.password_hash.clone())
            .await?;
        if !valid {
            tracing::debug!(user_id = %profile.user.id, "login with wrong password");
            return Err(AuthError::InvalidCredentials.into());
        }
        if !profile.user.is_active {
            return Err(AuthError::AccountInactive.into());
        }

        let pair = self.tokens.issue_pair(&profile.identity())?;
        tracing::info!(user_id = %profile.user.id, "access token issued");
        Ok(pair)
    }

    /// Issue a new access token from a refresh token.
    ///
    /// Roles, permissions and department are re-read, so changes made since
    /// login take effect here.
    pub async fn refresh(&self, refresh_token: &str) -> Result<AccessToken, AccountError> {
        let user_id = self.tokens.decode_refresh(refresh_token)?;
        let profile = self
            .store
            .find_profile(user_id)
            .await?
            .ok_or(AuthError::TokenInvalid("subject no longer exists".into()))?;
        if !profile.user.is_active {
            return Err(AuthError::AccountInactive.into());
        }
        Ok(self.tokens.issue_access(&profile.identity())?)
    }

    pub async fn update(&self, input: UpdateUser) -> Result<UserProfile, AccountError> {
        let hash = match input.password.as_deref() {
            Some(pw) if !pw.is_empty() => Some(self.hash_password(pw.to_string()).await?),
            _ => None,
        };
        let profile = self.store.update_user(&input, hash).await?;
        tracing::info!(user_id = %profile.user.id, "user updated");
        Ok(profile)
    }

    /// Ensure an unrestricted administrator exists. Idempotent.
    pub async fn bootstrap_admin(&self, email: &str, password: &str, now: DateTime<Utc>) -> Result<UserProfile, AccountError> {
        let admin = Role::create(CreateRole {
            name: BOOTSTRAP_ROLE.into(),
            hierarchy_level: UNRESTRICTED_LEVEL,
            can_cross_departments: true,
        })?;
        match self.store.insert_role(admin).await {
            Ok(_) | Err(StoreError::Conflict(_)) => {}
            Err(e) => return Err(e.into()),
        }

        if let Some(existing) = self.store.find_profile_by_email(email).await? {
            tracing::debug!(user_id = %existing.user.id, "bootstrap administrator already present");
            return Ok(existing);
        }

        let profile = self
            .register(
                CreateUser {
                    first_name: "Admin".into(),
                    last_name: "User".into(),
                    email: email.into(),
                    phone: None,
                    password: password.into(),
                    department_name: Some(BOOTSTRAP_DEPARTMENT.into()),
                    roles: vec![BOOTSTRAP_ROLE.into()],
                    reports_to: None,
                },
                now,
            )
            .await?;
        tracing::info!(user_id = %profile.user.id, "bootstrap administrator created");
        Ok(profile)
    }

    // Argon2 is CPU-bound; keep it off the async workers.

    async fn hash_password(&self, password: String) -> Result<String, AuthError> {
        let hasher = Arc::clone(&self.hasher);
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AuthError::Crypto(format!("hashing task failed: {e}")))?
    }

    async fn verify_password(&self, password: String, credential: String) -> Result<bool, AuthError> {
        let hasher = Arc::clone(&self.hasher);
        tokio::task::spawn_blocking(move || hasher.verify(&password, &credential))
            .await
            .map_err(|e| AuthError::Crypto(format!("verification task failed: {e}")))?
    }

    /// Profiles the actor may see, in id order.
    pub async fn accessible(&self, actor: &ActorSnapshot) -> Result<Vec<UserProfile>, AccountError> {
        let profiles = self.store.list_profiles().await?;
        let subjects: Vec<_> = profiles.iter().map(UserProfile::subject).collect();
        let visible = accessible_users(actor, &subjects);
        Ok(profiles.into_iter().filter(|p| visible.contains(&p.user.id)).collect())
    }
}
