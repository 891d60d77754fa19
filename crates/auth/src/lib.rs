//! `hrdesk-auth`: authentication and authorization core.
//!
//! This crate is intentionally decoupled from HTTP and storage: targets are
//! looked up through [`SubjectDirectory`], credentials through
//! [`CredentialHasher`].

pub mod access;
pub mod authorize;
pub mod claims;
pub mod config;
pub mod error;
pub mod password;
pub mod permissions;
pub mod principal;
pub mod roles;
pub mod token;

pub use authorize::{AuthorizationGate, DenialKind, GateError, GateStage, SubjectDirectory};
pub use claims::{AccessClaims, RefreshClaims};
pub use config::AuthConfig;
pub use error::AuthError;
pub use password::{Argon2Hasher, CredentialHasher};
pub use permissions::{Permission, PermissionRegistry, RegistryBuilder, RegistryError};
pub use principal::{ActorSnapshot, Identity, Subject};
pub use roles::{LEAST_PRIVILEGED_LEVEL, RoleGrant, UNRESTRICTED_LEVEL};
pub use token::{AccessToken, TokenPair, TokenService};
