//! Service wiring: stores, gate, and the services handlers call into.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;

use hrdesk_auth::{Argon2Hasher, AuthError, AuthorizationGate, PermissionRegistry, RegistryError, TokenService};
use hrdesk_infra::{
    AccountError, AccountService, AttendanceService, AttendanceStore, DirectoryStore, InMemoryAttendanceStore,
    InMemoryDirectoryStore, InMemoryLeaveStore, LeaveLedger, LeaveStore, StoreError, StoreSubjects,
    reconcile_permissions,
};

use crate::app::operations;
use crate::config::ApiConfig;

/// Fatal startup failure.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("bootstrap administrator: {0}")]
    Bootstrap(#[from] AccountError),

    #[error("{0}")]
    Config(String),
}

pub struct AppServices {
    pub gate: Arc<AuthorizationGate>,
    pub accounts: AccountService,
    pub directory: Arc<dyn DirectoryStore>,
    pub subjects: StoreSubjects<dyn DirectoryStore>,
    pub ledger: LeaveLedger<dyn LeaveStore>,
    pub attendance: AttendanceService,
}

struct Stores {
    directory: Arc<dyn DirectoryStore>,
    leave: Arc<dyn LeaveStore>,
    attendance: Arc<dyn AttendanceStore>,
}

pub async fn build_services(config: &ApiConfig) -> Result<AppServices, StartupError> {
    let tokens = Arc::new(TokenService::new(&config.auth)?);
    let registry: PermissionRegistry = operations::registry()?;

    let stores = if config.use_persistent_stores {
        persistent_stores(config).await?
    } else {
        in_memory_stores()
    };

    reconcile_permissions(stores.directory.as_ref(), &registry, config.prune_orphan_permissions).await?;

    let accounts = AccountService::new(stores.directory.clone(), Arc::new(Argon2Hasher::new()), tokens.clone());
    if let Some(admin) = &config.bootstrap_admin {
        accounts.bootstrap_admin(&admin.email, &admin.password, Utc::now()).await?;
    }

    Ok(AppServices {
        gate: Arc::new(AuthorizationGate::new(tokens, Arc::new(registry))),
        accounts,
        subjects: StoreSubjects(stores.directory.clone()),
        directory: stores.directory,
        ledger: LeaveLedger::new(stores.leave),
        attendance: AttendanceService::new(stores.attendance, config.work_policy),
    })
}

fn in_memory_stores() -> Stores {
    Stores {
        directory: Arc::new(InMemoryDirectoryStore::new()),
        leave: Arc::new(InMemoryLeaveStore::new()),
        attendance: Arc::new(InMemoryAttendanceStore::new()),
    }
}

#[cfg(feature = "postgres")]
async fn persistent_stores(config: &ApiConfig) -> Result<Stores, StartupError> {
    use hrdesk_infra::postgres::{self, PgAttendanceStore, PgDirectoryStore, PgLeaveStore};

    let url = config
        .database_url
        .as_deref()
        .ok_or_else(|| StartupError::Config("USE_PERSISTENT_STORES=true requires DATABASE_URL".into()))?;
    let pool = postgres::connect(url).await?;
    postgres::migrate(&pool).await?;
    tracing::info!("using PostgreSQL stores");

    Ok(Stores {
        directory: Arc::new(PgDirectoryStore::new(pool.clone())),
        leave: Arc::new(PgLeaveStore::new(pool.clone())),
        attendance: Arc::new(PgAttendanceStore::new(pool)),
    })
}

#[cfg(not(feature = "postgres"))]
async fn persistent_stores(_config: &ApiConfig) -> Result<Stores, StartupError> {
    Err(StartupError::Config(
        "USE_PERSISTENT_STORES=true requires a build with the postgres feature".into(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(persistent: bool) -> ApiConfig {
        ApiConfig::from_lookup(|var| match var {
            "JWT_ACCESS_SECRET" => Some("access".into()),
            "JWT_REFRESH_SECRET" => Some("refresh".into()),
            "USE_PERSISTENT_STORES" => Some(persistent.to_string()),
            _ => None,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn in_memory_services_start() {
        assert!(build_services(&config(false)).await.is_ok());
    }

    #[cfg(not(feature = "postgres"))]
    #[tokio::test]
    async fn persistent_stores_without_postgres_refuse_to_start() {
        let result = build_services(&config(true)).await;
        assert!(matches!(result, Err(StartupError::Config(_))));
    }
}
