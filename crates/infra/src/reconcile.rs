//! Startup reconciliation of persisted permissions with the registry.

use hrdesk_auth::PermissionRegistry;

use crate::error::StoreResult;
use crate::store::{DirectoryStore, ReconcileReport};

/// Make every registry permission persistent; with `prune`, drop persisted
/// permissions the registry no longer names.
pub async fn reconcile_permissions<S>(store: &S, registry: &PermissionRegistry, prune: bool) -> StoreResult<ReconcileReport>
where
    S: DirectoryStore + ?Sized,
{
    let report = store.reconcile_permissions(registry.known_permissions(), prune).await?;
    tracing::info!(
        known = registry.known_permissions().len(),
        inserted = report.inserted,
        pruned = report.pruned,
        "permissions reconciled"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryDirectoryStore;

    #[tokio::test]
    async fn reconcile_is_idempotent() {
        let registry = PermissionRegistry::from_table(&[("create_role", "create_role"), ("punch_in", "punch_in")]).unwrap();
        let store = InMemoryDirectoryStore::new();

        let first = reconcile_permissions(&store, &registry, true).await.unwrap();
        let second = reconcile_permissions(&store, &registry, true).await.unwrap();

        assert_eq!(first, ReconcileReport { inserted: 2, pruned: 0 });
        assert_eq!(second, ReconcileReport::default());
    }
}
