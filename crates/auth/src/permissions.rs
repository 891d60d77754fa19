use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Permission identifier.
///
/// Permissions are modeled as opaque strings (e.g. "create_leave_request").
/// They are granted to roles and embedded into access tokens as a flat set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("operation '{operation}' already requires '{existing}'")]
    DuplicateOperation {
        operation: String,
        existing: Permission,
    },

    #[error("operation name must not be empty")]
    EmptyOperation,

    #[error("permission for operation '{0}' must not be empty")]
    EmptyPermission(String),
}

/// Write-once table of operation → required permission.
///
/// Built during startup composition and shared read-only afterwards; there is
/// no way to mutate a built registry.
#[derive(Debug, Clone, Default)]
pub struct PermissionRegistry {
    operations: BTreeMap<String, Permission>,
    known: BTreeSet<Permission>,
}

/// Accumulates registrations before the registry is frozen.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    inner: PermissionRegistry,
}

impl RegistryBuilder {
    /// Associate `operation` with `permission` and record the permission as known.
    ///
    /// Registering the same pair twice is a no-op; re-registering an operation
    /// with a different permission is an error.
    pub fn register(
        &mut self,
        operation: impl Into<String>,
        permission: Permission,
    ) -> Result<&mut Self, RegistryError> {
        let operation = operation.into();
        if operation.trim().is_empty() {
            return Err(RegistryError::EmptyOperation);
        }
        if permission.as_str().trim().is_empty() {
            return Err(RegistryError::EmptyPermission(operation));
        }

        if let Some(existing) = self.inner.operations.get(&operation) {
            if existing != &permission {
                return Err(RegistryError::DuplicateOperation {
                    operation,
                    existing: existing.clone(),
                });
            }
            return Ok(self);
        }

        self.inner.known.insert(permission.clone());
        self.inner.operations.insert(operation, permission);
        Ok(self)
    }

    pub fn build(self) -> PermissionRegistry {
        self.inner
    }
}

impl PermissionRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Build a registry from a static `(operation, permission)` table.
    pub fn from_table<'a, I>(table: I) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = &'a (&'static str, &'static str)>,
    {
        let mut builder = Self::builder();
        for (operation, permission) in table {
            builder.register(*operation, Permission::new(*permission))?;
        }
        Ok(builder.build())
    }

    /// Permission required by `operation`, if any.
    ///
    /// Operations without a registration are open to any authenticated actor.
    pub fn required_permission(&self, operation: &str) -> Option<&Permission> {
        self.operations.get(operation)
    }

    /// Every permission referenced by a registered operation.
    pub fn known_permissions(&self) -> &BTreeSet<Permission> {
        &self.known
    }

    pub fn is_known(&self, permission: &str) -> bool {
        self.known.iter().any(|p| p.as_str() == permission)
    }

    pub fn operations(&self) -> impl Iterator<Item = (&str, &Permission)> {
        self.operations.iter().map(|(op, p)| (op.as_str(), p))
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_returns_registered_permission() {
        let registry = PermissionRegistry::from_table(&[
            ("punch_in", "punch_in"),
            ("update_leave", "leave_status_updates"),
        ])
        .unwrap();

        assert_eq!(
            registry.required_permission("update_leave").map(Permission::as_str),
            Some("leave_status_updates")
        );
        assert!(registry.required_permission("unregistered").is_none());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn known_permissions_are_deduplicated() {
        let registry = PermissionRegistry::from_table(&[
            ("list_roles", "roles.read"),
            ("get_role", "roles.read"),
            ("delete_role", "roles.write"),
        ])
        .unwrap();

        let known: Vec<&str> = registry.known_permissions().iter().map(|p| p.as_str()).collect();
        assert_eq!(known, vec!["roles.read", "roles.write"]);
        assert!(registry.is_known("roles.write"));
        assert!(!registry.is_known("roles.admin"));
    }

    #[test]
    fn conflicting_registration_is_rejected() {
        let mut builder = PermissionRegistry::builder();
        builder.register("day_end", Permission::new("day_end")).unwrap();
        builder.register("day_end", Permission::new("day_end")).unwrap();

        let err = builder
            .register("day_end", Permission::new("something_else"))
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateOperation { .. }));
    }

    #[test]
    fn empty_names_are_rejected() {
        let mut builder = PermissionRegistry::builder();
        assert_eq!(
            builder.register("  ", Permission::new("x")).unwrap_err(),
            RegistryError::EmptyOperation
        );
        assert!(matches!(
            builder.register("op", Permission::new("")).unwrap_err(),
            RegistryError::EmptyPermission(_)
        ));
    }
}
