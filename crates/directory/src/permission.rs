use serde::{Deserialize, Serialize};

use hrdesk_auth::Permission;
use hrdesk_core::{Entity, PermissionId, RoleId};

/// Persisted permission record, created by startup reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionRecord {
    pub id: PermissionId,
    pub name: String,
}

impl PermissionRecord {
    pub fn new(permission: &Permission) -> Self {
        Self {
            id: PermissionId::new(),
            name: permission.as_str().to_string(),
        }
    }

    pub fn permission(&self) -> Permission {
        Permission::new(self.name.clone())
    }
}

impl Entity for PermissionRecord {
    type Id = PermissionId;
    const KIND: &'static str = "permission";

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Replace-style assignment of permission names to a role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignPermissions {
    pub role_id: RoleId,
    pub permissions: Vec<String>,
}
