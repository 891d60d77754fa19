use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use hrdesk_core::UserId;

use crate::roles::{self, RoleGrant, UNRESTRICTED_LEVEL};
use crate::Permission;

/// Authorization-relevant facts about a user at token issue time.
///
/// Built from current persisted state (user, roles, role permissions,
/// department) by whoever issues tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
    pub roles: Vec<RoleGrant>,
    pub permissions: BTreeSet<Permission>,
    pub department: Option<String>,
    pub reports_to: Option<UserId>,
}

/// The current caller, decoded from a verified access token.
///
/// Immutable once decoded; it reflects the user's roles at issue time and is
/// only trusted until `expires_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActorSnapshot {
    pub user_id: UserId,
    pub role_names: Vec<String>,
    pub access_context: Vec<RoleGrant>,
    pub hierarchy_level: i32,
    pub can_cross_departments: bool,
    pub department: Option<String>,
    pub permissions: BTreeSet<Permission>,
    pub reports_to: Option<UserId>,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl ActorSnapshot {
    pub fn has_role_at_level(&self, level: i32) -> bool {
        self.access_context.iter().any(|g| g.hierarchy_level == level)
    }

    pub fn is_unrestricted(&self) -> bool {
        self.has_role_at_level(UNRESTRICTED_LEVEL)
    }
}

/// A user addressed by an operation (the "target"), loaded fresh from storage.
///
/// Targets never reuse token snapshots: their hierarchy is derived from their
/// current role assignments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub user_id: UserId,
    pub department: Option<String>,
    pub role_levels: Vec<i32>,
    pub is_active: bool,
}

impl Subject {
    pub fn min_hierarchy_level(&self) -> i32 {
        self.role_levels
            .iter()
            .copied()
            .min()
            .unwrap_or(roles::LEAST_PRIVILEGED_LEVEL)
    }
}
