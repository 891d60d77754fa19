use serde::{Deserialize, Serialize};

/// Hierarchy level that bypasses every authorization check.
pub const UNRESTRICTED_LEVEL: i32 = 0;

/// Level assumed for a principal without any role (least privileged).
pub const LEAST_PRIVILEGED_LEVEL: i32 = 999;

/// One role held by a principal, as far as authorization is concerned.
///
/// Lower `hierarchy_level` means more senior. This is the `access_context`
/// entry carried in access tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleGrant {
    pub role: String,
    pub hierarchy_level: i32,
    #[serde(default)]
    pub can_cross_departments: bool,
}

impl RoleGrant {
    pub fn new(role: impl Into<String>, hierarchy_level: i32, can_cross_departments: bool) -> Self {
        Self {
            role: role.into(),
            hierarchy_level,
            can_cross_departments,
        }
    }
}

/// Minimum (most senior) level across `grants`, or [`LEAST_PRIVILEGED_LEVEL`].
pub fn min_hierarchy_level(grants: &[RoleGrant]) -> i32 {
    grants
        .iter()
        .map(|g| g.hierarchy_level)
        .min()
        .unwrap_or(LEAST_PRIVILEGED_LEVEL)
}

/// True iff some grant at the minimum level carries the cross-department flag.
///
/// A cross-department role at a less senior level does not count.
pub fn can_cross_at_min_level(grants: &[RoleGrant]) -> bool {
    let min = min_hierarchy_level(grants);
    grants
        .iter()
        .any(|g| g.hierarchy_level == min && g.can_cross_departments)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_roles_means_least_privileged() {
        assert_eq!(min_hierarchy_level(&[]), LEAST_PRIVILEGED_LEVEL);
        assert!(!can_cross_at_min_level(&[]));
    }

    #[test]
    fn any_cross_role_at_min_level_grants_crossing() {
        let grants = vec![
            RoleGrant::new("team_lead", 1, false),
            RoleGrant::new("hr_partner", 1, true),
        ];
        assert_eq!(min_hierarchy_level(&grants), 1);
        assert!(can_cross_at_min_level(&grants));
    }

    #[test]
    fn cross_role_above_min_level_does_not_grant_crossing() {
        let grants = vec![
            RoleGrant::new("manager", 2, false),
            RoleGrant::new("auditor", 5, true),
        ];
        assert_eq!(min_hierarchy_level(&grants), 2);
        assert!(!can_cross_at_min_level(&grants));
    }
}
