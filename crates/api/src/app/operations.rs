//! Operation → required permission table.
//!
//! Every protected route passes its operation name to the gate. Operations
//! missing from this table are open to any authenticated caller.

use hrdesk_auth::{PermissionRegistry, RegistryError};

pub const OPERATIONS: &[(&str, &str)] = &[
    ("create_department", "create_department"),
    ("get_all_departments", "get_all_departments"),
    ("update_department", "update_department"),
    ("delete_department", "delete_department"),
    ("create_role", "create_role"),
    ("get_all_roles", "get_all_roles"),
    ("update_role", "update_role"),
    ("delete_role", "delete_role"),
    ("get_all_permissions", "get_all_permissions"),
    ("assign_permissions", "assign_permissions"),
    ("get_all_users", "get_all_users"),
    ("get_user", "get_user"),
    ("update_user", "update_user"),
    ("get_accessible_users", "get_accessible_users"),
    ("punch_in", "punch_in"),
    ("punch_out", "punch_out"),
    ("day_end", "day_end"),
    ("view_time_logs", "view_time_logs"),
    ("create_leave_request", "create_leave_request"),
    ("leave_status_updates", "leave_status_updates"),
    ("view_leave_balance", "view_leave_balance"),
    ("view_leave_requests", "view_leave_requests"),
    ("create_leave_type", "create_leave_type"),
    ("set_leave_balance", "set_leave_balance"),
];

pub fn registry() -> Result<PermissionRegistry, RegistryError> {
    PermissionRegistry::from_table(OPERATIONS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_operation_is_registered_once() {
        let registry = registry().unwrap();
        assert_eq!(registry.len(), OPERATIONS.len());
        assert_eq!(registry.known_permissions().len(), OPERATIONS.len());
        for (op, perm) in OPERATIONS {
            assert_eq!(registry.required_permission(op).map(|p| p.as_str()), Some(*perm));
        }
    }

    #[test]
    fn leave_type_listing_is_open() {
        assert!(registry().unwrap().required_permission("list_leave_types").is_none());
    }
}
