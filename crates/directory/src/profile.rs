use std::collections::BTreeSet;

use serde::Serialize;

use hrdesk_auth::{Identity, Permission, Subject};

use crate::department::Department;
use crate::role::Role;
use crate::user::User;

/// A user joined with its department, roles and the permissions granted
/// through those roles.
///
/// This is the current persisted state from which identities (token issue,
/// refresh) and subjects (gate targets) are derived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserProfile {
    #[serde(flatten)]
    pub user: User,
    pub department_name: Option<String>,
    pub roles: Vec<Role>,
    #[serde(skip)]
    pub permissions: BTreeSet<Permission>,
}

impl UserProfile {
    pub fn new(user: User, department: Option<&Department>, roles: Vec<Role>, permissions: BTreeSet<Permission>) -> Self {
        Self {
            user,
            department_name: department.map(|d| d.name.clone()),
            roles,
            permissions,
        }
    }

    pub fn identity(&self) -> Identity {
        Identity {
            user_id: self.user.id,
            roles: self.roles.iter().map(Role::grant).collect(),
            permissions: self.permissions.clone(),
            department: self.department_name.clone(),
            reports_to: self.user.reports_to,
        }
    }

    pub fn subject(&self) -> Subject {
        Subject {
            user_id: self.user.id,
            department: self.department_name.clone(),
            role_levels: self.roles.iter().map(|r| r.hierarchy_level).collect(),
            is_active: self.user.is_active,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::role::CreateRole;
    use crate::user::CreateUser;

    #[test]
    fn identity_and_subject_reflect_current_roles() {
        let now = Utc::now();
        let dept = Department::named("Engineering", now).unwrap();
        let user = User::register(
            &CreateUser {
                first_name: "Ada".into(),
                last_name: "L".into(),
                email: "ada@example.com".into(),
                phone: None,
                password: "pw".into(),
                department_name: Some("engineering".into()),
                roles: vec![],
                reports_to: None,
            },
            "hash".into(),
            Some(dept.id),
            now,
        )
        .unwrap();
        let lead = Role::create(CreateRole { name: "lead".into(), hierarchy_level: 2, can_cross_departments: true }).unwrap();
        let staff = Role::create(CreateRole { name: "staff".into(), hierarchy_level: 5, can_cross_departments: false }).unwrap();

        let profile = UserProfile::new(
            user,
            Some(&dept),
            vec![lead, staff],
            BTreeSet::from([Permission::new("punch_in")]),
        );

        let identity = profile.identity();
        assert_eq!(identity.department.as_deref(), Some("engineering"));
        assert_eq!(identity.roles.len(), 2);
        assert!(identity.permissions.contains(&Permission::new("punch_in")));

        let subject = profile.subject();
        assert_eq!(subject.min_hierarchy_level(), 2);
        assert!(subject.is_active);
    }
}
