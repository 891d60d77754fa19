use serde::{Deserialize, Serialize};

use hrdesk_auth::{LEAST_PRIVILEGED_LEVEL, RoleGrant};
use hrdesk_core::{DomainError, DomainResult, Entity, RoleId};

use crate::names::fold_name;

/// A role. Lower `hierarchy_level` is more senior; level 0 is unrestricted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub name: String,
    pub hierarchy_level: i32,
    pub can_cross_departments: bool,
}

impl Role {
    pub fn create(input: CreateRole) -> DomainResult<Self> {
        check_level(input.hierarchy_level)?;
        Ok(Self {
            id: RoleId::new(),
            name: fold_name("role", &input.name)?,
            hierarchy_level: input.hierarchy_level,
            can_cross_departments: input.can_cross_departments,
        })
    }

    /// Role created on the fly for an unknown name during user registration.
    pub fn least_privileged(name: &str) -> DomainResult<Self> {
        Self::create(CreateRole {
            name: name.to_string(),
            hierarchy_level: LEAST_PRIVILEGED_LEVEL,
            can_cross_departments: false,
        })
    }

    pub fn apply(&mut self, update: &UpdateRole) -> DomainResult<()> {
        if let Some(name) = &update.name {
            self.name = fold_name("role", name)?;
        }
        if let Some(level) = update.hierarchy_level {
            check_level(level)?;
            self.hierarchy_level = level;
        }
        if let Some(cross) = update.can_cross_departments {
            self.can_cross_departments = cross;
        }
        Ok(())
    }

    pub fn grant(&self) -> RoleGrant {
        RoleGrant::new(self.name.clone(), self.hierarchy_level, self.can_cross_departments)
    }
}

fn check_level(level: i32) -> DomainResult<()> {
    if level < 0 {
        return Err(DomainError::validation("hierarchy_level must be >= 0"));
    }
    Ok(())
}

impl Entity for Role {
    type Id = RoleId;
    const KIND: &'static str = "role";

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRole {
    pub name: String,
    #[serde(default = "default_level")]
    pub hierarchy_level: i32,
    #[serde(default)]
    pub can_cross_departments: bool,
}

fn default_level() -> i32 {
    LEAST_PRIVILEGED_LEVEL
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateRole {
    pub id: RoleId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub hierarchy_level: Option<i32>,
    #[serde(default)]
    pub can_cross_departments: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_levels_are_rejected() {
        let err = Role::create(CreateRole {
            name: "x".into(),
            hierarchy_level: -1,
            can_cross_departments: false,
        })
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn unknown_roles_default_to_least_privileged() {
        let role = Role::least_privileged("Intern").unwrap();
        assert_eq!(role.name, "intern");
        assert_eq!(role.grant(), RoleGrant::new("intern", 999, false));
    }

    #[test]
    fn partial_update() {
        let mut role = Role::create(CreateRole {
            name: "Manager".into(),
            hierarchy_level: 2,
            can_cross_departments: false,
        })
        .unwrap();
        role.apply(&UpdateRole {
            id: role.id,
            name: None,
            hierarchy_level: None,
            can_cross_departments: Some(true),
        })
        .unwrap();
        assert_eq!((role.name.as_str(), role.hierarchy_level, role.can_cross_departments), ("manager", 2, true));
    }
}
