use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use hrdesk_core::{DepartmentId, DomainResult, Entity, UserId};

use crate::names::fold_name;

/// A department; `name` is stored case-folded and unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
    pub id: DepartmentId,
    pub name: String,
    pub head: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

impl Department {
    pub fn create(input: CreateDepartment, now: DateTime<Utc>) -> DomainResult<Self> {
        Ok(Self {
            id: DepartmentId::new(),
            name: fold_name("department", &input.name)?,
            head: input.head,
            created_at: now,
        })
    }

    /// Department implicitly created while registering a user.
    pub fn named(name: &str, now: DateTime<Utc>) -> DomainResult<Self> {
        Self::create(CreateDepartment { name: name.to_string(), head: None }, now)
    }

    /// Apply an update in place. Absent fields keep their value.
    pub fn apply(&mut self, update: &UpdateDepartment) -> DomainResult<()> {
        if let Some(name) = &update.name {
            self.name = fold_name("department", name)?;
        }
        if update.head.is_some() {
            self.head = update.head;
        }
        Ok(())
    }
}

impl Entity for Department {
    type Id = DepartmentId;
    const KIND: &'static str = "department";

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateDepartment {
    #[serde(alias = "department_name")]
    pub name: String,
    #[serde(default, alias = "department_head")]
    pub head: Option<UserId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateDepartment {
    pub id: DepartmentId,
    #[serde(default, alias = "department_name")]
    pub name: Option<String>,
    #[serde(default, alias = "department_head")]
    pub head: Option<UserId>,
}
