use serde::{Deserialize, Serialize};

use hrdesk_core::{DomainError, DomainResult, Entity, LeaveTypeId};

/// Kind of leave (casual, sick, ...). `title` is unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveType {
    pub id: LeaveTypeId,
    pub title: String,
    pub carry_forward: bool,
}

impl LeaveType {
    pub fn create(input: CreateLeaveType) -> DomainResult<Self> {
        let title = input.title.trim().to_string();
        if title.is_empty() {
            return Err(DomainError::validation("leave type title cannot be empty"));
        }
        Ok(Self {
            id: LeaveTypeId::new(),
            title,
            carry_forward: input.carry_forward,
        })
    }
}

impl Entity for LeaveType {
    type Id = LeaveTypeId;
    const KIND: &'static str = "leave type";

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateLeaveType {
    pub title: String,
    #[serde(default)]
    pub carry_forward: bool,
}
