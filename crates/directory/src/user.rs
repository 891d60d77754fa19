use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use hrdesk_core::{DepartmentId, DomainError, DomainResult, Entity, UserId};

use crate::names::{non_blank, normalize_email};

/// A user account.
///
/// `password_hash` is an opaque PHC string and is never serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub is_active: bool,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub department_id: Option<DepartmentId>,
    pub reports_to: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Build a new active user from validated input and an already computed hash.
    pub fn register(
        input: &CreateUser,
        password_hash: String,
        department_id: Option<DepartmentId>,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let first_name = required("first_name", &input.first_name)?;
        let last_name = required("last_name", &input.last_name)?;
        Ok(Self {
            id: UserId::new(),
            first_name,
            last_name,
            email: normalize_email(&input.email)?,
            phone: non_blank(input.phone.clone()),
            is_active: true,
            password_hash,
            department_id,
            reports_to: input.reports_to,
            created_at: now,
        })
    }

    /// Apply the scalar part of an update. Department, roles and password are
    /// resolved by the caller.
    pub fn apply(&mut self, update: &UpdateUser) {
        if let Some(first) = non_blank(update.first_name.clone()) {
            self.first_name = first;
        }
        if let Some(last) = non_blank(update.last_name.clone()) {
            self.last_name = last;
        }
        if let Some(phone) = non_blank(update.phone.clone()) {
            self.phone = Some(phone);
        }
        if let Some(active) = update.is_active {
            self.is_active = active;
        }
        if update.reports_to.is_some() {
            self.reports_to = update.reports_to;
        }
    }
}

fn required(field: &str, value: &str) -> DomainResult<String> {
    let v = value.trim();
    if v.is_empty() {
        return Err(DomainError::validation(format!("{field} cannot be empty")));
    }
    Ok(v.to_string())
}

impl Entity for User {
    type Id = UserId;
    const KIND: &'static str = "user";

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Registration input. Roles and department are referenced by name.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreateUser {
    #[serde(alias = "firstname")]
    pub first_name: String,
    #[serde(alias = "lastname")]
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub password: String,
    #[serde(default)]
    pub department_name: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub reports_to: Option<UserId>,
}

/// Update input, keyed by email.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UpdateUser {
    pub email: String,
    #[serde(default, alias = "firstname")]
    pub first_name: Option<String>,
    #[serde(default, alias = "lastname")]
    pub last_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub department_name: Option<String>,
    /// `Some` replaces the whole role set; `None` keeps it.
    #[serde(default)]
    pub roles: Option<Vec<String>>,
    #[serde(default)]
    pub reports_to: Option<UserId>,
}
