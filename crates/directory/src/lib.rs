//! Directory domain module (users, roles, departments, permission records).
//!
//! Deterministic models and input normalisation only; persistence lives in
//! `hrdesk-infra`.

pub mod department;
pub mod names;
pub mod permission;
pub mod profile;
pub mod role;
pub mod user;

pub use department::{CreateDepartment, Department, UpdateDepartment};
pub use names::{fold_name, normalize_email};
pub use permission::{AssignPermissions, PermissionRecord};
pub use profile::UserProfile;
pub use role::{CreateRole, Role, UpdateRole};
pub use user::{CreateUser, UpdateUser, User};
