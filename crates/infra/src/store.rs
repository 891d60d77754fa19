//! Persistence collaborator contracts.
//!
//! Every method is one atomic unit: multi-row writes (user registration with
//! implicit roles/departments, role deletion cascades, ledger transitions)
//! either fully apply or not at all.

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use hrdesk_attendance::{TimeLog, TimeSummary, WorkPolicy};
use hrdesk_auth::Permission;
use hrdesk_core::{LeaveRequestId, LeaveTypeId, RoleId, UserId};
use hrdesk_directory::{
    Department, PermissionRecord, Role, UpdateDepartment, UpdateRole, UpdateUser, User, UserProfile,
};
use hrdesk_leave::{
    LeaveBalance, LeavePeriod, LeaveRequest, LeaveStatus, LeaveType, LedgerError, Transition,
};

use crate::error::StoreResult;

/// Counts reported by permission reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ReconcileReport {
    pub inserted: usize,
    pub pruned: usize,
}

#[async_trait]
pub trait DirectoryStore: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────
    // Departments
    // ─────────────────────────────────────────────────────────────────────

    /// Insert a department; a case-insensitive duplicate name is a conflict.
    async fn insert_department(&self, department: Department) -> StoreResult<Department>;
    async fn list_departments(&self) -> StoreResult<Vec<Department>>;
    async fn update_department(&self, update: &UpdateDepartment) -> StoreResult<Department>;
    /// Delete by (case-folded) name; members keep existing without a department.
    async fn delete_department(&self, name: &str) -> StoreResult<Department>;

    // ─────────────────────────────────────────────────────────────────────
    // Roles and permissions
    // ─────────────────────────────────────────────────────────────────────

    async fn insert_role(&self, role: Role) -> StoreResult<Role>;
    async fn list_roles(&self) -> StoreResult<Vec<Role>>;
    async fn update_role(&self, update: &UpdateRole) -> StoreResult<Role>;
    /// Delete by (case-folded) name, cascading user and permission assignments.
    async fn delete_role(&self, name: &str) -> StoreResult<Role>;

    async fn list_permissions(&self) -> StoreResult<Vec<PermissionRecord>>;
    /// Replace the role's permission set. Unknown names are `NotFound`.
    async fn assign_permissions(&self, role_id: RoleId, names: &[String]) -> StoreResult<Vec<PermissionRecord>>;
    /// Insert missing `known` permissions; with `prune`, delete records (and
    /// their role assignments) that are not in `known`.
    async fn reconcile_permissions(&self, known: &BTreeSet<Permission>, prune: bool) -> StoreResult<ReconcileReport>;

    // ─────────────────────────────────────────────────────────────────────
    // Users
    // ─────────────────────────────────────────────────────────────────────

    /// Persist a new user. Unknown role names are created at the
    /// least-privileged level; an unknown department name is created.
    async fn create_user(
        &self,
        user: User,
        department_name: Option<&str>,
        role_names: &[String],
    ) -> StoreResult<UserProfile>;

    /// Update the user identified by `update.email`. `password_hash`
    /// replaces the credential when present. Unknown roles or department
    /// are `NotFound`.
    async fn update_user(&self, update: &UpdateUser, password_hash: Option<String>) -> StoreResult<UserProfile>;

    async fn find_profile(&self, user_id: UserId) -> StoreResult<Option<UserProfile>>;
    async fn find_profile_by_email(&self, email: &str) -> StoreResult<Option<UserProfile>>;
    async fn list_profiles(&self) -> StoreResult<Vec<UserProfile>>;
}

/// Balance row joined with its leave type title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BalanceView {
    pub leave_type: String,
    #[serde(flatten)]
    pub balance: LeaveBalance,
}

#[async_trait]
pub trait LeaveStore: Send + Sync {
    async fn insert_leave_type(&self, leave_type: LeaveType) -> StoreResult<LeaveType>;
    async fn list_leave_types(&self) -> StoreResult<Vec<LeaveType>>;

    /// Seed a balance row; an existing row for the same key is a conflict.
    async fn insert_balance(&self, balance: LeaveBalance) -> StoreResult<LeaveBalance>;
    async fn list_balances(&self, user_id: UserId, period: LeavePeriod) -> StoreResult<Vec<BalanceView>>;
    async fn balance_for(
        &self,
        user_id: UserId,
        leave_type_id: LeaveTypeId,
        period: LeavePeriod,
    ) -> StoreResult<Option<LeaveBalance>>;

    async fn find_request(&self, id: LeaveRequestId) -> StoreResult<Option<LeaveRequest>>;
    /// Requests of `user_id` lying completely inside `[from, to]`.
    async fn list_requests(&self, user_id: UserId, from: NaiveDate, to: NaiveDate) -> StoreResult<Vec<LeaveRequest>>;

    /// Persist a pending request and its balance effect in one transaction,
    /// with the balance row locked for the whole check-then-update.
    async fn submit_request(&self, request: LeaveRequest, now: DateTime<Utc>) -> Result<Transition, LedgerError>;

    /// Apply a status transition and its balance effect in one transaction.
    async fn transition_request(
        &self,
        request_id: LeaveRequestId,
        target: LeaveStatus,
        approver: UserId,
        comment: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(LeaveRequest, Transition), LedgerError>;
}

#[async_trait]
pub trait AttendanceStore: Send + Sync {
    /// Open a log unless the user already has one open.
    async fn punch_in(&self, user_id: UserId, now: DateTime<Utc>) -> StoreResult<TimeLog>;
    /// Close the user's open log.
    async fn punch_out(&self, user_id: UserId, now: DateTime<Utc>) -> StoreResult<TimeLog>;
    /// Logs punched in within `[start, end)`.
    async fn logs_between(&self, user_id: UserId, start: DateTime<Utc>, end: DateTime<Utc>) -> StoreResult<Vec<TimeLog>>;
    /// Summarise `date` and persist the summary; a second summary is a conflict.
    async fn close_day(
        &self,
        user_id: UserId,
        date: NaiveDate,
        policy: WorkPolicy,
        now: DateTime<Utc>,
    ) -> StoreResult<TimeSummary>;
}
