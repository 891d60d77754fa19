//! In-memory stores for tests/dev.
//!
//! Each store keeps all of its tables behind a single `RwLock`, so every trait
//! method runs as one serialised unit of work.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use hrdesk_attendance::{TimeLog, TimeSummary, WorkPolicy, day_bounds};
use hrdesk_auth::Permission;
use hrdesk_core::{Entity, LeaveRequestId, LeaveTypeId, PermissionId, RoleId, UserId};
use hrdesk_directory::{
    Department, PermissionRecord, Role, UpdateDepartment, UpdateRole, UpdateUser, User, UserProfile,
    fold_name, normalize_email,
};
use hrdesk_leave::{
    LeaveBalance, LeavePeriod, LeaveRequest, LeaveStatus, LeaveType, LedgerError, Transition, ledger,
};

use crate::error::{StoreError, StoreResult};
use crate::store::{AttendanceStore, BalanceView, DirectoryStore, LeaveStore, ReconcileReport};

/// Id-keyed table of entities (ids are time-ordered, so iteration follows
/// insertion order).
#[derive(Debug)]
struct Table<E: Entity> {
    rows: BTreeMap<E::Id, E>,
}

impl<E: Entity> Default for Table<E> {
    fn default() -> Self {
        Self { rows: BTreeMap::new() }
    }
}

impl<E: Entity + Clone> Table<E> {
    fn get(&self, id: &E::Id) -> Option<&E> {
        self.rows.get(id)
    }

    fn require(&self, id: &E::Id) -> StoreResult<&E> {
        self.rows.get(id).ok_or(StoreError::NotFound(E::KIND))
    }

    fn require_mut(&mut self, id: &E::Id) -> StoreResult<&mut E> {
        self.rows.get_mut(id).ok_or(StoreError::NotFound(E::KIND))
    }

    fn find(&self, pred: impl Fn(&E) -> bool) -> Option<&E> {
        self.rows.values().find(|e| pred(e))
    }

    fn insert(&mut self, entity: E) -> E {
        self.rows.insert(*entity.id(), entity.clone());
        entity
    }

    fn remove(&mut self, id: &E::Id) -> Option<E> {
        self.rows.remove(id)
    }

    fn values(&self) -> impl Iterator<Item = &E> {
        self.rows.values()
    }

    fn all(&self) -> Vec<E> {
        self.rows.values().cloned().collect()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Directory
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct DirectoryTables {
    departments: Table<Department>,
    roles: Table<Role>,
    permissions: Table<PermissionRecord>,
    users: Table<User>,
    user_roles: BTreeSet<(UserId, RoleId)>,
    role_permissions: BTreeSet<(RoleId, PermissionId)>,
}

impl DirectoryTables {
    fn department_by_name(&self, name: &str) -> Option<&Department> {
        self.departments.find(|d| d.name == name)
    }

    fn role_by_name(&self, name: &str) -> Option<&Role> {
        self.roles.find(|r| r.name == name)
    }

    fn profile(&self, user: &User) -> UserProfile {
        let department = user.department_id.and_then(|id| self.departments.get(&id));
        let roles: Vec<Role> = self
            .user_roles
            .iter()
            .filter(|(u, _)| *u == user.id)
            .filter_map(|(_, r)| self.roles.get(r).cloned())
            .collect();
        let permissions = self
            .role_permissions
            .iter()
            .filter(|(r, _)| roles.iter().any(|role| role.id == *r))
            .filter_map(|(_, p)| self.permissions.get(p))
            .map(PermissionRecord::permission)
            .collect();
        UserProfile::new(user.clone(), department, roles, permissions)
    }

    fn ensure_user_exists(&self, id: Option<UserId>) -> StoreResult<()> {
        match id {
            Some(id) => self.users.require(&id).map(|_| ()),
            None => Ok(()),
        }
    }
}

/// In-memory users/roles/departments/permissions.
#[derive(Debug, Default)]
pub struct InMemoryDirectoryStore {
    inner: RwLock<DirectoryTables>,
}

impl InMemoryDirectoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DirectoryStore for InMemoryDirectoryStore {
    async fn insert_department(&self, department: Department) -> StoreResult<Department> {
        let mut t = self.inner.write().map_err(|_| StoreError::poisoned("directory"))?;
        if t.department_by_name(&department.name).is_some() {
            return Err(StoreError::conflict(format!("department '{}' already exists", department.name)));
        }
        t.ensure_user_exists(department.head)?;
        Ok(t.departments.insert(department))
    }

    async fn list_departments(&self) -> StoreResult<Vec<Department>> {
        let t = self.inner.read().map_err(|_| StoreError::poisoned("directory"))?;
        Ok(t.departments.all())
    }

    async fn update_department(&self, update: &UpdateDepartment) -> StoreResult<Department> {
        let mut t = self.inner.write().map_err(|_| StoreError::poisoned("directory"))?;
        let mut department = t.departments.require(&update.id)?.clone();
        department.apply(update)?;

        if t
            .department_by_name(&department.name)
            .is_some_and(|other| other.id != department.id)
        {
            return Err(StoreError::conflict(format!("department '{}' already exists", department.name)));
        }
        t.ensure_user_exists(department.head)?;
        Ok(t.departments.insert(department))
    }

    async fn delete_department(&self, name: &str) -> StoreResult<Department> {
        let name = fold_name("department", name)?;
        let mut t = self.inner.write().map_err(|_| StoreError::poisoned("directory"))?;
        let id = t.department_by_name(&name).map(|d| d.id).ok_or(StoreError::NotFound("department"))?;

        for user in t.users.rows.values_mut() {
            if user.department_id == Some(id) {
                user.department_id = None;
            }
        }
        t.departments.remove(&id).ok_or(StoreError::NotFound("department"))
    }

    async fn insert_role(&self, role: Role) -> StoreResult<Role> {
        let mut t = self.inner.write().map_err(|_| StoreError::poisoned("directory"))?;
        if t.role_by_name(&role.name).is_some() {
            return Err(StoreError::conflict(format!("role '{}' already exists", role.name)));
        }
        Ok(t.roles.insert(role))
    }

    async fn list_roles(&self) -> StoreResult<Vec<Role>> {
        let t = self.inner.read().map_err(|_| StoreError::poisoned("directory"))?;
        Ok(t.roles.all())
    }

    async fn update_role(&self, update: &UpdateRole) -> StoreResult<Role> {
        let mut t = self.inner.write().map_err(|_| StoreError::poisoned("directory"))?;
        let mut role = t.roles.require(&update.id)?.clone();
        role.apply(update)?;
        if t.role_by_name(&role.name).is_some_and(|other| other.id != role.id) {
            return Err(StoreError::conflict(format!("role '{}' already exists", role.name)));
        }
        Ok(t.roles.insert(role))
    }

    async fn delete_role(&self, name: &str) -> StoreResult<Role> {
        let name = fold_name("role", name)?;
        let mut t = self.inner.write().map_err(|_| StoreError::poisoned("directory"))?;
        let id = t.role_by_name(&name).map(|r| r.id).ok_or(StoreError::NotFound("role"))?;

        t.user_roles.retain(|(_, r)| *r != id);
        t.role_permissions.retain(|(r, _)| *r != id);
        t.roles.remove(&id).ok_or(StoreError::NotFound("role"))
    }

    async fn list_permissions(&self) -> StoreResult<Vec<PermissionRecord>> {
        let t = self.inner.read().map_err(|_| StoreError::poisoned("directory"))?;
        Ok(t.permissions.all())
    }

    async fn assign_permissions(&self, role_id: RoleId, names: &[String]) -> StoreResult<Vec<PermissionRecord>> {
        let mut t = self.inner.write().map_err(|_| StoreError::poisoned("directory"))?;
        t.roles.require(&role_id)?;

        let mut records = Vec::with_capacity(names.len());
        for name in names {
            let record = t
                .permissions
                .find(|p| p.name == *name)
                .cloned()
                .ok_or(StoreError::NotFound("permission"))?;
            records.push(record);
        }

        t.role_permissions.retain(|(r, _)| *r != role_id);
        for record in &records {
            t.role_permissions.insert((role_id, record.id));
        }
        Ok(records)
    }

    async fn reconcile_permissions(&self, known: &BTreeSet<Permission>, prune: bool) -> StoreResult<ReconcileReport> {
        let mut t = self.inner.write().map_err(|_| StoreError::poisoned("directory"))?;
        let mut report = ReconcileReport::default();

        for permission in known {
            if t.permissions.find(|p| p.name == permission.as_str()).is_none() {
                t.permissions.insert(PermissionRecord::new(permission));
                report.inserted += 1;
            }
        }

        if prune {
            let orphans: Vec<PermissionId> = t
                .permissions
                .values()
                .filter(|p| !known.contains(&p.permission()))
                .map(|p| p.id)
                .collect();
            for id in orphans {
                t.role_permissions.retain(|(_, p)| *p != id);
                t.permissions.remove(&id);
                report.pruned += 1;
            }
        }
        Ok(report)
    }

    async fn create_user(
        &self,
        mut user: User,
        department_name: Option<&str>,
        role_names: &[String],
    ) -> StoreResult<UserProfile> {
        let mut t = self.inner.write().map_err(|_| StoreError::poisoned("directory"))?;
        if t.users.find(|u| u.email == user.email).is_some() {
            return Err(StoreError::conflict("user already exists"));
        }
        if let Some(phone) = &user.phone {
            if t.users.find(|u| u.phone.as_ref() == Some(phone)).is_some() {
                return Err(StoreError::conflict("phone number already in use"));
            }
        }
        t.ensure_user_exists(user.reports_to)?;

        // Resolve everything before the first write so a failure leaves no trace.
        let department = match department_name {
            Some(name) => {
                let folded = fold_name("department", name)?;
                match t.department_by_name(&folded) {
                    Some(existing) => Some((existing.clone(), false)),
                    None => Some((Department::named(&folded, user.created_at)?, true)),
                }
            }
            None => None,
        };
        let mut roles = Vec::with_capacity(role_names.len());
        for name in role_names {
            let folded = fold_name("role", name)?;
            match t.role_by_name(&folded) {
                Some(existing) => roles.push((existing.clone(), false)),
                None if roles.iter().any(|(r, _): &(Role, bool)| r.name == folded) => {}
                None => roles.push((Role::least_privileged(&folded)?, true)),
            }
        }

        if let Some((department, created)) = department {
            user.department_id = Some(department.id);
            if created {
                t.departments.insert(department);
            }
        }
        for (role, created) in &roles {
            if *created {
                t.roles.insert(role.clone());
            }
            t.user_roles.insert((user.id, role.id));
        }
        let user = t.users.insert(user);
        Ok(t.profile(&user))
    }

    async fn update_user(&self, update: &UpdateUser, password_hash: Option<String>) -> StoreResult<UserProfile> {
        let email = normalize_email(&update.email)?;
        let mut t = self.inner.write().map_err(|_| StoreError::poisoned("directory"))?;
        let mut user = t.users.find(|u| u.email == email).cloned().ok_or(StoreError::NotFound("user"))?;

        user.apply(update);
        if let Some(phone) = &user.phone {
            if t.users.find(|u| u.id != user.id && u.phone.as_ref() == Some(phone)).is_some() {
                return Err(StoreError::conflict("phone number already in use"));
            }
        }
        t.ensure_user_exists(user.reports_to)?;
        if let Some(hash) = password_hash {
            user.password_hash = hash;
        }
        if let Some(name) = &update.department_name {
            let folded = fold_name("department", name)?;
            let department = t.department_by_name(&folded).ok_or(StoreError::NotFound("department"))?;
            user.department_id = Some(department.id);
        }
        let role_ids = match &update.roles {
            Some(names) => {
                let mut ids = Vec::with_capacity(names.len());
                for name in names {
                    let folded = fold_name("role", name)?;
                    ids.push(t.role_by_name(&folded).map(|r| r.id).ok_or(StoreError::NotFound("role"))?);
                }
                Some(ids)
            }
            None => None,
        };

        if let Some(ids) = role_ids {
            t.user_roles.retain(|(u, _)| *u != user.id);
            for id in ids {
                t.user_roles.insert((user.id, id));
            }
        }
        *t.users.require_mut(&user.id)? = user.clone();
        Ok(t.profile(&user))
    }

    async fn find_profile(&self, user_id: UserId) -> StoreResult<Option<UserProfile>> {
        let t = self.inner.read().map_err(|_| StoreError::poisoned("directory"))?;
        Ok(t.users.get(&user_id).map(|u| t.profile(u)))
    }

    async fn find_profile_by_email(&self, email: &str) -> StoreResult<Option<UserProfile>> {
        let email = email.trim().to_lowercase();
        let t = self.inner.read().map_err(|_| StoreError::poisoned("directory"))?;
        Ok(t.users.find(|u| u.email == email).map(|u| t.profile(u)))
    }

    async fn list_profiles(&self) -> StoreResult<Vec<UserProfile>> {
        let t = self.inner.read().map_err(|_| StoreError::poisoned("directory"))?;
        Ok(t.users.values().map(|u| t.profile(u)).collect())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Leave
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct LeaveTables {
    types: Table<LeaveType>,
    balances: Table<LeaveBalance>,
    requests: Table<LeaveRequest>,
}

impl LeaveTables {
    fn balance_key(&self, user_id: UserId, leave_type_id: LeaveTypeId, period: LeavePeriod) -> Option<&LeaveBalance> {
        self.balances
            .find(|b| b.user_id == user_id && b.leave_type_id == leave_type_id && b.period == period)
    }
}

/// In-memory leave types, balances and requests.
///
/// The ledger operations hold the write lock for the whole check-then-update,
/// which serialises concurrent submissions against the same balance row.
#[derive(Debug, Default)]
pub struct InMemoryLeaveStore {
    inner: RwLock<LeaveTables>,
}

impl InMemoryLeaveStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LeaveStore for InMemoryLeaveStore {
    async fn insert_leave_type(&self, leave_type: LeaveType) -> StoreResult<LeaveType> {
        let mut t = self.inner.write().map_err(|_| StoreError::poisoned("leave"))?;
        if t.types.find(|lt| lt.title.eq_ignore_ascii_case(&leave_type.title)).is_some() {
            return Err(StoreError::conflict(format!("leave type '{}' already exists", leave_type.title)));
        }
        Ok(t.types.insert(leave_type))
    }

    async fn list_leave_types(&self) -> StoreResult<Vec<LeaveType>> {
        let t = self.inner.read().map_err(|_| StoreError::poisoned("leave"))?;
        Ok(t.types.all())
    }

    async fn insert_balance(&self, balance: LeaveBalance) -> StoreResult<LeaveBalance> {
        let mut t = self.inner.write().map_err(|_| StoreError::poisoned("leave"))?;
        t.types.require(&balance.leave_type_id)?;
        if t.balance_key(balance.user_id, balance.leave_type_id, balance.period).is_some() {
            return Err(StoreError::conflict(format!(
                "balance for this leave type already exists in {}",
                balance.period
            )));
        }
        Ok(t.balances.insert(balance))
    }

    async fn list_balances(&self, user_id: UserId, period: LeavePeriod) -> StoreResult<Vec<BalanceView>> {
        let t = self.inner.read().map_err(|_| StoreError::poisoned("leave"))?;
        Ok(t.balances
            .values()
            .filter(|b| b.user_id == user_id && b.period == period)
            .map(|b| BalanceView {
                leave_type: t.types.get(&b.leave_type_id).map(|lt| lt.title.clone()).unwrap_or_default(),
                balance: b.clone(),
            })
            .collect())
    }

    async fn balance_for(
        &self,
        user_id: UserId,
        leave_type_id: LeaveTypeId,
        period: LeavePeriod,
    ) -> StoreResult<Option<LeaveBalance>> {
        let t = self.inner.read().map_err(|_| StoreError::poisoned("leave"))?;
        Ok(t.balance_key(user_id, leave_type_id, period).cloned())
    }

    async fn find_request(&self, id: LeaveRequestId) -> StoreResult<Option<LeaveRequest>> {
        let t = self.inner.read().map_err(|_| StoreError::poisoned("leave"))?;
        Ok(t.requests.get(&id).cloned())
    }

    async fn list_requests(&self, user_id: UserId, from: NaiveDate, to: NaiveDate) -> StoreResult<Vec<LeaveRequest>> {
        let t = self.inner.read().map_err(|_| StoreError::poisoned("leave"))?;
        Ok(t.requests
            .values()
            .filter(|r| r.user_id == user_id && r.within(from, to))
            .cloned()
            .collect())
    }

    async fn submit_request(&self, request: LeaveRequest, now: DateTime<Utc>) -> Result<Transition, LedgerError> {
        let mut t = self.inner.write().map_err(|_| LedgerError::consistency("leave lock poisoned"))?;
        if t.types.get(&request.leave_type_id).is_none() {
            return Err(LedgerError::NotFound("leave type"));
        }
        let mut balance = t
            .balance_key(request.user_id, request.leave_type_id, request.period())
            .cloned()
            .ok_or_else(|| LedgerError::conflict("leave balance not sufficient for the given leave type"))?;

        let transition = {
            let existing = t.requests.values().filter(|r| r.user_id == request.user_id);
            ledger::open_request(&mut balance, &request, existing, now)?
        };

        t.balances.insert(balance);
        t.requests.insert(request);
        Ok(transition)
    }

    async fn transition_request(
        &self,
        request_id: LeaveRequestId,
        target: LeaveStatus,
        approver: UserId,
        comment: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(LeaveRequest, Transition), LedgerError> {
        let mut t = self.inner.write().map_err(|_| LedgerError::consistency("leave lock poisoned"))?;
        let mut request = t.requests.get(&request_id).cloned().ok_or(LedgerError::NotFound("leave request"))?;
        let mut balance = t
            .balance_key(request.user_id, request.leave_type_id, request.period())
            .cloned()
            .ok_or_else(|| LedgerError::consistency(format!("no balance row for leave request {request_id}")))?;

        let transition = ledger::decide(&mut balance, &mut request, target, approver, comment, now)?;

        t.balances.insert(balance);
        let request = t.requests.insert(request);
        Ok((request, transition))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Attendance
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct AttendanceTables {
    logs: Table<TimeLog>,
    summaries: Table<TimeSummary>,
}

/// In-memory time logs and summaries.
#[derive(Debug, Default)]
pub struct InMemoryAttendanceStore {
    inner: RwLock<AttendanceTables>,
}

impl InMemoryAttendanceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AttendanceStore for InMemoryAttendanceStore {
    async fn punch_in(&self, user_id: UserId, now: DateTime<Utc>) -> StoreResult<TimeLog> {
        let mut t = self.inner.write().map_err(|_| StoreError::poisoned("attendance"))?;
        let open = t.logs.find(|l| l.user_id == user_id && l.is_open());
        let log = TimeLog::punch_in(user_id, open, now)?;
        Ok(t.logs.insert(log))
    }

    async fn punch_out(&self, user_id: UserId, now: DateTime<Utc>) -> StoreResult<TimeLog> {
        let mut t = self.inner.write().map_err(|_| StoreError::poisoned("attendance"))?;
        let mut log = t
            .logs
            .find(|l| l.user_id == user_id && l.is_open())
            .cloned()
            .ok_or_else(|| StoreError::conflict("you do not have an open time log"))?;
        log.punch_out(now)?;
        Ok(t.logs.insert(log))
    }

    async fn logs_between(&self, user_id: UserId, start: DateTime<Utc>, end: DateTime<Utc>) -> StoreResult<Vec<TimeLog>> {
        let t = self.inner.read().map_err(|_| StoreError::poisoned("attendance"))?;
        Ok(t.logs
            .values()
            .filter(|l| l.user_id == user_id && l.punch_in >= start && l.punch_in < end)
            .cloned()
            .collect())
    }

    async fn close_day(
        &self,
        user_id: UserId,
        date: NaiveDate,
        policy: WorkPolicy,
        now: DateTime<Utc>,
    ) -> StoreResult<TimeSummary> {
        let mut t = self.inner.write().map_err(|_| StoreError::poisoned("attendance"))?;
        let (start, end) = day_bounds(date);
        let logs: Vec<TimeLog> = t
            .logs
            .values()
            .filter(|l| l.user_id == user_id && l.punch_in >= start && l.punch_in < end)
            .cloned()
            .collect();
        let existing = t.summaries.find(|s| s.user_id == user_id && s.date == date);

        let summary = TimeSummary::close_day(user_id, date, &logs, existing, policy, now)?;
        Ok(t.summaries.insert(summary))
    }
}
