use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool, Postgres, Row, Transaction};
use tracing::instrument;
use uuid::Uuid;

use hrdesk_auth::Permission;
use hrdesk_core::{PermissionId, RoleId, UserId};
use hrdesk_directory::{
    Department, PermissionRecord, Role, UpdateDepartment, UpdateRole, UpdateUser, User, UserProfile,
    fold_name, normalize_email,
};

use super::{Db, map_sqlx_error};
use crate::error::{StoreError, StoreResult};
use crate::store::{DirectoryStore, ReconcileReport};

const USER_COLUMNS: &str =
    "id, first_name, last_name, email, phone, is_active, password_hash, department_id, reports_to, created_at";

#[derive(Debug, Clone)]
pub struct PgDirectoryStore {
    pool: PgPool,
}

impl PgDirectoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn begin(&self) -> StoreResult<Transaction<'static, Postgres>> {
        self.pool.begin().await.map_err(|e| map_sqlx_error("begin_transaction", e))
    }

    /// Join roles, permissions and department for the given users.
    async fn profiles(&self, users: Vec<User>) -> StoreResult<Vec<UserProfile>> {
        if users.is_empty() {
            return Ok(vec![]);
        }
        let ids: Vec<Uuid> = users.iter().map(|u| *u.id.as_uuid()).collect();

        let departments: BTreeMap<Uuid, Department> = sqlx::query_as::<_, Db<Department>>(
            "SELECT id, name, head, created_at FROM departments",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("load_departments", e))?
        .into_iter()
        .map(|Db(d)| (*d.id.as_uuid(), d))
        .collect();

        let role_rows = sqlx::query(
            r#"
            SELECT ur.user_id, r.id, r.name, r.hierarchy_level, r.can_cross_departments
            FROM user_roles ur
            JOIN roles r ON r.id = ur.role_id
            WHERE ur.user_id = ANY($1)
            ORDER BY r.id
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("load_user_roles", e))?;

        let mut roles: BTreeMap<Uuid, Vec<Role>> = BTreeMap::new();
        for row in &role_rows {
            let user_id: Uuid = row.try_get("user_id").map_err(|e| map_sqlx_error("decode_role", e))?;
            let Db(role) = Db::<Role>::from_row(row).map_err(|e| map_sqlx_error("decode_role", e))?;
            roles.entry(user_id).or_default().push(role);
        }

        let perm_rows = sqlx::query(
            r#"
            SELECT DISTINCT ur.user_id, p.name
            FROM user_roles ur
            JOIN role_permissions rp ON rp.role_id = ur.role_id
            JOIN permissions p ON p.id = rp.permission_id
            WHERE ur.user_id = ANY($1)
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("load_user_permissions", e))?;

        let mut permissions: BTreeMap<Uuid, BTreeSet<Permission>> = BTreeMap::new();
        for row in &perm_rows {
            let user_id: Uuid = row.try_get("user_id").map_err(|e| map_sqlx_error("decode_permission", e))?;
            let name: String = row.try_get("name").map_err(|e| map_sqlx_error("decode_permission", e))?;
            permissions.entry(user_id).or_default().insert(Permission::new(name));
        }

        Ok(users
            .into_iter()
            .map(|user| {
                let key = *user.id.as_uuid();
                let department = user.department_id.and_then(|d| departments.get(d.as_uuid()));
                UserProfile::new(
                    user,
                    department,
                    roles.remove(&key).unwrap_or_default(),
                    permissions.remove(&key).unwrap_or_default(),
                )
            })
            .collect())
    }

    async fn profile_where(&self, clause: &str, bind: BindValue) -> StoreResult<Option<UserProfile>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {clause}");
        let query = sqlx::query_as::<_, Db<User>>(&sql);
        let query = match bind {
            BindValue::Id(id) => query.bind(id),
            BindValue::Text(text) => query.bind(text),
        };
        let user = query
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_user", e))?;
        match user {
            Some(Db(user)) => Ok(self.profiles(vec![user]).await?.pop()),
            None => Ok(None),
        }
    }
}

enum BindValue {
    Id(Uuid),
    Text(String),
}

#[async_trait]
impl DirectoryStore for PgDirectoryStore {
    #[instrument(skip(self, department), fields(name = %department.name), err)]
    async fn insert_department(&self, department: Department) -> StoreResult<Department> {
        sqlx::query("INSERT INTO departments (id, name, head, created_at) VALUES ($1, $2, $3, $4)")
            .bind(department.id.as_uuid())
            .bind(&department.name)
            .bind(department.head.map(Uuid::from))
            .bind(department.created_at)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("insert_department", e))?;
        Ok(department)
    }

    async fn list_departments(&self) -> StoreResult<Vec<Department>> {
        let rows = sqlx::query_as::<_, Db<Department>>("SELECT id, name, head, created_at FROM departments ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_departments", e))?;
        Ok(rows.into_iter().map(|Db(d)| d).collect())
    }

    async fn update_department(&self, update: &UpdateDepartment) -> StoreResult<Department> {
        let mut tx = self.begin().await?;
        let Db(mut department) = sqlx::query_as::<_, Db<Department>>(
            "SELECT id, name, head, created_at FROM departments WHERE id = $1 FOR UPDATE",
        )
        .bind(update.id.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("update_department", e))?
        .ok_or(StoreError::NotFound("department"))?;

        department.apply(update)?;
        sqlx::query("UPDATE departments SET name = $2, head = $3 WHERE id = $1")
            .bind(department.id.as_uuid())
            .bind(&department.name)
            .bind(department.head.map(Uuid::from))
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("update_department", e))?;
        tx.commit().await.map_err(|e| map_sqlx_error("commit", e))?;
        Ok(department)
    }

    async fn delete_department(&self, name: &str) -> StoreResult<Department> {
        let name = fold_name("department", name)?;
        // users.department_id is ON DELETE SET NULL
        let row = sqlx::query_as::<_, Db<Department>>(
            "DELETE FROM departments WHERE name = $1 RETURNING id, name, head, created_at",
        )
        .bind(&name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("delete_department", e))?;
        row.map(|Db(d)| d).ok_or(StoreError::NotFound("department"))
    }

    async fn insert_role(&self, role: Role) -> StoreResult<Role> {
        sqlx::query("INSERT INTO roles (id, name, hierarchy_level, can_cross_departments) VALUES ($1, $2, $3, $4)")
            .bind(role.id.as_uuid())
            .bind(&role.name)
            .bind(role.hierarchy_level)
            .bind(role.can_cross_departments)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("insert_role", e))?;
        Ok(role)
    }

    async fn list_roles(&self) -> StoreResult<Vec<Role>> {
        let rows = sqlx::query_as::<_, Db<Role>>(
            "SELECT id, name, hierarchy_level, can_cross_departments FROM roles ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_roles", e))?;
        Ok(rows.into_iter().map(|Db(r)| r).collect())
    }

    async fn update_role(&self, update: &UpdateRole) -> StoreResult<Role> {
        let mut tx = self.begin().await?;
        let Db(mut role) = sqlx::query_as::<_, Db<Role>>(
            "SELECT id, name, hierarchy_level, can_cross_departments FROM roles WHERE id = $1 FOR UPDATE",
        )
        .bind(update.id.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("update_role", e))?
        .ok_or(StoreError::NotFound("role"))?;

        role.apply(update)?;
        sqlx::query("UPDATE roles SET name = $2, hierarchy_level = $3, can_cross_departments = $4 WHERE id = $1")
            .bind(role.id.as_uuid())
            .bind(&role.name)
            .bind(role.hierarchy_level)
            .bind(role.can_cross_departments)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("update_role", e))?;
        tx.commit().await.map_err(|e| map_sqlx_error("commit", e))?;
        Ok(role)
    }

    async fn delete_role(&self, name: &str) -> StoreResult<Role> {
        let name = fold_name("role", name)?;
        // user_roles and role_permissions cascade
        let row = sqlx::query_as::<_, Db<Role>>(
            "DELETE FROM roles WHERE name = $1 RETURNING id, name, hierarchy_level, can_cross_departments",
        )
        .bind(&name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("delete_role", e))?;
        row.map(|Db(r)| r).ok_or(StoreError::NotFound("role"))
    }

    async fn list_permissions(&self) -> StoreResult<Vec<PermissionRecord>> {
        let rows = sqlx::query_as::<_, Db<PermissionRecord>>("SELECT id, name FROM permissions ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_permissions", e))?;
        Ok(rows.into_iter().map(|Db(p)| p).collect())
    }

    #[instrument(skip(self, names), fields(role_id = %role_id, count = names.len()), err)]
    async fn assign_permissions(&self, role_id: RoleId, names: &[String]) -> StoreResult<Vec<PermissionRecord>> {
        let mut tx = self.begin().await?;
        let role_exists = sqlx::query("SELECT 1 FROM roles WHERE id = $1 FOR UPDATE")
            .bind(role_id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("assign_permissions", e))?;
        if role_exists.is_none() {
            return Err(StoreError::NotFound("role"));
        }

        let records: Vec<PermissionRecord> = sqlx::query_as::<_, Db<PermissionRecord>>(
            "SELECT id, name FROM permissions WHERE name = ANY($1)",
        )
        .bind(names)
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("assign_permissions", e))?
        .into_iter()
        .map(|Db(p)| p)
        .collect();
        if names.iter().any(|n| !records.iter().any(|r| &r.name == n)) {
            return Err(StoreError::NotFound("permission"));
        }

        sqlx::query("DELETE FROM role_permissions WHERE role_id = $1")
            .bind(role_id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("assign_permissions", e))?;
        for record in &records {
            sqlx::query("INSERT INTO role_permissions (role_id, permission_id) VALUES ($1, $2)")
                .bind(role_id.as_uuid())
                .bind(record.id.as_uuid())
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("assign_permissions", e))?;
        }
        tx.commit().await.map_err(|e| map_sqlx_error("commit", e))?;
        Ok(records)
    }

    async fn reconcile_permissions(&self, known: &BTreeSet<Permission>, prune: bool) -> StoreResult<ReconcileReport> {
        let mut tx = self.begin().await?;
        let mut report = ReconcileReport::default();

        for permission in known {
            let inserted = sqlx::query("INSERT INTO permissions (id, name) VALUES ($1, $2) ON CONFLICT (name) DO NOTHING")
                .bind(PermissionId::new().as_uuid())
                .bind(permission.as_str())
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("reconcile_permissions", e))?;
            report.inserted += inserted.rows_affected() as usize;
        }

        if prune {
            let names: Vec<&str> = known.iter().map(Permission::as_str).collect();
            // role_permissions cascade
            let pruned = sqlx::query("DELETE FROM permissions WHERE NOT (name = ANY($1))")
                .bind(&names)
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("reconcile_permissions", e))?;
            report.pruned = pruned.rows_affected() as usize;
        }

        tx.commit().await.map_err(|e| map_sqlx_error("commit", e))?;
        Ok(report)
    }

    #[instrument(skip_all, fields(user_id = %user.id), err)]
    async fn create_user(
        &self,
        mut user: User,
        department_name: Option<&str>,
        role_names: &[String],
    ) -> StoreResult<UserProfile> {
        let mut tx = self.begin().await?;

        if let Some(name) = department_name {
            let folded = fold_name("department", name)?;
            let candidate = Department::named(&folded, user.created_at)?;
            // Upsert so concurrent registrations into a new department agree on one row.
            let id: Uuid = sqlx::query_scalar(
                r#"
                INSERT INTO departments (id, name, head, created_at) VALUES ($1, $2, NULL, $3)
                ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
                RETURNING id
                "#,
            )
            .bind(candidate.id.as_uuid())
            .bind(&candidate.name)
            .bind(candidate.created_at)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("create_user_department", e))?;
            user.department_id = Some(id.into());
        }

        insert_user(&mut tx, &user).await?;

        for name in role_names {
            let candidate = Role::least_privileged(name)?;
            let role_id: Uuid = sqlx::query_scalar(
                r#"
                INSERT INTO roles (id, name, hierarchy_level, can_cross_departments) VALUES ($1, $2, $3, $4)
                ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
                RETURNING id
                "#,
            )
            .bind(candidate.id.as_uuid())
            .bind(&candidate.name)
            .bind(candidate.hierarchy_level)
            .bind(candidate.can_cross_departments)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("create_user_role", e))?;

            sqlx::query("INSERT INTO user_roles (user_id, role_id) VALUES ($1, $2) ON CONFLICT DO NOTHING")
                .bind(user.id.as_uuid())
                .bind(role_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("create_user_role", e))?;
        }

        tx.commit().await.map_err(|e| map_sqlx_error("commit", e))?;
        self.find_profile(user.id).await?.ok_or(StoreError::NotFound("user"))
    }

    async fn update_user(&self, update: &UpdateUser, password_hash: Option<String>) -> StoreResult<UserProfile> {
        let email = normalize_email(&update.email)?;
        let mut tx = self.begin().await?;

        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1 FOR UPDATE");
        let Db(mut user) = sqlx::query_as::<_, Db<User>>(&sql)
            .bind(&email)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("update_user", e))?
            .ok_or(StoreError::NotFound("user"))?;

        user.apply(update);
        if let Some(hash) = password_hash {
            user.password_hash = hash;
        }
        if let Some(name) = &update.department_name {
            let folded = fold_name("department", name)?;
            let id: Uuid = sqlx::query_scalar("SELECT id FROM departments WHERE name = $1")
                .bind(&folded)
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("update_user", e))?
                .ok_or(StoreError::NotFound("department"))?;
            user.department_id = Some(id.into());
        }

        sqlx::query(
            r#"
            UPDATE users
            SET first_name = $2, last_name = $3, phone = $4, is_active = $5,
                password_hash = $6, department_id = $7, reports_to = $8
            WHERE id = $1
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.phone)
        .bind(user.is_active)
        .bind(&user.password_hash)
        .bind(user.department_id.map(Uuid::from))
        .bind(user.reports_to.map(Uuid::from))
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("update_user", e))?;

        if let Some(names) = &update.roles {
            let mut folded = Vec::with_capacity(names.len());
            for name in names {
                folded.push(fold_name("role", name)?);
            }
            let ids: Vec<Uuid> = sqlx::query_scalar("SELECT id FROM roles WHERE name = ANY($1)")
                .bind(&folded)
                .fetch_all(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("update_user", e))?;
            let distinct: BTreeSet<&String> = folded.iter().collect();
            if ids.len() != distinct.len() {
                return Err(StoreError::NotFound("role"));
            }

            sqlx::query("DELETE FROM user_roles WHERE user_id = $1")
                .bind(user.id.as_uuid())
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("update_user", e))?;
            for role_id in ids {
                sqlx::query("INSERT INTO user_roles (user_id, role_id) VALUES ($1, $2)")
                    .bind(user.id.as_uuid())
                    .bind(role_id)
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| map_sqlx_error("update_user", e))?;
            }
        }

        tx.commit().await.map_err(|e| map_sqlx_error("commit", e))?;
        self.find_profile(user.id).await?.ok_or(StoreError::NotFound("user"))
    }

    async fn find_profile(&self, user_id: UserId) -> StoreResult<Option<UserProfile>> {
        self.profile_where("id = $1", BindValue::Id(*user_id.as_uuid())).await
    }

    async fn find_profile_by_email(&self, email: &str) -> StoreResult<Option<UserProfile>> {
        self.profile_where("email = $1", BindValue::Text(email.trim().to_lowercase())).await
    }

    async fn list_profiles(&self) -> StoreResult<Vec<UserProfile>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY id");
        let users = sqlx::query_as::<_, Db<User>>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_users", e))?;
        self.profiles(users.into_iter().map(|Db(u)| u).collect()).await
    }
}

async fn insert_user(tx: &mut Transaction<'static, Postgres>, user: &User) -> StoreResult<()> {
    sqlx::query(
        r#"
        INSERT INTO users
            (id, first_name, last_name, email, phone, is_active, password_hash, department_id, reports_to, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        "#,
    )
    .bind(user.id.as_uuid())
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(&user.email)
    .bind(&user.phone)
    .bind(user.is_active)
    .bind(&user.password_hash)
    .bind(user.department_id.map(Uuid::from))
    .bind(user.reports_to.map(Uuid::from))
    .bind(user.created_at)
    .execute(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("insert_user", e))?;
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Row decoding
// ─────────────────────────────────────────────────────────────────────────────

impl<'r> FromRow<'r, PgRow> for Db<Department> {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Db(Department {
            id: row.try_get::<Uuid, _>("id")?.into(),
            name: row.try_get("name")?,
            head: row.try_get::<Option<Uuid>, _>("head")?.map(UserId::from),
            created_at: row.try_get("created_at")?,
        }))
    }
}

impl<'r> FromRow<'r, PgRow> for Db<Role> {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Db(Role {
            id: row.try_get::<Uuid, _>("id")?.into(),
            name: row.try_get("name")?,
            hierarchy_level: row.try_get("hierarchy_level")?,
            can_cross_departments: row.try_get("can_cross_departments")?,
        }))
    }
}

impl<'r> FromRow<'r, PgRow> for Db<PermissionRecord> {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Db(PermissionRecord {
            id: row.try_get::<Uuid, _>("id")?.into(),
            name: row.try_get("name")?,
        }))
    }
}

impl<'r> FromRow<'r, PgRow> for Db<User> {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Db(User {
            id: row.try_get::<Uuid, _>("id")?.into(),
            first_name: row.try_get("first_name")?,
            last_name: row.try_get("last_name")?,
            email: row.try_get("email")?,
            phone: row.try_get("phone")?,
            is_active: row.try_get("is_active")?,
            password_hash: row.try_get("password_hash")?,
            department_id: row.try_get::<Option<Uuid>, _>("department_id")?.map(Into::into),
            reports_to: row.try_get::<Option<Uuid>, _>("reports_to")?.map(Into::into),
            created_at: row.try_get("created_at")?,
        }))
    }
}
