//! PostgreSQL-backed stores (`postgres` feature).
//!
//! ## Error Mapping
//!
//! | SQLx error | PostgreSQL code | StoreError |
//! |------------|-----------------|------------|
//! | unique violation | `23505` | `Conflict` |
//! | foreign key violation | `23503` | `NotFound` |
//! | check violation | `23514` | `Validation` |
//! | anything else | - | `Backend` |
//!
//! Row types are decoded through the [`Db`] wrapper, one manual `FromRow`
//! impl per domain type.

mod attendance;
mod directory;
mod leave;

use std::time::Duration;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::error::StoreError;

pub use attendance::PgAttendanceStore;
pub use directory::PgDirectoryStore;
pub use leave::PgLeaveStore;

const SCHEMA: &str = include_str!("../../migrations/0001_init.sql");

/// Open a connection pool.
pub async fn connect(database_url: &str) -> Result<PgPool, StoreError> {
    PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await
        .map_err(|e| map_sqlx_error("connect", e))
}

/// Apply the schema. Every statement is idempotent.
pub async fn migrate(pool: &PgPool) -> Result<(), StoreError> {
    sqlx::raw_sql(SCHEMA)
        .execute(pool)
        .await
        .map_err(|e| map_sqlx_error("migrate", e))?;
    tracing::info!("database schema applied");
    Ok(())
}

/// Local wrapper so domain types can be decoded from rows.
pub(crate) struct Db<T>(pub T);

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::Conflict(msg),
                Some("23503") => StoreError::NotFound("referenced record"),
                Some("23514") => StoreError::Validation(msg),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolClosed => StoreError::Backend(format!("connection pool closed in {operation}")),
        sqlx::Error::RowNotFound => StoreError::Backend(format!("unexpected row not found in {operation}")),
        _ => StoreError::Backend(format!("sqlx error in {operation}: {err}")),
    }
}

/// Decode error for a column whose text does not parse into a domain value.
fn decode_error(column: &str, err: impl std::fmt::Display) -> sqlx::Error {
    sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: err.to_string().into(),
    }
}
