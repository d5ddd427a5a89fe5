//! Persistence layer: the placement store and directory records.
//!
//! # Responsibility
//! - Keep SQL details inside the persistence boundary.
//! - Provide atomic, scope-locked write transactions to the ordering engines.
//!
//! # Invariants
//! - Stores only accept connections migrated to the latest schema version.
//! - Read paths reject invalid persisted state instead of masking it.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::repo::scope_lock::ScopeKey;
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub mod directory_repo;
pub mod placement_store;
pub mod scope_lock;

/// Result type used by persistence operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors from persistence operations.
#[derive(Debug)]
pub enum StoreError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Persisted data cannot be converted to a valid record.
    InvalidData(String),
    /// A scope failed its density check before commit.
    BrokenOrdering(ScopeKey),
}

impl StoreError {
    /// Returns whether this error reports SQLite lock contention.
    pub fn is_busy(&self) -> bool {
        match self {
            Self::Db(err) => err.is_busy(),
            _ => false,
        }
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "placement store requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "placement store requires table `{table}`")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted board data: {message}"),
            Self::BrokenOrdering(scope) => {
                write!(f, "positions in {scope} are not dense; transaction rolled back")
            }
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

const REQUIRED_TABLES: &[&str] = &[
    "projects",
    "project_members",
    "tasks",
    "boards",
    "board_columns",
    "placements",
];

/// Verifies that `conn` is migrated and carries every table core reads.
pub(crate) fn ensure_connection_ready(conn: &Connection) -> StoreResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(StoreError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for &table in REQUIRED_TABLES {
        if !table_exists(conn, table)? {
            return Err(StoreError::MissingRequiredTable(table));
        }
    }
    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> StoreResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

pub(crate) fn parse_uuid(value: &str, column: &'static str) -> StoreResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| StoreError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}

pub(crate) fn parse_optional_uuid(
    value: Option<String>,
    column: &'static str,
) -> StoreResult<Option<Uuid>> {
    value.map(|value| parse_uuid(&value, column)).transpose()
}
