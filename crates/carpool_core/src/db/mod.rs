//! SQLite bootstrap shared by the relational and document backends.
//!
//! # Responsibility
//! - Open and configure SQLite connections.
//! - Apply schema migrations in deterministic order.
//!
//! # Invariants
//! - Migration version is tracked via `PRAGMA user_version`.
//! - Stores must not touch application tables before migrations succeed.

use crate::error::{ConstraintKind, DataAccessKind, StoreError};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "database schema version {db_version} is newer than supported {latest_supported}"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

/// Classifies an engine error into the stable data-access kinds.
pub(crate) fn classify_sqlite_error(err: &rusqlite::Error) -> DataAccessKind {
    use rusqlite::ffi;

    match err {
        rusqlite::Error::SqliteFailure(failure, _) => match failure.code {
            rusqlite::ErrorCode::ConstraintViolation => {
                DataAccessKind::ConstraintViolation(match failure.extended_code {
                    ffi::SQLITE_CONSTRAINT_UNIQUE => ConstraintKind::Unique,
                    ffi::SQLITE_CONSTRAINT_PRIMARYKEY => ConstraintKind::PrimaryKey,
                    ffi::SQLITE_CONSTRAINT_FOREIGNKEY => ConstraintKind::ForeignKey,
                    ffi::SQLITE_CONSTRAINT_NOTNULL => ConstraintKind::NotNull,
                    ffi::SQLITE_CONSTRAINT_CHECK => ConstraintKind::Check,
                    _ => ConstraintKind::Other,
                })
            }
            rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked => {
                DataAccessKind::StaleSession
            }
            rusqlite::ErrorCode::ReadOnly => DataAccessKind::ReadOnly,
            _ => DataAccessKind::Other,
        },
        rusqlite::Error::QueryReturnedNoRows => DataAccessKind::MissingRow,
        _ => DataAccessKind::Other,
    }
}

/// Wraps an engine error into the taxonomy, keeping it as the source.
pub(crate) fn data_access_error(
    entity: &'static str,
    operation: &'static str,
    err: rusqlite::Error,
) -> StoreError {
    StoreError::DataAccess {
        entity,
        operation,
        kind: classify_sqlite_error(&err),
        source: Box::new(err),
    }
}

impl DbError {
    /// Converts a bootstrap failure into the storage taxonomy.
    pub fn into_store_error(self, operation: &'static str) -> StoreError {
        match self {
            Self::Sqlite(err) => data_access_error("database", operation, err),
            other => StoreError::DataAccess {
                entity: "database",
                operation,
                kind: DataAccessKind::Other,
                source: Box::new(other),
            },
        }
    }
}
