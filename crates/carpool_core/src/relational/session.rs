//! Explicit session context handed to every unit of work.

use super::{RelationalStore, SqlEntity, SqlValue};
use crate::db::data_access_error;
use crate::error::{DataAccessKind, StoreError, StoreResult, WorkResult};
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::Connection;

static SQL_IDENTIFIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid identifier regex"));

// SQLite reports these as read-only statements, yet they end the span or
// change connection state.
static SPAN_CONTROL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?is)^(?:\s+|--[^\n]*(?:\n|$)|/\*.*?\*/)*(begin|commit|end|rollback|savepoint|release|pragma|attach|detach|vacuum)\b",
    )
    .expect("valid span control regex")
});

const SESSION_ENTITY: &str = "session";

/// Access mode of the active span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    ReadOnly,
    ReadWrite,
}

impl SessionMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ReadOnly => "read_only",
            Self::ReadWrite => "read_write",
        }
    }
}

/// Handle to the connection and span of the running unit of work.
///
/// Only the coordinator creates sessions. Everything a unit of work touches
/// in the relational backend goes through this value; there is no ambient
/// per-thread state.
pub struct Session<'c> {
    conn: &'c Connection,
    mode: SessionMode,
    span_id: u64,
    nested: bool,
}

impl<'c> Session<'c> {
    pub(crate) fn new(conn: &'c Connection, mode: SessionMode, span_id: u64, nested: bool) -> Self {
        Self {
            conn,
            mode,
            span_id,
            nested,
        }
    }

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    /// Identifier of the begin/commit span this session belongs to.
    pub fn span_id(&self) -> u64 {
        self.span_id
    }

    /// True when this session reuses a span opened by an outer call.
    pub fn is_nested(&self) -> bool {
        self.nested
    }

    pub(crate) fn conn(&self) -> &'c Connection {
        self.conn
    }

    /// Session-scoped store for entity type `T`.
    pub fn store<T: SqlEntity>(&self) -> RelationalStore<'_, T> {
        RelationalStore::new(self)
    }

    /// Runs `work` inside the current span. No nested transaction is opened.
    ///
    /// Fails with `DataAccess(ReadOnly)` when the current span is read-only.
    pub fn run_in_transaction<T>(
        &self,
        work: impl FnOnce(&Session<'c>) -> WorkResult<T>,
    ) -> WorkResult<T> {
        if self.mode == SessionMode::ReadOnly {
            return Err(StoreError::DataAccess {
                entity: SESSION_ENTITY,
                operation: "run_in_transaction",
                kind: DataAccessKind::ReadOnly,
                source: "cannot open a write span inside a read-only span".into(),
            }
            .into());
        }
        work(self)
    }

    /// Runs `work` inside the current span, whatever its mode.
    pub fn run_read_only<T>(
        &self,
        work: impl FnOnce(&Session<'c>) -> WorkResult<T>,
    ) -> WorkResult<T> {
        work(self)
    }

    /// Executes one read-only SQL statement and returns every row.
    ///
    /// Statements that could modify the database are rejected, and so are
    /// transaction-control, `PRAGMA`, `ATTACH`/`DETACH` and `VACUUM`
    /// statements.
    pub fn query(&self, sql: &str) -> StoreResult<Vec<Vec<SqlValue>>> {
        self.query_with(sql, &[])
    }

    /// `query` with positional parameters bound as `?1..?N`.
    pub fn query_with(&self, sql: &str, params: &[SqlValue]) -> StoreResult<Vec<Vec<SqlValue>>> {
        if let Some(keyword) = SPAN_CONTROL_RE.captures(sql).and_then(|caps| caps.get(1)) {
            return Err(StoreError::DataAccess {
                entity: SESSION_ENTITY,
                operation: "query",
                kind: DataAccessKind::ReadOnly,
                source: format!(
                    "{} statements are reserved for the coordinator",
                    keyword.as_str().to_ascii_uppercase()
                )
                .into(),
            });
        }
        let mut stmt = self
            .conn
            .prepare(sql)
            .map_err(|err| data_access_error(SESSION_ENTITY, "query", err))?;
        if !stmt.readonly() {
            return Err(StoreError::DataAccess {
                entity: SESSION_ENTITY,
                operation: "query",
                kind: DataAccessKind::ReadOnly,
                source: format!("statement is not read-only: {sql}").into(),
            });
        }

        let column_count = stmt.column_count();
        let mut rows = stmt
            .query(rusqlite::params_from_iter(params.iter()))
            .map_err(|err| data_access_error(SESSION_ENTITY, "query", err))?;
        let mut result = Vec::new();
        while let Some(row) = rows
            .next()
            .map_err(|err| data_access_error(SESSION_ENTITY, "query", err))?
        {
            let mut values = Vec::with_capacity(column_count);
            for index in 0..column_count {
                values.push(
                    row.get::<_, SqlValue>(index)
                        .map_err(|err| data_access_error(SESSION_ENTITY, "query", err))?,
                );
            }
            result.push(values);
        }
        Ok(result)
    }

    /// Names of the application tables, sorted.
    pub fn table_names(&self) -> StoreResult<Vec<String>> {
        let rows = self.query(
            "SELECT name FROM sqlite_master
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
             ORDER BY name ASC;",
        )?;
        Ok(rows
            .into_iter()
            .filter_map(|row| match row.into_iter().next() {
                Some(SqlValue::Text(name)) => Some(name),
                _ => None,
            })
            .collect())
    }

    /// Number of rows in `table`.
    pub fn row_count(&self, table: &str) -> StoreResult<u64> {
        if !SQL_IDENTIFIER_RE.is_match(table) {
            return Err(StoreError::InvalidIdentifier {
                entity: SESSION_ENTITY,
                value: table.to_string(),
            });
        }
        let count: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM \"{table}\";"), [], |row| {
                row.get(0)
            })
            .map_err(|err| data_access_error(SESSION_ENTITY, "row_count", err))?;
        Ok(count.max(0) as u64)
    }
}

impl std::fmt::Debug for Session<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("mode", &self.mode)
            .field("span_id", &self.span_id)
            .field("nested", &self.nested)
            .finish()
    }
}
