//! Unit-of-work execution over one SQLite connection.

use super::{Session, SessionMode};
use crate::db::{data_access_error, open_db, open_db_in_memory};
use crate::error::{DataAccessKind, StoreError, StoreResult, WorkError, WorkResult};
use log::{debug, error, info, warn};
use rusqlite::Connection;
use std::cell::Cell;
use std::path::Path;
use std::time::Instant;

const TRANSACTION_ENTITY: &str = "transaction";

/// Lifecycle of one unit of work.
///
/// `NotStarted -> Running -> Committed | RolledBack`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitOfWorkState {
    NotStarted,
    Running,
    Committed,
    RolledBack,
}

impl UnitOfWorkState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::Running => "running",
            Self::Committed => "committed",
            Self::RolledBack => "rolled_back",
        }
    }
}

/// Owns the relational connection and runs units of work against it.
///
/// `Connection` is `Send` but not `Sync`, so a coordinator and the sessions
/// it hands out never cross threads while a unit of work runs.
pub struct TransactionCoordinator {
    conn: Connection,
    active: Cell<Option<(SessionMode, u64)>>,
    next_span_id: Cell<u64>,
    last_state: Cell<UnitOfWorkState>,
}

impl TransactionCoordinator {
    /// Wraps a connection produced by `db::open_db*` (migrations applied).
    pub fn new(conn: Connection) -> Self {
        Self {
            conn,
            active: Cell::new(None),
            next_span_id: Cell::new(1),
            last_state: Cell::new(UnitOfWorkState::NotStarted),
        }
    }

    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = open_db(path).map_err(|err| err.into_store_error("open"))?;
        Ok(Self::new(conn))
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = open_db_in_memory().map_err(|err| err.into_store_error("open"))?;
        Ok(Self::new(conn))
    }

    /// Raw connection, for diagnostics and tests. Bypasses span tracking.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn into_connection(self) -> Connection {
        self.conn
    }

    /// Final state of the most recent top-level unit of work.
    pub fn last_state(&self) -> UnitOfWorkState {
        self.last_state.get()
    }

    /// True while a unit of work is running on this coordinator.
    pub fn is_active(&self) -> bool {
        self.active.get().is_some()
    }

    /// Runs `work` without ever committing a write.
    ///
    /// The connection is switched to `query_only` for the span, so write
    /// attempts fail with `DataAccess(ReadOnly)`. Nested calls reuse the
    /// active span.
    pub fn run_read_only<T>(
        &self,
        work: impl FnOnce(&Session<'_>) -> WorkResult<T>,
    ) -> WorkResult<T> {
        if let Some((mode, span_id)) = self.active.get() {
            debug!("event=uow_reuse module=relational span_id={span_id} mode={}", mode.as_str());
            return Session::new(&self.conn, mode, span_id, true).run_read_only(work);
        }

        let span = self.begin(SessionMode::ReadOnly)?;
        let session = Session::new(&self.conn, SessionMode::ReadOnly, span.span_id, false);
        let outcome = work(&session);
        // Nothing written in a read-only span is ever kept.
        match span.rollback() {
            Ok(()) => outcome,
            Err(rollback) => Err(compound_or_rollback(outcome, rollback)),
        }
    }

    /// Runs `work` as one atomic transaction.
    ///
    /// Commits when `work` returns `Ok`; otherwise rolls back and returns the
    /// original error unchanged. If the rollback itself fails, the caller gets
    /// `WorkError::CompoundFailure` with both errors. Nested calls run inside
    /// the active span without opening a nested transaction.
    ///
    /// A span that was ended behind the coordinator's back (the connection is
    /// back in autocommit mode when `work` returns) is never reported as a
    /// success: an `Ok` outcome becomes `DataAccess(StaleSession)` and an
    /// error outcome becomes `CompoundFailure`.
    pub fn run_in_transaction<T>(
        &self,
        work: impl FnOnce(&Session<'_>) -> WorkResult<T>,
    ) -> WorkResult<T> {
        if let Some((mode, span_id)) = self.active.get() {
            debug!("event=uow_reuse module=relational span_id={span_id} mode={}", mode.as_str());
            return Session::new(&self.conn, mode, span_id, true).run_in_transaction(work);
        }

        let span = self.begin(SessionMode::ReadWrite)?;
        let session = Session::new(&self.conn, SessionMode::ReadWrite, span.span_id, false);
        match work(&session) {
            Ok(value) => {
                span.commit()?;
                Ok(value)
            }
            Err(original) => match span.rollback() {
                Ok(()) => Err(original),
                Err(rollback) => Err(WorkError::CompoundFailure {
                    original: Box::new(original),
                    rollback,
                }),
            },
        }
    }

    fn begin(&self, mode: SessionMode) -> WorkResult<Span<'_>> {
        let span_id = self.next_span_id.get();
        self.next_span_id.set(span_id.wrapping_add(1));

        let begin_sql = match mode {
            SessionMode::ReadOnly => "PRAGMA query_only = ON; BEGIN DEFERRED;",
            SessionMode::ReadWrite => "BEGIN IMMEDIATE;",
        };
        if let Err(err) = self.conn.execute_batch(begin_sql) {
            error!(
                "event=uow_begin module=relational status=error span_id={span_id} mode={} error={}",
                mode.as_str(),
                err
            );
            if mode == SessionMode::ReadOnly {
                let _ = self.conn.execute_batch("PRAGMA query_only = OFF;");
            }
            return Err(data_access_error(TRANSACTION_ENTITY, "begin", err).into());
        }

        self.active.set(Some((mode, span_id)));
        log_transition(span_id, mode, UnitOfWorkState::NotStarted, UnitOfWorkState::Running);
        Ok(Span {
            coordinator: self,
            mode,
            span_id,
            started_at: Instant::now(),
            finished: false,
        })
    }
}

impl std::fmt::Debug for TransactionCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionCoordinator")
            .field("active", &self.active.get())
            .field("last_state", &self.last_state.get())
            .finish()
    }
}

/// One open begin/commit span. Dropping an unfinished span rolls it back,
/// which also covers unwinding out of a panicking unit of work.
struct Span<'a> {
    coordinator: &'a TransactionCoordinator,
    mode: SessionMode,
    span_id: u64,
    started_at: Instant,
    finished: bool,
}

impl Span<'_> {
    fn commit(mut self) -> StoreResult<()> {
        self.finished = true;
        let conn = &self.coordinator.conn;
        if conn.is_autocommit() {
            error!(
                "event=uow_commit module=relational status=error span_id={} error=span_already_ended",
                self.span_id
            );
            self.finish(UnitOfWorkState::RolledBack);
            return Err(span_ended_error("commit"));
        }
        match conn.execute_batch("COMMIT;") {
            Ok(()) => {
                self.finish(UnitOfWorkState::Committed);
                Ok(())
            }
            Err(err) => {
                error!(
                    "event=uow_commit module=relational status=error span_id={} error={}",
                    self.span_id, err
                );
                if !conn.is_autocommit() {
                    if let Err(rollback_err) = conn.execute_batch("ROLLBACK;") {
                        warn!(
                            "event=uow_rollback module=relational status=error span_id={} error={}",
                            self.span_id, rollback_err
                        );
                    }
                }
                self.finish(UnitOfWorkState::RolledBack);
                Err(data_access_error(TRANSACTION_ENTITY, "commit", err))
            }
        }
    }

    fn rollback(mut self) -> StoreResult<()> {
        self.finished = true;
        let result = self.rollback_inner();
        self.finish(UnitOfWorkState::RolledBack);
        result
    }

    fn rollback_inner(&self) -> StoreResult<()> {
        let conn = &self.coordinator.conn;
        let rolled_back = if conn.is_autocommit() {
            Err(span_ended_error("rollback"))
        } else {
            conn.execute_batch("ROLLBACK;")
                .map_err(|err| data_access_error(TRANSACTION_ENTITY, "rollback", err))
        };
        if self.mode == SessionMode::ReadOnly {
            if let Err(err) = conn.execute_batch("PRAGMA query_only = OFF;") {
                warn!(
                    "event=uow_release module=relational status=error span_id={} error={}",
                    self.span_id, err
                );
            }
        }
        if let Err(err) = &rolled_back {
            error!(
                "event=uow_rollback module=relational status=error span_id={} error={}",
                self.span_id, err
            );
        }
        rolled_back
    }

    fn finish(&self, state: UnitOfWorkState) {
        self.coordinator.active.set(None);
        self.coordinator.last_state.set(state);
        log_transition(self.span_id, self.mode, UnitOfWorkState::Running, state);
        debug!(
            "event=uow_end module=relational span_id={} duration_ms={}",
            self.span_id,
            self.started_at.elapsed().as_millis()
        );
    }
}

impl Drop for Span<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        warn!(
            "event=uow_abandoned module=relational span_id={} mode={}",
            self.span_id,
            self.mode.as_str()
        );
        let _ = self.rollback_inner();
        self.finish(UnitOfWorkState::RolledBack);
    }
}

fn log_transition(span_id: u64, mode: SessionMode, from: UnitOfWorkState, to: UnitOfWorkState) {
    let status = if to == UnitOfWorkState::RolledBack {
        "rollback"
    } else {
        "ok"
    };
    info!(
        "event=uow_transition module=relational status={status} span_id={span_id} mode={} from={} to={}",
        mode.as_str(),
        from.as_str(),
        to.as_str()
    );
}

/// The connection left the span before the coordinator ended it, so what
/// the unit of work wrote can no longer be committed or undone as one.
fn span_ended_error(operation: &'static str) -> StoreError {
    StoreError::DataAccess {
        entity: TRANSACTION_ENTITY,
        operation,
        kind: DataAccessKind::StaleSession,
        source: "transaction was ended outside the coordinator".into(),
    }
}

fn compound_or_rollback<T>(outcome: WorkResult<T>, rollback: StoreError) -> WorkError {
    match outcome {
        Ok(_) => WorkError::Store(rollback),
        Err(original) => WorkError::CompoundFailure {
            original: Box::new(original),
            rollback,
        },
    }
}
