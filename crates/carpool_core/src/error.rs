//! Storage error taxonomy shared by every backend.
//!
//! # Responsibility
//! - Define the small, stable set of error kinds callers observe regardless
//!   of which backend is configured.
//! - Separate infrastructure failures (`StoreError`) from business-rule
//!   violations (`DomainError`) so units of work can roll back uniformly
//!   while callers still distinguish the two.
//!
//! # Invariants
//! - Backend primitives never swallow errors; raw backend errors are kept as
//!   `source()` of the taxonomy member they were translated into.
//! - Every `StoreError` names the entity it was raised for.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub type StoreResult<T> = Result<T, StoreError>;
pub type WorkResult<T> = Result<T, WorkError>;

/// Boxed underlying cause kept for diagnostics and downcasting.
pub type Cause = Box<dyn Error + Send + Sync + 'static>;

/// Stable error kinds exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    StorageInit,
    StorageRead,
    StorageWrite,
    Mapping,
    InvalidIdentifier,
    NotFound,
    OperationNotSupported,
    DataAccess,
    BusinessRule,
    CompoundFailure,
}

/// Whether a failure came from storage infrastructure or from domain rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Infrastructure,
    Domain,
}

/// Storage backend family, used for error and log context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    Csv,
    Xml,
    Document,
    Relational,
}

impl Backend {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Xml => "xml",
            Self::Document => "document",
            Self::Relational => "relational",
        }
    }
}

impl Display for Backend {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Engine constraint family reported by a constraint violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    Unique,
    ForeignKey,
    NotNull,
    Check,
    PrimaryKey,
    Other,
}

/// Classification of a `DataAccess` failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataAccessKind {
    ConstraintViolation(ConstraintKind),
    /// A row expected by the engine vanished between statements.
    MissingRow,
    /// The session/transaction was no longer usable (closed, busy, locked).
    StaleSession,
    /// A write was attempted through a read-only session.
    ReadOnly,
    Other,
}

/// Infrastructure failure raised by a storage primitive.
#[derive(Debug)]
pub enum StoreError {
    StorageInit {
        entity: &'static str,
        path: PathBuf,
        source: Cause,
    },
    StorageRead {
        entity: &'static str,
        path: PathBuf,
        source: Cause,
    },
    StorageWrite {
        entity: &'static str,
        path: PathBuf,
        source: Cause,
    },
    Mapping {
        entity: &'static str,
        message: String,
    },
    InvalidIdentifier {
        entity: &'static str,
        value: String,
    },
    NotFound {
        entity: &'static str,
        id: String,
    },
    OperationNotSupported {
        entity: &'static str,
        operation: &'static str,
        backend: Backend,
    },
    DataAccess {
        entity: &'static str,
        operation: &'static str,
        kind: DataAccessKind,
        source: Cause,
    },
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::StorageInit { .. } => ErrorKind::StorageInit,
            Self::StorageRead { .. } => ErrorKind::StorageRead,
            Self::StorageWrite { .. } => ErrorKind::StorageWrite,
            Self::Mapping { .. } => ErrorKind::Mapping,
            Self::InvalidIdentifier { .. } => ErrorKind::InvalidIdentifier,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::OperationNotSupported { .. } => ErrorKind::OperationNotSupported,
            Self::DataAccess { .. } => ErrorKind::DataAccess,
        }
    }

    /// Entity name the failing operation was working on.
    pub fn entity(&self) -> &'static str {
        match self {
            Self::StorageInit { entity, .. }
            | Self::StorageRead { entity, .. }
            | Self::StorageWrite { entity, .. }
            | Self::Mapping { entity, .. }
            | Self::InvalidIdentifier { entity, .. }
            | Self::NotFound { entity, .. }
            | Self::OperationNotSupported { entity, .. }
            | Self::DataAccess { entity, .. } => entity,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_not_supported(&self) -> bool {
        matches!(self, Self::OperationNotSupported { .. })
    }

    /// Returns the classified data-access kind, if this is a `DataAccess` error.
    pub fn data_access_kind(&self) -> Option<DataAccessKind> {
        match self {
            Self::DataAccess { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// True when the engine rejected a write because of a unique constraint,
    /// e.g. a second user registering with the same email.
    pub fn is_unique_violation(&self) -> bool {
        matches!(
            self.data_access_kind(),
            Some(DataAccessKind::ConstraintViolation(
                ConstraintKind::Unique | ConstraintKind::PrimaryKey
            ))
        )
    }

    pub(crate) fn mapping(entity: &'static str, message: impl Into<String>) -> Self {
        Self::Mapping {
            entity,
            message: message.into(),
        }
    }

    pub(crate) fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub(crate) fn not_supported(
        entity: &'static str,
        operation: &'static str,
        backend: Backend,
    ) -> Self {
        Self::OperationNotSupported {
            entity,
            operation,
            backend,
        }
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StorageInit {
                entity,
                path,
                source,
            } => write!(
                f,
                "failed to initialize {entity} storage at `{}`: {source}",
                path.display()
            ),
            Self::StorageRead {
                entity,
                path,
                source,
            } => write!(
                f,
                "failed to read {entity} storage at `{}`: {source}",
                path.display()
            ),
            Self::StorageWrite {
                entity,
                path,
                source,
            } => write!(
                f,
                "failed to write {entity} storage at `{}`: {source}",
                path.display()
            ),
            Self::Mapping { entity, message } => write!(f, "cannot map {entity}: {message}"),
            Self::InvalidIdentifier { entity, value } => {
                write!(f, "invalid {entity} identifier `{value}`")
            }
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::OperationNotSupported {
                entity,
                operation,
                backend,
            } => write!(
                f,
                "operation `{operation}` on {entity} is not supported by the {backend} backend"
            ),
            Self::DataAccess {
                entity,
                operation,
                kind,
                source,
            } => write!(
                f,
                "data access failure during `{operation}` on {entity} ({kind:?}): {source}"
            ),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::StorageInit { source, .. }
            | Self::StorageRead { source, .. }
            | Self::StorageWrite { source, .. }
            | Self::DataAccess { source, .. } => Some(source.as_ref()),
            Self::Mapping { .. }
            | Self::InvalidIdentifier { .. }
            | Self::NotFound { .. }
            | Self::OperationNotSupported { .. } => None,
        }
    }
}

/// Business-rule violation raised by caller code inside a unit of work.
///
/// Not a storage failure: it triggers rollback but keeps its own kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainError {
    /// Stable machine-readable rule code, e.g. `seat_capacity_exceeded`.
    pub rule: &'static str,
    pub message: String,
}

impl DomainError {
    pub fn new(rule: &'static str, message: impl Into<String>) -> Self {
        Self {
            rule,
            message: message.into(),
        }
    }
}

impl Display for DomainError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "business rule `{}` violated: {}", self.rule, self.message)
    }
}

impl Error for DomainError {}

/// Error returned by a unit of work and by the transaction coordinator.
#[derive(Debug)]
pub enum WorkError {
    Store(StoreError),
    Domain(DomainError),
    /// The unit of work failed and the following rollback failed as well.
    CompoundFailure {
        original: Box<WorkError>,
        rollback: StoreError,
    },
}

impl WorkError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Store(_) => ErrorCategory::Infrastructure,
            Self::Domain(_) => ErrorCategory::Domain,
            Self::CompoundFailure { original, .. } => original.category(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Store(err) => err.kind(),
            Self::Domain(_) => ErrorKind::BusinessRule,
            Self::CompoundFailure { .. } => ErrorKind::CompoundFailure,
        }
    }

    pub fn as_store(&self) -> Option<&StoreError> {
        match self {
            Self::Store(err) => Some(err),
            _ => None,
        }
    }

    pub fn as_domain(&self) -> Option<&DomainError> {
        match self {
            Self::Domain(err) => Some(err),
            _ => None,
        }
    }
}

impl Display for WorkError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(err) => write!(f, "{err}"),
            Self::Domain(err) => write!(f, "{err}"),
            Self::CompoundFailure { original, rollback } => {
                write!(f, "{original}; rollback also failed: {rollback}")
            }
        }
    }
}

impl Error for WorkError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => err.source(),
            Self::Domain(_) => None,
            Self::CompoundFailure { original, .. } => Some(original.as_ref()),
        }
    }
}

impl From<StoreError> for WorkError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<DomainError> for WorkError {
    fn from(value: DomainError) -> Self {
        Self::Domain(value)
    }
}
