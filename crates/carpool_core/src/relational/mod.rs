//! Relational backend: schema-mapped tables behind an explicit session.
//!
//! # Responsibility
//! - Run units of work as read-only spans or as one atomic transaction.
//! - Persist/merge/get/remove entities through a session-scoped store.
//! - Translate engine failures into the storage taxonomy without losing the
//!   original cause.
//!
//! # Invariants
//! - One unit of work maps to exactly one begin/commit-or-rollback span;
//!   nested calls reuse the active span.
//! - The session is released on every exit path, including panics.
//! - This is the only backend offering cross-entity atomicity.

mod coordinator;
mod mapping;
mod session;
mod store;

pub use coordinator::{TransactionCoordinator, UnitOfWorkState};
pub use mapping::SqlEntity;
pub use rusqlite::types::Value as SqlValue;
pub use session::{Session, SessionMode};
pub use store::RelationalStore;
