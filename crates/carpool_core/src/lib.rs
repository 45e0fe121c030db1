//! Persistence core for the carpool domain.
//!
//! One entity model, four interchangeable storage backends (CSV, XML,
//! document collections, SQLite) behind a uniform DAO contract, and a
//! transaction coordinator for units of work on the relational backend.

pub mod config;
pub mod dao;
pub mod db;
pub mod document;
pub mod error;
pub mod file;
pub mod logging;
pub mod model;
pub mod relational;
pub mod service;

pub use config::{BackendKind, ConfigError, StorageConfig};
pub use dao::{BookingQueries, Dao, RatingQueries, TripQueries, UserQueries};
pub use error::{
    Backend, ConstraintKind, DataAccessKind, DomainError, ErrorCategory, ErrorKind, StoreError,
    StoreResult, WorkError, WorkResult,
};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::booking::{Booking, BookingStatus};
pub use model::entity::{Entity, EntityId};
pub use model::rating::Rating;
pub use model::route::Route;
pub use model::trip::{Trip, TripStatus};
pub use model::user::User;
pub use relational::{Session, SessionMode, TransactionCoordinator, UnitOfWorkState};
pub use service::{BookingLedger, TripService, UnsupportedCheckPolicy};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
