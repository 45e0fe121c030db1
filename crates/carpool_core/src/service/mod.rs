//! Demonstration use-case services over the persistence layer.
//!
//! # Responsibility
//! - Run multi-entity writes as one relational unit of work.
//! - Show the same business check over a non-transactional backend.
//!
//! # Invariants
//! - Business-rule failures surface as `WorkError::Domain` and roll back.
//! - `OperationNotSupported` from a business check is handled according to
//!   the caller's `UnsupportedCheckPolicy`, never silently.

pub mod booking_ledger;
pub mod trip_service;

use crate::error::{StoreError, StoreResult};
use log::warn;
use std::time::{SystemTime, UNIX_EPOCH};

pub use booking_ledger::BookingLedger;
pub use trip_service::TripService;

/// Rule codes carried by `DomainError::rule`.
pub mod rules {
    pub const INVALID_SEAT_COUNT: &str = "invalid_seat_count";
    pub const TRIP_NOT_BOOKABLE: &str = "trip_not_bookable";
    pub const DUPLICATE_BOOKING: &str = "duplicate_booking";
    pub const SEAT_CAPACITY_EXCEEDED: &str = "seat_capacity_exceeded";
    pub const TRIP_STATUS_FINAL: &str = "trip_status_final";
}

/// What a business check does when its backend cannot answer the query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnsupportedCheckPolicy {
    /// Skip the check and continue; logged at warn level.
    Skip,
    /// Fail the operation with the `OperationNotSupported` error.
    #[default]
    FailClosed,
}

impl UnsupportedCheckPolicy {
    /// Resolves a check result: `Ok(None)` means the check was skipped.
    pub fn resolve<T>(self, check: &'static str, result: StoreResult<T>) -> StoreResult<Option<T>> {
        match result {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.is_not_supported() && self == Self::Skip => {
                warn!("event=check_skipped module=service check={check} error={err}");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }
}

pub(crate) fn ensure_found<T>(entity: &'static str, id: &str, value: Option<T>) -> StoreResult<T> {
    value.ok_or_else(|| StoreError::not_found(entity, id))
}

/// Current time as Unix epoch milliseconds.
pub(crate) fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or_default()
}
