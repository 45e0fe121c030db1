//! Seat booking over any backend, without atomicity.
//!
//! The check-then-create sequence below is not isolated on file or document
//! backends: two concurrent callers can both pass the capacity check.

use super::{now_epoch_ms, rules, UnsupportedCheckPolicy};
use crate::dao::{BookingQueries, Dao};
use crate::error::{DomainError, WorkResult};
use crate::model::booking::{Booking, BookingStatus};
use crate::model::entity::EntityId;
use crate::model::trip::Trip;

pub struct BookingLedger<D> {
    bookings: D,
    policy: UnsupportedCheckPolicy,
}

impl<D: Dao<Booking> + BookingQueries> BookingLedger<D> {
    pub fn new(bookings: D, policy: UnsupportedCheckPolicy) -> Self {
        Self { bookings, policy }
    }

    pub fn bookings(&self) -> &D {
        &self.bookings
    }

    /// Books `seats` on `trip` for `user_id`.
    ///
    /// Duplicate and capacity checks both go through the ledger's policy.
    pub fn book(&self, user_id: &str, trip: &Trip, seats: u32) -> WorkResult<EntityId> {
        let Some(trip_id) = trip.id.as_deref() else {
            return Err(DomainError::new(rules::TRIP_NOT_BOOKABLE, "trip is not persisted").into());
        };
        if seats == 0 {
            return Err(DomainError::new(rules::INVALID_SEAT_COUNT, "seats must be positive").into());
        }
        if !trip.is_open_for_booking() {
            return Err(DomainError::new(
                rules::TRIP_NOT_BOOKABLE,
                format!("trip {trip_id} is {}", trip.status),
            )
            .into());
        }

        let existing = self.policy.resolve(
            "duplicate_booking",
            self.bookings.find_active_by_user_and_trip(user_id, trip_id),
        )?;
        if existing.flatten().is_some() {
            return Err(DomainError::new(
                rules::DUPLICATE_BOOKING,
                format!("user {user_id} already holds a booking on trip {trip_id}"),
            )
            .into());
        }

        let booked = self
            .policy
            .resolve("seat_capacity", self.bookings.count_booked_seats(trip_id))?;
        if booked.is_some_and(|booked| booked.saturating_add(seats) > trip.seats_total) {
            return Err(DomainError::new(
                rules::SEAT_CAPACITY_EXCEEDED,
                format!("requested {seats} seats on trip {trip_id}"),
            )
            .into());
        }

        let mut booking = Booking::new(user_id, trip_id, seats, now_epoch_ms());
        booking.status = BookingStatus::Confirmed;
        Ok(self.bookings.create(&booking)?)
    }
}
