//! Trip publishing and seat booking as relational units of work.

use super::{ensure_found, now_epoch_ms, rules, UnsupportedCheckPolicy};
use crate::dao::BookingQueries;
use crate::error::{DomainError, WorkResult};
use crate::model::booking::{Booking, BookingStatus};
use crate::model::entity::{Entity, EntityId};
use crate::model::route::Route;
use crate::model::trip::{Trip, TripStatus};
use crate::relational::TransactionCoordinator;
use log::info;

/// Use-case service over one `TransactionCoordinator`.
pub struct TripService<'a> {
    coordinator: &'a TransactionCoordinator,
}

impl<'a> TripService<'a> {
    pub fn new(coordinator: &'a TransactionCoordinator) -> Self {
        Self { coordinator }
    }

    /// Creates `route` and then `trip` on it, atomically.
    ///
    /// `trip.route_id` is replaced by the new route's id. Returns
    /// `(route_id, trip_id)`.
    pub fn publish_trip(&self, route: &Route, trip: &Trip) -> WorkResult<(EntityId, EntityId)> {
        self.coordinator.run_in_transaction(|session| {
            let route_id = session.store::<Route>().persist(route)?;
            let mut trip = trip.clone();
            trip.route_id = route_id.clone();
            let trip_id = session.store::<Trip>().persist(&trip)?;
            info!(
                "event=trip_publish module=service status=ok span_id={}",
                session.span_id()
            );
            Ok((route_id, trip_id))
        })
    }

    /// Books `seats` on `trip_id` for `user_id` and returns the booking id.
    ///
    /// Rejects a second live booking by the same user and any request that
    /// would overbook the trip. The capacity check is resolved through
    /// `policy` when the backend cannot count seats.
    pub fn book_seats(
        &self,
        user_id: &str,
        trip_id: &str,
        seats: u32,
        policy: UnsupportedCheckPolicy,
    ) -> WorkResult<EntityId> {
        if seats == 0 {
            return Err(DomainError::new(rules::INVALID_SEAT_COUNT, "seats must be positive").into());
        }

        self.coordinator.run_in_transaction(|session| {
            let trip = ensure_found(
                Trip::NAME,
                trip_id,
                session.store::<Trip>().find_by_id(trip_id)?,
            )?;
            if !trip.is_open_for_booking() {
                return Err(DomainError::new(
                    rules::TRIP_NOT_BOOKABLE,
                    format!("trip {trip_id} is {}", trip.status),
                )
                .into());
            }

            let bookings = session.store::<Booking>();
            if let Some(existing) = bookings.find_active_by_user_and_trip(user_id, trip_id)? {
                return Err(DomainError::new(
                    rules::DUPLICATE_BOOKING,
                    format!(
                        "user {user_id} already holds booking {} on trip {trip_id}",
                        existing.id.as_deref().unwrap_or_default()
                    ),
                )
                .into());
            }

            let booked = policy.resolve("seat_capacity", bookings.count_booked_seats(trip_id))?;
            if let Some(booked) = booked {
                if booked.saturating_add(seats) > trip.seats_total {
                    return Err(DomainError::new(
                        rules::SEAT_CAPACITY_EXCEEDED,
                        format!(
                            "requested {seats} seats, {} of {} available",
                            trip.seats_total.saturating_sub(booked),
                            trip.seats_total
                        ),
                    )
                    .into());
                }
            }

            let mut booking = Booking::new(user_id, trip_id, seats, now_epoch_ms());
            booking.status = BookingStatus::Confirmed;
            let booking_id = bookings.persist(&booking)?;
            info!(
                "event=booking_create module=service status=ok span_id={} seats={seats}",
                session.span_id()
            );
            Ok(booking_id)
        })
    }

    /// Moves a trip to `status`. Completed and cancelled trips are final.
    pub fn update_trip_status(&self, trip_id: &str, status: TripStatus) -> WorkResult<Trip> {
        self.coordinator.run_in_transaction(|session| {
            let trips = session.store::<Trip>();
            let mut trip = ensure_found(Trip::NAME, trip_id, trips.find_by_id(trip_id)?)?;
            if matches!(trip.status, TripStatus::Completed | TripStatus::Cancelled)
                && trip.status != status
            {
                return Err(DomainError::new(
                    rules::TRIP_STATUS_FINAL,
                    format!("trip {trip_id} is already {}", trip.status),
                )
                .into());
            }
            trip.status = status;
            trips.merge(&trip)?;
            Ok(trip)
        })
    }
}
