//! Uniform per-entity DAO contract over every backend.
//!
//! # Responsibility
//! - Expose identical CRUD names for file, document and relational stores.
//! - Expose domain queries (booked seats, booking/rating by user and trip,
//!   user by email, trips by route) where a backend can answer them.
//!
//! # Invariants
//! - `create` assigns exactly one identifier, stable for the entity lifetime.
//! - `update` of an unknown identifier fails with `NotFound`.
//! - `delete` of an unknown identifier returns `Ok(false)` on every backend.
//! - Queries a backend cannot answer fail with `OperationNotSupported`; they
//!   never return an empty or zero result instead.

mod document;
mod file;
mod relational;

use crate::error::StoreResult;
use crate::model::booking::Booking;
use crate::model::entity::{Entity, EntityId};
use crate::model::rating::Rating;
use crate::model::trip::Trip;
use crate::model::user::User;

/// CRUD contract shared by every backend.
pub trait Dao<T: Entity> {
    /// Persists a not-yet-identified entity and returns its new identifier.
    fn create(&self, entity: &T) -> StoreResult<EntityId>;
    fn find_by_id(&self, id: &str) -> StoreResult<Option<T>>;
    fn find_all(&self) -> StoreResult<Vec<T>>;
    /// Replaces the stored entity with the same identifier.
    fn update(&self, entity: &T) -> StoreResult<()>;
    /// Removes the entity. `Ok(false)` when nothing matched.
    fn delete(&self, id: &str) -> StoreResult<bool>;
}

pub trait UserQueries {
    fn find_by_email(&self, email: &str) -> StoreResult<Option<User>>;
}

pub trait TripQueries {
    fn find_by_route(&self, route_id: &str) -> StoreResult<Vec<Trip>>;
}

pub trait BookingQueries {
    /// Seats held by non-cancelled bookings on `trip_id`.
    fn count_booked_seats(&self, trip_id: &str) -> StoreResult<u32>;
    /// First booking by `user_id` on `trip_id` in insertion order, whatever its status.
    fn find_by_user_and_trip(&self, user_id: &str, trip_id: &str) -> StoreResult<Option<Booking>>;
    /// Booking by `user_id` on `trip_id` that still holds seats.
    fn find_active_by_user_and_trip(
        &self,
        user_id: &str,
        trip_id: &str,
    ) -> StoreResult<Option<Booking>>;
}

pub trait RatingQueries {
    fn find_by_user_and_trip(&self, user_id: &str, trip_id: &str) -> StoreResult<Option<Rating>>;
}

impl<T: Entity, D: Dao<T> + ?Sized> Dao<T> for &D {
    fn create(&self, entity: &T) -> StoreResult<EntityId> {
        (**self).create(entity)
    }

    fn find_by_id(&self, id: &str) -> StoreResult<Option<T>> {
        (**self).find_by_id(id)
    }

    fn find_all(&self) -> StoreResult<Vec<T>> {
        (**self).find_all()
    }

    fn update(&self, entity: &T) -> StoreResult<()> {
        (**self).update(entity)
    }

    fn delete(&self, id: &str) -> StoreResult<bool> {
        (**self).delete(id)
    }
}

impl<D: BookingQueries + ?Sized> BookingQueries for &D {
    fn count_booked_seats(&self, trip_id: &str) -> StoreResult<u32> {
        (**self).count_booked_seats(trip_id)
    }

    fn find_by_user_and_trip(&self, user_id: &str, trip_id: &str) -> StoreResult<Option<Booking>> {
        (**self).find_by_user_and_trip(user_id, trip_id)
    }

    fn find_active_by_user_and_trip(
        &self,
        user_id: &str,
        trip_id: &str,
    ) -> StoreResult<Option<Booking>> {
        (**self).find_active_by_user_and_trip(user_id, trip_id)
    }
}
