//! DAO contract over flat-file stores.
//!
//! Predicate searches and aggregates are not offered here: answering them
//! would mean scanning the whole file on every call.

use super::{BookingQueries, Dao, RatingQueries, TripQueries, UserQueries};
use crate::error::{StoreError, StoreResult};
use crate::file::{FileFormat, FileRecordStore};
use crate::model::booking::Booking;
use crate::model::entity::{Entity, EntityId};
use crate::model::rating::Rating;
use crate::model::trip::Trip;
use crate::model::user::User;

impl<T: Entity, F: FileFormat> Dao<T> for FileRecordStore<T, F> {
    fn create(&self, entity: &T) -> StoreResult<EntityId> {
        FileRecordStore::create(self, entity)
    }

    fn find_by_id(&self, id: &str) -> StoreResult<Option<T>> {
        FileRecordStore::find_by_id(self, id)
    }

    fn find_all(&self) -> StoreResult<Vec<T>> {
        self.read_all()
    }

    fn update(&self, entity: &T) -> StoreResult<()> {
        FileRecordStore::update(self, entity)
    }

    fn delete(&self, id: &str) -> StoreResult<bool> {
        self.delete_by_id(id)
    }
}

impl<F: FileFormat> UserQueries for FileRecordStore<User, F> {
    fn find_by_email(&self, _email: &str) -> StoreResult<Option<User>> {
        Err(StoreError::not_supported(User::NAME, "find_by_email", F::BACKEND))
    }
}

impl<F: FileFormat> TripQueries for FileRecordStore<Trip, F> {
    fn find_by_route(&self, _route_id: &str) -> StoreResult<Vec<Trip>> {
        Err(StoreError::not_supported(Trip::NAME, "find_by_route", F::BACKEND))
    }
}

impl<F: FileFormat> BookingQueries for FileRecordStore<Booking, F> {
    fn count_booked_seats(&self, _trip_id: &str) -> StoreResult<u32> {
        Err(StoreError::not_supported(
            Booking::NAME,
            "count_booked_seats",
            F::BACKEND,
        ))
    }

    fn find_by_user_and_trip(&self, _user_id: &str, _trip_id: &str) -> StoreResult<Option<Booking>> {
        Err(StoreError::not_supported(
            Booking::NAME,
            "find_by_user_and_trip",
            F::BACKEND,
        ))
    }

    fn find_active_by_user_and_trip(
        &self,
        _user_id: &str,
        _trip_id: &str,
    ) -> StoreResult<Option<Booking>> {
        Err(StoreError::not_supported(
            Booking::NAME,
            "find_active_by_user_and_trip",
            F::BACKEND,
        ))
    }
}

impl<F: FileFormat> RatingQueries for FileRecordStore<Rating, F> {
    fn find_by_user_and_trip(&self, _user_id: &str, _trip_id: &str) -> StoreResult<Option<Rating>> {
        Err(StoreError::not_supported(
            Rating::NAME,
            "find_by_user_and_trip",
            F::BACKEND,
        ))
    }
}
