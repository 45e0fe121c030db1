//! DAO contract over document stores.

use super::{BookingQueries, Dao, RatingQueries, TripQueries, UserQueries};
use crate::document::{Document, DocumentCollection, DocumentStore};
use crate::error::{Backend, StoreError, StoreResult};
use crate::model::booking::Booking;
use crate::model::entity::{Entity, EntityId};
use crate::model::rating::Rating;
use crate::model::trip::Trip;
use crate::model::user::User;
use serde_json::Value;

impl<T: Entity, C: DocumentCollection> Dao<T> for DocumentStore<T, C> {
    fn create(&self, entity: &T) -> StoreResult<EntityId> {
        DocumentStore::create(self, entity)
    }

    fn find_by_id(&self, id: &str) -> StoreResult<Option<T>> {
        self.get(id)
    }

    fn find_all(&self) -> StoreResult<Vec<T>> {
        DocumentStore::find_all(self)
    }

    fn update(&self, entity: &T) -> StoreResult<()> {
        DocumentStore::update(self, entity)
    }

    fn delete(&self, id: &str) -> StoreResult<bool> {
        DocumentStore::delete(self, id)
    }
}

fn filter<const N: usize>(fields: [(&str, &str); N]) -> Document {
    fields
        .into_iter()
        .map(|(field, value)| (field.to_string(), Value::String(value.to_string())))
        .collect()
}

impl<C: DocumentCollection> UserQueries for DocumentStore<User, C> {
    fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self.find_where(filter([("email", email)]))?.into_iter().next())
    }
}

impl<C: DocumentCollection> TripQueries for DocumentStore<Trip, C> {
    fn find_by_route(&self, route_id: &str) -> StoreResult<Vec<Trip>> {
        self.find_where(filter([("route_id", route_id)]))
    }
}

impl<C: DocumentCollection> BookingQueries for DocumentStore<Booking, C> {
    /// Aggregates are not offered by the document backend.
    fn count_booked_seats(&self, _trip_id: &str) -> StoreResult<u32> {
        Err(StoreError::not_supported(
            Booking::NAME,
            "count_booked_seats",
            Backend::Document,
        ))
    }

    fn find_by_user_and_trip(&self, user_id: &str, trip_id: &str) -> StoreResult<Option<Booking>> {
        Ok(self
            .find_where(filter([("user_id", user_id), ("trip_id", trip_id)]))?
            .into_iter()
            .next())
    }

    fn find_active_by_user_and_trip(
        &self,
        user_id: &str,
        trip_id: &str,
    ) -> StoreResult<Option<Booking>> {
        Ok(self
            .find_where(filter([("user_id", user_id), ("trip_id", trip_id)]))?
            .into_iter()
            .find(Booking::holds_seats))
    }
}

impl<C: DocumentCollection> RatingQueries for DocumentStore<Rating, C> {
    fn find_by_user_and_trip(&self, user_id: &str, trip_id: &str) -> StoreResult<Option<Rating>> {
        Ok(self
            .find_where(filter([("user_id", user_id), ("trip_id", trip_id)]))?
            .into_iter()
            .next())
    }
}
