//! DAO contract over session-scoped relational stores.

use super::{BookingQueries, Dao, RatingQueries, TripQueries, UserQueries};
use crate::db::data_access_error;
use crate::error::StoreResult;
use crate::model::booking::{Booking, BookingStatus};
use crate::model::entity::{Entity, EntityId};
use crate::model::rating::Rating;
use crate::model::trip::Trip;
use crate::model::user::User;
use crate::relational::{RelationalStore, SqlEntity, SqlValue};
use rusqlite::params;

impl<T: SqlEntity> Dao<T> for RelationalStore<'_, T> {
    fn create(&self, entity: &T) -> StoreResult<EntityId> {
        self.persist(entity)
    }

    fn find_by_id(&self, id: &str) -> StoreResult<Option<T>> {
        RelationalStore::find_by_id(self, id)
    }

    fn find_all(&self) -> StoreResult<Vec<T>> {
        RelationalStore::find_all(self)
    }

    fn update(&self, entity: &T) -> StoreResult<()> {
        self.merge(entity)
    }

    fn delete(&self, id: &str) -> StoreResult<bool> {
        self.delete_by_id(id)
    }
}

impl UserQueries for RelationalStore<'_, User> {
    fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self
            .find_where("email", SqlValue::Text(email.to_string()))?
            .into_iter()
            .next())
    }
}

impl TripQueries for RelationalStore<'_, Trip> {
    fn find_by_route(&self, route_id: &str) -> StoreResult<Vec<Trip>> {
        self.find_where("route_id", SqlValue::Text(route_id.to_string()))
    }
}

impl BookingQueries for RelationalStore<'_, Booking> {
    fn count_booked_seats(&self, trip_id: &str) -> StoreResult<u32> {
        let seats: i64 = self
            .session()
            .conn()
            .query_row(
                "SELECT COALESCE(SUM(seats), 0)
                 FROM bookings
                 WHERE trip_id = ?1
                   AND status != ?2;",
                params![trip_id, BookingStatus::Cancelled.as_str()],
                |row| row.get(0),
            )
            .map_err(|err| data_access_error(Booking::NAME, "count_booked_seats", err))?;
        Ok(u32::try_from(seats.max(0)).unwrap_or(u32::MAX))
    }

    fn find_by_user_and_trip(&self, user_id: &str, trip_id: &str) -> StoreResult<Option<Booking>> {
        Ok(self
            .select(
                "find_by_user_and_trip",
                "WHERE user_id = ?1 AND trip_id = ?2",
                vec![
                    SqlValue::Text(user_id.to_string()),
                    SqlValue::Text(trip_id.to_string()),
                ],
            )?
            .into_iter()
            .next())
    }

    fn find_active_by_user_and_trip(
        &self,
        user_id: &str,
        trip_id: &str,
    ) -> StoreResult<Option<Booking>> {
        Ok(self
            .select(
                "find_active_by_user_and_trip",
                "WHERE user_id = ?1 AND trip_id = ?2 AND status != ?3",
                vec![
                    SqlValue::Text(user_id.to_string()),
                    SqlValue::Text(trip_id.to_string()),
                    SqlValue::Text(BookingStatus::Cancelled.as_str().to_string()),
                ],
            )?
            .into_iter()
            .next())
    }
}

impl RatingQueries for RelationalStore<'_, Rating> {
    fn find_by_user_and_trip(&self, user_id: &str, trip_id: &str) -> StoreResult<Option<Rating>> {
        Ok(self
            .select(
                "find_by_user_and_trip",
                "WHERE user_id = ?1 AND trip_id = ?2",
                vec![
                    SqlValue::Text(user_id.to_string()),
                    SqlValue::Text(trip_id.to_string()),
                ],
            )?
            .into_iter()
            .next())
    }
}
