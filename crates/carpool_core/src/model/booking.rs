//! Booking entity: seats reserved by a passenger on a trip.

use crate::model::entity::{string_enum, Entity, EntityId};
use serde::{Deserialize, Serialize};

string_enum! {
    /// Booking lifecycle state. Cancelled bookings release their seats.
    pub enum BookingStatus {
        Pending => "pending",
        Confirmed => "confirmed",
        Cancelled => "cancelled",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: Option<EntityId>,
    pub user_id: EntityId,
    pub trip_id: EntityId,
    pub seats: u32,
    pub status: BookingStatus,
    /// Unix epoch milliseconds.
    pub created_at: i64,
}

impl Booking {
    /// Creates a pending booking.
    pub fn new(
        user_id: impl Into<EntityId>,
        trip_id: impl Into<EntityId>,
        seats: u32,
        created_at: i64,
    ) -> Self {
        Self {
            id: None,
            user_id: user_id.into(),
            trip_id: trip_id.into(),
            seats,
            status: BookingStatus::Pending,
            created_at,
        }
    }

    /// Whether this booking still holds seats on its trip.
    pub fn holds_seats(&self) -> bool {
        self.status != BookingStatus::Cancelled
    }
}

impl Entity for Booking {
    const NAME: &'static str = "booking";
    const COLLECTION: &'static str = "bookings";
    const FIELDS: &'static [&'static str] =
        &["id", "user_id", "trip_id", "seats", "status", "created_at"];

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn assign_id(&mut self, id: EntityId) {
        self.id = Some(id);
    }
}
