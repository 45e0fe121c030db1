//! Trip entity: one driver offering seats on a route at a given time.

use crate::model::entity::{string_enum, Entity, EntityId};
use serde::{Deserialize, Serialize};

string_enum! {
    /// Trip lifecycle state.
    pub enum TripStatus {
        Scheduled => "scheduled",
        InProgress => "in_progress",
        Completed => "completed",
        Cancelled => "cancelled",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trip {
    pub id: Option<EntityId>,
    pub driver_id: EntityId,
    pub route_id: EntityId,
    /// Unix epoch milliseconds.
    pub departure_at: i64,
    pub seats_total: u32,
    pub price_cents: i64,
    pub status: TripStatus,
}

impl Trip {
    /// Creates a scheduled trip.
    pub fn new(
        driver_id: impl Into<EntityId>,
        route_id: impl Into<EntityId>,
        departure_at: i64,
        seats_total: u32,
        price_cents: i64,
    ) -> Self {
        Self {
            id: None,
            driver_id: driver_id.into(),
            route_id: route_id.into(),
            departure_at,
            seats_total,
            price_cents,
            status: TripStatus::Scheduled,
        }
    }

    pub fn is_open_for_booking(&self) -> bool {
        self.status == TripStatus::Scheduled
    }
}

impl Entity for Trip {
    const NAME: &'static str = "trip";
    const COLLECTION: &'static str = "trips";
    const FIELDS: &'static [&'static str] = &[
        "id",
        "driver_id",
        "route_id",
        "departure_at",
        "seats_total",
        "price_cents",
        "status",
    ];

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn assign_id(&mut self, id: EntityId) {
        self.id = Some(id);
    }
}
