//! Route entity: an origin/destination pair shared by many trips.

use crate::model::entity::{Entity, EntityId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub id: Option<EntityId>,
    pub origin: String,
    pub destination: String,
    pub distance_km: f64,
    pub duration_minutes: u32,
}

impl Route {
    pub fn new(
        origin: impl Into<String>,
        destination: impl Into<String>,
        distance_km: f64,
        duration_minutes: u32,
    ) -> Self {
        Self {
            id: None,
            origin: origin.into(),
            destination: destination.into(),
            distance_km,
            duration_minutes,
        }
    }
}

impl Entity for Route {
    const NAME: &'static str = "route";
    const COLLECTION: &'static str = "routes";
    const FIELDS: &'static [&'static str] = &[
        "id",
        "origin",
        "destination",
        "distance_km",
        "duration_minutes",
    ];

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn assign_id(&mut self, id: EntityId) {
        self.id = Some(id);
    }
}
