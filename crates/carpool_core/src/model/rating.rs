//! Rating entity: a passenger's score for a completed trip.

use crate::model::entity::{Entity, EntityId};
use serde::{Deserialize, Serialize};

pub const MIN_SCORE: u8 = 1;
pub const MAX_SCORE: u8 = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rating {
    pub id: Option<EntityId>,
    pub user_id: EntityId,
    pub trip_id: EntityId,
    /// `MIN_SCORE..=MAX_SCORE`; enforced by the relational schema only.
    pub score: u8,
    pub comment: Option<String>,
}

impl Rating {
    pub fn new(user_id: impl Into<EntityId>, trip_id: impl Into<EntityId>, score: u8) -> Self {
        Self {
            id: None,
            user_id: user_id.into(),
            trip_id: trip_id.into(),
            score,
            comment: None,
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

impl Entity for Rating {
    const NAME: &'static str = "rating";
    const COLLECTION: &'static str = "ratings";
    const FIELDS: &'static [&'static str] = &["id", "user_id", "trip_id", "score", "comment"];
    const OPTIONAL_TEXT_FIELDS: &'static [&'static str] = &["comment"];

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn assign_id(&mut self, id: EntityId) {
        self.id = Some(id);
    }
}
