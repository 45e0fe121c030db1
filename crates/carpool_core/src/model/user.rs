//! User account entity.

use crate::model::entity::{Entity, EntityId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Option<EntityId>,
    pub first_name: String,
    pub last_name: String,
    /// Unique across users in the relational backend.
    pub email: String,
    /// Already-hashed password; hashing is the caller's concern.
    pub password_hash: String,
    pub phone: Option<String>,
}

impl User {
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            first_name: first_name.into(),
            last_name: last_name.into(),
            email: email.into(),
            password_hash: password_hash.into(),
            phone: None,
        }
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

impl Entity for User {
    const NAME: &'static str = "user";
    const COLLECTION: &'static str = "users";
    const FIELDS: &'static [&'static str] = &[
        "id",
        "first_name",
        "last_name",
        "email",
        "password_hash",
        "phone",
    ];
    const OPTIONAL_TEXT_FIELDS: &'static [&'static str] = &["phone"];

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn assign_id(&mut self, id: EntityId) {
        self.id = Some(id);
    }
}
