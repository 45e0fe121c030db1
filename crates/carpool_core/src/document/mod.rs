//! Document backend: one key-value document per entity.
//!
//! # Responsibility
//! - Map entities to documents and back, translating the backend surrogate
//!   key (`_id`) to and from the domain string identifier (`id`).
//! - Provide CRUD over one collection handle per entity type.
//!
//! # Invariants
//! - Callers only ever see the domain `id`; `_id` exists only inside the
//!   collection.
//! - At every boundary crossing exactly one of `_id` / `id` is populated.
//! - Malformed identifiers are rejected before the collection is touched.

mod collection;
mod key;
mod memory;
mod sqlite;
mod store;

pub use collection::{
    matches_filter, CollectionError, CollectionResult, Document, DocumentCollection,
    SURROGATE_KEY,
};
pub use key::DocumentKey;
pub use memory::MemoryCollection;
pub use sqlite::SqliteCollection;
pub use store::{DocumentStore, DocumentStores, DOMAIN_ID_KEY};
