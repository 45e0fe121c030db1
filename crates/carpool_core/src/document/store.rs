//! Entity <-> document mapping and CRUD over one collection.

use super::{
    CollectionError, Document, DocumentCollection, DocumentKey, MemoryCollection,
    SqliteCollection, SURROGATE_KEY,
};
use crate::db::classify_sqlite_error;
use crate::error::{ConstraintKind, DataAccessKind, StoreError, StoreResult};
use crate::model::booking::Booking;
use crate::model::entity::{Entity, EntityId};
use crate::model::rating::Rating;
use crate::model::route::Route;
use crate::model::trip::Trip;
use crate::model::user::User;
use log::{debug, error};
use rusqlite::Connection;
use serde_json::Value;
use std::marker::PhantomData;

/// Field holding the domain identifier outside the collection.
pub const DOMAIN_ID_KEY: &str = "id";

/// CRUD for entity `T` over collection handle `C`.
pub struct DocumentStore<T, C> {
    collection: C,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Entity, C: DocumentCollection> DocumentStore<T, C> {
    pub fn new(collection: C) -> Self {
        Self {
            collection,
            _marker: PhantomData,
        }
    }

    pub fn collection(&self) -> &C {
        &self.collection
    }

    /// Serializes `entity` to a document.
    ///
    /// `id` is omitted when the entity has not been assigned one yet.
    pub fn to_document(entity: &T) -> StoreResult<Document> {
        let value = serde_json::to_value(entity)
            .map_err(|err| StoreError::mapping(T::NAME, err.to_string()))?;
        let Value::Object(mut doc) = value else {
            return Err(StoreError::mapping(
                T::NAME,
                "entity does not serialize to a key-value document",
            ));
        };
        if doc.get(DOMAIN_ID_KEY).is_some_and(Value::is_null) {
            doc.remove(DOMAIN_ID_KEY);
        }
        Ok(doc)
    }

    /// Rebuilds an entity from a stored document.
    ///
    /// Moves `_id` (hex string) into `id`. Fails with `Mapping` when `_id` is
    /// missing or mistyped, when `id` is also present, or when a required
    /// field is missing or mistyped.
    pub fn from_document(mut doc: Document) -> StoreResult<T> {
        let key = match doc.remove(SURROGATE_KEY) {
            Some(Value::String(text)) => DocumentKey::parse_str(&text).ok_or_else(|| {
                StoreError::mapping(T::NAME, format!("`{SURROGATE_KEY}` is not a document key: `{text}`"))
            })?,
            Some(other) => {
                return Err(StoreError::mapping(
                    T::NAME,
                    format!("`{SURROGATE_KEY}` must be a hex string, found `{other}`"),
                ));
            }
            None => {
                return Err(StoreError::mapping(
                    T::NAME,
                    format!("document has no `{SURROGATE_KEY}`"),
                ));
            }
        };
        if doc.contains_key(DOMAIN_ID_KEY) {
            return Err(StoreError::mapping(
                T::NAME,
                format!("document carries both `{SURROGATE_KEY}` and `{DOMAIN_ID_KEY}`"),
            ));
        }

        doc.insert(DOMAIN_ID_KEY.to_string(), Value::String(key.to_hex()));
        serde_json::from_value(Value::Object(doc))
            .map_err(|err| StoreError::mapping(T::NAME, err.to_string()))
    }

    /// Stores `entity` under a new surrogate key and returns its hex form.
    pub fn create(&self, entity: &T) -> StoreResult<EntityId> {
        if let Some(existing) = entity.id() {
            return Err(StoreError::InvalidIdentifier {
                entity: T::NAME,
                value: existing.to_string(),
            });
        }

        let key = DocumentKey::generate();
        let doc = Self::into_storage(Self::to_document(entity)?, key);
        let stored = self
            .collection
            .insert_one(&doc)
            .map_err(|err| self.backend_error("create", err))?;
        debug!(
            "event=doc_create module=document status=ok entity={} collection={}",
            T::NAME,
            self.collection.name()
        );
        Ok(stored.to_hex())
    }

    pub fn get(&self, id: &str) -> StoreResult<Option<T>> {
        let key = Self::parse_key(id)?;
        match self
            .collection
            .find_one(&key)
            .map_err(|err| self.backend_error("get", err))?
        {
            Some(doc) => Ok(Some(Self::from_document(doc)?)),
            None => Ok(None),
        }
    }

    /// Every document of the collection, in insertion order.
    pub fn find_all(&self) -> StoreResult<Vec<T>> {
        self.find_where(Document::new())
    }

    /// Documents whose fields equal every field of `filter`.
    pub fn find_where(&self, filter: Document) -> StoreResult<Vec<T>> {
        self.collection
            .find(&filter)
            .map_err(|err| self.backend_error("find", err))?
            .into_iter()
            .map(Self::from_document)
            .collect()
    }

    pub fn count_where(&self, filter: Document) -> StoreResult<u64> {
        self.collection
            .count(&filter)
            .map_err(|err| self.backend_error("count", err))
    }

    /// Replaces the stored document. `NotFound` when no document matches.
    pub fn update(&self, entity: &T) -> StoreResult<()> {
        let id = entity.id().ok_or_else(|| StoreError::InvalidIdentifier {
            entity: T::NAME,
            value: String::new(),
        })?;
        let key = Self::parse_key(id)?;
        let doc = Self::into_storage(Self::to_document(entity)?, key);

        let matched = self
            .collection
            .replace_one(&key, &doc)
            .map_err(|err| self.backend_error("update", err))?;
        if matched == 0 {
            return Err(StoreError::not_found(T::NAME, id));
        }
        Ok(())
    }

    /// Deletes the document. A miss is not an error and returns `false`.
    pub fn delete(&self, id: &str) -> StoreResult<bool> {
        let key = Self::parse_key(id)?;
        let deleted = self
            .collection
            .delete_one(&key)
            .map_err(|err| self.backend_error("delete", err))?;
        Ok(deleted > 0)
    }

    fn parse_key(id: &str) -> StoreResult<DocumentKey> {
        DocumentKey::parse_str(id).ok_or_else(|| StoreError::InvalidIdentifier {
            entity: T::NAME,
            value: id.to_string(),
        })
    }

    /// Swaps the domain `id` for the surrogate `_id`.
    fn into_storage(mut doc: Document, key: DocumentKey) -> Document {
        doc.remove(DOMAIN_ID_KEY);
        doc.insert(SURROGATE_KEY.to_string(), Value::String(key.to_hex()));
        doc
    }

    fn backend_error(&self, operation: &'static str, err: CollectionError) -> StoreError {
        error!(
            "event=doc_{operation} module=document status=error entity={} collection={} error={}",
            T::NAME,
            self.collection.name(),
            err
        );
        match err {
            CollectionError::Corrupt(message) => StoreError::mapping(T::NAME, message),
            other => {
                let kind = match &other {
                    CollectionError::Sqlite(inner) => classify_sqlite_error(inner),
                    CollectionError::DuplicateKey(_) => {
                        DataAccessKind::ConstraintViolation(ConstraintKind::PrimaryKey)
                    }
                    CollectionError::Poisoned => DataAccessKind::StaleSession,
                    CollectionError::Corrupt(_) => DataAccessKind::Other,
                };
                StoreError::DataAccess {
                    entity: T::NAME,
                    operation,
                    kind,
                    source: Box::new(other),
                }
            }
        }
    }
}

/// One document store per entity type over the same collection family.
pub struct DocumentStores<C> {
    pub users: DocumentStore<User, C>,
    pub routes: DocumentStore<Route, C>,
    pub trips: DocumentStore<Trip, C>,
    pub bookings: DocumentStore<Booking, C>,
    pub ratings: DocumentStore<Rating, C>,
}

impl<C: DocumentCollection> DocumentStores<C> {
    /// Builds every store from a factory mapping a collection name to a handle.
    pub fn with_collections(mut open: impl FnMut(&'static str) -> C) -> Self {
        Self {
            users: DocumentStore::new(open(User::COLLECTION)),
            routes: DocumentStore::new(open(Route::COLLECTION)),
            trips: DocumentStore::new(open(Trip::COLLECTION)),
            bookings: DocumentStore::new(open(Booking::COLLECTION)),
            ratings: DocumentStore::new(open(Rating::COLLECTION)),
        }
    }

    /// Document count per collection, in `(collection, count)` pairs.
    pub fn document_counts(&self) -> StoreResult<Vec<(&'static str, u64)>> {
        Ok(vec![
            (User::COLLECTION, self.users.count_where(Document::new())?),
            (Route::COLLECTION, self.routes.count_where(Document::new())?),
            (Trip::COLLECTION, self.trips.count_where(Document::new())?),
            (Booking::COLLECTION, self.bookings.count_where(Document::new())?),
            (Rating::COLLECTION, self.ratings.count_where(Document::new())?),
        ])
    }
}

impl DocumentStores<MemoryCollection> {
    pub fn in_memory() -> Self {
        Self::with_collections(|name| MemoryCollection::new(name))
    }
}

impl<'conn> DocumentStores<SqliteCollection<'conn>> {
    /// Collections persisted in the `documents` table of a migrated database.
    pub fn sqlite(conn: &'conn Connection) -> Self {
        Self::with_collections(|name| SqliteCollection::new(conn, name))
    }
}
