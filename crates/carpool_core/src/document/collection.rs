//! Collection handle contract implemented by every document engine.

use super::DocumentKey;
use serde_json::{Map, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// A document as stored: a JSON object.
pub type Document = Map<String, Value>;

/// Field holding the surrogate key inside the collection.
pub const SURROGATE_KEY: &str = "_id";

pub type CollectionResult<T> = Result<T, CollectionError>;

/// Raw failure reported by a document engine.
#[derive(Debug)]
pub enum CollectionError {
    Sqlite(rusqlite::Error),
    DuplicateKey(DocumentKey),
    /// Stored bytes are not a JSON object with a valid `_id`.
    Corrupt(String),
    /// The collection lock was poisoned by a panicking writer.
    Poisoned,
}

impl Display for CollectionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::DuplicateKey(key) => write!(f, "duplicate document key {key}"),
            Self::Corrupt(message) => write!(f, "corrupt document: {message}"),
            Self::Poisoned => write!(f, "collection lock poisoned"),
        }
    }
}

impl Error for CollectionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for CollectionError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

/// Handle to one named document collection.
///
/// Documents passed in and returned always carry `_id` as a hex string.
/// No method offers multi-document atomicity.
pub trait DocumentCollection {
    fn name(&self) -> &str;

    /// Stores a new document. `_id` must already be set.
    fn insert_one(&self, doc: &Document) -> CollectionResult<DocumentKey>;

    fn find_one(&self, key: &DocumentKey) -> CollectionResult<Option<Document>>;

    /// Documents whose fields equal every field of `filter`, in insertion order.
    fn find(&self, filter: &Document) -> CollectionResult<Vec<Document>>;

    /// Replaces the document with `key`. Returns the matched count (0 or 1).
    fn replace_one(&self, key: &DocumentKey, doc: &Document) -> CollectionResult<u64>;

    /// Deletes the document with `key`. Returns the deleted count (0 or 1).
    fn delete_one(&self, key: &DocumentKey) -> CollectionResult<u64>;

    fn count(&self, filter: &Document) -> CollectionResult<u64> {
        Ok(self.find(filter)?.len() as u64)
    }
}

/// Equality match of every `filter` field against `doc`.
pub fn matches_filter(doc: &Document, filter: &Document) -> bool {
    filter
        .iter()
        .all(|(field, expected)| doc.get(field) == Some(expected))
}

/// Reads the `_id` of a stored document.
pub(crate) fn surrogate_key_of(doc: &Document) -> CollectionResult<DocumentKey> {
    doc.get(SURROGATE_KEY)
        .and_then(Value::as_str)
        .and_then(DocumentKey::parse_str)
        .ok_or_else(|| CollectionError::Corrupt(format!("missing or invalid `{SURROGATE_KEY}`")))
}
