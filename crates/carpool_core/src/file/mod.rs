//! Flat-file backends: one file holds one whole entity collection.
//!
//! # Responsibility
//! - Persist any `Entity` collection as a tabular (CSV) or markup (XML) file.
//! - Provide find/update/delete on top of whole-collection read and rewrite.
//!
//! # Invariants
//! - The file always holds a well-formed, possibly empty collection once
//!   initialized; it is created lazily on first access.
//! - Every mutation is a full read-modify-rewrite of the file. There is no
//!   cross-process locking: concurrent writers race and the last rewrite wins.
//! - Lookups that miss never trigger a write.

mod csv_format;
mod record_store;
mod stores;
mod xml_format;

pub use csv_format::CsvFormat;
pub use record_store::FileRecordStore;
pub use stores::{collection_path, FileStores};
pub use xml_format::XmlFormat;

use crate::error::{Backend, Cause};
use crate::model::entity::Entity;

/// Serialization of a whole entity collection to and from file bytes.
pub trait FileFormat {
    const BACKEND: Backend;
    /// File extension without the dot.
    const EXTENSION: &'static str;

    /// Encodes a collection. An empty slice must still yield a well-formed file.
    fn encode<T: Entity>(items: &[T]) -> Result<Vec<u8>, Cause>;

    /// Decodes a collection. Empty (or whitespace-only) input is an empty collection.
    fn decode<T: Entity>(bytes: &[u8]) -> Result<Vec<T>, Cause>;

    /// Rejects an entity this format cannot store without loss.
    fn check<T: Entity>(_item: &T) -> Result<(), String> {
        Ok(())
    }
}

pub type CsvStore<T> = FileRecordStore<T, CsvFormat>;
pub type XmlStore<T> = FileRecordStore<T, XmlFormat>;
