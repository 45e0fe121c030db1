//! In-process document collection.

use super::collection::surrogate_key_of;
use super::{matches_filter, CollectionError, CollectionResult, Document, DocumentCollection};
use super::DocumentKey;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

/// Insertion-ordered documents behind a mutex.
#[derive(Debug, Default)]
pub struct MemoryCollection {
    name: String,
    documents: Mutex<Vec<(DocumentKey, Document)>>,
    operations: AtomicU64,
}

impl MemoryCollection {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            documents: Mutex::new(Vec::new()),
            operations: AtomicU64::new(0),
        }
    }

    /// Number of calls that reached this collection.
    pub fn operation_count(&self) -> u64 {
        self.operations.load(Ordering::Relaxed)
    }

    fn lock(&self) -> CollectionResult<MutexGuard<'_, Vec<(DocumentKey, Document)>>> {
        self.operations.fetch_add(1, Ordering::Relaxed);
        self.documents.lock().map_err(|_| CollectionError::Poisoned)
    }
}

impl DocumentCollection for MemoryCollection {
    fn name(&self) -> &str {
        &self.name
    }

    fn insert_one(&self, doc: &Document) -> CollectionResult<DocumentKey> {
        let key = surrogate_key_of(doc)?;
        let mut documents = self.lock()?;
        if documents.iter().any(|(existing, _)| *existing == key) {
            return Err(CollectionError::DuplicateKey(key));
        }
        documents.push((key, doc.clone()));
        Ok(key)
    }

    fn find_one(&self, key: &DocumentKey) -> CollectionResult<Option<Document>> {
        let documents = self.lock()?;
        Ok(documents
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, doc)| doc.clone()))
    }

    fn find(&self, filter: &Document) -> CollectionResult<Vec<Document>> {
        let documents = self.lock()?;
        Ok(documents
            .iter()
            .filter(|(_, doc)| matches_filter(doc, filter))
            .map(|(_, doc)| doc.clone())
            .collect())
    }

    fn replace_one(&self, key: &DocumentKey, doc: &Document) -> CollectionResult<u64> {
        let mut documents = self.lock()?;
        match documents.iter_mut().find(|(existing, _)| existing == key) {
            Some((_, stored)) => {
                *stored = doc.clone();
                Ok(1)
            }
            None => Ok(0),
        }
    }

    fn delete_one(&self, key: &DocumentKey) -> CollectionResult<u64> {
        let mut documents = self.lock()?;
        let before = documents.len();
        documents.retain(|(existing, _)| existing != key);
        Ok((before - documents.len()) as u64)
    }
}
