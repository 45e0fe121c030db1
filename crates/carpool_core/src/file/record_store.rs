//! Generic whole-collection file store.

use super::FileFormat;
use crate::error::{Cause, StoreError, StoreResult};
use crate::model::entity::{Entity, EntityId};
use log::{debug, error};
use std::fs;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::time::Instant;
use uuid::Uuid;

/// One entity collection persisted in one file.
///
/// Construction is free of I/O; the file is created on the first call that
/// touches it (or eagerly through `open`).
pub struct FileRecordStore<T, F> {
    path: PathBuf,
    _marker: PhantomData<fn() -> (T, F)>,
}

impl<T: Entity, F: FileFormat> FileRecordStore<T, F> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _marker: PhantomData,
        }
    }

    /// Creates a store and its backing file if it does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let store = Self::new(path);
        store.initialize()?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes an empty well-formed collection when the file is missing.
    ///
    /// Idempotent: an existing file is left untouched, whatever its content.
    pub fn initialize(&self) -> StoreResult<()> {
        if self.path.exists() {
            return Ok(());
        }

        let result = (|| -> Result<(), Cause> {
            if let Some(parent) = self.path.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent)?;
                }
            }
            fs::write(&self.path, F::encode::<T>(&[])?)?;
            Ok(())
        })();

        match result {
            Ok(()) => {
                debug!(
                    "event=file_init module=file status=ok backend={} entity={}",
                    F::BACKEND,
                    T::NAME
                );
                Ok(())
            }
            Err(source) => {
                error!(
                    "event=file_init module=file status=error backend={} entity={} error={}",
                    F::BACKEND,
                    T::NAME,
                    source
                );
                Err(StoreError::StorageInit {
                    entity: T::NAME,
                    path: self.path.clone(),
                    source,
                })
            }
        }
    }

    /// Loads the whole collection in file order.
    pub fn read_all(&self) -> StoreResult<Vec<T>> {
        self.initialize()?;
        let started_at = Instant::now();

        let bytes = fs::read(&self.path).map_err(|err| self.read_error(err.into()))?;
        let items = F::decode::<T>(&bytes).map_err(|err| self.read_error(err))?;

        debug!(
            "event=file_read module=file status=ok backend={} entity={} records={} duration_ms={}",
            F::BACKEND,
            T::NAME,
            items.len(),
            started_at.elapsed().as_millis()
        );
        Ok(items)
    }

    /// Replaces the whole file content with `items`.
    pub fn write_all(&self, items: &[T]) -> StoreResult<()> {
        let started_at = Instant::now();

        let bytes = F::encode(items).map_err(|err| self.write_error(err))?;
        fs::write(&self.path, bytes).map_err(|err| self.write_error(err.into()))?;

        debug!(
            "event=file_write module=file status=ok backend={} entity={} records={} duration_ms={}",
            F::BACKEND,
            T::NAME,
            items.len(),
            started_at.elapsed().as_millis()
        );
        Ok(())
    }

    /// Assigns a fresh UUID, appends the entity and returns the identifier.
    pub fn create(&self, entity: &T) -> StoreResult<EntityId> {
        if let Some(existing) = entity.id() {
            return Err(StoreError::InvalidIdentifier {
                entity: T::NAME,
                value: existing.to_string(),
            });
        }

        F::check(entity).map_err(|message| StoreError::mapping(T::NAME, message))?;

        let mut items = self.read_all()?;
        let id = Uuid::new_v4().to_string();
        let mut stored = entity.clone();
        stored.assign_id(id.clone());
        items.push(stored);
        self.write_all(&items)?;
        Ok(id)
    }

    pub fn find_by_id(&self, id: &str) -> StoreResult<Option<T>> {
        Ok(self
            .read_all()?
            .into_iter()
            .find(|item| item.id() == Some(id)))
    }

    /// Removes the entity with `id`. Returns `false` (and writes nothing) on a miss.
    pub fn delete_by_id(&self, id: &str) -> StoreResult<bool> {
        let mut items = self.read_all()?;
        let before = items.len();
        items.retain(|item| item.id() != Some(id));
        if items.len() == before {
            return Ok(false);
        }
        self.write_all(&items)?;
        Ok(true)
    }

    /// Applies `mutate` to the entity with `id` and rewrites the file.
    ///
    /// The identifier is restored after `mutate` runs. Returns `false` (and
    /// writes nothing) on a miss.
    pub fn update_by_id(&self, id: &str, mutate: impl FnOnce(&mut T)) -> StoreResult<bool> {
        let mut items = self.read_all()?;
        let Some(target) = items.iter_mut().find(|item| item.id() == Some(id)) else {
            return Ok(false);
        };
        mutate(target);
        target.assign_id(id.to_string());
        F::check(target).map_err(|message| StoreError::mapping(T::NAME, message))?;
        self.write_all(&items)?;
        Ok(true)
    }

    /// Replaces the stored entity carrying the same identifier.
    pub fn update(&self, entity: &T) -> StoreResult<()> {
        let id = entity.id().ok_or_else(|| StoreError::InvalidIdentifier {
            entity: T::NAME,
            value: String::new(),
        })?;
        let replacement = entity.clone();
        if self.update_by_id(id, |current| *current = replacement)? {
            Ok(())
        } else {
            Err(StoreError::not_found(T::NAME, id))
        }
    }

    fn read_error(&self, source: Cause) -> StoreError {
        error!(
            "event=file_read module=file status=error backend={} entity={} error={}",
            F::BACKEND,
            T::NAME,
            source
        );
        StoreError::StorageRead {
            entity: T::NAME,
            path: self.path.clone(),
            source,
        }
    }

    fn write_error(&self, source: Cause) -> StoreError {
        error!(
            "event=file_write module=file status=error backend={} entity={} error={}",
            F::BACKEND,
            T::NAME,
            source
        );
        StoreError::StorageWrite {
            entity: T::NAME,
            path: self.path.clone(),
            source,
        }
    }
}

impl<T, F> std::fmt::Debug for FileRecordStore<T, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileRecordStore")
            .field("path", &self.path)
            .finish()
    }
}
