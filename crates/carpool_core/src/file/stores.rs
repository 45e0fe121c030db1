//! All entity collections of one data directory, in one file format.

use super::{FileFormat, FileRecordStore};
use crate::error::StoreResult;
use crate::model::booking::Booking;
use crate::model::entity::Entity;
use crate::model::rating::Rating;
use crate::model::route::Route;
use crate::model::trip::Trip;
use crate::model::user::User;
use log::info;
use std::path::{Path, PathBuf};

/// The five entity stores laid out as `<dir>/<collection>.<ext>`.
#[derive(Debug)]
pub struct FileStores<F> {
    pub users: FileRecordStore<User, F>,
    pub routes: FileRecordStore<Route, F>,
    pub trips: FileRecordStore<Trip, F>,
    pub bookings: FileRecordStore<Booking, F>,
    pub ratings: FileRecordStore<Rating, F>,
}

impl<F: FileFormat> FileStores<F> {
    /// Opens (and lazily creates) every collection file under `dir`.
    pub fn open(dir: impl AsRef<Path>) -> StoreResult<Self> {
        let dir = dir.as_ref();
        let stores = Self {
            users: FileRecordStore::open(collection_path::<User, F>(dir))?,
            routes: FileRecordStore::open(collection_path::<Route, F>(dir))?,
            trips: FileRecordStore::open(collection_path::<Trip, F>(dir))?,
            bookings: FileRecordStore::open(collection_path::<Booking, F>(dir))?,
            ratings: FileRecordStore::open(collection_path::<Rating, F>(dir))?,
        };
        info!(
            "event=file_stores_open module=file status=ok backend={} dir={}",
            F::BACKEND,
            dir.display()
        );
        Ok(stores)
    }

    /// Record count per collection, in `(collection, count)` pairs.
    pub fn record_counts(&self) -> StoreResult<Vec<(&'static str, usize)>> {
        Ok(vec![
            (User::COLLECTION, self.users.read_all()?.len()),
            (Route::COLLECTION, self.routes.read_all()?.len()),
            (Trip::COLLECTION, self.trips.read_all()?.len()),
            (Booking::COLLECTION, self.bookings.read_all()?.len()),
            (Rating::COLLECTION, self.ratings.read_all()?.len()),
        ])
    }
}

/// File path for the collection of `T` in format `F` under `dir`.
pub fn collection_path<T: Entity, F: FileFormat>(dir: &Path) -> PathBuf {
    dir.join(format!("{}.{}", T::COLLECTION, F::EXTENSION))
}
