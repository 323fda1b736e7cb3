//! Typed repositories over the named collections.
//!
//! Every repository does a full read-modify-write of its collection per call.
//! Callers go through [`Store`]; nothing outside this crate touches the
//! key-value store directly.

mod clients;
mod communications;
mod jobs;
mod photos;
mod templates;
mod time_entries;

pub use clients::ClientRepo;
pub use communications::CommunicationRepo;
pub use jobs::JobRepo;
pub use photos::PhotoRepo;
pub use templates::TemplateRepo;
pub use time_entries::TimeEntryRepo;

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;

use crate::error::Result;
use crate::models::{Client, Communication, Job, MessageTemplate, Photo, TimeEntry};
use crate::storage::{Collection, KeyValueStore, Storage};
use crate::sync::ClientSync;

/// An entity stored in its own collection and identified by id.
pub trait Record: Serialize + DeserializeOwned {
    const COLLECTION: Collection;

    fn id(&self) -> &str;

    /// Stamp a replaced record. Entities without `updatedAt` keep the default.
    fn touch(&mut self, _now: &str) {}
}

impl Record for Job {
    const COLLECTION: Collection = Collection::Jobs;

    fn id(&self) -> &str {
        &self.id
    }

    fn touch(&mut self, now: &str) {
        self.updated_at = now.to_string();
    }
}

impl Record for TimeEntry {
    const COLLECTION: Collection = Collection::TimeEntries;

    fn id(&self) -> &str {
        &self.id
    }
}

impl Record for Photo {
    const COLLECTION: Collection = Collection::Photos;

    fn id(&self) -> &str {
        &self.id
    }
}

impl Record for Client {
    const COLLECTION: Collection = Collection::Clients;

    fn id(&self) -> &str {
        &self.id
    }

    fn touch(&mut self, now: &str) {
        self.updated_at = now.to_string();
    }
}

impl Record for Communication {
    const COLLECTION: Collection = Collection::Communications;

    fn id(&self) -> &str {
        &self.id
    }
}

impl Record for MessageTemplate {
    const COLLECTION: Collection = Collection::MessageTemplates;

    fn id(&self) -> &str {
        &self.id
    }

    fn touch(&mut self, now: &str) {
        self.updated_at = now.to_string();
    }
}

pub(crate) fn all<T: Record>(storage: &Storage) -> Vec<T> {
    storage.load(T::COLLECTION)
}

pub(crate) fn find<T: Record>(storage: &Storage, id: &str) -> Option<T> {
    all::<T>(storage).into_iter().find(|r| r.id() == id)
}

/// Replace the record with the same id, or append it. Returns what was stored.
pub(crate) fn upsert<T: Record + Clone>(storage: &Storage, mut record: T) -> Result<T> {
    storage.update(T::COLLECTION, |records: &mut Vec<T>| {
        match records.iter().position(|r| r.id() == record.id()) {
            Some(idx) => {
                record.touch(&crate::models::now());
                records[idx] = record.clone();
            }
            None => records.push(record.clone()),
        }
        record
    })
}

/// Remove the record with this id. Returns whether anything was removed.
pub(crate) fn remove<T: Record>(storage: &Storage, id: &str) -> Result<bool> {
    remove_where::<T, _>(storage, |r| r.id() == id).map(|n| n > 0)
}

/// Remove every record matching the predicate. Returns how many went.
pub(crate) fn remove_where<T, P>(storage: &Storage, pred: P) -> Result<usize>
where
    T: Record,
    P: Fn(&T) -> bool,
{
    storage.update(T::COLLECTION, |records: &mut Vec<T>| {
        let before = records.len();
        records.retain(|r| !pred(r));
        before - records.len()
    })
}

/// Entry point for callers: owns the storage and hands out repositories.
#[derive(Clone)]
pub struct Store {
    storage: Arc<Storage>,
}

impl Store {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self {
            storage: Arc::new(Storage::new(backend)),
        }
    }

    pub fn in_memory() -> Self {
        Self {
            storage: Arc::new(Storage::in_memory()),
        }
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn jobs(&self) -> JobRepo<'_> {
        JobRepo::new(&self.storage)
    }

    pub fn time_entries(&self) -> TimeEntryRepo<'_> {
        TimeEntryRepo::new(&self.storage)
    }

    pub fn photos(&self) -> PhotoRepo<'_> {
        PhotoRepo::new(&self.storage)
    }

    pub fn clients(&self) -> ClientRepo<'_> {
        ClientRepo::new(&self.storage)
    }

    pub fn communications(&self) -> CommunicationRepo<'_> {
        CommunicationRepo::new(&self.storage)
    }

    pub fn templates(&self) -> TemplateRepo<'_> {
        TemplateRepo::new(&self.storage)
    }

    pub fn sync(&self) -> ClientSync<'_> {
        ClientSync::new(&self.storage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PhotoType;

    #[test]
    fn test_upsert_replaces_in_place() {
        let store = Store::in_memory();
        let first = Photo::new("j1", PhotoType::Before, "a.jpg");
        let second = Photo::new("j1", PhotoType::After, "b.jpg");
        upsert(store.storage(), first.clone()).unwrap();
        upsert(store.storage(), second.clone()).unwrap();

        let mut edited = first.clone();
        edited.description = Some("kitchen".into());
        upsert(store.storage(), edited).unwrap();

        let photos: Vec<Photo> = all(store.storage());
        assert_eq!(photos.len(), 2);
        assert_eq!(photos[0].id, first.id);
        assert_eq!(photos[0].description.as_deref(), Some("kitchen"));
        assert_eq!(photos[1].id, second.id);
    }

    #[test]
    fn test_remove_missing_id_is_noop() {
        let store = Store::in_memory();
        upsert(store.storage(), Photo::new("j1", PhotoType::Issue, "x.jpg")).unwrap();
        assert!(!remove::<Photo>(store.storage(), "nope").unwrap());
        assert_eq!(all::<Photo>(store.storage()).len(), 1);
    }
}
