//! Collection-level persistence over a pluggable key-value store.
//!
//! Every entity collection lives under one fixed key as a JSON array.
//! Reads are fail-soft: a missing or corrupted collection reads as empty so a
//! single bad value cannot take the whole application down. Writes are not:
//! a failed write is logged and handed back to the caller.

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::{Error, Result};

pub type BackendError = Box<dyn std::error::Error + Send + Sync>;

/// Synchronous string key-value store the collections are persisted in.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> std::result::Result<Option<String>, BackendError>;
    fn set(&self, key: &str, value: &str) -> std::result::Result<(), BackendError>;
    fn remove(&self, key: &str) -> std::result::Result<(), BackendError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Jobs,
    TimeEntries,
    Photos,
    Clients,
    Communications,
    MessageTemplates,
}

const COLLECTION_COUNT: usize = 6;

impl Collection {
    pub const ALL: [Collection; COLLECTION_COUNT] = [
        Collection::Jobs,
        Collection::TimeEntries,
        Collection::Photos,
        Collection::Clients,
        Collection::Communications,
        Collection::MessageTemplates,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Collection::Jobs => "fachowiec_jobs",
            Collection::TimeEntries => "fachowiec_time_entries",
            Collection::Photos => "fachowiec_photos",
            Collection::Clients => "fachowiec_clients",
            Collection::Communications => "fachowiec_communications",
            Collection::MessageTemplates => "fachowiec_message_templates",
        }
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

/// In-process store. Optionally enforces a byte quota across all keys, the
/// way browser storage does.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
    quota: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(bytes: usize) -> Self {
        Self {
            entries: Mutex::default(),
            quota: Some(bytes),
        }
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> std::result::Result<Option<String>, BackendError> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> std::result::Result<(), BackendError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(quota) = self.quota {
            let used: usize = entries
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            if used + key.len() + value.len() > quota {
                return Err(format!("storage quota of {} bytes exceeded", quota).into());
            }
        }
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> std::result::Result<(), BackendError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key);
        Ok(())
    }
}

/// Typed access to the named collections of a [`KeyValueStore`].
///
/// Each collection has its own lock; [`Storage::update`] holds it across the
/// whole read-modify-write.
pub struct Storage {
    backend: Arc<dyn KeyValueStore>,
    locks: [Mutex<()>; COLLECTION_COUNT],
}

impl Storage {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self {
            backend,
            locks: Default::default(),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    pub fn backend(&self) -> &Arc<dyn KeyValueStore> {
        &self.backend
    }

    /// Read a whole collection. Never fails.
    pub fn load<T: DeserializeOwned>(&self, collection: Collection) -> Vec<T> {
        let key = collection.key();
        let raw = match self.backend.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                log::error!("Error reading from storage ({}): {}", key, e);
                return Vec::new();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(records) => records,
            Err(e) => {
                log::warn!("Discarding malformed collection ({}): {}", key, e);
                Vec::new()
            }
        }
    }

    /// Overwrite a whole collection.
    pub fn store<T: Serialize>(&self, collection: Collection, records: &[T]) -> Result<()> {
        let key = collection.key();
        let encoded = serde_json::to_string(records).map_err(|source| {
            log::error!("Error encoding collection ({}): {}", key, source);
            Error::Serialize {
                collection: key.to_string(),
                source,
            }
        })?;

        self.backend.set(key, &encoded).map_err(|e| {
            log::error!("Error saving to storage ({}): {}", key, e);
            Error::Storage {
                collection: key.to_string(),
                reason: e.to_string(),
            }
        })
    }

    /// Load, mutate and store a collection while holding its lock.
    pub fn update<T, R, F>(&self, collection: Collection, f: F) -> Result<R>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(&mut Vec<T>) -> R,
    {
        let _guard = self.locks[collection.index()]
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let mut records = self.load(collection);
        let out = f(&mut records);
        self.store(collection, &records)?;
        Ok(out)
    }

    /// Drop a collection entirely.
    pub fn clear(&self, collection: Collection) -> Result<()> {
        let _guard = self.locks[collection.index()]
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        self.backend.remove(collection.key()).map_err(|e| Error::Storage {
            collection: collection.key().to_string(),
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_load_missing_key_is_empty() {
        let storage = Storage::in_memory();
        let jobs: Vec<serde_json::Value> = storage.load(Collection::Jobs);
        assert!(jobs.is_empty());
    }

    #[test]
    fn test_load_malformed_value_is_empty() {
        let backend = Arc::new(MemoryStore::new());
        backend.set("fachowiec_photos", "{not json").unwrap();
        let storage = Storage::new(backend);

        let photos: Vec<serde_json::Value> = storage.load(Collection::Photos);
        assert!(photos.is_empty());
    }

    #[test]
    fn test_store_then_load() {
        let storage = Storage::in_memory();
        let records = vec![json!({"id": "1"}), json!({"id": "2"})];
        storage.store(Collection::Clients, &records).unwrap();

        let loaded: Vec<serde_json::Value> = storage.load(Collection::Clients);
        assert_eq!(loaded, records);

        let raw = storage.backend().get("fachowiec_clients").unwrap().unwrap();
        assert!(raw.starts_with('['));
    }

    #[test]
    fn test_quota_failure_is_returned() {
        let storage = Storage::new(Arc::new(MemoryStore::with_quota(64)));
        let big = vec![json!({"id": "x".repeat(100)})];

        let err = storage.store(Collection::Jobs, &big).unwrap_err();
        assert!(err.is_write_failure());

        // The previous (absent) value is untouched.
        let loaded: Vec<serde_json::Value> = storage.load(Collection::Jobs);
        assert!(loaded.is_empty());
    }

    #[test]
    fn test_update_serializes_writers() {
        let storage = Arc::new(Storage::in_memory());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let storage = Arc::clone(&storage);
                std::thread::spawn(move || {
                    for j in 0..25 {
                        storage
                            .update(Collection::TimeEntries, |items: &mut Vec<serde_json::Value>| {
                                items.push(json!({"id": format!("{}-{}", i, j)}))
                            })
                            .unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let items: Vec<serde_json::Value> = storage.load(Collection::TimeEntries);
        assert_eq!(items.len(), 200);
    }

    #[test]
    fn test_clear_removes_collection() {
        let storage = Storage::in_memory();
        storage.store(Collection::Photos, &[json!({"id": "p"})]).unwrap();
        storage.clear(Collection::Photos).unwrap();
        assert!(storage.load::<serde_json::Value>(Collection::Photos).is_empty());
    }
}
