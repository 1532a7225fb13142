//! services/client/src/adapters/store.rs
//!
//! This module contains the persisted preference store, the concrete
//! implementation of the `PreferenceStore` port. Preferences live in a
//! small JSON file of flat string keys; a sibling process writing the
//! same file is surfaced to observers through [`JsonFileStore::refresh`].

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use campus_assistant_core::ports::{PortError, PortResult, PreferenceStore, StoreObserver};
use tracing::warn;

type PrefMap = BTreeMap<String, String>;

/// A file-backed preference store.
///
/// Local mutations persist immediately and do not notify observers;
/// observers exist for changes made by another execution context, which
/// are detected when `refresh` re-reads the backing file.
pub struct JsonFileStore {
    path: PathBuf,
    inner: Mutex<PrefMap>,
    observers: Mutex<Vec<StoreObserver>>,
}

impl JsonFileStore {
    /// Opens the store, loading any existing backing file.
    ///
    /// A corrupt file is logged and treated as empty rather than making
    /// the client unusable.
    pub fn open(path: impl Into<PathBuf>) -> PortResult<Self> {
        let path = path.into();
        let initial = match std::fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<PrefMap>(&raw) {
                Ok(map) => map,
                Err(e) => {
                    warn!("Preference file {} is corrupt ({}); starting empty.", path.display(), e);
                    PrefMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => PrefMap::new(),
            Err(e) => return Err(PortError::Unexpected(e.to_string())),
        };

        Ok(Self {
            path,
            inner: Mutex::new(initial),
            observers: Mutex::new(Vec::new()),
        })
    }

    /// Re-reads the backing file and notifies observers of every key whose
    /// value changed outside this store instance. Returns the changed keys.
    pub fn refresh(&self) -> PortResult<Vec<String>> {
        let fresh = match std::fs::read_to_string(&self.path) {
            Ok(raw) => serde_json::from_str::<PrefMap>(&raw)
                .map_err(|e| PortError::Unexpected(e.to_string()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => PrefMap::new(),
            Err(e) => return Err(PortError::Unexpected(e.to_string())),
        };

        let changed: Vec<String> = {
            let mut map = self.lock_map()?;
            let mut keys = Vec::new();
            for (key, value) in map.iter() {
                if fresh.get(key) != Some(value) {
                    keys.push(key.clone());
                }
            }
            for key in fresh.keys() {
                if !map.contains_key(key) {
                    keys.push(key.clone());
                }
            }
            *map = fresh;
            keys
        };

        for key in &changed {
            self.notify(key);
        }
        Ok(changed)
    }

    fn persist(&self, map: &PrefMap) -> PortResult<()> {
        let raw = serde_json::to_string_pretty(map)
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        std::fs::write(&self.path, raw).map_err(|e| PortError::Unexpected(e.to_string()))
    }

    fn lock_map(&self) -> PortResult<MutexGuard<'_, PrefMap>> {
        self.inner
            .lock()
            .map_err(|_| PortError::Unexpected("preference store lock poisoned".to_string()))
    }

    fn notify(&self, key: &str) {
        if let Ok(observers) = self.observers.lock() {
            for observer in observers.iter() {
                observer(key);
            }
        }
    }
}

impl PreferenceStore for JsonFileStore {
    fn get(&self, key: &str) -> PortResult<Option<String>> {
        Ok(self.lock_map()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> PortResult<()> {
        let mut map = self.lock_map()?;
        map.insert(key.to_string(), value.to_string());
        self.persist(&map)
    }

    fn remove(&self, key: &str) -> PortResult<()> {
        let mut map = self.lock_map()?;
        if map.remove(key).is_some() {
            self.persist(&map)?;
        }
        Ok(())
    }

    fn subscribe(&self, observer: StoreObserver) {
        if let Ok(mut observers) = self.observers.lock() {
            observers.push(observer);
        }
    }
}

//=========================================================================================
// Tests
//=========================================================================================
