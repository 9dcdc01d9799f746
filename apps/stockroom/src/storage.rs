//! # Local Store
//!
//! A small JSON key-value file next to the app data: the current route, its
//! history and the persisted session live here so a restart picks up where
//! the user left off.
//!
//! ## File Format
//! ```json
//! {
//!   "route": "orders/6f1c...",
//!   "route.history": ["dashboard", "orders"],
//!   "auth.session": { "access_token": "...", "refresh_token": "...", ... }
//! }
//! ```
//!
//! Every write replaces the whole file through a temporary sibling and a
//! rename, so a crash never leaves half a file behind.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tracing::{debug, warn};

/// Local store failures.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Local storage I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Local storage encoding error: {0}")]
    Encode(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// JSON key-value store, optionally backed by a file.
#[derive(Debug)]
pub struct LocalStore {
    path: Option<PathBuf>,
    data: Mutex<Map<String, Value>>,
}

impl LocalStore {
    /// Opens (or lazily creates) the store file.
    ///
    /// A missing file is an empty store. A corrupt file is logged and
    /// replaced on the next write.
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();

        let data = match std::fs::read_to_string(&path) {
            Ok(text) => match serde_json::from_str::<Map<String, Value>>(&text) {
                Ok(map) => map,
                Err(err) => {
                    warn!(?path, error = %err, "Local store is corrupt, starting empty");
                    Map::new()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Map::new(),
            Err(source) => return Err(StoreError::Io { path, source }),
        };

        debug!(?path, keys = data.len(), "Opened local store");
        Ok(LocalStore {
            path: Some(path),
            data: Mutex::new(data),
        })
    }

    /// A store that never touches the disk.
    pub fn in_memory() -> Self {
        LocalStore {
            path: None,
            data: Mutex::new(Map::new()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn data(&self) -> MutexGuard<'_, Map<String, Value>> {
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reads a key. Values that no longer decode are treated as absent.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.data().get(key).cloned()?;
        match serde_json::from_value(value) {
            Ok(decoded) => Some(decoded),
            Err(err) => {
                warn!(key, error = %err, "Ignoring undecodable local store value");
                None
            }
        }
    }

    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> StoreResult<()> {
        let value = serde_json::to_value(value)?;
        let mut data = self.data();
        data.insert(key.to_string(), value);
        self.flush(&data)
    }

    pub fn remove(&self, key: &str) -> StoreResult<()> {
        let mut data = self.data();
        if data.remove(key).is_some() {
            self.flush(&data)?;
        }
        Ok(())
    }

    fn flush(&self, data: &Map<String, Value>) -> StoreResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let io_err = |source| StoreError::Io {
            path: path.clone(),
            source,
        };

        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(io_err)?;
        }

        let tmp = path.with_extension("json.tmp");
        let text = serde_json::to_string_pretty(data)?;
        std::fs::write(&tmp, text).map_err(io_err)?;
        std::fs::rename(&tmp, path).map_err(io_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_remove_persist() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.json");

        let store = LocalStore::open(&path).unwrap();
        assert!(store.get::<String>("route").is_none());
        store.set("route", &"orders").unwrap();
        store.set("count", &3).unwrap();

        let reopened = LocalStore::open(&path).unwrap();
        assert_eq!(reopened.get::<String>("route").as_deref(), Some("orders"));
        assert_eq!(reopened.get::<i64>("count"), Some(3));

        reopened.remove("route").unwrap();
        let again = LocalStore::open(&path).unwrap();
        assert!(again.get::<String>("route").is_none());
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = LocalStore::open(&path).unwrap();
        assert!(store.get::<String>("route").is_none());
        store.set("route", &"clients").unwrap();
        assert_eq!(LocalStore::open(&path).unwrap().get::<String>("route").as_deref(), Some("clients"));
    }

    #[test]
    fn test_wrong_type_reads_as_absent() {
        let store = LocalStore::in_memory();
        store.set("route", &42).unwrap();
        assert!(store.get::<Vec<String>>("route").is_none());
        assert!(store.path().is_none());
    }
}
