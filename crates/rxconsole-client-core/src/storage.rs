//! Pluggable key-value storage capability for session state.
//!
//! The session manager persists through this seam so that the same core
//! runs with a durable store, an in-memory store, or no storage at all.
//! The implementation is selected once at startup.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Storage key for the raw bearer token.
pub const ACCESS_TOKEN_KEY: &str = "access_token";
/// Storage key for the serialized user profile.
pub const USER_KEY: &str = "user";
/// Storage key for the user's region.
pub const REGION_KEY: &str = "region";
/// Storage key for the legacy single-slot environment selection.
pub const SELECTED_ENVIRONMENT_KEY: &str = "selected_environment";

#[derive(Debug, thiserror::Error)]
#[error("storage_write_failed:{message}")]
pub struct StorageError {
    pub message: String,
}

impl StorageError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Synchronous origin-scoped key-value storage.
///
/// Reads are infallible (`None` covers both "absent" and "unreadable");
/// writes report failure but callers in the session lifecycle treat a
/// failed write as non-fatal.
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// In-memory store. Session state lives exactly as long as the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .map(|entries| entries.get(key).cloned())
            .unwrap_or_default()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| StorageError::new("memory store poisoned"))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| StorageError::new("memory store poisoned"))?;
        entries.remove(key);
        Ok(())
    }
}

/// Store for execution contexts without persistent storage: reads see
/// nothing, writes succeed and discard.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopStore;

impl SessionStore for NoopStore {
    fn get(&self, _key: &str) -> Option<String> {
        None
    }

    fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
        Ok(())
    }

    fn remove(&self, _key: &str) -> Result<(), StorageError> {
        Ok(())
    }
}

/// Durable store backed by a single JSON object file.
///
/// The file is read once on open; every mutation rewrites it whole. Values
/// are plain strings keyed by the storage key constants above.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: Mutex<HashMap<String, String>>,
}

impl JsonFileStore {
    /// Opens the store at `path`, loading any existing contents. A missing
    /// or unreadable file starts empty; it will be created on first write.
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let entries = match std::fs::read(&path) {
            Ok(bytes) => serde_json::from_slice::<HashMap<String, String>>(&bytes)
                .unwrap_or_default(),
            Err(_) => HashMap::new(),
        };
        Self {
            path,
            entries: Mutex::new(entries),
        }
    }

    fn flush(&self, entries: &HashMap<String, String>) -> Result<(), StorageError> {
        let body = serde_json::to_vec_pretty(entries)
            .map_err(|error| StorageError::new(error.to_string()))?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|error| StorageError::new(error.to_string()))?;
        }
        std::fs::write(&self.path, body).map_err(|error| StorageError::new(error.to_string()))
    }
}

impl SessionStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .map(|entries| entries.get(key).cloned())
            .unwrap_or_default()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| StorageError::new("file store poisoned"))?;
        entries.insert(key.to_string(), value.to_string());
        self.flush(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| StorageError::new("file store poisoned"))?;
        if entries.remove(key).is_none() {
            return Ok(());
        }
        self.flush(&entries)
    }
}
