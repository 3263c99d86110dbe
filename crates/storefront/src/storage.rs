//! Client-side key/value storage.
//!
//! `LocalStorage` is a flat map of string keys to string values that
//! survives restarts when backed by a file. Every mutation is broadcast as a
//! [`StorageEvent`] so other handles sharing the same storage can react.
//!
//! # Keys
//!
//! | Key | Contents |
//! |-----|----------|
//! | `authToken` | Bearer token of the signed-in user |
//! | `currentUser` | Signed-in [`User`](voltparts_core::User) as JSON |
//! | `cartItems` | Cart basket |
//! | `quoteItems` | Quote basket |
//! | `orders_<userId>` / `orders_guest` | Local mirror of the user's orders |

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use voltparts_core::UserId;

/// Storage key of the bearer token.
pub const AUTH_TOKEN_KEY: &str = "authToken";
/// Storage key of the signed-in user.
pub const CURRENT_USER_KEY: &str = "currentUser";
/// Storage key of the cart basket.
pub const CART_ITEMS_KEY: &str = "cartItems";
/// Storage key of the quote basket.
pub const QUOTE_ITEMS_KEY: &str = "quoteItems";

const EVENT_CAPACITY: usize = 64;

/// Storage key of the local order mirror for a user (or guests).
#[must_use]
pub fn orders_key(user_id: Option<&UserId>) -> String {
    user_id.map_or_else(|| "orders_guest".to_string(), |id| format!("orders_{id}"))
}

/// Errors raised by storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading or writing the backing file failed.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A value could not be encoded or decoded.
    #[error("storage serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A change to one key. `new_value` is `None` when the key was removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    pub key: String,
    pub new_value: Option<String>,
}

/// Shared key/value storage, optionally persisted to a JSON file.
///
/// Cheap to clone; clones share the same map and event channel.
#[derive(Clone)]
pub struct LocalStorage {
    inner: Arc<LocalStorageInner>,
}

struct LocalStorageInner {
    entries: RwLock<BTreeMap<String, String>>,
    path: Option<PathBuf>,
    events: broadcast::Sender<StorageEvent>,
}

impl LocalStorage {
    /// Storage that lives only as long as the process.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::with_entries(BTreeMap::new(), None)
    }

    /// Storage persisted to `path`. Existing contents are loaded; a missing
    /// file starts empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(contents) if contents.trim().is_empty() => BTreeMap::new(),
            Ok(contents) => serde_json::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        debug!(path = %path.display(), keys = entries.len(), "Opened local storage");
        Ok(Self::with_entries(entries, Some(path)))
    }

    fn with_entries(entries: BTreeMap<String, String>, path: Option<PathBuf>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(LocalStorageInner {
                entries: RwLock::new(entries),
                path,
                events,
            }),
        }
    }

    /// Read a raw value.
    #[must_use]
    pub fn get_item(&self, key: &str) -> Option<String> {
        self.inner
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Write a raw value.
    ///
    /// # Errors
    ///
    /// Returns an error if persisting to the backing file fails.
    pub fn set_item(&self, key: &str, value: impl Into<String>) -> Result<(), StorageError> {
        let value = value.into();
        self.mutate(key, Some(value))
    }

    /// Remove a key. Removing a missing key is a no-op and emits no event.
    ///
    /// # Errors
    ///
    /// Returns an error if persisting to the backing file fails.
    pub fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        if self.get_item(key).is_none() {
            return Ok(());
        }
        self.mutate(key, None)
    }

    /// Read and decode a JSON value.
    ///
    /// A value that no longer decodes (for example after a model change) is
    /// treated as absent and logged.
    #[must_use]
    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.get_item(key)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key, error = %e, "Ignoring unreadable storage entry");
                None
            }
        }
    }

    /// Encode and write a JSON value.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or persisting fails.
    pub fn set_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let raw = serde_json::to_string(value)?;
        self.set_item(key, raw)
    }

    /// Subscribe to change events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<StorageEvent> {
        self.inner.events.subscribe()
    }

    /// Backing file, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.inner.path.as_deref()
    }

    fn mutate(&self, key: &str, value: Option<String>) -> Result<(), StorageError> {
        {
            let mut entries = self
                .inner
                .entries
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            // Memory only changes once the file holds the new map.
            if let Some(path) = &self.inner.path {
                let mut staged = entries.clone();
                apply(&mut staged, key, value.clone());
                persist(path, &staged)?;
                *entries = staged;
            } else {
                apply(&mut entries, key, value.clone());
            }
        }

        // No subscribers is fine
        let _ = self.inner.events.send(StorageEvent {
            key: key.to_string(),
            new_value: value,
        });
        Ok(())
    }
}

fn apply(entries: &mut BTreeMap<String, String>, key: &str, value: Option<String>) {
    match value {
        Some(v) => entries.insert(key.to_string(), v),
        None => entries.remove(key),
    };
}

/// Write the whole map atomically (temp file + rename).
fn persist(path: &Path, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, serde_json::to_vec_pretty(entries)?)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}
