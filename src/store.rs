//! Persisted bearer credential and the key/value backends that hold it.
//!
//! SYSTEM CONTEXT
//! ==============
//! Exactly one credential is stored, under [`ACCESS_TOKEN_KEY`]. The store
//! works without a backend (non-interactive runs): reads come back empty and
//! writes do nothing. Backend failures are logged and swallowed so callers
//! never have to handle storage errors.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

/// Well-known storage key for the access token.
pub const ACCESS_TOKEN_KEY: &str = "accessToken";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage io failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("storage file {path} is not a JSON object: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("storage encode failed: {0}")]
    Encode(#[from] serde_json::Error),
}

/// String key/value persistence, shaped after browser `localStorage`.
pub trait Storage: Send + Sync {
    /// Read `key`, returning `None` when it was never written.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete `key`. Removing a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;
}

// =============================================================================
// MEMORY BACKEND
// =============================================================================

/// Process-local storage. Contents vanish with the process.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: Mutex<BTreeMap<String, String>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        items.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        items.remove(key);
        Ok(())
    }
}

// =============================================================================
// FILE BACKEND
// =============================================================================

/// Storage persisted as a JSON object map in a single file.
///
/// A missing file reads as empty. Parent directories are created on first
/// write. The lock serializes read-modify-write cycles within one process.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStorage {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), lock: Mutex::new(()) }
    }

    fn load(&self) -> Result<BTreeMap<String, String>, StorageError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(source) => return Err(StorageError::Io { path: self.path.clone(), source }),
        };
        if raw.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&raw).map_err(|source| StorageError::Decode { path: self.path.clone(), source })
    }

    /// `load` for read-modify-write cycles. A file that does not decode
    /// starts over as an empty map; the flag says it must be rewritten.
    fn load_for_write(&self) -> Result<(BTreeMap<String, String>, bool), StorageError> {
        match self.load() {
            Ok(items) => Ok((items, false)),
            Err(StorageError::Decode { path, source }) => {
                tracing::warn!(path = %path.display(), error = %source, "overwriting undecodable storage file");
                Ok((BTreeMap::new(), true))
            }
            Err(e) => Err(e),
        }
    }

    fn save(&self, items: &BTreeMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|source| StorageError::Io { path: parent.to_path_buf(), source })?;
        }
        let raw = serde_json::to_string_pretty(items)?;
        fs::write(&self.path, raw).map_err(|source| StorageError::Io { path: self.path.clone(), source })
    }
}

impl Storage for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let _held = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(self.load()?.remove(key))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let _held = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let (mut items, _) = self.load_for_write()?;
        items.insert(key.to_owned(), value.to_owned());
        self.save(&items)
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let _held = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let (mut items, replaced) = self.load_for_write()?;
        if items.remove(key).is_none() && !replaced {
            return Ok(());
        }
        self.save(&items)
    }
}

// =============================================================================
// CREDENTIAL STORE
// =============================================================================

/// Owner of the single bearer credential. Cheap to clone; clones share the
/// same backend.
#[derive(Clone)]
pub struct CredentialStore {
    backend: Option<Arc<dyn Storage>>,
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore")
            .field("attached", &self.backend.is_some())
            .finish()
    }
}

impl CredentialStore {
    /// Store backed by `backend`.
    #[must_use]
    pub fn new(backend: Arc<dyn Storage>) -> Self {
        Self { backend: Some(backend) }
    }

    /// Store with no backend: `get` is always absent, writes are no-ops.
    #[must_use]
    pub fn detached() -> Self {
        Self { backend: None }
    }

    /// Store backed by a fresh [`MemoryStorage`].
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()))
    }

    /// Store backed by a [`FileStorage`] at `path`.
    #[must_use]
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::new(Arc::new(FileStorage::new(path)))
    }

    /// Return the stored credential. Empty strings count as absent.
    #[must_use]
    pub fn get(&self) -> Option<String> {
        let backend = self.backend.as_ref()?;
        match backend.get_item(ACCESS_TOKEN_KEY) {
            Ok(token) => token.filter(|t| !t.is_empty()),
            Err(e) => {
                tracing::warn!(error = %e, "credential read failed; treating as absent");
                None
            }
        }
    }

    /// Persist `token`, replacing any previous credential.
    pub fn set(&self, token: &str) {
        let Some(backend) = self.backend.as_ref() else {
            return;
        };
        if let Err(e) = backend.set_item(ACCESS_TOKEN_KEY, token) {
            tracing::warn!(error = %e, "credential write failed");
        }
    }

    /// Remove the stored credential, if any.
    pub fn remove(&self) {
        let Some(backend) = self.backend.as_ref() else {
            return;
        };
        if let Err(e) = backend.remove_item(ACCESS_TOKEN_KEY) {
            tracing::warn!(error = %e, "credential removal failed");
        }
    }

    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.backend.is_some()
    }
}

#[cfg(test)]
#[path = "store_test.rs"]
mod store_test;
