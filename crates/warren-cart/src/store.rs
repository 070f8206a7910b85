//! # Cart Stores
//!
//! A tiny string key-value abstraction, the shape of browser local storage.
//!
//! ```text
//!   key                 value
//!   ─────────────────   ──────────────────────────────────────────────
//!   cart:guest          {"version":1,"owner":"guest","items":[..],..}
//!   cart:user:42        {"version":1,"owner":"user:42","items":[..],..}
//! ```
//!
//! Two backends:
//! - [`MemoryCartStore`] - process memory, for tests and embedding
//! - [`FileCartStore`] - one JSON file per key under a directory
//!
//! Concurrent writers are not coordinated: the last write wins.

use directories::ProjectDirs;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

use crate::error::{CartStoreError, CartStoreResult};

// =============================================================================
// Store Trait
// =============================================================================

/// String key-value storage for serialized cart buckets.
pub trait CartStore: Send + Sync {
    /// Returns the stored value, or `None` if the key was never written.
    fn read(&self, key: &str) -> CartStoreResult<Option<String>>;

    fn write(&self, key: &str, value: &str) -> CartStoreResult<()>;

    /// Removes a key. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> CartStoreResult<()>;
}

// =============================================================================
// Memory Store
// =============================================================================

#[derive(Debug, Default)]
pub struct MemoryCartStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryCartStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        // Every critical section is a single map call, so poisoning is harmless.
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}

impl CartStore for MemoryCartStore {
    fn read(&self, key: &str) -> CartStoreResult<Option<String>> {
        Ok(self.entries().get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> CartStoreResult<()> {
        self.entries().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> CartStoreResult<()> {
        self.entries().remove(key);
        Ok(())
    }
}

// =============================================================================
// File Store
// =============================================================================

/// Stores each key as `<dir>/<key with ':' replaced by '_'>.json`.
///
/// Writes go to a temporary sibling first and are renamed into place, so a
/// crash mid-write leaves the previous bucket intact.
#[derive(Debug, Clone)]
pub struct FileCartStore {
    dir: PathBuf,
}

impl FileCartStore {
    /// Opens (creating if needed) a store rooted at `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> CartStoreResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| CartStoreError::io(&dir.display().to_string(), e))?;
        debug!(dir = %dir.display(), "Cart file store opened");
        Ok(FileCartStore { dir })
    }

    /// Opens the store in the platform data directory
    /// (e.g. `~/.local/share/warren/carts` on Linux).
    pub fn default_location() -> CartStoreResult<Self> {
        let dirs = ProjectDirs::from("th", "Warren", "warren").ok_or(CartStoreError::NoDataDir)?;
        Self::new(dirs.data_dir().join("carts"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> CartStoreResult<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, ':' | '-' | '_'));
        if !valid {
            return Err(CartStoreError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{}.json", key.replace(':', "_"))))
    }
}

impl CartStore for FileCartStore {
    fn read(&self, key: &str) -> CartStoreResult<Option<String>> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CartStoreError::io(key, e)),
        }
    }

    fn write(&self, key: &str, value: &str) -> CartStoreResult<()> {
        let path = self.path_for(key)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value).map_err(|e| CartStoreError::io(key, e))?;
        fs::rename(&tmp, &path).map_err(|e| CartStoreError::io(key, e))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> CartStoreResult<()> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CartStoreError::io(key, e)),
        }
    }
}
