//! Durable key-value storage for the serialized queue.
//!
//! The whole queue persists as one serialized value under one key. The
//! [`QueueStorage`] trait abstracts the medium so the store can be backed by
//! a file, an embedder-provided blob store, or a mock in tests. Absent and
//! unreadable values are both treated as "no stored queue" by the caller.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Error, Result, StorageError};

/// Storage key under which the serialized queue lives.
pub const QUEUE_STORAGE_KEY: &str = "playlist";

/// Abstraction over the durable key-value blob store.
#[cfg_attr(test, mockall::automock)]
pub trait QueueStorage: Send + Sync {
    /// Read the value stored under `key`. Returns `None` if no value exists.
    fn read(&self, key: &str) -> Result<Option<String>>;

    /// Write `value` under `key`, replacing any previous value.
    fn write(&self, key: &str, value: &str) -> Result<()>;
}

/// File-backed storage mapping each key to `<key>.json` under a base
/// directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    base_dir: PathBuf,
}

impl FileStorage {
    /// Create storage rooted at the given directory.
    ///
    /// The directory is created lazily on the first write.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Create storage in the platform-default data directory.
    #[must_use]
    pub fn in_default_location() -> Self {
        Self::new(default_data_directory())
    }

    /// The directory this storage writes under.
    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.base_dir.join(format!("{key}.json"))
    }
}

impl QueueStorage for FileStorage {
    fn read(&self, key: &str) -> Result<Option<String>> {
        let path = self.key_path(key);
        if !path.exists() {
            debug!("No stored value for '{}' at {}", key, path.display());
            return Ok(None);
        }

        let value = fs::read_to_string(&path).map_err(|e| {
            Error::Storage(StorageError::ReadFailed {
                key: key.to_string(),
                reason: e.to_string(),
            })
        })?;
        Ok(Some(value))
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        if !self.base_dir.exists() {
            fs::create_dir_all(&self.base_dir).map_err(|e| {
                Error::Storage(StorageError::WriteFailed {
                    key: key.to_string(),
                    reason: format!("Failed to create {}: {e}", self.base_dir.display()),
                })
            })?;
        }

        let path = self.key_path(key);
        fs::write(&path, value).map_err(|e| {
            Error::Storage(StorageError::WriteFailed {
                key: key.to_string(),
                reason: e.to_string(),
            })
        })
    }
}

/// Get the platform-default data directory for Tubeloop.
#[must_use]
pub fn default_data_directory() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tubeloop")
}
