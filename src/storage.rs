//! Storage capability for cache entries and source uploads.
//!
//! Keys are storage-relative paths using forward slashes (the same strings
//! [`crate::keys`] produces). The backend must behave like a local
//! filesystem: immediate read-after-write consistency, per-path atomic
//! writes. Object stores with eventual consistency are not supported.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("no entry at {0}")]
    NotFound(String),

    #[error("storage root unavailable at {path}: {source}")]
    RootUnavailable { path: PathBuf, source: io::Error },

    #[error("storage I/O failure at {path}: {source}")]
    Io { path: String, source: io::Error },
}

/// Filesystem-like store.
///
/// One trait covers both roles the dispenser needs: the derivative cache
/// (read/write entries, manage subtrees) and the upload store (resolve a
/// source locator via [`Storage::url`]).
pub trait Storage: Sync {
    fn exists(&self, key: &str) -> bool;

    fn get(&self, key: &str) -> Result<Vec<u8>, StorageError>;

    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError>;

    /// Absolute filesystem path for a key, whether or not an entry exists.
    fn absolute_path(&self, key: &str) -> String;

    /// Resolve a store-relative locator to wherever the bytes can actually
    /// be read from. For disk stores this is the absolute path.
    fn url(&self, key: &str) -> String;

    fn make_directory(&self, key: &str) -> Result<(), StorageError>;

    /// Recursively delete a subtree. Returns `true` on success; a missing
    /// directory counts as success (already empty).
    fn delete_directory(&self, key: &str) -> bool;

    fn last_modified(&self, key: &str) -> Result<DateTime<Utc>, StorageError>;
}

/// SHA-256 hex digest of the entry at `key`, read back from the store.
///
/// Hashing goes through [`Storage::get`] rather than any in-memory buffer so
/// the digest always reflects the bytes a later request would be served.
pub fn content_hash(store: &dyn Storage, key: &str) -> Result<String, StorageError> {
    let bytes = store.get(key)?;
    Ok(format!("{:x}", Sha256::digest(&bytes)))
}

/// Local-disk store rooted at a directory.
pub struct DiskStorage {
    root: PathBuf,
}

impl DiskStorage {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|source| StorageError::RootUnavailable {
            path: root.clone(),
            source,
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    fn io_error(key: &str, source: io::Error) -> StorageError {
        if source.kind() == io::ErrorKind::NotFound {
            StorageError::NotFound(key.to_string())
        } else {
            StorageError::Io {
                path: key.to_string(),
                source,
            }
        }
    }
}

impl Storage for DiskStorage {
    fn exists(&self, key: &str) -> bool {
        self.resolve(key).exists()
    }

    fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        fs::read(self.resolve(key)).map_err(|e| Self::io_error(key, e))
    }

    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        static WRITE_SEQ: AtomicU64 = AtomicU64::new(0);

        let path = self.resolve(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| Self::io_error(key, e))?;
        }
        // Stage in a per-write unique sibling then rename: readers never see
        // a partial entry, and writers racing on one key never share a
        // staging file.
        let tmp = PathBuf::from(format!(
            "{}.{}.{}.tmp",
            path.display(),
            std::process::id(),
            WRITE_SEQ.fetch_add(1, Ordering::Relaxed),
        ));
        fs::write(&tmp, bytes).map_err(|e| Self::io_error(key, e))?;
        fs::rename(&tmp, &path).map_err(|e| Self::io_error(key, e))
    }

    fn absolute_path(&self, key: &str) -> String {
        self.resolve(key).display().to_string()
    }

    fn url(&self, key: &str) -> String {
        self.absolute_path(key)
    }

    fn make_directory(&self, key: &str) -> Result<(), StorageError> {
        fs::create_dir_all(self.resolve(key)).map_err(|e| Self::io_error(key, e))
    }

    fn delete_directory(&self, key: &str) -> bool {
        let path = self.resolve(key);
        if !path.exists() {
            return true;
        }
        match fs::remove_dir_all(&path) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "directory removal failed");
                false
            }
        }
    }

    fn last_modified(&self, key: &str) -> Result<DateTime<Utc>, StorageError> {
        let meta = fs::metadata(self.resolve(key)).map_err(|e| Self::io_error(key, e))?;
        let mtime = meta.modified().map_err(|e| Self::io_error(key, e))?;
        Ok(DateTime::<Utc>::from(mtime))
    }
}
