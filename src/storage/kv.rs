/// Simple string key-value stores
///
/// The key-value backend only needs to read and overwrite whole values under
/// a handful of fixed keys. Two stores are provided: a single JSON document
/// on disk, and an in-memory map for ephemeral use. Both apply a batch of
/// writes as one unit.

use std::collections::{BTreeMap, HashMap};
use std::fs::{File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use fs2::FileExt;

use crate::storage::StorageError;

/// File holding every key of a `FileKeyValueStore`
pub const DOCUMENT_FILE: &str = "store.json";

/// Advisory lock held for as long as a `FileKeyValueStore` is open
pub const LOCK_FILE: &str = "store.lock";

/// Minimal persistent map from string keys to string values
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the value under `key`, if any
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Overwrite every listed key at once
    ///
    /// Either all values are durable when this returns `Ok`, or none of them
    /// changed.
    async fn set_many(&self, entries: &[(&str, String)]) -> Result<(), StorageError>;

    /// Overwrite the value under `key`
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.set_many(&[(key, value.to_string())]).await
    }
}

/// Keeps all keys in one JSON document inside a directory
///
/// Every batch rewrites the document through a temp file and a rename, so a
/// crash leaves either the old or the new document. An exclusive lock on
/// `store.lock` keeps a second store from opening the same directory.
#[derive(Debug)]
pub struct FileKeyValueStore {
    dir: PathBuf,
    values: tokio::sync::Mutex<BTreeMap<String, String>>,
    _lock: File,
}

impl FileKeyValueStore {
    /// Use `dir` as the store, creating it if needed
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        let lock = acquire_lock(&dir.join(LOCK_FILE))?;

        let values = match tokio::fs::read_to_string(dir.join(DOCUMENT_FILE)).await {
            Ok(json) => serde_json::from_str(&json)?,
            Err(e) if e.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };

        tracing::debug!("Opened key-value store at {:?} ({} keys)", dir, values.len());
        Ok(Self {
            dir,
            values: tokio::sync::Mutex::new(values),
            _lock: lock,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn write_document(&self, values: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let path = self.dir.join(DOCUMENT_FILE);
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serde_json::to_string_pretty(values)?).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
}

/// Take the exclusive lock on `path` without waiting
fn acquire_lock(path: &Path) -> Result<File, StorageError> {
    let lock_file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(path)?;

    match lock_file.try_lock_exclusive() {
        Ok(()) => Ok(lock_file),
        Err(e) if e.raw_os_error() == fs2::lock_contended_error().raw_os_error() => {
            Err(StorageError::Locked(path.display().to_string()))
        }
        Err(e) => Err(e.into()),
    }
}

#[async_trait]
impl KeyValueStore for FileKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.values.lock().await.get(key).cloned())
    }

    async fn set_many(&self, entries: &[(&str, String)]) -> Result<(), StorageError> {
        let mut values = self.values.lock().await;
        let mut next = values.clone();
        for (key, value) in entries {
            next.insert(key.to_string(), value.clone());
        }

        self.write_document(&next).await?;
        *values = next;
        Ok(())
    }
}

/// In-memory store; contents vanish with the process
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn values(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.values.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.values().get(key).cloned())
    }

    async fn set_many(&self, entries: &[(&str, String)]) -> Result<(), StorageError> {
        let mut values = self.values();
        for (key, value) in entries {
            values.insert(key.to_string(), value.clone());
        }
        Ok(())
    }
}
