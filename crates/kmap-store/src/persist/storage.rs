//! Durable key/value backends for persisted records.
//!
//! Each document is two independently addressable records (nodes, edges),
//! stored under string keys. Hosts pick a backend; the adapter only sees the
//! [`SnapshotStorage`] trait.

use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] io::Error),
    #[error("record is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
}

/// Trait for reading and writing persisted records by key.
///
/// Implemented differently by each host environment:
/// - desktop: a directory of JSON files ([`FileStorage`])
/// - tests/embedding: an in-process map ([`MemoryStorage`])
pub trait SnapshotStorage: Send + Sync {
    /// `Ok(None)` when nothing was ever stored under `key`.
    fn read(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn write(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

// ─── In-memory ───────────────────────────────────────────────────────────

/// Shared in-process storage. Clones see the same records.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    records: Arc<Mutex<HashMap<String, String>>>,
    writes: Arc<AtomicUsize>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a record directly, bypassing the write counter.
    pub fn insert(&self, key: impl Into<String>, value: impl Into<String>) {
        if let Ok(mut records) = self.records.lock() {
            records.insert(key.into(), value.into());
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.records.lock().ok()?.get(key).cloned()
    }

    /// Number of successful `write` calls so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl SnapshotStorage for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        let records = self
            .records
            .lock()
            .map_err(|_| StorageError::Unavailable("memory storage lock poisoned".into()))?;
        Ok(records.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| StorageError::Unavailable("memory storage lock poisoned".into()))?;
        records.insert(key.to_string(), value.to_string());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ─── Files ───────────────────────────────────────────────────────────────

/// One `<key>.json` file per record inside `dir`.
///
/// Writes go to a temporary sibling first and are renamed into place, so a
/// crash mid-write leaves the previous record intact.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl SnapshotStorage for FileStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(text) => Ok(Some(text)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);
        let tmp = self.dir.join(format!(".{key}.json.tmp"));
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(value.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_storage_clones_share_records() {
        let storage = MemoryStorage::new();
        let view = storage.clone();
        storage.write("k", "v").unwrap();
        assert_eq!(view.read("k").unwrap().as_deref(), Some("v"));
        assert_eq!(view.read("missing").unwrap(), None);
        assert_eq!(view.write_count(), 1);
    }

    #[test]
    fn file_storage_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("maps"));
        assert_eq!(storage.read("nodes").unwrap(), None);

        storage.write("nodes", "[]").unwrap();
        storage.write("nodes", "[1]").unwrap();
        assert_eq!(storage.read("nodes").unwrap().as_deref(), Some("[1]"));
        assert!(dir.path().join("maps/nodes.json").is_file());
        assert!(!dir.path().join("maps/.nodes.json.tmp").exists());
    }
}
