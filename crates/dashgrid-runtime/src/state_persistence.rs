//! Layout snapshot persistence.
//!
//! This module provides the [`StorageBackend`] key/value abstraction and the
//! [`SnapshotStore`] that reads and writes the dashboard's row list through it.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      SnapshotStore                            │
//! │   - Fixed storage key                                         │
//! │   - JSON encode/decode of the row list                        │
//! │   - Malformed data reported as "no snapshot"                  │
//! └──────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     StorageBackend                            │
//! │   - MemoryStorage: in-memory (testing, ephemeral)             │
//! │   - FileStorage: JSON document on disk                        │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Snapshot Format
//!
//! The stored value is a JSON array of rows:
//!
//! ```json
//! [
//!   { "id": "row-1", "cards": [ { "id": "summary", "type": "summary", "title": "Summary" } ] }
//! ]
//! ```
//!
//! There is no version tag in the value. A shape change is detected as
//! malformed data and the caller falls back to the default layout.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | `StorageError::Io` | File I/O failure | Returned from `save`/`clear`; `load` logs and reports no snapshot |
//! | `StorageError::Serialization` | Not JSON, or wrong shape | `load` logs and reports no snapshot |
//! | `StorageError::Corruption` | Duplicate or empty ids, poisoned lock | `load` logs and reports no snapshot |
//! | Missing value | First run, after reset | `load` reports no snapshot |

use std::collections::HashMap;
use std::fmt;
#[cfg(feature = "file-storage")]
use std::fs::{self, File};
#[cfg(feature = "file-storage")]
use std::io::{BufReader, BufWriter, Write};
#[cfg(feature = "file-storage")]
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use dashgrid_core::{LayoutState, Row};
#[cfg(feature = "file-storage")]
use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Error Types
// ─────────────────────────────────────────────────────────────────────────────

/// Errors that can occur during storage operations.
#[derive(Debug)]
pub enum StorageError {
    /// I/O error during file operations.
    Io(std::io::Error),
    /// Serialization or deserialization error.
    Serialization(String),
    /// Stored data is structurally valid but violates an invariant, or a
    /// lock was poisoned.
    Corruption(String),
    /// Backend is not available.
    Unavailable(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Io(e) => write!(f, "I/O error: {e}"),
            StorageError::Serialization(msg) => write!(f, "serialization error: {msg}"),
            StorageError::Corruption(msg) => write!(f, "storage corruption: {msg}"),
            StorageError::Unavailable(msg) => write!(f, "storage unavailable: {msg}"),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StorageError::Io(e) => Some(e),
            StorageError::Serialization(_)
            | StorageError::Corruption(_)
            | StorageError::Unavailable(_) => None,
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        StorageError::Io(e)
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

// ─────────────────────────────────────────────────────────────────────────────
// Storage Backend Trait
// ─────────────────────────────────────────────────────────────────────────────

/// A durable string key/value store.
///
/// This is the browser-local-storage contract: string keys, string values,
/// no business logic. Implementations must be `Send + Sync`; the stored
/// values are shared by every dashboard instance using the same backend and
/// the last writer wins.
pub trait StorageBackend: Send + Sync {
    /// Human-readable name for logging.
    fn name(&self) -> &str;

    /// Read the value stored under `key`.
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Remove the value under `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> StorageResult<()>;

    /// Check if the backend is available and functional.
    fn is_available(&self) -> bool {
        true
    }
}

impl<T: StorageBackend + ?Sized> StorageBackend for Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        (**self).remove(key)
    }

    fn is_available(&self) -> bool {
        (**self).is_available()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Memory Storage
// ─────────────────────────────────────────────────────────────────────────────

/// In-memory storage backend for testing and ephemeral sessions.
///
/// Wrap it in an [`Arc`] to share one store between several
/// [`SnapshotStore`]s, which is how tests simulate a page reload.
#[derive(Default)]
pub struct MemoryStorage {
    data: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    /// Create a new empty memory storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create memory storage pre-populated with entries.
    #[must_use]
    pub fn with_entries(entries: HashMap<String, String>) -> Self {
        Self {
            data: RwLock::new(entries),
        }
    }

    /// Create memory storage holding a single value.
    #[must_use]
    pub fn with_value(key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut entries = HashMap::new();
        entries.insert(key.into(), value.into());
        Self::with_entries(entries)
    }

    /// Number of stored keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.read().map(|g| g.len()).unwrap_or(0)
    }

    /// True when nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl StorageBackend for MemoryStorage {
    fn name(&self) -> &str {
        "MemoryStorage"
    }

    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let guard = self
            .data
            .read()
            .map_err(|_| StorageError::Corruption("lock poisoned".into()))?;
        Ok(guard.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut guard = self
            .data
            .write()
            .map_err(|_| StorageError::Corruption("lock poisoned".into()))?;
        guard.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        let mut guard = self
            .data
            .write()
            .map_err(|_| StorageError::Corruption("lock poisoned".into()))?;
        guard.remove(key);
        Ok(())
    }
}

impl fmt::Debug for MemoryStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryStorage")
            .field("entries", &self.len())
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// File Storage
// ─────────────────────────────────────────────────────────────────────────────

/// On-disk document holding every key.
#[cfg(feature = "file-storage")]
#[derive(Serialize, Deserialize)]
struct StateFile {
    /// Format version for future migrations.
    format_version: u32,
    entries: HashMap<String, String>,
}

#[cfg(feature = "file-storage")]
impl StateFile {
    const FORMAT_VERSION: u32 = 1;

    fn new() -> Self {
        Self {
            format_version: Self::FORMAT_VERSION,
            entries: HashMap::new(),
        }
    }
}

/// File-based storage backend using a single JSON document.
///
/// # File Format
///
/// ```json
/// {
///   "format_version": 1,
///   "entries": {
///     "dashboard-layout": "[{\"id\":\"row-1\",\"cards\":[]}]"
///   }
/// }
/// ```
///
/// # Atomic Writes
///
/// Writes use a temporary file + rename pattern to prevent corruption:
/// 1. Write to `{path}.tmp`
/// 2. Flush and sync
/// 3. Rename `{path}.tmp` -> `{path}`
///
/// The file is deleted once its last key is removed.
#[cfg(feature = "file-storage")]
pub struct FileStorage {
    path: PathBuf,
}

#[cfg(feature = "file-storage")]
impl FileStorage {
    /// Create a file storage at the given path.
    ///
    /// The file does not need to exist; it will be created on first write.
    #[must_use]
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Create storage at the default location for the application.
    ///
    /// Uses `$XDG_STATE_HOME/dashgrid/{app_name}/state.json` on Linux,
    /// falling back to `~/.local/state` and then the current directory.
    #[must_use]
    pub fn default_for_app(app_name: &str) -> Self {
        let base = dirs_or_fallback();
        let path = base.join("dashgrid").join(app_name).join("state.json");
        Self { path }
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut tmp = self.path.clone();
        tmp.set_extension("json.tmp");
        tmp
    }

    fn read_document(&self) -> StorageResult<StateFile> {
        if !self.path.exists() {
            return Ok(StateFile::new());
        }

        let file = File::open(&self.path)?;
        let reader = BufReader::new(file);
        let doc: StateFile = serde_json::from_reader(reader).map_err(|e| {
            StorageError::Serialization(format!("failed to parse state file: {e}"))
        })?;

        if doc.format_version != StateFile::FORMAT_VERSION {
            tracing::warn!(
                stored = doc.format_version,
                expected = StateFile::FORMAT_VERSION,
                "state file format version mismatch, ignoring stored state"
            );
            return Ok(StateFile::new());
        }
        Ok(doc)
    }

    /// Read the document for a read-modify-write, starting over if the
    /// existing file cannot be parsed.
    fn read_for_update(&self) -> StorageResult<StateFile> {
        match self.read_document() {
            Ok(doc) => Ok(doc),
            Err(StorageError::Serialization(msg)) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %msg,
                    "replacing unreadable state file"
                );
                Ok(StateFile::new())
            }
            Err(e) => Err(e),
        }
    }

    fn write_document(&self, doc: &StateFile) -> StorageResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let tmp_path = self.temp_path();
        {
            let file = File::create(&tmp_path)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, doc).map_err(|e| {
                StorageError::Serialization(format!("failed to serialize state: {e}"))
            })?;
            writer.flush()?;
            writer.get_ref().sync_all()?;
        }

        fs::rename(&tmp_path, &self.path)?;

        tracing::debug!(
            path = %self.path.display(),
            entries = doc.entries.len(),
            "saved state file"
        );
        Ok(())
    }
}

/// Get state directory, falling back to current dir if unavailable.
#[cfg(feature = "file-storage")]
fn dirs_or_fallback() -> PathBuf {
    if let Ok(state_home) = std::env::var("XDG_STATE_HOME") {
        return PathBuf::from(state_home);
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".local").join("state");
    }
    PathBuf::from(".")
}

#[cfg(feature = "file-storage")]
impl StorageBackend for FileStorage {
    fn name(&self) -> &str {
        "FileStorage"
    }

    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let mut doc = self.read_document()?;
        Ok(doc.entries.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut doc = self.read_for_update()?;
        doc.entries.insert(key.to_string(), value.to_string());
        self.write_document(&doc)
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        if !self.path.exists() {
            return Ok(());
        }
        let mut doc = self.read_for_update()?;
        doc.entries.remove(key);
        if doc.entries.is_empty() {
            fs::remove_file(&self.path)?;
            return Ok(());
        }
        self.write_document(&doc)
    }

    fn is_available(&self) -> bool {
        if let Some(parent) = self.path.parent() {
            if !parent.exists() {
                return fs::create_dir_all(parent).is_ok();
            }
            let test_path = parent.join(".dashgrid_test_write");
            if fs::write(&test_path, b"test").is_ok() {
                let _ = fs::remove_file(&test_path);
                return true;
            }
        }
        false
    }
}

#[cfg(feature = "file-storage")]
impl fmt::Debug for FileStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileStorage")
            .field("path", &self.path)
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Snapshot Store
// ─────────────────────────────────────────────────────────────────────────────

/// Loads, saves and clears the persisted row list under one fixed key.
///
/// `load` never fails: missing, unreadable, malformed or invariant-violating
/// data all read as "no snapshot" and are logged.
///
/// # Example
///
/// ```
/// use dashgrid_core::default_rows;
/// use dashgrid_runtime::state_persistence::SnapshotStore;
///
/// let store = SnapshotStore::in_memory();
/// assert!(store.load().is_none());
///
/// store.save(&default_rows()).unwrap();
/// assert_eq!(store.load(), Some(default_rows()));
///
/// store.clear().unwrap();
/// assert!(store.load().is_none());
/// ```
pub struct SnapshotStore {
    backend: Box<dyn StorageBackend>,
    key: String,
}

impl SnapshotStore {
    /// Storage key used when none is configured.
    pub const DEFAULT_KEY: &'static str = "dashboard-layout";

    /// Create a snapshot store over `backend` using `key`.
    #[must_use]
    pub fn new(backend: Box<dyn StorageBackend>, key: impl Into<String>) -> Self {
        Self {
            backend,
            key: key.into(),
        }
    }

    /// Snapshot store over fresh memory storage and the default key.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryStorage::new()), Self::DEFAULT_KEY)
    }

    /// Snapshot store over a JSON file and the default key.
    #[cfg(feature = "file-storage")]
    #[must_use]
    pub fn with_file(path: impl AsRef<Path>) -> Self {
        Self::new(Box::new(FileStorage::new(path)), Self::DEFAULT_KEY)
    }

    /// Storage key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Backend name for logging.
    #[must_use]
    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Check if the storage backend is available.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.backend.is_available()
    }

    /// Load the persisted row list, if one exists and is well formed.
    #[must_use]
    pub fn load(&self) -> Option<Vec<Row>> {
        let raw = match self.backend.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                tracing::debug!(key = %self.key, backend = %self.backend.name(), "no layout snapshot");
                return None;
            }
            Err(e) => {
                tracing::warn!(
                    key = %self.key,
                    backend = %self.backend.name(),
                    error = %e,
                    "failed to read layout snapshot, using default layout"
                );
                return None;
            }
        };

        match decode_rows(&raw) {
            Ok(rows) => {
                tracing::debug!(key = %self.key, rows = rows.len(), "loaded layout snapshot");
                Some(rows)
            }
            Err(e) => {
                tracing::warn!(
                    key = %self.key,
                    error = %e,
                    "malformed layout snapshot, using default layout"
                );
                None
            }
        }
    }

    /// Serialize and store `rows`, replacing any previous snapshot.
    pub fn save(&self, rows: &[Row]) -> StorageResult<()> {
        let raw = serde_json::to_string(rows).map_err(|e| {
            StorageError::Serialization(format!("failed to serialize layout: {e}"))
        })?;
        self.backend.set(&self.key, &raw)?;
        tracing::debug!(key = %self.key, rows = rows.len(), "saved layout snapshot");
        Ok(())
    }

    /// Remove the stored snapshot entirely.
    pub fn clear(&self) -> StorageResult<()> {
        self.backend.remove(&self.key)?;
        tracing::debug!(key = %self.key, "cleared layout snapshot");
        Ok(())
    }
}

impl fmt::Debug for SnapshotStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnapshotStore")
            .field("backend", &self.backend.name())
            .field("key", &self.key)
            .finish()
    }
}

fn decode_rows(raw: &str) -> StorageResult<Vec<Row>> {
    let rows: Vec<Row> = serde_json::from_str(raw)
        .map_err(|e| StorageError::Serialization(format!("failed to parse snapshot: {e}")))?;
    LayoutState::from_rows(rows)
        .map(LayoutState::into_rows)
        .map_err(|e| StorageError::Corruption(e.to_string()))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use dashgrid_core::{Card, CardKind, default_rows};

    #[test]
    fn memory_storage_basic_operations() {
        let storage = MemoryStorage::new();
        assert!(storage.get("k").unwrap().is_none());

        storage.set("k", "v1").unwrap();
        assert_eq!(storage.get("k").unwrap().as_deref(), Some("v1"));

        storage.set("k", "v2").unwrap();
        assert_eq!(storage.get("k").unwrap().as_deref(), Some("v2"));
        assert_eq!(storage.len(), 1);

        storage.remove("k").unwrap();
        assert!(storage.get("k").unwrap().is_none());
        assert!(storage.is_empty());

        // Removing a missing key is fine
        storage.remove("k").unwrap();
    }

    #[test]
    fn memory_storage_shared_through_arc() {
        let shared = Arc::new(MemoryStorage::new());
        let a = SnapshotStore::new(Box::new(Arc::clone(&shared)), "layout");
        let b = SnapshotStore::new(Box::new(Arc::clone(&shared)), "layout");

        a.save(&default_rows()).unwrap();
        assert_eq!(b.load(), Some(default_rows()));
        assert_eq!(shared.len(), 1);
    }

    #[test]
    fn snapshot_store_round_trip() {
        let store = SnapshotStore::in_memory();
        let rows = vec![
            Row::new("top", vec![Card::of_kind(CardKind::Orders)]),
            Row::new("bottom", vec![]),
        ];
        store.save(&rows).unwrap();
        assert_eq!(store.load(), Some(rows));
    }

    #[test]
    fn snapshot_store_writes_plain_json_array() {
        let storage = Arc::new(MemoryStorage::new());
        let store = SnapshotStore::new(Box::new(Arc::clone(&storage)), "k");
        store
            .save(&[Row::new("r", vec![Card::of_kind(CardKind::Summary)])])
            .unwrap();
        let raw = storage.get("k").unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(
            value,
            serde_json::json!([
                { "id": "r", "cards": [ { "id": "summary", "type": "summary", "title": "Summary" } ] }
            ])
        );
    }

    #[test]
    fn load_rejects_non_json() {
        let store = SnapshotStore::new(Box::new(MemoryStorage::with_value("k", "not json")), "k");
        assert!(store.load().is_none());
    }

    #[test]
    fn unknown_wrapping_known_name_reloads_unchanged() {
        let store = SnapshotStore::in_memory();
        let rows = vec![Row::new("r", vec![Card::new("x", CardKind::Unknown("orders".into()))])];
        store.save(&rows).unwrap();
        assert_eq!(store.load(), Some(rows));
    }

    #[test]
    fn load_rejects_wrong_shape() {
        for raw in [
            r#"{"rows":[]}"#,
            r#"[{"id":"r"}]"#,
            r#"[{"id":"r","cards":[{"id":"c"}]}]"#,
            r#"[1,2,3]"#,
            r#""row-1""#,
        ] {
            let store = SnapshotStore::new(Box::new(MemoryStorage::with_value("k", raw)), "k");
            assert!(store.load().is_none(), "accepted malformed snapshot {raw}");
        }
    }

    #[test]
    fn load_rejects_duplicate_card_ids() {
        let raw = r#"[
            {"id":"a","cards":[{"id":"x","type":"orders","title":"Orders"}]},
            {"id":"b","cards":[{"id":"x","type":"summary","title":"Summary"}]}
        ]"#;
        let store = SnapshotStore::new(Box::new(MemoryStorage::with_value("k", raw)), "k");
        assert!(store.load().is_none());
    }

    #[test]
    fn load_accepts_empty_list_and_unknown_kinds() {
        let store = SnapshotStore::new(Box::new(MemoryStorage::with_value("k", "[]")), "k");
        assert_eq!(store.load(), Some(vec![]));

        let raw = r#"[{"id":"a","cards":[{"id":"x","type":"radar","title":"Radar"}]}]"#;
        let store = SnapshotStore::new(Box::new(MemoryStorage::with_value("k", raw)), "k");
        let rows = store.load().unwrap();
        assert_eq!(rows[0].cards()[0].kind(), &CardKind::Unknown("radar".into()));
    }

    #[test]
    fn snapshot_store_uses_its_key_only() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set("other", "keep me").unwrap();
        let store = SnapshotStore::new(Box::new(Arc::clone(&storage)), "layout");
        store.save(&default_rows()).unwrap();
        store.clear().unwrap();
        assert_eq!(storage.get("other").unwrap().as_deref(), Some("keep me"));
        assert!(storage.get("layout").unwrap().is_none());
    }

    #[test]
    fn storage_error_display() {
        let io_err = StorageError::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "missing"));
        assert!(io_err.to_string().contains("I/O error"));
        assert!(std::error::Error::source(&io_err).is_some());

        let corrupt = StorageError::Corruption("bad data".into());
        assert!(corrupt.to_string().contains("corruption"));

        let unavail = StorageError::Unavailable("no backend".into());
        assert!(unavail.to_string().contains("unavailable"));
    }
}
