//! Local persistence for layout and notes.
//!
//! Records live in a small string key-value store, JSON-encoded, the same way
//! a browser's local storage would hold them. Nothing here reaches the server.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use thiserror::Error;

/// Key of the persisted display order.
pub const LAYOUT_KEY: &str = "config_center_layout_v1";
/// Key of the persisted per-module notes.
pub const NOTES_KEY: &str = "config_center_notes_v1";

const STORE_FILE: &str = "local_storage.json";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// A synchronous string key-value store. Writes are last-write-wins.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// In-process store, lost when the session ends.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

/// Store backed by one JSON file. Every write replaces the file atomically.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStore {
    /// Open the store file in `dir`, creating the directory if needed.
    pub fn open(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)?;
        let path = dir.join(STORE_FILE);
        let entries = match fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!(path = %path.display(), "ignoring unreadable store file: {}", e);
                BTreeMap::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        let content = serde_json::to_string_pretty(entries)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, content)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.lock();
        entries.insert(key.to_string(), value.to_string());
        self.flush(&entries)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.lock();
        if entries.remove(key).is_some() {
            self.flush(&entries)?;
        }
        Ok(())
    }
}

/// Default location of local state: `<data_dir>/config-center`.
pub fn default_state_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("config-center")
}

/// Typed access to the layout and notes records.
pub struct LocalRecords {
    store: Box<dyn KeyValueStore>,
}

impl LocalRecords {
    pub fn new(store: Box<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// The persisted display order. A corrupt record reads as empty.
    pub fn layout(&self) -> Vec<String> {
        self.read_json(LAYOUT_KEY).unwrap_or_default()
    }

    /// Overwrite the display order in a single write.
    pub fn save_layout(&self, names: &[String]) -> Result<()> {
        let encoded = serde_json::to_string(names)?;
        self.store.set(LAYOUT_KEY, &encoded)
    }

    pub fn clear_layout(&self) -> Result<()> {
        self.store.remove(LAYOUT_KEY)
    }

    /// All notes. A corrupt record reads as empty.
    pub fn notes(&self) -> BTreeMap<String, String> {
        self.read_json(NOTES_KEY).unwrap_or_default()
    }

    pub fn note(&self, name: &str) -> String {
        self.notes().remove(name).unwrap_or_default()
    }

    /// Set a module's note. An empty note removes the entry.
    pub fn set_note(&self, name: &str, text: &str) -> Result<()> {
        let mut notes = self.notes();
        if text.is_empty() {
            notes.remove(name);
        } else {
            notes.insert(name.to_string(), text.to_string());
        }
        let encoded = serde_json::to_string(&notes)?;
        self.store.set(NOTES_KEY, &encoded)
    }

    fn read_json<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.store.get(key)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key, "ignoring corrupt local record: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_corrupt_layout_reads_as_empty() {
        let store = MemoryStore::new();
        store.set(LAYOUT_KEY, "not json").unwrap();
        let records = LocalRecords::new(Box::new(store));
        assert!(records.layout().is_empty());
    }

    #[test]
    fn test_empty_note_removes_entry() {
        let records = LocalRecords::new(Box::new(MemoryStore::new()));
        records.set_note("camera", "check exposure").unwrap();
        records.set_note("camera", "").unwrap();
        assert!(records.notes().is_empty());
    }
}
