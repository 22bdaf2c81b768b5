//! Key-value persistence for the board.
//!
//! Everything the board keeps between sessions is a JSON document stored under a
//! string key. `FileStore` keeps one `<key>.json` file per key in the data
//! directory and writes atomically (temp file + rename); `MemoryStore` backs tests.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{BoardError, Result};

pub const KEY_TASKS: &str = "tasks";
pub const KEY_PERIOD_START: &str = "period_start";
pub const KEY_HISTORY: &str = "history";
pub const KEY_SHOUTOUTS: &str = "shoutouts";
pub const KEY_GOALS: &str = "goals";
pub const KEY_GOAL_ARCHIVE: &str = "goal_archive";
pub const KEY_ACTION_LOG: &str = "action_log";
pub const KEY_PREF_FONT: &str = "pref_font";
pub const KEY_PREF_HIDE_COMPLETED: &str = "pref_hide_completed";
pub const KEY_PREF_HAS_SEEN_HELP: &str = "pref_has_seen_help";

/// String-keyed storage of JSON-encoded values.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: String) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
}

/// Outcome of reading one key.
#[derive(Debug)]
pub enum Loaded<T> {
    Missing,
    Corrupt(serde_json::Error),
    Value(T),
}

/// Read and decode a key.
pub fn load_json<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Loaded<T> {
    match store.get(key) {
        None => Loaded::Missing,
        Some(raw) => match serde_json::from_str(&raw) {
            Ok(v) => Loaded::Value(v),
            Err(e) => Loaded::Corrupt(e),
        },
    }
}

/// Read a key, falling back to `default` when it is missing or unreadable.
pub fn load_or<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str, default: T) -> T {
    match load_json(store, key) {
        Loaded::Value(v) => v,
        Loaded::Missing => default,
        Loaded::Corrupt(e) => {
            tracing::warn!(key, error = %e, "stored value unreadable, using default");
            default
        }
    }
}

/// Encode and write a key.
pub fn save_json<T: Serialize + ?Sized>(store: &mut dyn KeyValueStore, key: &str, value: &T) -> Result<()> {
    let data = serde_json::to_string_pretty(value)?;
    store.set(key, data)
}

/// Directory-backed store: each key lives in `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open a store rooted at `dir`, creating the directory if needed.
    pub fn open(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir).map_err(|source| BoardError::IoPath {
            path: dir.to_path_buf(),
            source,
        })?;
        Ok(FileStore { dir: dir.to_path_buf() })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(s) => Some(s),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to read stored key");
                None
            }
        }
    }

    fn set(&mut self, key: &str, value: String) -> Result<()> {
        // Atomic-ish write via temp + rename.
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        let io_err = |source: std::io::Error| BoardError::IoPath { path: tmp.clone(), source };
        let mut f = File::create(&tmp).map_err(io_err)?;
        f.write_all(value.as_bytes()).map_err(io_err)?;
        f.flush().map_err(io_err)?;
        fs::rename(&tmp, &path).map_err(|source| BoardError::IoPath { path: path.clone(), source })?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(BoardError::IoPath { path, source }),
        }
    }
}

/// In-memory store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) -> Result<()> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_store_round_trips_and_removes() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::open(&dir.path().join("board")).unwrap();
        assert_eq!(store.get("tasks"), None);

        store.set("tasks", "[1,2,3]".into()).unwrap();
        assert_eq!(store.get("tasks").as_deref(), Some("[1,2,3]"));
        assert!(store.dir().join("tasks.json").exists());
        assert!(!store.dir().join("tasks.json.tmp").exists());

        store.remove("tasks").unwrap();
        assert_eq!(store.get("tasks"), None);
        // Removing a missing key is fine.
        store.remove("tasks").unwrap();
    }

    #[test]
    fn corrupt_values_fall_back() {
        let mut store = MemoryStore::new();
        store.set("history", "{not json".into()).unwrap();
        let v: Vec<u32> = load_or(&store, "history", vec![7]);
        assert_eq!(v, vec![7]);
        assert!(matches!(load_json::<Vec<u32>>(&store, "history"), Loaded::Corrupt(_)));
        assert!(matches!(load_json::<Vec<u32>>(&store, "absent"), Loaded::Missing));
    }

    #[test]
    fn save_json_writes_through_trait_object() {
        let mut store = MemoryStore::new();
        save_json(&mut store, "nums", &vec![1, 2]).unwrap();
        let v: Vec<u32> = load_or(&store, "nums", Vec::new());
        assert_eq!(v, vec![1, 2]);
        assert_eq!(store.len(), 1);
    }
}
