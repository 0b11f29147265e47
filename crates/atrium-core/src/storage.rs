//! Persisted key/value state
//!
//! Values are opaque strings keyed by name and scope. The extension crates
//! store JSON string arrays here (auto-update allow/deny lists, dismissed
//! notification keys).

use crate::error::{Error, Result};
use camino::{Utf8Path, Utf8PathBuf};
use fs4::fs_std::FileExt;
use std::collections::{BTreeMap, HashMap};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::sync::{Mutex, PoisonError};
use tracing::warn;

/// Visibility of a stored value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageScope {
    /// Local to the active user profile
    Profile,
    /// Shared by every profile
    Application,
}

impl StorageScope {
    fn file_name(&self) -> &'static str {
        match self {
            Self::Profile => "profile.json",
            Self::Application => "application.json",
        }
    }
}

/// Key/value store for opaque string blobs
pub trait StateStorage: Send + Sync {
    fn get(&self, key: &str, scope: StorageScope) -> Result<Option<String>>;

    fn store(&self, key: &str, value: &str, scope: StorageScope) -> Result<()>;

    fn remove(&self, key: &str, scope: StorageScope) -> Result<()>;
}

/// Read a JSON string array; missing or malformed values read as empty
pub fn read_string_list(
    storage: &dyn StateStorage,
    key: &str,
    scope: StorageScope,
) -> Result<Vec<String>> {
    let Some(raw) = storage.get(key, scope)? else {
        return Ok(Vec::new());
    };
    match serde_json::from_str::<Vec<String>>(&raw) {
        Ok(list) => Ok(list),
        Err(e) => {
            warn!("Ignoring malformed value for '{}': {}", key, e);
            Ok(Vec::new())
        }
    }
}

/// Write a JSON string array; an empty list removes the key
pub fn write_string_list(
    storage: &dyn StateStorage,
    key: &str,
    scope: StorageScope,
    list: &[String],
) -> Result<()> {
    if list.is_empty() {
        return storage.remove(key, scope);
    }
    let raw = serde_json::to_string(list)?;
    storage.store(key, &raw, scope)
}

/// In-memory storage
#[derive(Debug, Default)]
pub struct MemoryStateStorage {
    values: Mutex<HashMap<(StorageScope, String), String>>,
}

impl MemoryStateStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStorage for MemoryStateStorage {
    fn get(&self, key: &str, scope: StorageScope) -> Result<Option<String>> {
        let values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(values.get(&(scope, key.to_string())).cloned())
    }

    fn store(&self, key: &str, value: &str, scope: StorageScope) -> Result<()> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.insert((scope, key.to_string()), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str, scope: StorageScope) -> Result<()> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.remove(&(scope, key.to_string()));
        Ok(())
    }
}

/// File-backed storage: one JSON object per scope under a directory
pub struct FileStateStorage {
    dir: Utf8PathBuf,
}

impl FileStateStorage {
    /// Open (creating if needed) a storage directory
    pub fn open(dir: impl Into<Utf8PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Utf8Path {
        &self.dir
    }

    fn scope_path(&self, scope: StorageScope) -> Utf8PathBuf {
        self.dir.join(scope.file_name())
    }

    fn read_map(&self, scope: StorageScope) -> Result<BTreeMap<String, String>> {
        let path = self.scope_path(scope);
        if !path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = fs::read_to_string(&path)?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&content).map_err(|e| {
            Error::invalid_config(format!("Corrupt state file {}: {}", path, e))
        })
    }

    /// Read-modify-write a scope file under an exclusive lock
    fn update<F>(&self, scope: StorageScope, mutate: F) -> Result<()>
    where
        F: FnOnce(&mut BTreeMap<String, String>),
    {
        let lock_path = self.dir.join(format!("{}.lock", scope.file_name()));
        let lock_file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)?;
        lock_file.lock_exclusive()?;

        let mut map = self.read_map(scope)?;
        mutate(&mut map);

        let path = self.scope_path(scope);
        let temp_path = path.with_extension("json.tmp");
        {
            let mut temp_file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&temp_path)?;
            temp_file.write_all(serde_json::to_string_pretty(&map)?.as_bytes())?;
            temp_file.sync_all()?;
        }
        fs::rename(&temp_path, &path)?;

        // Lock is released when `lock_file` is dropped
        Ok(())
    }
}

impl StateStorage for FileStateStorage {
    fn get(&self, key: &str, scope: StorageScope) -> Result<Option<String>> {
        Ok(self.read_map(scope)?.get(key).cloned())
    }

    fn store(&self, key: &str, value: &str, scope: StorageScope) -> Result<()> {
        self.update(scope, |map| {
            map.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str, scope: StorageScope) -> Result<()> {
        self.update(scope, |map| {
            map.remove(key);
        })
    }
}
