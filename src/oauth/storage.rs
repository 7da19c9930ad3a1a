//! Durable key-value media for the token pair.

use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::AuthError;

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, AuthError>;

    fn set(&self, key: &str, value: &str) -> Result<(), AuthError>;

    fn remove(&self, key: &str) -> Result<(), AuthError>;

    /// Write several entries. Backends that can commit them in one step
    /// should override this.
    fn set_all(&self, entries: &[(&str, &str)]) -> Result<(), AuthError> {
        for (key, value) in entries {
            self.set(key, value)?;
        }
        Ok(())
    }

    fn remove_all(&self, keys: &[&str]) -> Result<(), AuthError> {
        for key in keys {
            self.remove(key)?;
        }
        Ok(())
    }
}

/// Default on-disk location: `~/.jwt-auth/storage.json`.
pub fn default_storage_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".jwt-auth")
        .join("storage.json")
}

/// A JSON object file. Every read goes to disk, so values written by other
/// processes are visible immediately.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<BTreeMap<String, String>, AuthError> {
        let data = match std::fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(e.into()),
        };
        if data.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&data).map_err(|e| AuthError::Storage {
            key: self.path.display().to_string(),
            detail: format!("corrupt storage file: {e}"),
        })
    }

    fn write_map(&self, map: &BTreeMap<String, String>) -> Result<(), AuthError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_string_pretty(map)?;

        // Write a sibling file and rename it over the original so a crash
        // mid-write leaves the previous pair intact.
        let temp_path = self.temp_path();
        {
            let mut file = std::fs::File::create(&temp_path)?;
            file.write_all(data.as_bytes())?;
            file.sync_all()?;
        }
        if let Err(e) = std::fs::rename(&temp_path, &self.path) {
            let _ = std::fs::remove_file(&temp_path);
            return Err(AuthError::Storage {
                key: self.path.display().to_string(),
                detail: format!("cannot replace storage file: {e}"),
            });
        }
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "storage.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn update<F>(&self, f: F) -> Result<(), AuthError>
    where
        F: FnOnce(&mut BTreeMap<String, String>),
    {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut map = self.read_map()?;
        f(&mut map);
        self.write_map(&map)
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, AuthError> {
        Ok(self.read_map()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), AuthError> {
        self.set_all(&[(key, value)])
    }

    fn remove(&self, key: &str) -> Result<(), AuthError> {
        self.remove_all(&[key])
    }

    fn set_all(&self, entries: &[(&str, &str)]) -> Result<(), AuthError> {
        self.update(|map| {
            for (key, value) in entries {
                map.insert((*key).to_string(), (*value).to_string());
            }
        })
    }

    fn remove_all(&self, keys: &[&str]) -> Result<(), AuthError> {
        self.update(|map| {
            for key in keys {
                map.remove(*key);
            }
        })
    }
}

/// In-process store; contents live as long as the value.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, AuthError> {
        Ok(self.entries().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), AuthError> {
        self.entries().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), AuthError> {
        self.entries().remove(key);
        Ok(())
    }

    fn set_all(&self, entries: &[(&str, &str)]) -> Result<(), AuthError> {
        let mut map = self.entries();
        for (key, value) in entries {
            map.insert((*key).to_string(), (*value).to_string());
        }
        Ok(())
    }
}
