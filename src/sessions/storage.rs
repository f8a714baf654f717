//! Key-value backends for the session store.
//! Mirrors the browser's local storage: string keys, string values.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use super::StoreError;

pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    fn set(&mut self, key: &str, value: String) -> Result<(), StoreError>;

    fn delete(&mut self, key: &str) -> Result<(), StoreError>;

    fn list_keys(&self) -> Result<Vec<String>, StoreError>;
}

/// In-memory backend; nothing survives the process.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    data: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.data.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), StoreError> {
        self.data.insert(key.to_string(), value);
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<(), StoreError> {
        self.data.remove(key);
        Ok(())
    }

    fn list_keys(&self) -> Result<Vec<String>, StoreError> {
        let mut keys: Vec<String> = self.data.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}

/// Backend persisted as a single JSON object on disk, rewritten on every change.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    data: BTreeMap<String, String>,
}

impl FileStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let data = if path.exists() {
            let raw = fs::read_to_string(&path)
                .map_err(|err| StoreError::Backend(format!("{}: {err}", path.display())))?;
            serde_json::from_str(&raw).map_err(|err| StoreError::Corrupt(err.to_string()))?
        } else {
            BTreeMap::new()
        };
        Ok(Self { path, data })
    }

    fn flush(&self) -> Result<(), StoreError> {
        let raw = serde_json::to_string_pretty(&self.data)?;
        fs::write(&self.path, raw)
            .map_err(|err| StoreError::Backend(format!("{}: {err}", self.path.display())))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.data.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), StoreError> {
        self.data.insert(key.to_string(), value);
        self.flush()
    }

    fn delete(&mut self, key: &str) -> Result<(), StoreError> {
        if self.data.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }

    fn list_keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.data.keys().cloned().collect())
    }
}
