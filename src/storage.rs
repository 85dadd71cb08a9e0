//! Key/value persistence for the recipe history, modelled on browser local
//! storage: string keys mapping to serialized JSON strings.

use std::{
    collections::BTreeMap,
    fs, io,
    path::{Path, PathBuf},
};

use thiserror::Error;

pub const SAVED_RECIPES_KEY: &str = "savedRecipes";
pub const LAST_ACTIVE_RECIPE_KEY: &str = "lastActiveRecipeId";
pub const SIDEBAR_EXPANDED_KEY: &str = "sidebarExpanded";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("failed to write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },

    #[error("malformed storage file {path}: {source}")]
    Malformed {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("storage rejected write to {0}")]
    Rejected(String),
}

pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}

/// Stores every key in a single JSON object on disk, rewritten on each change.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl FileStorage {
    /// Opens the store at `path`. A missing file is an empty store.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        let values = match fs::read_to_string(&path) {
            Ok(serialized) => serde_json::from_str(&serialized).map_err(|source| {
                StorageError::Malformed {
                    path: path.clone(),
                    source,
                }
            })?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(StorageError::Read { path, source }),
        };
        Ok(FileStorage { path, values })
    }

    /// An empty store that replaces whatever is at `path` on the first write.
    pub fn empty(path: impl AsRef<Path>) -> Self {
        FileStorage {
            path: path.as_ref().to_path_buf(),
            values: BTreeMap::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), StorageError> {
        let serialized = serde_json::to_string_pretty(&self.values).map_err(|e| {
            StorageError::Write {
                path: self.path.clone(),
                source: io::Error::new(io::ErrorKind::InvalidData, e),
            }
        })?;
        fs::write(&self.path, serialized).map_err(|source| StorageError::Write {
            path: self.path.clone(),
            source,
        })
    }
}

impl KeyValueStore for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.values.insert(key.to_string(), value.to_string());
        self.flush()
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        if self.values.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }
}

/// Non-durable store, optionally refusing every write.
#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    values: BTreeMap<String, String>,
    reject_writes: bool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose writes always fail, like a browser store over quota.
    pub fn rejecting_writes() -> Self {
        MemoryStorage {
            values: BTreeMap::new(),
            reject_writes: true,
        }
    }

    pub fn with_value(mut self, key: &str, value: &str) -> Self {
        self.values.insert(key.to_string(), value.to_string());
        self
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }
}

impl KeyValueStore for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        if self.reject_writes {
            return Err(StorageError::Rejected(key.to_string()));
        }
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        if self.reject_writes {
            return Err(StorageError::Rejected(key.to_string()));
        }
        self.values.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_opens_empty() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::open(dir.path().join("absent.json")).unwrap();
        assert_eq!(storage.get(SAVED_RECIPES_KEY).unwrap(), None);
    }

    #[test]
    fn values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");

        let mut storage = FileStorage::open(&path).unwrap();
        storage.set(SIDEBAR_EXPANDED_KEY, "true").unwrap();
        storage.set(LAST_ACTIVE_RECIPE_KEY, "recipe-1").unwrap();
        storage.remove(LAST_ACTIVE_RECIPE_KEY).unwrap();

        let reopened = FileStorage::open(&path).unwrap();
        assert_eq!(
            reopened.get(SIDEBAR_EXPANDED_KEY).unwrap().as_deref(),
            Some("true")
        );
        assert_eq!(reopened.get(LAST_ACTIVE_RECIPE_KEY).unwrap(), None);
    }

    #[test]
    fn malformed_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        fs::write(&path, "{ not json").unwrap();

        let err = FileStorage::open(&path).unwrap_err();
        assert!(matches!(err, StorageError::Malformed { .. }));
    }

    #[test]
    fn write_into_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = FileStorage::empty(dir.path().join("nested").join("storage.json"));

        let err = storage.set(SAVED_RECIPES_KEY, "[]").unwrap_err();
        assert!(matches!(err, StorageError::Write { .. }));
        assert_eq!(storage.get(SAVED_RECIPES_KEY).unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn rejecting_store_refuses_writes() {
        let mut storage = MemoryStorage::rejecting_writes();
        assert!(storage.set(SAVED_RECIPES_KEY, "[]").is_err());
        assert!(!storage.contains_key(SAVED_RECIPES_KEY));
    }
}
