use crate::storage::{Storage, StorageError};
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

/// Storage backed by a single JSON object on disk.
///
/// The whole file is loaded on open and rewritten after every change, so the
/// file always holds the complete key space. A change only becomes visible
/// once the file write succeeds.
pub struct FileStorage {
    path: PathBuf,
    items: Mutex<BTreeMap<String, String>>
}

impl FileStorage {
    /// Opens the store at `path`; a missing file starts an empty store.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();

        let items: BTreeMap<String, String> = match fs::read_to_string(&path) {
            Ok(contents) if contents.trim().is_empty() => BTreeMap::new(),
            Ok(contents) => serde_json::from_str(&contents).map_err(|source| StorageError::Serialization {
                key: path.display().to_string(),
                source
            })?,
            Err(error) if error.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(StorageError::Io { path, source })
        };

        debug!("Opened store at [{}] with {} keys", path.display(), items.len());

        Ok(Self {
            path,
            items: Mutex::new(items)
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, items: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let contents = serde_json::to_string_pretty(items).map_err(|source| StorageError::Serialization {
            key: self.path.display().to_string(),
            source
        })?;

        fs::write(&self.path, contents).map_err(|source| StorageError::Io {
            path: self.path.clone(),
            source
        })
    }
}

impl Storage for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let items = self.items.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: String) -> Result<(), StorageError> {
        let mut items = self.items.lock().map_err(|_| StorageError::Poisoned)?;
        let mut staged = items.clone();
        staged.insert(key.to_string(), value);

        self.flush(&staged)?;
        *items = staged;

        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let mut items = self.items.lock().map_err(|_| StorageError::Poisoned)?;

        if !items.contains_key(key) {
            return Ok(())
        }

        let mut staged = items.clone();
        staged.remove(key);

        self.flush(&staged)?;
        *items = staged;

        Ok(())
    }
}
