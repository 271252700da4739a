use crate::storage::{Storage, StorageError};
use dashmap::DashMap;
use std::sync::Arc;

/// Process local storage, lost on exit.
#[derive(Default)]
pub struct MemoryStorage {
    items: Arc<DashMap<String, String>>
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            items: Arc::new(DashMap::new())
        }
    }
}

impl Storage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.items.get(key).map(|item| item.value().clone()))
    }

    fn set_item(&self, key: &str, value: String) -> Result<(), StorageError> {
        self.items.insert(key.to_string(), value);
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.items.remove(key);
        Ok(())
    }
}
