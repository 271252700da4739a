mod collections;
mod errors;
mod file_storage;
mod memory_storage;
#[cfg(test)]
mod tests;

pub use collections::{
    active_account_key, load_collection, load_value, save_collection, save_value, ACCOUNTS_KEY, CURRENT_USER_KEY,
    TRANSACTIONS_KEY, USERS_KEY
};
pub use errors::StorageError;
pub use file_storage::FileStorage;
pub use memory_storage::MemoryStorage;

/// A flat string key-value store, the shape of browser local storage.
///
/// Values are whole serialized collections; callers read, modify and write back.
pub trait Storage: Send + Sync + 'static {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set_item(&self, key: &str, value: String) -> Result<(), StorageError>;
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;
}
