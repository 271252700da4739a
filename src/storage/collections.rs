use crate::storage::{Storage, StorageError};
use crate::types::UserId;
use serde::de::DeserializeOwned;
use serde::Serialize;

pub const USERS_KEY: &str = "users";
pub const ACCOUNTS_KEY: &str = "accounts";
pub const TRANSACTIONS_KEY: &str = "transactions";
pub const CURRENT_USER_KEY: &str = "currentUser";

pub fn active_account_key(user_id: UserId) -> String {
    format!("activeAccount_{user_id}")
}

/// Reads a whole collection; an absent key is an empty collection.
pub fn load_collection<T, S>(storage: &S, key: &str) -> Result<Vec<T>, StorageError>
where
    T: DeserializeOwned,
    S: Storage + ?Sized,
{
    Ok(load_value(storage, key)?.unwrap_or_default())
}

/// Overwrites a whole collection.
pub fn save_collection<T, S>(storage: &S, key: &str, items: &[T]) -> Result<(), StorageError>
where
    T: Serialize,
    S: Storage + ?Sized,
{
    save_value(storage, key, items)
}

pub fn load_value<T, S>(storage: &S, key: &str) -> Result<Option<T>, StorageError>
where
    T: DeserializeOwned,
    S: Storage + ?Sized,
{
    let Some(raw) = storage.get_item(key)? else {
        return Ok(None)
    };

    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|source| StorageError::Serialization { key: key.to_string(), source })
}

pub fn save_value<T, S>(storage: &S, key: &str, value: &T) -> Result<(), StorageError>
where
    T: Serialize + ?Sized,
    S: Storage + ?Sized,
{
    let raw = serde_json::to_string(value)
        .map_err(|source| StorageError::Serialization { key: key.to_string(), source })?;

    storage.set_item(key, raw)
}
