use super::{
    active_account_key, load_collection, load_value, save_collection, save_value, FileStorage, MemoryStorage, Storage,
    StorageError
};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use tempfile::tempdir;
use uuid::Uuid;

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct Entry {
    id: u32,
    label: String
}

fn entries() -> Vec<Entry> {
    vec![
        Entry { id: 1, label: "one".to_string() },
        Entry { id: 2, label: "two".to_string() }
    ]
}

#[test]
fn test_memory_storage_basic_get_set_and_remove() -> Result<()> {
    let storage = MemoryStorage::new();

    assert!(storage.get_item("missing")?.is_none());

    storage.set_item("key", "value".to_string())?;
    assert_eq!(storage.get_item("key")?.as_deref(), Some("value"));

    storage.set_item("key", "replaced".to_string())?;
    assert_eq!(storage.get_item("key")?.as_deref(), Some("replaced"));

    storage.remove_item("key")?;
    assert!(storage.get_item("key")?.is_none());

    Ok(())
}

#[test]
fn test_collections_round_trip_through_storage() -> Result<()> {
    let storage = MemoryStorage::new();

    let empty: Vec<Entry> = load_collection(&storage, "entries")?;
    assert!(empty.is_empty());

    save_collection(&storage, "entries", &entries())?;
    let loaded: Vec<Entry> = load_collection(&storage, "entries")?;

    assert_eq!(loaded, entries());

    Ok(())
}

#[test]
fn test_corrupt_collection_reports_the_key() -> Result<()> {
    let storage = MemoryStorage::new();
    storage.set_item("entries", "{not json".to_string())?;

    let result: Result<Vec<Entry>, StorageError> = load_collection(&storage, "entries");

    match result {
        Err(StorageError::Serialization { key, .. }) => assert_eq!(key, "entries"),
        other => panic!("expected serialization error, got {other:?}")
    }

    Ok(())
}

#[test]
fn test_file_storage_persists_across_reopen() -> Result<()> {
    let directory = tempdir()?;
    let path = directory.path().join("store.json");

    {
        let storage = FileStorage::open(&path)?;
        save_collection(&storage, "entries", &entries())?;
        save_value(&storage, "selected", &7u32)?;
    }

    let reopened = FileStorage::open(&path)?;
    let loaded: Vec<Entry> = load_collection(&reopened, "entries")?;
    let selected: Option<u32> = load_value(&reopened, "selected")?;

    assert_eq!(loaded, entries());
    assert_eq!(selected, Some(7));

    reopened.remove_item("selected")?;
    let reopened = FileStorage::open(&path)?;
    assert!(reopened.get_item("selected")?.is_none());

    Ok(())
}

#[test]
fn test_file_storage_starts_empty_when_file_is_missing() -> Result<()> {
    let directory = tempdir()?;
    let storage = FileStorage::open(directory.path().join("absent.json"))?;

    assert!(storage.get_item("users")?.is_none());
    assert!(!storage.path().exists());

    Ok(())
}

#[test]
fn test_active_account_key_is_scoped_per_user() {
    let user_id = Uuid::new_v4();

    assert_eq!(active_account_key(user_id), format!("activeAccount_{user_id}"));
    assert_ne!(active_account_key(user_id), active_account_key(Uuid::new_v4()));
}

#[test]
fn test_file_storage_keeps_previous_state_when_write_fails() -> Result<()> {
    let directory = tempdir()?;
    let path = directory.path().join("store.json");
    let storage = FileStorage::open(&path)?;

    storage.set_item("key", "original".to_string())?;

    //NOTE: a directory in place of the file makes every flush fail
    std::fs::remove_file(&path)?;
    std::fs::create_dir(&path)?;

    assert!(matches!(storage.set_item("key", "replaced".to_string()), Err(StorageError::Io { .. })));
    assert!(matches!(storage.set_item("other", "added".to_string()), Err(StorageError::Io { .. })));
    assert!(matches!(storage.remove_item("key"), Err(StorageError::Io { .. })));

    assert_eq!(storage.get_item("key")?.as_deref(), Some("original"));
    assert!(storage.get_item("other")?.is_none());

    Ok(())
}
