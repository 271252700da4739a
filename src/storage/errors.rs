use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage I/O error at [{path}]: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error
    },
    #[error("Storage serialization error for key [{key}]: {source}")]
    Serialization {
        key: String,
        #[source]
        source: serde_json::Error
    },
    #[error("Storage lock was poisoned")]
    Poisoned
}
