//! Persistent storage for the PixelForge client.
//!
//! This crate provides the key-value port the session layer persists
//! through, with two backends:
//! - **File**: a JSON object under `~/.pixelforge/storage.json`
//! - **Memory**: process-local, for tests and throwaway sessions

mod file;
mod keys;
mod memory;
mod traits;

pub use file::FileStorage;
pub use keys::StorageKeys;
pub use memory::MemoryStorage;
pub use traits::KeyValueStorage;

use std::path::PathBuf;
use thiserror::Error;

/// Error type for storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// No usable location for the storage file
    #[error("Storage location unavailable: {0}")]
    Location(String),

    /// Encoding/decoding error
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Default location of the storage file.
pub fn default_storage_path() -> StorageResult<PathBuf> {
    dirs::home_dir()
        .map(|home| home.join(".pixelforge").join("storage.json"))
        .ok_or_else(|| StorageError::Location("home directory not found".to_string()))
}

/// Create the default file-backed storage.
pub fn create_storage() -> StorageResult<Box<dyn KeyValueStorage>> {
    let storage = FileStorage::open(default_storage_path()?)?;
    Ok(Box::new(storage))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_keys_are_distinct() {
        assert!(!StorageKeys::TOKEN.is_empty());
        assert!(!StorageKeys::SESSION.is_empty());
        assert_ne!(StorageKeys::TOKEN, StorageKeys::SESSION);
    }

    #[test]
    fn test_default_storage_path() {
        if let Ok(path) = default_storage_path() {
            assert!(path.ends_with(".pixelforge/storage.json"));
        }
    }
}
