//! Key-value persistence for the OAuth state, refresh token and expiry

pub mod local_store;
pub mod memory_store;

pub use local_store::LocalFileStore;
pub use memory_store::MemoryStore;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Key '{0}' not found")]
    NotFound(String),

    #[error("Store lock poisoned: {0}")]
    LockPoisoned(String),

    #[error("Store IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Store JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

/// String key-value store.
///
/// A missing key is always an error: `get_item` and `remove_item` return
/// [`StoreError::NotFound`] for keys that were never set or were removed.
/// An empty value reads as not found.
pub trait KvStore: Send + Sync {
    fn get_item(&self, key: &str) -> Result<String, StoreError>;

    fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError>;

    fn remove_item(&self, key: &str) -> Result<(), StoreError>;
}
