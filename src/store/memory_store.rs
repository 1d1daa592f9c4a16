use super::{KvStore, StoreError};
use std::collections::HashMap;
use std::sync::Mutex;

/// Transient store backed by a `HashMap`
#[derive(Default)]
pub struct MemoryStore {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.items.lock().map(|items| items.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KvStore for MemoryStore {
    fn get_item(&self, key: &str) -> Result<String, StoreError> {
        let items = self
            .items
            .lock()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))?;

        // an empty value reads the same as an absent one
        items
            .get(key)
            .filter(|value| !value.is_empty())
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut items = self
            .items
            .lock()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))?;

        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StoreError> {
        let mut items = self
            .items
            .lock()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))?;

        items
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }
}
