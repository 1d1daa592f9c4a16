use super::{KvStore, StoreError};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

type Entries = BTreeMap<String, String>;

/// Durable store persisted as a JSON object on disk.
///
/// Every key is namespaced as `{application_name}:{key}`, so several
/// applications can share one file without clobbering each other.
pub struct LocalFileStore {
    application_name: String,
    storage_path: PathBuf,
    // serialises read-modify-write cycles within this process
    lock: Mutex<()>,
}

impl LocalFileStore {
    /// Create a store at the default location: ~/.{application_name}/store.json
    pub fn new(application_name: &str) -> Result<Self, StoreError> {
        let storage_path = Self::get_storage_path(application_name)?;
        Self::with_path(application_name, storage_path)
    }

    /// Create a store persisted at `storage_path`
    pub fn with_path(
        application_name: &str,
        storage_path: impl Into<PathBuf>,
    ) -> Result<Self, StoreError> {
        let storage_path = storage_path.into();

        if let Some(parent) = storage_path.parent() {
            fs::create_dir_all(parent)?;
        }

        Ok(Self {
            application_name: application_name.to_string(),
            storage_path,
            lock: Mutex::new(()),
        })
    }

    pub fn storage_path(&self) -> &Path {
        &self.storage_path
    }

    fn get_storage_path(application_name: &str) -> Result<PathBuf, StoreError> {
        let home = dirs::home_dir().ok_or_else(|| {
            StoreError::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "Could not determine home directory",
            ))
        })?;

        Ok(home.join(format!(".{}", application_name)).join("store.json"))
    }

    fn namespaced(&self, key: &str) -> String {
        format!("{}:{}", self.application_name, key)
    }

    fn load(&self) -> Result<Entries, StoreError> {
        match fs::read(&self.storage_path) {
            Ok(bytes) if bytes.is_empty() => Ok(Entries::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Entries::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, entries: &Entries) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(entries)?;
        fs::write(&self.storage_path, json)?;
        Ok(())
    }
}

impl KvStore for LocalFileStore {
    fn get_item(&self, key: &str) -> Result<String, StoreError> {
        let _guard = self
            .lock
            .lock()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))?;

        // an empty value reads the same as an absent one
        self.load()?
            .remove(&self.namespaced(key))
            .filter(|value| !value.is_empty())
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let _guard = self
            .lock
            .lock()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))?;

        let mut entries = self.load()?;
        entries.insert(self.namespaced(key), value.to_string());
        self.save(&entries)?;

        debug!(key = %key, path = %self.storage_path.display(), "Stored item");
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StoreError> {
        let _guard = self
            .lock
            .lock()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))?;

        let mut entries = self.load()?;
        if entries.remove(&self.namespaced(key)).is_none() {
            return Err(StoreError::NotFound(key.to_string()));
        }
        self.save(&entries)?;

        debug!(key = %key, path = %self.storage_path.display(), "Removed item");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_store(dir: &tempfile::TempDir, app: &str) -> LocalFileStore {
        LocalFileStore::with_path(app, dir.path().join("store.json")).unwrap()
    }

    #[test]
    fn test_set_get_remove() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store(&dir, "test");

        store.set_item("refresh_token", "rt").unwrap();
        assert_eq!(store.get_item("refresh_token").unwrap(), "rt");

        store.remove_item("refresh_token").unwrap();
        assert!(store.get_item("refresh_token").unwrap_err().is_not_found());
    }

    #[test]
    fn test_missing_file_reads_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store(&dir, "test");

        assert!(store.get_item("oauth_state").unwrap_err().is_not_found());
        assert!(store.remove_item("oauth_state").unwrap_err().is_not_found());
    }

    #[test]
    fn test_keys_are_namespaced() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store(&dir, "my-app");
        store.set_item("refresh_token", "rt").unwrap();

        let raw: Entries =
            serde_json::from_slice(&fs::read(store.storage_path()).unwrap()).unwrap();
        assert_eq!(raw.get("my-app:refresh_token"), Some(&"rt".to_string()));

        let other = test_store(&dir, "other-app");
        assert!(other.get_item("refresh_token").unwrap_err().is_not_found());
    }

    #[test]
    fn test_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        test_store(&dir, "test")
            .set_item("access_token_expires_at", "1700000000000")
            .unwrap();

        let reopened = test_store(&dir, "test");
        assert_eq!(
            reopened.get_item("access_token_expires_at").unwrap(),
            "1700000000000"
        );
    }

    #[test]
    fn test_empty_value_reads_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store(&dir, "test");
        store.set_item("refresh_token", "").unwrap();

        assert!(store.get_item("refresh_token").unwrap_err().is_not_found());
    }

    #[test]
    fn test_corrupt_file_is_json_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store(&dir, "test");
        fs::write(store.storage_path(), b"not json").unwrap();

        assert!(matches!(
            store.get_item("refresh_token"),
            Err(StoreError::JsonError(_))
        ));
    }
}
