use serde_json::{Map, Value};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tabfloat_core::{KeyValueStore, StorageError};
use tracing::warn;

/// [`KeyValueStore`] persisting a single JSON object to disk.
///
/// Every `set` rewrites the whole file through a temporary sibling so a crash
/// mid-write never leaves a truncated file behind.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the default location in the user's data directory.
    pub fn open_default() -> Self {
        Self::new(Self::default_path())
    }

    /// Get the default path for the settings file.
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("", "", "tabfloat")
            .map(|dirs| dirs.data_dir().join("settings.json"))
            .unwrap_or_else(|| PathBuf::from("settings.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored object. A missing or corrupt file reads as empty.
    async fn load(&self, key: &str) -> Result<Map<String, Value>, StorageError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => {
                return Err(StorageError::Read {
                    key: key.to_string(),
                    message: format!("{}: {}", self.path.display(), e),
                })
            }
        };

        match serde_json::from_str::<Map<String, Value>>(&content) {
            Ok(map) => Ok(map),
            Err(e) => {
                warn!("Ignoring corrupt settings file {}: {}", self.path.display(), e);
                Ok(Map::new())
            }
        }
    }
}

impl KeyValueStore for JsonFileStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        Ok(self.load(key).await?.remove(key))
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StorageError> {
        let write_error = |message: String| StorageError::Write {
            key: key.to_string(),
            message,
        };

        let mut map = self.load(key).await?;
        map.insert(key.to_string(), value);

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| write_error(format!("{}: {}", parent.display(), e)))?;
        }

        let json = serde_json::to_string_pretty(&map).map_err(|e| write_error(e.to_string()))?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| write_error(format!("{}: {}", tmp.display(), e)))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| write_error(format!("{}: {}", self.path.display(), e)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tabfloat_core::{SettingsStore, WindowGeometry, WindowSettingsStore, SETTINGS_KEY};

    #[tokio::test]
    async fn test_missing_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("settings.json"));
        assert_eq!(store.get("anything").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_creates_parent_dirs_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let store = JsonFileStore::new(&path);
        store.set("answer", json!(42)).await.unwrap();
        store.set("name", json!("tabfloat")).await.unwrap();

        let reopened = JsonFileStore::new(&path);
        assert_eq!(reopened.get("answer").await.unwrap(), Some(json!(42)));
        assert_eq!(reopened.get("name").await.unwrap(), Some(json!("tabfloat")));
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn test_corrupt_file_reads_empty_and_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = JsonFileStore::new(&path);
        assert_eq!(store.get("answer").await.unwrap(), None);

        store.set("answer", json!(1)).await.unwrap();
        assert_eq!(store.get("answer").await.unwrap(), Some(json!(1)));
    }

    #[tokio::test]
    async fn test_unwritable_location_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "file, not a directory").unwrap();

        let store = JsonFileStore::new(blocker.join("settings.json"));
        assert!(store.set("answer", json!(1)).await.is_err());
    }

    #[tokio::test]
    async fn test_geometry_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let settings = WindowSettingsStore::new(JsonFileStore::new(&path));
        settings.save(WindowGeometry::new(700, 500, 20, 30)).await;

        let restarted = WindowSettingsStore::new(JsonFileStore::new(&path));
        assert_eq!(restarted.get().await, WindowGeometry::new(700, 500, 20, 30));

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains(SETTINGS_KEY));
    }

    #[test]
    fn test_default_path() {
        let path = JsonFileStore::default_path();
        assert!(path.to_str().unwrap().ends_with("settings.json"));
    }
}
