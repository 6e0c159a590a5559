//! Geometry memory for floating windows.
//!
//! The last observed popup bounds are kept in an external key-value store so
//! that new floating windows open where the user last left one.

use crate::capability::{KeyValueStore, SettingsStore};
use crate::{StorageError, WindowGeometry};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, warn};

/// Storage key holding the last floating-window geometry.
pub const SETTINGS_KEY: &str = "lastWindowSettings";

/// [`SettingsStore`] backed by a [`KeyValueStore`].
#[derive(Debug)]
pub struct WindowSettingsStore<K> {
    store: K,
}

impl<K: KeyValueStore> WindowSettingsStore<K> {
    pub fn new(store: K) -> Self {
        Self { store }
    }

    /// Access the underlying key-value store.
    pub fn store(&self) -> &K {
        &self.store
    }
}

impl<K: KeyValueStore> SettingsStore for WindowSettingsStore<K> {
    async fn get(&self) -> WindowGeometry {
        match self.store.get(SETTINGS_KEY).await {
            Ok(Some(value)) => match serde_json::from_value(value) {
                Ok(geometry) => geometry,
                Err(e) => {
                    warn!("Ignoring malformed stored window geometry: {}", e);
                    WindowGeometry::default()
                }
            },
            Ok(None) => WindowGeometry::default(),
            Err(e) => {
                warn!("{}. Using default window geometry.", e);
                WindowGeometry::default()
            }
        }
    }

    async fn save(&self, geometry: WindowGeometry) {
        let value = match serde_json::to_value(geometry) {
            Ok(value) => value,
            Err(e) => {
                warn!("Failed to encode window geometry: {}", e);
                return;
            }
        };

        match self.store.set(SETTINGS_KEY, value).await {
            Ok(()) => debug!(
                "Saved window geometry {}x{} at ({}, {})",
                geometry.width, geometry.height, geometry.left, geometry.top
            ),
            Err(e) => warn!("{}", e),
        }
    }
}

/// In-process [`KeyValueStore`] with no persistence.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, serde_json::Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, StorageError> {
        let entries = self.entries.lock().map_err(|e| StorageError::Read {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: serde_json::Value) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().map_err(|e| StorageError::Write {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        entries.insert(key.to_string(), value);
        Ok(())
    }
}
