//! Settings Storage Abstraction
//!
//! Durable key-value preferences that survive reloads (liked episodes,
//! last volume). Browser hosts back this with `localStorage`, the desktop
//! host with SQLite.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{BridgeError, Result};

/// Key-value settings storage trait
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::SettingsStore;
///
/// async fn remember_volume(store: &dyn SettingsStore, volume: f64) -> Result<()> {
///     store.set_f64("volume", volume).await
/// }
/// ```
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Store a string value
    async fn set_string(&self, key: &str, value: &str) -> Result<()>;

    /// Retrieve a string value
    async fn get_string(&self, key: &str) -> Result<Option<String>>;

    /// Store a boolean value
    async fn set_bool(&self, key: &str, value: bool) -> Result<()>;

    /// Retrieve a boolean value
    async fn get_bool(&self, key: &str) -> Result<Option<bool>>;

    /// Store a floating-point value
    async fn set_f64(&self, key: &str, value: f64) -> Result<()>;

    /// Retrieve a floating-point value
    async fn get_f64(&self, key: &str) -> Result<Option<f64>>;

    /// Delete a setting
    async fn delete(&self, key: &str) -> Result<()>;

    /// Check if a setting exists
    async fn has_key(&self, key: &str) -> Result<bool> {
        Ok(self.get_string(key).await?.is_some())
    }

    /// List all setting keys
    async fn list_keys(&self) -> Result<Vec<String>>;
}

/// Read a JSON-encoded value stored under `key`.
///
/// A missing key yields `Ok(None)`; a value that fails to parse is an error so
/// callers can decide whether to discard it.
pub async fn get_json<T: DeserializeOwned>(
    store: &dyn SettingsStore,
    key: &str,
) -> Result<Option<T>> {
    match store.get_string(key).await? {
        Some(raw) => serde_json::from_str(&raw).map(Some).map_err(|e| {
            BridgeError::OperationFailed(format!("Corrupt setting '{}': {}", key, e))
        }),
        None => Ok(None),
    }
}

/// Store `value` as JSON under `key`.
pub async fn set_json<T: Serialize + Sync>(
    store: &dyn SettingsStore,
    key: &str,
    value: &T,
) -> Result<()> {
    let raw = serde_json::to_string(value)
        .map_err(|e| BridgeError::OperationFailed(format!("Serialize '{}': {}", key, e)))?;
    store.set_string(key, &raw).await
}
