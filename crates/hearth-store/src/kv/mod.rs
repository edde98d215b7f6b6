//! String-keyed storage backends.
//!
//! Every value is a whole JSON document and every write replaces it. There
//! is no atomicity across keys: a read-modify-write of two collections can
//! be observed half-applied by another process sharing the same partition.

mod file;
mod memory;
mod sqlite;

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Result, StoreError};

pub use file::FileStore;
pub use memory::MemoryStore;
pub use sqlite::{default_data_dir, SqliteStore};

/// Synchronous string-keyed storage.
pub trait KeyValueStore: Send + Sync {
    /// Read the value under `key`, or `None` if it was never written.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Overwrite the value under `key`.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Delete `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<()>;

    /// Delete every key in the partition.
    fn clear(&self) -> Result<()>;
}

/// Shared handle to a backend, cloned into every store component.
pub type SharedKv = Arc<dyn KeyValueStore>;

/// Decode the JSON document under `key`, or `T::default()` if absent.
pub fn load<T>(kv: &dyn KeyValueStore, key: &str) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    match kv.get(key)? {
        Some(raw) => serde_json::from_str(&raw).map_err(|source| {
            tracing::error!(key, error = %source, "persisted value failed to decode");
            StoreError::Corrupt {
                key: key.to_string(),
                source,
            }
        }),
        None => Ok(T::default()),
    }
}

/// Encode `value` as JSON and overwrite `key` with it.
pub fn save<T>(kv: &dyn KeyValueStore, key: &str, value: &T) -> Result<()>
where
    T: Serialize + ?Sized,
{
    let raw = serde_json::to_string(value)?;
    kv.set(key, &raw)
}

/// Read a boolean marker. Anything other than `true` counts as unset.
pub fn flag(kv: &dyn KeyValueStore, key: &str) -> Result<bool> {
    Ok(kv.get(key)?.as_deref() == Some("true"))
}

/// Set or remove a boolean marker.
pub fn set_flag(kv: &dyn KeyValueStore, key: &str, on: bool) -> Result<()> {
    if on {
        kv.set(key, "true")
    } else {
        kv.remove(key)
    }
}

pub(crate) fn validate_key(key: &str) -> Result<()> {
    let ok = !key.is_empty()
        && key
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_');
    if ok {
        Ok(())
    } else {
        Err(StoreError::InvalidKey(key.to_string()))
    }
}
