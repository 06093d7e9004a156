//! Persistent store adapter.
//!
//! Two backends hold raw bytes under string keys:
//!
//! - [`MemStore`](mem::MemStore): volatile, DashMap-backed, with an optional byte quota
//! - [`DurableStore`](durable::DurableStore): ACID transactions in a redb file
//!
//! [`RecordStore`] layers JSON encoding on top. It owns no business logic: loads
//! never fail (missing or corrupt records read as `None`), saves report a
//! [`StoreError`] and the caller decides what to tell the user.

pub mod durable;
pub mod mem;

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::StoreError;

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Key of the persisted user profile record.
pub const PROFILE_KEY: &str = "profile";
/// Key of the persisted mood history record.
pub const HISTORY_KEY: &str = "history";

/// Raw key-value backend. Last write wins per key.
pub trait KvBackend: Send + Sync {
    /// Read a value. `Ok(None)` when the key was never written.
    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Insert or replace a value.
    fn put(&self, key: &str, value: &[u8]) -> StoreResult<()>;

    /// Delete a key. Returns whether it existed.
    fn remove(&self, key: &str) -> StoreResult<bool>;
}

/// JSON records over a shared backend.
#[derive(Clone)]
pub struct RecordStore {
    backend: Arc<dyn KvBackend>,
}

impl RecordStore {
    pub fn new(backend: Arc<dyn KvBackend>) -> Self {
        Self { backend }
    }

    /// A record store over a fresh unbounded [`mem::MemStore`].
    pub fn memory_only() -> Self {
        Self::new(Arc::new(mem::MemStore::new()))
    }

    /// The shared backend, for handing to a background writer.
    pub fn backend(&self) -> Arc<dyn KvBackend> {
        Arc::clone(&self.backend)
    }

    /// Load and decode a record.
    ///
    /// Missing keys, unreadable backends and non-parseable payloads all yield
    /// `None`; the latter two are logged.
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let bytes = self.load_bytes(key)?;
        match serde_json::from_slice(&bytes) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key, error = %e, "discarding corrupt record");
                None
            }
        }
    }

    /// Load a record as an untyped JSON value, for migrations that merge
    /// defaults field by field.
    pub fn load_value(&self, key: &str) -> Option<serde_json::Value> {
        self.load(key)
    }

    /// Encode and write a record.
    pub fn save<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> StoreResult<()> {
        let bytes = encode(key, value)?;
        self.backend.put(key, &bytes)
    }

    /// Delete a record. Returns whether it existed.
    pub fn remove(&self, key: &str) -> StoreResult<bool> {
        self.backend.remove(key)
    }

    fn load_bytes(&self, key: &str) -> Option<Vec<u8>> {
        match self.backend.get(key) {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(key, error = %e, "record read failed, using defaults");
                None
            }
        }
    }
}

impl std::fmt::Debug for RecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordStore").finish_non_exhaustive()
    }
}

/// Serialize a record to JSON bytes.
pub fn encode<T: Serialize + ?Sized>(key: &str, value: &T) -> StoreResult<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| StoreError::Serialization {
        key: key.to_string(),
        message: e.to_string(),
    })
}
