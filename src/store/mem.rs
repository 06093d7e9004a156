//! Volatile storage backed by DashMap.
//!
//! Used for tests and for sessions without a data directory. An optional byte
//! quota caps the total payload size the way browser storage does.

use dashmap::DashMap;

use crate::error::StoreError;
use crate::store::{KvBackend, StoreResult};

/// Concurrent in-memory backend using a sharded hashmap.
#[derive(Debug, Default)]
pub struct MemStore {
    data: DashMap<String, Vec<u8>>,
    quota: Option<usize>,
}

impl MemStore {
    /// Create an empty, unbounded store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that refuses writes once the summed payload size
    /// would exceed `quota` bytes.
    pub fn with_quota(quota: usize) -> Self {
        Self {
            data: DashMap::new(),
            quota: Some(quota),
        }
    }

    /// Total payload bytes currently held.
    pub fn used_bytes(&self) -> usize {
        self.data.iter().map(|entry| entry.value().len()).sum()
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl KvBackend for MemStore {
    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.data.get(key).map(|v| v.value().clone()))
    }

    fn put(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        if let Some(quota) = self.quota {
            let replaced = self.data.get(key).map(|v| v.len()).unwrap_or(0);
            let needed = self.used_bytes() - replaced + value.len();
            if needed > quota {
                return Err(StoreError::QuotaExceeded {
                    key: key.to_string(),
                    needed,
                    quota,
                });
            }
        }
        self.data.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<bool> {
        Ok(self.data.remove(key).is_some())
    }
}
