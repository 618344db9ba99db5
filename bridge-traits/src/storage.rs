//! Blob Storage Abstraction
//!
//! Provides a platform-agnostic key→bytes store used to keep raw downloaded
//! icon bytes across launches.

use bytes::Bytes;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::{BridgeError, Result};

/// Persistent key→bytes store
///
/// Keys are icon URLs. Implementations decide how keys map onto storage
/// (hashed file names on desktop, IndexedDB keys on web, ...).
///
/// Calls are synchronous: the engine consults the store once when an icon URL
/// is first seen and writes to it from background tasks only. Implementations
/// must be safe to call from any thread.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::BlobStore;
///
/// fn remember(store: &dyn BlobStore, url: &str, data: Bytes) -> Result<()> {
///     if store.get(url)?.is_none() {
///         store.put(url, data)?;
///     }
///     Ok(())
/// }
/// ```
pub trait BlobStore: Send + Sync {
    /// Retrieve the bytes stored under `key`
    ///
    /// # Returns
    ///
    /// Returns `Ok(None)` if the key doesn't exist.
    fn get(&self, key: &str) -> Result<Option<Bytes>>;

    /// Store `data` under `key`, replacing any previous value
    fn put(&self, key: &str, data: Bytes) -> Result<()>;

    /// Check if a key exists without retrieving it
    fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }
}

/// In-memory blob store
///
/// Nothing survives the process. Useful for tests and for hosts that keep icon
/// bytes elsewhere.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    entries: RwLock<HashMap<String, Bytes>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.entries.read().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl BlobStore for MemoryBlobStore {
    fn get(&self, key: &str) -> Result<Option<Bytes>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| BridgeError::OperationFailed("blob store lock poisoned".to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn put(&self, key: &str, data: Bytes) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| BridgeError::OperationFailed("blob store lock poisoned".to_string()))?;
        entries.insert(key.to_string(), data);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_blob_store_round_trip() {
        let store = MemoryBlobStore::new();
        assert!(store.is_empty());
        assert_eq!(store.get("https://example.com/favicon.ico").unwrap(), None);

        store
            .put("https://example.com/favicon.ico", Bytes::from_static(b"ico"))
            .unwrap();

        assert_eq!(store.len(), 1);
        assert!(store.contains("https://example.com/favicon.ico").unwrap());
        assert_eq!(
            store.get("https://example.com/favicon.ico").unwrap(),
            Some(Bytes::from_static(b"ico"))
        );
    }

    #[test]
    fn test_memory_blob_store_replaces_value() {
        let store = MemoryBlobStore::new();
        store.put("key", Bytes::from_static(b"old")).unwrap();
        store.put("key", Bytes::from_static(b"new")).unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.get("key").unwrap(), Some(Bytes::from_static(b"new")));
    }
}
