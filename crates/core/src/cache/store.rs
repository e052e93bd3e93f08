//! Persistent key/value store behind the cache tiers.

use std::collections::HashMap;
use std::sync::Mutex;

use thiserror::Error;

/// Errors from a persistent store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Namespaced string store with no TTL of its own.
///
/// Freshness is tracked by the cache tiers through a timestamp stored with
/// each value.
pub trait KvStore: Send + Sync {
    /// Read a value, `None` if absent.
    fn get(&self, namespace: &str, key: &str) -> Result<Option<String>, StoreError>;

    /// Insert or overwrite a value.
    fn set(&self, namespace: &str, key: &str, value: &str) -> Result<(), StoreError>;

    /// Delete a value. Deleting a missing key is not an error.
    fn remove(&self, namespace: &str, key: &str) -> Result<(), StoreError>;
}

/// In-memory store for tests and ephemeral runs.
#[derive(Debug, Default)]
pub struct MemoryKvStore {
    values: Mutex<HashMap<(String, String), String>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored values across all namespaces.
    pub fn len(&self) -> usize {
        self.values.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KvStore for MemoryKvStore {
    fn get(&self, namespace: &str, key: &str) -> Result<Option<String>, StoreError> {
        let values = self.values.lock().unwrap();
        Ok(values
            .get(&(namespace.to_string(), key.to_string()))
            .cloned())
    }

    fn set(&self, namespace: &str, key: &str, value: &str) -> Result<(), StoreError> {
        let mut values = self.values.lock().unwrap();
        values.insert(
            (namespace.to_string(), key.to_string()),
            value.to_string(),
        );
        Ok(())
    }

    fn remove(&self, namespace: &str, key: &str) -> Result<(), StoreError> {
        let mut values = self.values.lock().unwrap();
        values.remove(&(namespace.to_string(), key.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_namespaces_are_separate() {
        let store = MemoryKvStore::new();
        store.set("catalog", "k", "a").unwrap();
        store.set("episodes", "k", "b").unwrap();

        assert_eq!(store.get("catalog", "k").unwrap().as_deref(), Some("a"));
        assert_eq!(store.get("episodes", "k").unwrap().as_deref(), Some("b"));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_memory_store_overwrite_and_remove() {
        let store = MemoryKvStore::new();
        store.set("ns", "k", "a").unwrap();
        store.set("ns", "k", "b").unwrap();
        assert_eq!(store.get("ns", "k").unwrap().as_deref(), Some("b"));

        store.remove("ns", "k").unwrap();
        store.remove("ns", "missing").unwrap();
        assert!(store.get("ns", "k").unwrap().is_none());
        assert!(store.is_empty());
    }
}
