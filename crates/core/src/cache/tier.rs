//! One cache tier: a bounded LRU in memory, mirrored to a [`KvStore`].

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use lru::LruCache;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{KvStore, StoreError};
use crate::metrics::CACHE_LOOKUPS;

/// Key under which shared-record tiers persist their whole map.
const SHARED_RECORD_KEY: &str = "entries";

/// Longest TTL honoured (100 years); larger values are clamped.
const MAX_TTL_SECS: u64 = 100 * 365 * 24 * 60 * 60;

/// A value with the time it was stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stamped<V> {
    pub stored_at: DateTime<Utc>,
    pub value: V,
}

impl<V> Stamped<V> {
    pub fn now(value: V) -> Self {
        Self {
            stored_at: Utc::now(),
            value,
        }
    }
}

/// Result of a tier lookup. Stale values are still returned; the caller
/// decides whether to use them.
#[derive(Debug, Clone, PartialEq)]
pub struct Lookup<V> {
    pub value: V,
    pub fresh: bool,
    pub stored_at: DateTime<Utc>,
}

/// How a tier maps onto the persistent store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Persistence {
    /// One store record per key. Memory holds only the hottest keys; a
    /// memory miss falls through to the store.
    PerKey,
    /// All entries in one store record, loaded eagerly. Capacity evicts
    /// for good.
    SharedRecord,
}

/// A named cache tier with its own TTL, capacity and lock.
pub struct CacheTier<V> {
    name: &'static str,
    ttl: Duration,
    persistence: Persistence,
    entries: Mutex<LruCache<String, Stamped<V>>>,
    store: Arc<dyn KvStore>,
    // Serializes shared-record writes so a newer snapshot is never
    // overwritten by an older one.
    persist_lock: Mutex<()>,
}

impl<V> CacheTier<V>
where
    V: Clone + Serialize + DeserializeOwned,
{
    /// Create a tier. `name` is both the store namespace and the metric label.
    pub fn new(
        name: &'static str,
        ttl_secs: u64,
        capacity: usize,
        persistence: Persistence,
        store: Arc<dyn KvStore>,
    ) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        let tier = Self {
            name,
            ttl: Duration::seconds(ttl_secs.min(MAX_TTL_SECS) as i64),
            persistence,
            entries: Mutex::new(LruCache::new(capacity)),
            store,
            persist_lock: Mutex::new(()),
        };
        if persistence == Persistence::SharedRecord {
            tier.load_shared_record();
        }
        tier
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Entries currently held in memory.
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Look up `key`, marking it most recently used.
    pub fn get(&self, key: &str) -> Option<Lookup<V>> {
        let cached = self.entries.lock().unwrap().get(key).cloned();
        let stamped = match cached {
            Some(stamped) => Some(stamped),
            None if self.persistence == Persistence::PerKey => self.load_key(key),
            None => None,
        };

        let lookup = stamped.map(|s| Lookup {
            fresh: self.is_fresh(s.stored_at),
            stored_at: s.stored_at,
            value: s.value,
        });

        let outcome = match &lookup {
            Some(l) if l.fresh => "hit",
            Some(_) => "stale",
            None => "miss",
        };
        CACHE_LOOKUPS.with_label_values(&[self.name, outcome]).inc();
        debug!(tier = self.name, key, outcome, "Cache lookup");

        lookup
    }

    /// Store `value` stamped now.
    pub fn put(&self, key: &str, value: V) {
        self.put_stamped(key, Stamped::now(value));
    }

    /// Store a value with an explicit timestamp.
    pub fn put_stamped(&self, key: &str, stamped: Stamped<V>) {
        let record = match self.persistence {
            Persistence::PerKey => Some(stamped.clone()),
            Persistence::SharedRecord => None,
        };
        self.entries.lock().unwrap().put(key.to_string(), stamped);

        let result = match record {
            Some(record) => self.save_key(key, &record),
            None => self.save_shared_record(),
        };
        if let Err(e) = result {
            warn!(tier = self.name, key, error = %e, "Failed to persist cache entry");
        }
    }

    /// Drop `key` from memory and from the store.
    pub fn remove(&self, key: &str) {
        self.entries.lock().unwrap().pop(key);
        let result = match self.persistence {
            Persistence::PerKey => self.store.remove(self.name, key),
            Persistence::SharedRecord => self.save_shared_record(),
        };
        if let Err(e) = result {
            warn!(tier = self.name, key, error = %e, "Failed to remove cache entry");
        }
    }

    fn is_fresh(&self, stored_at: DateTime<Utc>) -> bool {
        Utc::now() - stored_at < self.ttl
    }

    fn load_key(&self, key: &str) -> Option<Stamped<V>> {
        let raw = match self.store.get(self.name, key) {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(tier = self.name, key, error = %e, "Failed to read cache entry");
                return None;
            }
        };
        match serde_json::from_str::<Stamped<V>>(&raw) {
            Ok(stamped) => {
                self.entries
                    .lock()
                    .unwrap()
                    .put(key.to_string(), stamped.clone());
                Some(stamped)
            }
            Err(e) => {
                warn!(tier = self.name, key, error = %e, "Discarding undecodable cache entry");
                None
            }
        }
    }

    fn save_key(&self, key: &str, stamped: &Stamped<V>) -> Result<(), StoreError> {
        let json =
            serde_json::to_string(stamped).map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.store.set(self.name, key, &json)
    }

    fn load_shared_record(&self) {
        let raw = match self.store.get(self.name, SHARED_RECORD_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return,
            Err(e) => {
                warn!(tier = self.name, error = %e, "Failed to read cache record");
                return;
            }
        };
        let items: Vec<(String, Stamped<V>)> = match serde_json::from_str(&raw) {
            Ok(items) => items,
            Err(e) => {
                warn!(tier = self.name, error = %e, "Discarding undecodable cache record");
                return;
            }
        };

        let mut entries = self.entries.lock().unwrap();
        // Stored oldest first, so the last one loaded ends up most recent.
        for (key, stamped) in items {
            entries.put(key, stamped);
        }
        debug!(tier = self.name, entries = entries.len(), "Loaded cache record");
    }

    fn save_shared_record(&self) -> Result<(), StoreError> {
        let _guard = self.persist_lock.lock().unwrap();
        let items: Vec<(String, Stamped<V>)> = {
            let entries = self.entries.lock().unwrap();
            entries
                .iter()
                .rev()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect()
        };
        let json =
            serde_json::to_string(&items).map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.store.set(self.name, SHARED_RECORD_KEY, &json)
    }
}
