//! Cache hierarchy - four tiers with independent TTLs and locks.
//!
//! | Tier       | Value                | Persistence                  |
//! |------------|----------------------|------------------------------|
//! | `catalog`  | catalog index        | one record per provider/kind |
//! | `episodes` | parsed episode list  | one record per series        |
//! | `resolved` | resolved episode     | one shared LRU record        |
//! | `bindings` | series binding       | one shared LRU record        |
//!
//! Values are replaced wholesale, never mutated in place. Each tier guards
//! only its own structure.

mod config;
mod sqlite;
mod store;
mod tier;

pub use config::CacheConfig;
pub use sqlite::SqliteKvStore;
pub use store::{KvStore, MemoryKvStore, StoreError};
pub use tier::{CacheTier, Lookup, Persistence, Stamped};

use std::sync::Arc;

use crate::episodes::Episode;
use crate::index::CatalogIndex;
use crate::provider::CatalogKind;
use crate::resolver::{ResolvedEpisode, SeriesBinding};

/// All cache tiers, shared by handle with the resolver.
pub struct CacheStore {
    pub catalogs: CacheTier<Arc<CatalogIndex>>,
    pub episodes: CacheTier<Arc<Vec<Episode>>>,
    pub resolved: CacheTier<ResolvedEpisode>,
    pub bindings: CacheTier<SeriesBinding>,
}

impl CacheStore {
    /// Build the tiers over a persistent store. Shared-record tiers load
    /// their contents immediately.
    pub fn new(config: &CacheConfig, store: Arc<dyn KvStore>) -> Self {
        Self {
            catalogs: CacheTier::new(
                "catalog",
                config.catalog_ttl_secs,
                config.memory_catalogs,
                Persistence::PerKey,
                Arc::clone(&store),
            ),
            episodes: CacheTier::new(
                "episodes",
                config.episodes_ttl_secs,
                config.memory_episode_lists,
                Persistence::PerKey,
                Arc::clone(&store),
            ),
            resolved: CacheTier::new(
                "resolved",
                config.resolved_ttl_secs,
                config.resolved_capacity,
                Persistence::SharedRecord,
                Arc::clone(&store),
            ),
            bindings: CacheTier::new(
                "bindings",
                config.binding_ttl_secs,
                config.binding_capacity,
                Persistence::SharedRecord,
                store,
            ),
        }
    }

    /// Tiers backed by a throwaway in-memory store.
    pub fn in_memory(config: &CacheConfig) -> Self {
        Self::new(config, Arc::new(MemoryKvStore::new()))
    }
}

/// Key of a catalog snapshot: `{provider}|{kind}`.
pub fn catalog_key(provider: &str, kind: CatalogKind) -> String {
    format!("{}|{}", provider, kind.as_str())
}

/// Key of a series' episode list: `{provider}|{series_id}`.
pub fn episodes_key(provider: &str, series_id: i64) -> String {
    format!("{}|{}", provider, series_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::RawCatalogEntry;
    use chrono::Utc;

    #[test]
    fn test_keys() {
        assert_eq!(catalog_key("host/user", CatalogKind::Series), "host/user|series");
        assert_eq!(catalog_key("host/user", CatalogKind::Movies), "host/user|movies");
        assert_eq!(episodes_key("host/user", 42), "host/user|42");
    }

    #[test]
    fn test_tiers_survive_restart() {
        let store: Arc<dyn KvStore> = Arc::new(SqliteKvStore::in_memory().unwrap());
        let config = CacheConfig::default();

        {
            let cache = CacheStore::new(&config, Arc::clone(&store));
            let index = CatalogIndex::build(vec![RawCatalogEntry {
                id: 1,
                name: "Dark".to_string(),
                tmdb: Some("70523".to_string()),
                imdb: None,
                year: Some(2017),
            }]);
            cache.catalogs.put("p|series", Arc::new(index));
            cache.episodes.put(
                "p|1",
                Arc::new(vec![Episode {
                    stream_id: 100,
                    season: 1,
                    episode: 1,
                    title: "Secrets".to_string(),
                    container_extension: None,
                }]),
            );
            cache.resolved.put(
                "p|tmdb:70523|s1e1",
                ResolvedEpisode {
                    stream_id: 100,
                    container_extension: None,
                    series_id: 1,
                    season: 1,
                    episode: 1,
                    confidence: 0.98,
                    method: "tmdb_id".to_string(),
                    resolved_at: Utc::now(),
                },
            );
            cache.bindings.put(
                "p|tmdb:70523",
                SeriesBinding {
                    query_key: "tmdb:70523".to_string(),
                    series_id: 1,
                },
            );
        }

        let cache = CacheStore::new(&config, store);
        let catalog = cache.catalogs.get("p|series").unwrap();
        assert!(catalog.fresh);
        assert_eq!(catalog.value.lookup_tmdb("70523").count(), 1);
        assert_eq!(cache.episodes.get("p|1").unwrap().value[0].stream_id, 100);
        assert_eq!(cache.resolved.get("p|tmdb:70523|s1e1").unwrap().value.stream_id, 100);
        assert_eq!(cache.bindings.get("p|tmdb:70523").unwrap().value.series_id, 1);
    }
}
