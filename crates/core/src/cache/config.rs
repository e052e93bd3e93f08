//! Cache configuration.

use serde::{Deserialize, Serialize};

/// TTLs and capacities for the four cache tiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// How long a catalog snapshot stays fresh (seconds).
    /// Stale snapshots are still served when a refresh fails.
    #[serde(default = "default_catalog_ttl")]
    pub catalog_ttl_secs: u64,

    /// How long a series' episode list stays fresh (seconds).
    #[serde(default = "default_episodes_ttl")]
    pub episodes_ttl_secs: u64,

    /// How long a resolved episode stays fresh (seconds).
    #[serde(default = "default_resolved_ttl")]
    pub resolved_ttl_secs: u64,

    /// How long a series binding stays valid (seconds).
    #[serde(default = "default_binding_ttl")]
    pub binding_ttl_secs: u64,

    /// Catalog snapshots kept in memory (one per provider and kind).
    #[serde(default = "default_memory_catalogs")]
    pub memory_catalogs: usize,

    /// Episode lists kept in memory. Older lists are reloaded from the store.
    #[serde(default = "default_memory_episode_lists")]
    pub memory_episode_lists: usize,

    /// Resolved episodes kept before least-recently-used eviction.
    #[serde(default = "default_resolved_capacity")]
    pub resolved_capacity: usize,

    /// Series bindings kept before least-recently-used eviction.
    #[serde(default = "default_binding_capacity")]
    pub binding_capacity: usize,
}

fn default_catalog_ttl() -> u64 {
    6 * 60 * 60 // 6 hours
}

fn default_episodes_ttl() -> u64 {
    12 * 60 * 60 // 12 hours
}

fn default_resolved_ttl() -> u64 {
    7 * 24 * 60 * 60 // 7 days
}

fn default_binding_ttl() -> u64 {
    30 * 24 * 60 * 60 // 30 days
}

fn default_memory_catalogs() -> usize {
    4
}

fn default_memory_episode_lists() -> usize {
    256
}

fn default_resolved_capacity() -> usize {
    2000
}

fn default_binding_capacity() -> usize {
    2000
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            catalog_ttl_secs: default_catalog_ttl(),
            episodes_ttl_secs: default_episodes_ttl(),
            resolved_ttl_secs: default_resolved_ttl(),
            binding_ttl_secs: default_binding_ttl(),
            memory_catalogs: default_memory_catalogs(),
            memory_episode_lists: default_memory_episode_lists(),
            resolved_capacity: default_resolved_capacity(),
            binding_capacity: default_binding_capacity(),
        }
    }
}
