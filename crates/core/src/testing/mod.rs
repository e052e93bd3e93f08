//! Testing utilities and mock implementations.
//!
//! This module provides a mock catalog provider and fixtures for driving
//! the resolver end to end without a real IPTV backend.
//!
//! # Example
//!
//! ```rust,ignore
//! use streamfind_core::testing::{MockProvider, fixtures};
//!
//! let provider = MockProvider::new();
//! provider.set_catalog(CatalogKind::Series, fixtures::office_catalog()).await;
//! provider.set_episodes(1, fixtures::episode_payload(&[(1, 1, 101)])).await;
//!
//! // Build a Resolver over Arc::new(provider.clone())...
//! ```

mod mock_provider;

pub use mock_provider::MockProvider;

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::collections::BTreeMap;

    use serde_json::{json, Map, Value};

    use crate::index::RawCatalogEntry;
    use crate::provider::ProviderCredentials;

    /// Credentials for a fake provider account.
    pub fn credentials() -> ProviderCredentials {
        ProviderCredentials::new("http://iptv.test:8080", "tester", "secret")
    }

    /// A catalog entry without external ids.
    pub fn raw_entry(id: i64, name: &str, year: Option<i32>) -> RawCatalogEntry {
        RawCatalogEntry {
            id,
            name: name.to_string(),
            tmdb: None,
            imdb: None,
            year,
        }
    }

    /// A catalog entry carrying a TMDB id.
    pub fn raw_entry_with_tmdb(id: i64, name: &str, tmdb: &str) -> RawCatalogEntry {
        RawCatalogEntry {
            tmdb: Some(tmdb.to_string()),
            ..raw_entry(id, name, None)
        }
    }

    /// Two series sharing a title, a year apart in origin.
    pub fn office_catalog() -> Vec<RawCatalogEntry> {
        vec![
            raw_entry(1, "The Office", Some(2005)),
            raw_entry(2, "The Office (UK)", Some(2001)),
        ]
    }

    /// Episode payload in the season-keyed shape most providers use.
    ///
    /// Each tuple is `(season, episode, stream_id)`.
    pub fn episode_payload(episodes: &[(u32, u32, i64)]) -> Value {
        let mut seasons: BTreeMap<u32, Vec<Value>> = BTreeMap::new();
        for &(season, episode, stream_id) in episodes {
            seasons.entry(season).or_default().push(json!({
                "id": stream_id.to_string(),
                "episode_num": episode,
                "season": season,
                "title": format!("S{:02}E{:02}", season, episode),
                "container_extension": "mkv",
            }));
        }
        let seasons: Map<String, Value> = seasons
            .into_iter()
            .map(|(season, records)| (season.to_string(), Value::Array(records)))
            .collect();
        json!({
            "info": {"name": "fixture"},
            "episodes": seasons,
        })
    }
}
