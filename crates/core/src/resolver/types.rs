//! Types for the resolution orchestrator.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::provider::CatalogKind;

/// Request to resolve one episode of a series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolveEpisodeRequest {
    pub title: String,
    pub season: u32,
    pub episode: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tmdb_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imdb_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    /// When false, only cached data is used.
    #[serde(default = "default_allow_network")]
    pub allow_network: bool,
}

impl ResolveEpisodeRequest {
    pub fn new(title: impl Into<String>, season: u32, episode: u32) -> Self {
        Self {
            title: title.into(),
            season,
            episode,
            tmdb_id: None,
            imdb_id: None,
            year: None,
            allow_network: true,
        }
    }

    pub fn with_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    pub fn with_tmdb(mut self, tmdb_id: impl Into<String>) -> Self {
        self.tmdb_id = Some(tmdb_id.into());
        self
    }

    pub fn with_imdb(mut self, imdb_id: impl Into<String>) -> Self {
        self.imdb_id = Some(imdb_id.into());
        self
    }

    pub fn offline(mut self) -> Self {
        self.allow_network = false;
        self
    }
}

/// Request to resolve a movie.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolveMovieRequest {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tmdb_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imdb_id: Option<String>,
    #[serde(default = "default_allow_network")]
    pub allow_network: bool,
}

/// Request to warm the caches for a series ahead of a lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrefetchSeriesRequest {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tmdb_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imdb_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
}

fn default_allow_network() -> bool {
    true
}

/// The cached answer for one (query, season, episode).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedEpisode {
    pub stream_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_extension: Option<String>,
    pub series_id: i64,
    /// Season of the matched episode, which may differ from the request.
    pub season: u32,
    /// Episode number of the matched episode.
    pub episode: u32,
    pub confidence: f32,
    /// Match method name, or `series_binding`.
    pub method: String,
    pub resolved_at: DateTime<Utc>,
}

/// Sticky mapping from a query identity to the series that answered it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesBinding {
    pub query_key: String,
    pub series_id: i64,
}

/// Orchestrator states, in order of progression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionState {
    Idle,
    BindingCheck,
    CatalogReady,
    Probing,
    Resolved,
    Exhausted,
}

impl ResolutionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionState::Idle => "idle",
            ResolutionState::BindingCheck => "binding_check",
            ResolutionState::CatalogReady => "catalog_ready",
            ResolutionState::Probing => "probing",
            ResolutionState::Resolved => "resolved",
            ResolutionState::Exhausted => "exhausted",
        }
    }
}

impl fmt::Display for ResolutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a resolution's answer came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionSource {
    /// Fresh resolved-episode cache entry.
    Cache,
    /// Expired resolved-episode entry, used because nothing better was found.
    StaleCache,
    /// Series binding, without ranking.
    Binding,
    /// Ranked catalog candidates.
    Catalog,
}

impl ResolutionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionSource::Cache => "cached",
            ResolutionSource::StaleCache => "stale",
            ResolutionSource::Binding => "binding",
            ResolutionSource::Catalog => "resolved",
        }
    }
}

/// Full outcome of an episode resolution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EpisodeResolution {
    pub result: Option<ResolvedEpisode>,
    pub final_state: ResolutionState,
    /// Candidates whose episode list was consulted.
    pub candidates_probed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<ResolutionSource>,
}

impl EpisodeResolution {
    pub(crate) fn exhausted(candidates_probed: usize) -> Self {
        Self {
            result: None,
            final_state: ResolutionState::Exhausted,
            candidates_probed,
            source: None,
        }
    }

    pub(crate) fn resolved(
        result: ResolvedEpisode,
        candidates_probed: usize,
        source: ResolutionSource,
    ) -> Self {
        Self {
            result: Some(result),
            final_state: ResolutionState::Resolved,
            candidates_probed,
            source: Some(source),
        }
    }
}

/// Errors surfaced by the public resolver API.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The request cannot be answered by any means.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Data-source failures. Logged and degraded internally, never surfaced.
#[derive(Debug, Clone, Error)]
pub enum SourceError {
    #[error("Catalog unavailable ({provider}, {kind}): {reason}")]
    CatalogUnavailable {
        provider: String,
        kind: CatalogKind,
        reason: String,
    },

    #[error("Episode list unavailable for series {series_id}: {reason}")]
    EpisodeListUnavailable { series_id: i64, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_episode_request_defaults_to_network() {
        let json = r#"{"title": "Dark", "season": 1, "episode": 2}"#;
        let req: ResolveEpisodeRequest = serde_json::from_str(json).unwrap();
        assert!(req.allow_network);
        assert_eq!(req, ResolveEpisodeRequest::new("Dark", 1, 2));
    }

    #[test]
    fn test_state_serialization() {
        assert_eq!(
            serde_json::to_string(&ResolutionState::BindingCheck).unwrap(),
            "\"binding_check\""
        );
        assert_eq!(ResolutionState::Exhausted.to_string(), "exhausted");
    }
}
