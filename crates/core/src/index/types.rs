//! Types for the catalog index.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One row of a provider catalog listing, as fetched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RawCatalogEntry {
    /// Provider series (or VOD stream) id.
    pub id: i64,
    /// Display name, noise included.
    pub name: String,
    /// TMDB id as sent by the provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tmdb: Option<String>,
    /// IMDB id as sent by the provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imdb: Option<String>,
    /// Release year, when the provider sends one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
}

/// A catalog entry with its matching keys precomputed.
///
/// Immutable once built.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CatalogEntry {
    /// Provider series (or VOD stream) id.
    pub series_id: i64,
    /// Name as the provider sent it.
    pub raw_name: String,
    /// Output of [`crate::normalize::normalize`] on the raw name.
    pub normalized_name: String,
    /// Sorted significant tokens joined by spaces; empty if none survive.
    pub canonical_title_key: String,
    /// Significant tokens of the title.
    pub title_tokens: BTreeSet<String>,
    /// Normalized TMDB id (digits only).
    pub external_id_tmdb: Option<String>,
    /// Normalized IMDB id (`tt` + digits).
    pub external_id_imdb: Option<String>,
    /// Release year from the listing or the name.
    pub year: Option<i32>,
}

impl CatalogEntry {
    /// Reconstruct the raw row this entry was built from.
    pub fn to_raw(&self) -> RawCatalogEntry {
        RawCatalogEntry {
            id: self.series_id,
            name: self.raw_name.clone(),
            tmdb: self.external_id_tmdb.clone(),
            imdb: self.external_id_imdb.clone(),
            year: self.year,
        }
    }
}

/// Persisted shape of a catalog index: the raw rows plus build time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct CatalogSnapshot {
    pub built_at: DateTime<Utc>,
    pub entries: Vec<RawCatalogEntry>,
}
