//! Catalog index - an immutable, queryable view over one provider catalog.
//!
//! Built once per catalog snapshot and replaced wholesale on refresh, so
//! readers holding an `Arc<CatalogIndex>` never see a partial update.
//! Lookups by TMDB id, IMDB id, canonical title and single token are all
//! hash-map hits.

mod types;

pub use types::*;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::normalize::{extract_year, key_from_tokens, normalize, normalize_imdb_id, normalize_tmdb_id, tokenize};

/// Searchable index over a provider catalog.
#[derive(Debug, Clone)]
pub struct CatalogIndex {
    built_at: DateTime<Utc>,
    entries: Vec<Arc<CatalogEntry>>,
    by_id: HashMap<i64, usize>,
    by_tmdb: HashMap<String, Vec<usize>>,
    by_imdb: HashMap<String, Vec<usize>>,
    by_canonical_title: HashMap<String, Vec<usize>>,
    by_token: HashMap<String, Vec<usize>>,
}

impl CatalogIndex {
    /// Build an index from a raw catalog listing, stamped now.
    pub fn build(raw: Vec<RawCatalogEntry>) -> Self {
        Self::build_at(raw, Utc::now())
    }

    /// Build an index with an explicit build time (used when restoring a snapshot).
    ///
    /// Entries with a blank name are skipped. When the same id appears more
    /// than once, the first row wins.
    pub fn build_at(raw: Vec<RawCatalogEntry>, built_at: DateTime<Utc>) -> Self {
        let mut index = Self {
            built_at,
            entries: Vec::with_capacity(raw.len()),
            by_id: HashMap::with_capacity(raw.len()),
            by_tmdb: HashMap::new(),
            by_imdb: HashMap::new(),
            by_canonical_title: HashMap::new(),
            by_token: HashMap::new(),
        };

        for row in raw {
            if row.name.trim().is_empty() || index.by_id.contains_key(&row.id) {
                continue;
            }
            let entry = Self::prepare(row);
            let pos = index.entries.len();

            index.by_id.insert(entry.series_id, pos);
            if let Some(tmdb) = &entry.external_id_tmdb {
                index.by_tmdb.entry(tmdb.clone()).or_default().push(pos);
            }
            if let Some(imdb) = &entry.external_id_imdb {
                index.by_imdb.entry(imdb.clone()).or_default().push(pos);
            }
            if !entry.canonical_title_key.is_empty() {
                index
                    .by_canonical_title
                    .entry(entry.canonical_title_key.clone())
                    .or_default()
                    .push(pos);
            }
            for token in &entry.title_tokens {
                index.by_token.entry(token.clone()).or_default().push(pos);
            }
            index.entries.push(Arc::new(entry));
        }

        index
    }

    fn prepare(row: RawCatalogEntry) -> CatalogEntry {
        let title_tokens = tokenize(&row.name);
        CatalogEntry {
            series_id: row.id,
            normalized_name: normalize(&row.name),
            canonical_title_key: key_from_tokens(&title_tokens),
            title_tokens,
            external_id_tmdb: row.tmdb.as_deref().and_then(normalize_tmdb_id),
            external_id_imdb: row.imdb.as_deref().and_then(normalize_imdb_id),
            year: row.year.or_else(|| extract_year(&row.name)),
            raw_name: row.name,
        }
    }

    /// When this index was built from the network.
    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    /// All indexed entries, in listing order.
    pub fn entries(&self) -> &[Arc<CatalogEntry>] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry with the given provider id.
    pub fn get(&self, series_id: i64) -> Option<&Arc<CatalogEntry>> {
        self.by_id.get(&series_id).map(|&pos| &self.entries[pos])
    }

    /// Entries carrying the given (normalized) TMDB id.
    pub fn lookup_tmdb(&self, tmdb: &str) -> impl Iterator<Item = &Arc<CatalogEntry>> {
        self.resolve(self.by_tmdb.get(tmdb))
    }

    /// Entries carrying the given (normalized) IMDB id.
    pub fn lookup_imdb(&self, imdb: &str) -> impl Iterator<Item = &Arc<CatalogEntry>> {
        self.resolve(self.by_imdb.get(imdb))
    }

    /// Entries whose canonical title key equals `key`.
    pub fn lookup_canonical(&self, key: &str) -> impl Iterator<Item = &Arc<CatalogEntry>> {
        self.resolve(self.by_canonical_title.get(key))
    }

    /// Entries whose title contains `token`.
    pub fn lookup_token(&self, token: &str) -> impl Iterator<Item = &Arc<CatalogEntry>> {
        self.resolve(self.by_token.get(token))
    }

    fn resolve<'a>(
        &'a self,
        positions: Option<&'a Vec<usize>>,
    ) -> impl Iterator<Item = &'a Arc<CatalogEntry>> + 'a {
        positions
            .into_iter()
            .flatten()
            .map(move |&pos| &self.entries[pos])
    }
}

impl Serialize for CatalogIndex {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        CatalogSnapshot {
            built_at: self.built_at,
            entries: self.entries.iter().map(|e| e.to_raw()).collect(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for CatalogIndex {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let snapshot = CatalogSnapshot::deserialize(deserializer)?;
        Ok(Self::build_at(snapshot.entries, snapshot.built_at))
    }
}
