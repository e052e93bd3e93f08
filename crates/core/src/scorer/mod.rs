//! Candidate scorer - ranks catalog entries against a title query.
//!
//! External ids win outright. Without an id hit, a canonical-title match is
//! preferred over a token overlap. Every candidate carries the method that
//! produced it so callers can tell strong matches from fuzzy ones.

mod policy;

pub use policy::ScoringPolicy;

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::index::{CatalogEntry, CatalogIndex};
use crate::normalize::{key_from_tokens, normalize_imdb_id, normalize_tmdb_id, tokenize};

/// How a candidate was matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMethod {
    TmdbId,
    ImdbId,
    TitleCanonical,
    TitleTokens,
}

impl MatchMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchMethod::TmdbId => "tmdb_id",
            MatchMethod::ImdbId => "imdb_id",
            MatchMethod::TitleCanonical => "title_canonical",
            MatchMethod::TitleTokens => "title_tokens",
        }
    }

    /// Matched through an external id.
    pub fn is_id(&self) -> bool {
        matches!(self, MatchMethod::TmdbId | MatchMethod::ImdbId)
    }

    /// Id or canonical-title match.
    pub fn is_strong(&self) -> bool {
        !matches!(self, MatchMethod::TitleTokens)
    }
}

impl std::fmt::Display for MatchMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A title query with its matching keys precomputed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogQuery {
    pub title_tokens: BTreeSet<String>,
    pub canonical_key: String,
    pub tmdb: Option<String>,
    pub imdb: Option<String>,
    pub year: Option<i32>,
}

impl CatalogQuery {
    /// Build a query from caller-supplied metadata.
    ///
    /// Ids are normalized the same way catalog ids are; ids that do not
    /// survive normalization are dropped.
    pub fn new(title: &str, year: Option<i32>, tmdb: Option<&str>, imdb: Option<&str>) -> Self {
        let title_tokens = tokenize(title);
        Self {
            canonical_key: key_from_tokens(&title_tokens),
            title_tokens,
            tmdb: tmdb.and_then(normalize_tmdb_id),
            imdb: imdb.and_then(normalize_imdb_id),
            year,
        }
    }

    pub fn has_ids(&self) -> bool {
        self.tmdb.is_some() || self.imdb.is_some()
    }

    /// Nothing to match on.
    pub fn is_empty(&self) -> bool {
        !self.has_ids() && self.title_tokens.is_empty()
    }
}

/// A scored catalog entry.
#[derive(Debug, Clone, Serialize)]
pub struct Candidate {
    pub entry: Arc<CatalogEntry>,
    pub confidence: f32,
    pub method: MatchMethod,
    /// Tie-breaker within a confidence band.
    pub score: i64,
}

impl Candidate {
    pub fn series_id(&self) -> i64 {
        self.entry.series_id
    }

    /// Whether `self` should rank ahead of `other`.
    fn beats(&self, other: &Candidate) -> bool {
        (self.confidence, self.score) > (other.confidence, other.score)
    }
}

const ID_BASE_SCORE: i64 = 1000;
const CANONICAL_BASE_SCORE: i64 = 500;
const TOKEN_OVERLAP_SCORE: i64 = 100;
const EXTRA_TOKEN_PENALTY: i64 = 5;

/// Rank catalog entries against `query`.
///
/// Returns at most one candidate per series, best first. Ordering is by
/// confidence, then score, then ascending series id, so equal inputs always
/// produce the same list.
pub fn rank(index: &CatalogIndex, query: &CatalogQuery, policy: &ScoringPolicy) -> Vec<Candidate> {
    let mut best: HashMap<i64, Candidate> = HashMap::new();
    let mut offer = |candidate: Candidate| {
        let replace = best
            .get(&candidate.series_id())
            .is_none_or(|current| candidate.beats(current));
        if replace {
            best.insert(candidate.series_id(), candidate);
        }
    };

    if let Some(tmdb) = &query.tmdb {
        for entry in index.lookup_tmdb(tmdb) {
            offer(id_candidate(entry, MatchMethod::TmdbId, query, policy));
        }
    }
    if let Some(imdb) = &query.imdb {
        for entry in index.lookup_imdb(imdb) {
            offer(id_candidate(entry, MatchMethod::ImdbId, query, policy));
        }
    }

    if !query.canonical_key.is_empty() {
        for entry in index.lookup_canonical(&query.canonical_key) {
            let delta = year_delta(query.year, entry.year);
            if let Some(confidence) = policy.canonical_confidence(delta) {
                offer(Candidate {
                    entry: Arc::clone(entry),
                    confidence,
                    method: MatchMethod::TitleCanonical,
                    score: CANONICAL_BASE_SCORE + year_bonus(delta),
                });
            }
        }
    }

    for entry in token_pool(index, &query.title_tokens) {
        if let Some(candidate) = token_candidate(&entry, query, policy) {
            offer(candidate);
        }
    }

    let mut ranked: Vec<Candidate> = best.into_values().collect();
    ranked.sort_by(|a, b| {
        b.confidence
            .total_cmp(&a.confidence)
            .then(b.score.cmp(&a.score))
            .then(a.series_id().cmp(&b.series_id()))
    });
    ranked
}

fn id_candidate(
    entry: &Arc<CatalogEntry>,
    method: MatchMethod,
    query: &CatalogQuery,
    policy: &ScoringPolicy,
) -> Candidate {
    let (confidence, _) = policy.band(method);
    Candidate {
        entry: Arc::clone(entry),
        confidence,
        method,
        score: ID_BASE_SCORE + year_bonus(year_delta(query.year, entry.year)),
    }
}

/// Every entry sharing at least one token with the query, once each.
fn token_pool(index: &CatalogIndex, tokens: &BTreeSet<String>) -> Vec<Arc<CatalogEntry>> {
    let mut seen = HashMap::new();
    for token in tokens {
        for entry in index.lookup_token(token) {
            seen.entry(entry.series_id).or_insert_with(|| Arc::clone(entry));
        }
    }
    seen.into_values().collect()
}

fn token_candidate(
    entry: &Arc<CatalogEntry>,
    query: &CatalogQuery,
    policy: &ScoringPolicy,
) -> Option<Candidate> {
    let query_len = query.title_tokens.len();
    let overlap = query.title_tokens.intersection(&entry.title_tokens).count();
    if !policy.accepts_overlap(overlap, query_len) {
        return None;
    }

    let delta = year_delta(query.year, entry.year);
    if delta.is_some_and(|d| d > policy.max_year_delta) {
        return None;
    }

    let coverage = overlap as f32 / query_len as f32;
    let extra = entry.title_tokens.len().saturating_sub(overlap) as i64;
    Some(Candidate {
        entry: Arc::clone(entry),
        confidence: policy.token_confidence(coverage),
        method: MatchMethod::TitleTokens,
        score: overlap as i64 * TOKEN_OVERLAP_SCORE + year_bonus(delta)
            - extra * EXTRA_TOKEN_PENALTY,
    })
}

/// Absolute year difference, when both sides know their year.
fn year_delta(query: Option<i32>, entry: Option<i32>) -> Option<i32> {
    Some((query? - entry?).abs())
}

fn year_bonus(delta: Option<i32>) -> i64 {
    match delta {
        Some(0) => 20,
        Some(1) => 10,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::RawCatalogEntry;

    fn entry(id: i64, name: &str) -> RawCatalogEntry {
        RawCatalogEntry {
            id,
            name: name.to_string(),
            tmdb: None,
            imdb: None,
            year: None,
        }
    }

    fn with_ids(id: i64, name: &str, tmdb: Option<&str>, imdb: Option<&str>) -> RawCatalogEntry {
        RawCatalogEntry {
            tmdb: tmdb.map(String::from),
            imdb: imdb.map(String::from),
            ..entry(id, name)
        }
    }

    fn with_year(id: i64, name: &str, year: i32) -> RawCatalogEntry {
        RawCatalogEntry {
            year: Some(year),
            ..entry(id, name)
        }
    }

    fn ranked_ids(candidates: &[Candidate]) -> Vec<i64> {
        candidates.iter().map(Candidate::series_id).collect()
    }

    #[test]
    fn test_query_normalizes_ids() {
        let query = CatalogQuery::new("Dark", None, Some("0070523"), Some("TT5753856"));
        assert_eq!(query.tmdb.as_deref(), Some("70523"));
        assert_eq!(query.imdb.as_deref(), Some("tt5753856"));
        assert!(query.has_ids());
        assert!(CatalogQuery::new("The", None, None, None).is_empty());
    }

    #[test]
    fn test_id_match_outranks_exact_title() {
        let index = CatalogIndex::build(vec![
            entry(1, "Shameless"),
            with_ids(2, "Shameless (US) 4K", Some("34307"), None),
        ]);
        let query = CatalogQuery::new("Shameless", None, Some("34307"), None);
        let ranked = rank(&index, &query, &ScoringPolicy::default());

        assert_eq!(ranked[0].series_id(), 2);
        assert_eq!(ranked[0].method, MatchMethod::TmdbId);
        assert_eq!(ranked[0].confidence, 0.98);
        assert_eq!(ranked[1].series_id(), 1);
        assert_eq!(ranked[1].method, MatchMethod::TitleCanonical);
    }

    #[test]
    fn test_imdb_beats_tmdb() {
        let index = CatalogIndex::build(vec![
            with_ids(1, "Dark", Some("70523"), None),
            with_ids(2, "Dark", None, Some("tt5753856")),
        ]);
        let query = CatalogQuery::new("Dark", None, Some("70523"), Some("tt5753856"));
        let ranked = rank(&index, &query, &ScoringPolicy::default());
        assert_eq!(ranked_ids(&ranked), vec![2, 1]);
        assert_eq!(ranked[0].method, MatchMethod::ImdbId);
    }

    #[test]
    fn test_best_method_kept_per_series() {
        let index = CatalogIndex::build(vec![with_ids(1, "Dark", Some("70523"), None)]);
        let query = CatalogQuery::new("Dark", None, Some("70523"), None);
        let ranked = rank(&index, &query, &ScoringPolicy::default());
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].method, MatchMethod::TmdbId);
    }

    #[test]
    fn test_canonical_year_bands() {
        let index = CatalogIndex::build(vec![
            with_year(1, "The Office", 2005),
            with_year(2, "Office, The", 2006),
            entry(3, "THE OFFICE"),
        ]);
        let query = CatalogQuery::new("The Office", Some(2005), None, None);
        let ranked = rank(&index, &query, &ScoringPolicy::default());

        let confidences: Vec<(i64, f32)> = ranked.iter().map(|c| (c.series_id(), c.confidence)).collect();
        assert_eq!(confidences, vec![(1, 0.93), (2, 0.90), (3, 0.88)]);
    }

    #[test]
    fn test_year_delta_over_one_rejects_title_matches() {
        let index = CatalogIndex::build(vec![
            with_year(1, "Doctor Who", 1963),
            with_year(2, "Doctor Who", 2005),
        ]);
        let query = CatalogQuery::new("Doctor Who", Some(2005), None, None);
        let ranked = rank(&index, &query, &ScoringPolicy::default());
        assert_eq!(ranked_ids(&ranked), vec![2]);
    }

    #[test]
    fn test_year_delta_does_not_reject_id_matches() {
        let index = CatalogIndex::build(vec![with_ids(1, "Doctor Who (1963)", Some("121"), None)]);
        let query = CatalogQuery::new("Doctor Who", Some(2005), Some("121"), None);
        let ranked = rank(&index, &query, &ScoringPolicy::default());
        assert_eq!(ranked_ids(&ranked), vec![1]);
        assert_eq!(ranked[0].method, MatchMethod::TmdbId);
    }

    #[test]
    fn test_token_overlap_bands() {
        let index = CatalogIndex::build(vec![
            entry(1, "Star Trek Strange New Worlds"),
            entry(2, "Strange New Worlds Documentary"),
            entry(3, "Star Wars"),
        ]);
        // Six query tokens: star trek strange new worlds extended.
        let query = CatalogQuery::new("Star Trek Strange New Worlds Extended", None, None, None);
        let ranked = rank(&index, &query, &ScoringPolicy::default());

        let by_id: HashMap<i64, &Candidate> = ranked.iter().map(|c| (c.series_id(), c)).collect();
        // 5 of 6 tokens (0.83): strong band.
        assert_eq!(by_id[&1].confidence, 0.82);
        assert_eq!(by_id[&1].method, MatchMethod::TitleTokens);
        // 3 of 6 tokens overlap, accepted by the two-token floor.
        assert_eq!(by_id[&2].confidence, 0.76);
        // Only "star" overlaps: one of six.
        assert!(!by_id.contains_key(&3));
        assert_eq!(ranked[0].series_id(), 1);
    }

    #[test]
    fn test_single_token_query_needs_full_coverage() {
        let index = CatalogIndex::build(vec![entry(1, "Andor Rogue Origins"), entry(2, "Fargo")]);
        let query = CatalogQuery::new("Andor", None, None, None);
        let ranked = rank(&index, &query, &ScoringPolicy::default());
        assert_eq!(ranked_ids(&ranked), vec![1]);
        assert_eq!(ranked[0].confidence, 0.86);
    }

    #[test]
    fn test_token_year_rejection() {
        let index = CatalogIndex::build(vec![with_year(1, "Battlestar Galactica Reimagined", 1978)]);
        let query = CatalogQuery::new("Battlestar Galactica", Some(2004), None, None);
        assert!(rank(&index, &query, &ScoringPolicy::default()).is_empty());
    }

    #[test]
    fn test_extra_tokens_penalized_within_band() {
        let index = CatalogIndex::build(vec![
            entry(1, "Blue Planet Special Making Documentary"),
            entry(2, "Blue Planet Documentary"),
        ]);
        let query = CatalogQuery::new("Blue Planet Documentary Series Two", None, None, None);
        let ranked = rank(&index, &query, &ScoringPolicy::default());
        assert_eq!(ranked_ids(&ranked), vec![2, 1]);
        assert!(ranked[0].score > ranked[1].score);
    }

    #[test]
    fn test_ties_broken_by_lower_series_id() {
        let index = CatalogIndex::build(vec![entry(30, "Fargo"), entry(10, "Fargo"), entry(20, "Fargo")]);
        let query = CatalogQuery::new("Fargo", None, None, None);
        let ranked = rank(&index, &query, &ScoringPolicy::default());
        assert_eq!(ranked_ids(&ranked), vec![10, 20, 30]);
    }

    #[test]
    fn test_empty_query_yields_nothing() {
        let index = CatalogIndex::build(vec![entry(1, "Fargo")]);
        let query = CatalogQuery::new("", None, None, None);
        assert!(rank(&index, &query, &ScoringPolicy::default()).is_empty());
    }

    #[test]
    fn test_match_method_flags() {
        assert!(MatchMethod::TmdbId.is_id());
        assert!(!MatchMethod::TitleCanonical.is_id());
        assert!(MatchMethod::TitleCanonical.is_strong());
        assert!(!MatchMethod::TitleTokens.is_strong());
        assert_eq!(MatchMethod::TitleTokens.to_string(), "title_tokens");
    }
}
