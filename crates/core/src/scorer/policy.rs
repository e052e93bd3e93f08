//! Confidence bands and acceptance thresholds for candidate scoring.
//!
//! These numbers were tuned against real provider catalogs rather than
//! derived; they live here as configuration so they can be retuned without
//! touching the ranking code.

use serde::{Deserialize, Serialize};

use super::MatchMethod;

/// Scoring policy table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringPolicy {
    /// Confidence of an exact TMDB id hit.
    #[serde(default = "default_tmdb_confidence")]
    pub tmdb_confidence: f32,
    /// Confidence of an exact IMDB id hit.
    #[serde(default = "default_imdb_confidence")]
    pub imdb_confidence: f32,
    /// Canonical-title hit with identical years.
    #[serde(default = "default_canonical_exact_year")]
    pub canonical_exact_year: f32,
    /// Canonical-title hit with years one apart.
    #[serde(default = "default_canonical_near_year")]
    pub canonical_near_year: f32,
    /// Canonical-title hit where either side has no year.
    #[serde(default = "default_canonical_unknown_year")]
    pub canonical_unknown_year: f32,
    /// Token overlap covering every query token.
    #[serde(default = "default_token_full")]
    pub token_full: f32,
    /// Token overlap at or above `token_strong_coverage`.
    #[serde(default = "default_token_strong")]
    pub token_strong: f32,
    /// Any other accepted token overlap.
    #[serde(default = "default_token_weak")]
    pub token_weak: f32,
    /// Coverage needed for the `token_strong` band.
    #[serde(default = "default_token_strong_coverage")]
    pub token_strong_coverage: f32,
    /// Multi-token queries: overlapping tokens that accept a candidate on their own.
    #[serde(default = "default_min_overlap_tokens")]
    pub min_overlap_tokens: usize,
    /// Multi-token queries: coverage that accepts a candidate on its own.
    #[serde(default = "default_min_coverage")]
    pub min_coverage: f32,
    /// Largest year difference still considered the same title.
    #[serde(default = "default_max_year_delta")]
    pub max_year_delta: i32,
}

fn default_tmdb_confidence() -> f32 {
    0.98
}

fn default_imdb_confidence() -> f32 {
    0.99
}

fn default_canonical_exact_year() -> f32 {
    0.93
}

fn default_canonical_near_year() -> f32 {
    0.90
}

fn default_canonical_unknown_year() -> f32 {
    0.88
}

fn default_token_full() -> f32 {
    0.86
}

fn default_token_strong() -> f32 {
    0.82
}

fn default_token_weak() -> f32 {
    0.76
}

fn default_token_strong_coverage() -> f32 {
    0.8
}

fn default_min_overlap_tokens() -> usize {
    2
}

fn default_min_coverage() -> f32 {
    0.6
}

fn default_max_year_delta() -> i32 {
    1
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            tmdb_confidence: default_tmdb_confidence(),
            imdb_confidence: default_imdb_confidence(),
            canonical_exact_year: default_canonical_exact_year(),
            canonical_near_year: default_canonical_near_year(),
            canonical_unknown_year: default_canonical_unknown_year(),
            token_full: default_token_full(),
            token_strong: default_token_strong(),
            token_weak: default_token_weak(),
            token_strong_coverage: default_token_strong_coverage(),
            min_overlap_tokens: default_min_overlap_tokens(),
            min_coverage: default_min_coverage(),
            max_year_delta: default_max_year_delta(),
        }
    }
}

impl ScoringPolicy {
    /// Lowest and highest confidence a method can produce.
    pub fn band(&self, method: MatchMethod) -> (f32, f32) {
        match method {
            MatchMethod::TmdbId => (self.tmdb_confidence, self.tmdb_confidence),
            MatchMethod::ImdbId => (self.imdb_confidence, self.imdb_confidence),
            MatchMethod::TitleCanonical => {
                (self.canonical_unknown_year, self.canonical_exact_year)
            }
            MatchMethod::TitleTokens => (self.token_weak, self.token_full),
        }
    }

    /// Confidence for a canonical-title hit given the year difference, or
    /// `None` if the difference rejects it.
    pub fn canonical_confidence(&self, year_delta: Option<i32>) -> Option<f32> {
        match year_delta {
            None => Some(self.canonical_unknown_year),
            Some(0) => Some(self.canonical_exact_year),
            Some(d) if d <= self.max_year_delta => Some(self.canonical_near_year),
            Some(_) => None,
        }
    }

    /// Confidence for an accepted token overlap at the given coverage.
    pub fn token_confidence(&self, coverage: f32) -> f32 {
        if coverage >= 1.0 {
            self.token_full
        } else if coverage >= self.token_strong_coverage {
            self.token_strong
        } else {
            self.token_weak
        }
    }

    /// Whether `overlap` of `query_tokens` query tokens is enough to keep a candidate.
    pub fn accepts_overlap(&self, overlap: usize, query_tokens: usize) -> bool {
        if overlap == 0 || query_tokens == 0 {
            return false;
        }
        if query_tokens == 1 {
            return overlap == 1;
        }
        overlap >= self.min_overlap_tokens
            || overlap as f32 / query_tokens as f32 >= self.min_coverage
    }

    /// Check bands are ordered and inside [0, 1].
    pub fn validate(&self) -> Result<(), String> {
        let all = [
            ("tmdb_confidence", self.tmdb_confidence),
            ("imdb_confidence", self.imdb_confidence),
            ("canonical_exact_year", self.canonical_exact_year),
            ("canonical_near_year", self.canonical_near_year),
            ("canonical_unknown_year", self.canonical_unknown_year),
            ("token_full", self.token_full),
            ("token_strong", self.token_strong),
            ("token_weak", self.token_weak),
            ("token_strong_coverage", self.token_strong_coverage),
            ("min_coverage", self.min_coverage),
        ];
        if let Some((name, value)) = all.iter().find(|(_, v)| !(0.0..=1.0).contains(v)) {
            return Err(format!("scoring.{} must be within [0, 1], got {}", name, value));
        }
        if self.token_weak > self.token_strong || self.token_strong > self.token_full {
            return Err("scoring token bands must satisfy weak <= strong <= full".to_string());
        }
        if self.canonical_unknown_year > self.canonical_near_year
            || self.canonical_near_year > self.canonical_exact_year
        {
            return Err(
                "scoring canonical bands must satisfy unknown <= near <= exact".to_string(),
            );
        }
        if self.token_full > self.canonical_unknown_year {
            return Err("scoring token bands must stay below canonical bands".to_string());
        }
        if self.max_year_delta < 0 {
            return Err("scoring.max_year_delta cannot be negative".to_string());
        }
        Ok(())
    }
}
