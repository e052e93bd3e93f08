//! Resolver configuration.

use serde::{Deserialize, Serialize};

use crate::scorer::ScoringPolicy;

/// Configuration for the resolution orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Wall-clock budget for the whole probing phase (milliseconds).
    /// Candidates not started when it runs out are skipped.
    #[serde(default = "default_probe_budget")]
    pub probe_budget_ms: u64,

    /// Ceiling for a single episode-list fetch (milliseconds).
    /// The effective timeout is the smaller of this and the budget left.
    #[serde(default = "default_per_call_timeout")]
    pub per_call_timeout_ms: u64,

    /// Timeout for a full catalog fetch (milliseconds).
    #[serde(default = "default_catalog_timeout")]
    pub catalog_timeout_ms: u64,

    /// Episode-list fetches allowed in flight at once, across all requests.
    #[serde(default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: usize,

    /// Candidates probed when the best one is a fuzzy token match.
    #[serde(default = "default_probe_limit")]
    pub probe_limit: usize,

    /// Candidates probed when the best one matched by id or canonical title.
    #[serde(default = "default_strong_probe_limit")]
    pub strong_probe_limit: usize,

    /// Confidence reported for answers found through a series binding.
    #[serde(default = "default_binding_confidence")]
    pub binding_confidence: f32,

    /// Confidence bands and acceptance thresholds.
    #[serde(default)]
    pub scoring: ScoringPolicy,
}

fn default_probe_budget() -> u64 {
    20_000 // 20 seconds
}

fn default_per_call_timeout() -> u64 {
    8_000 // 8 seconds
}

fn default_catalog_timeout() -> u64 {
    30_000 // 30 seconds
}

fn default_max_concurrent_fetches() -> usize {
    2
}

fn default_probe_limit() -> usize {
    6
}

fn default_strong_probe_limit() -> usize {
    3
}

fn default_binding_confidence() -> f32 {
    0.95
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            probe_budget_ms: default_probe_budget(),
            per_call_timeout_ms: default_per_call_timeout(),
            catalog_timeout_ms: default_catalog_timeout(),
            max_concurrent_fetches: default_max_concurrent_fetches(),
            probe_limit: default_probe_limit(),
            strong_probe_limit: default_strong_probe_limit(),
            binding_confidence: default_binding_confidence(),
            scoring: ScoringPolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ResolverConfig::default();
        assert_eq!(config.probe_budget_ms, 20_000);
        assert_eq!(config.per_call_timeout_ms, 8_000);
        assert_eq!(config.max_concurrent_fetches, 2);
        assert_eq!(config.probe_limit, 6);
        assert_eq!(config.strong_probe_limit, 3);
        assert_eq!(config.binding_confidence, 0.95);
    }

    #[test]
    fn test_deserialize_nested_scoring() {
        let toml = r#"
            probe_budget_ms = 5000

            [scoring]
            min_coverage = 0.5
        "#;
        let config: ResolverConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.probe_budget_ms, 5000);
        assert_eq!(config.scoring.min_coverage, 0.5);
        assert_eq!(config.scoring.token_full, 0.86);
        assert_eq!(config.per_call_timeout_ms, 8_000);
    }
}
