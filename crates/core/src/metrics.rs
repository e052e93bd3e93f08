//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Cache tiers (hits, stale hits, misses)
//! - Provider fetches (catalogs, episode lists)
//! - Resolutions (outcome, duration, candidates probed)

use once_cell::sync::Lazy;
use prometheus::{Histogram, HistogramOpts, HistogramVec, IntCounterVec, Opts};

// =============================================================================
// Cache Metrics
// =============================================================================

/// Cache lookups by tier and outcome.
pub static CACHE_LOOKUPS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("streamfind_cache_lookups_total", "Total cache lookups"),
        &["tier", "outcome"], // outcome: "hit", "stale", "miss"
    )
    .unwrap()
});

// =============================================================================
// Provider Metrics
// =============================================================================

/// Provider fetches by kind and result.
pub static PROVIDER_FETCHES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "streamfind_provider_fetches_total",
            "Total provider fetches",
        ),
        &["kind", "result"], // kind: "series", "movies", "episodes"; result: "success", "failure", "timeout"
    )
    .unwrap()
});

// =============================================================================
// Resolution Metrics
// =============================================================================

/// Resolutions by kind and result.
pub static RESOLUTIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("streamfind_resolutions_total", "Total resolution requests"),
        &["kind", "result"], // result: "cached", "stale", "binding", "resolved", "not_found"
    )
    .unwrap()
});

/// Resolution duration in seconds.
pub static RESOLUTION_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "streamfind_resolution_duration_seconds",
            "Duration of a resolution request",
        )
        .buckets(vec![0.001, 0.01, 0.05, 0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 20.0, 30.0]),
        &["kind"],
    )
    .unwrap()
});

/// Candidates whose episode list was probed per resolution.
pub static CANDIDATES_PROBED: Lazy<Histogram> = Lazy::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "streamfind_candidates_probed",
            "Number of candidates probed per resolution",
        )
        .buckets(vec![0.0, 1.0, 2.0, 3.0, 4.0, 6.0, 10.0]),
    )
    .unwrap()
});

/// Get all core metrics for registration.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(CACHE_LOOKUPS.clone()),
        Box::new(PROVIDER_FETCHES.clone()),
        Box::new(RESOLUTIONS.clone()),
        Box::new(RESOLUTION_DURATION.clone()),
        Box::new(CANDIDATES_PROBED.clone()),
    ]
}
