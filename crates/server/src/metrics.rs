//! Prometheus metrics for observability.
//!
//! This module provides metrics for monitoring the streamfind server:
//! - HTTP request metrics (latency, counts)
//! - Cache occupancy and in-flight fetches (collected dynamically)
//! - Resolver and cache metrics registered from the core crate

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, IntGaugeVec, Opts,
    Registry, TextEncoder,
};

use crate::state::AppState;

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "streamfind_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("streamfind_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "streamfind_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

// =============================================================================
// Cache Metrics (collected dynamically)
// =============================================================================

/// Entries held in memory per cache tier.
pub static CACHE_ENTRIES: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new("streamfind_cache_entries", "Entries held in memory per cache tier"),
        &["tier"],
    )
    .unwrap()
});

/// Episode-list fetches currently in flight.
pub static EPISODE_FETCHES_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "streamfind_episode_fetches_in_flight",
        "Number of episode-list fetches currently in flight",
    )
    .unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    // HTTP
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();

    // Cache
    registry.register(Box::new(CACHE_ENTRIES.clone())).unwrap();
    registry
        .register(Box::new(EPISODE_FETCHES_IN_FLIGHT.clone()))
        .unwrap();

    // Core metrics (cache lookups, provider fetches, resolutions)
    for metric in streamfind_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}

/// Collect dynamic metrics from current application state.
///
/// Called before encoding so the gauges reflect the caches right now.
pub fn collect_dynamic_metrics(state: &AppState) {
    let resolver = state.resolver();
    let cache = resolver.cache();
    for (tier, len) in [
        (cache.catalogs.name(), cache.catalogs.len()),
        (cache.episodes.name(), cache.episodes.len()),
        (cache.resolved.name(), cache.resolved.len()),
        (cache.bindings.name(), cache.bindings.len()),
    ] {
        CACHE_ENTRIES.with_label_values(&[tier]).set(len as i64);
    }
    EPISODE_FETCHES_IN_FLIGHT.set(resolver.episode_fetches_in_flight() as i64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_includes_core_metrics() {
        streamfind_core::metrics::CACHE_LOOKUPS
            .with_label_values(&["resolved", "miss"])
            .inc();
        HTTP_REQUESTS_IN_FLIGHT.set(0);

        let text = encode_metrics();
        assert!(text.contains("streamfind_cache_lookups_total"));
        assert!(text.contains("streamfind_http_requests_in_flight"));
    }
}
