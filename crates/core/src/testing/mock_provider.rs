//! Mock catalog provider for testing.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::index::RawCatalogEntry;
use crate::provider::{CatalogKind, CatalogProvider, ProviderCredentials, ProviderError};

/// Mock implementation of the CatalogProvider trait.
///
/// Provides controllable behavior for testing:
/// - Serve configured catalogs and per-series episode payloads
/// - Record every fetch for assertions
/// - Simulate failures and slow responses
/// - Track how many episode fetches ran at once
///
/// # Example
///
/// ```rust,ignore
/// use streamfind_core::testing::{MockProvider, fixtures};
///
/// let provider = MockProvider::new();
/// provider
///     .set_catalog(CatalogKind::Series, vec![fixtures::raw_entry(1, "The Office", Some(2005))])
///     .await;
/// provider.set_episodes(1, fixtures::episode_payload(&[(1, 1, 101)])).await;
///
/// // Resolve through a Resolver built over Arc::new(provider.clone())...
///
/// assert_eq!(provider.episode_fetches().await, vec![1]);
/// ```
#[derive(Clone)]
pub struct MockProvider {
    /// Configured catalogs per kind.
    catalogs: Arc<RwLock<HashMap<CatalogKind, Vec<RawCatalogEntry>>>>,
    /// Configured episode payloads per series.
    episodes: Arc<RwLock<HashMap<i64, Value>>>,
    /// Recorded catalog fetches, in call order.
    catalog_calls: Arc<RwLock<Vec<CatalogKind>>>,
    /// Recorded episode fetches, in call order.
    episode_calls: Arc<RwLock<Vec<i64>>>,
    /// Delay applied to every episode fetch.
    episode_delay: Arc<RwLock<Duration>>,
    /// Per-series delays, replacing `episode_delay` for those series.
    series_delays: Arc<RwLock<HashMap<i64, Duration>>>,
    /// Delay applied to every catalog fetch.
    catalog_delay: Arc<RwLock<Duration>>,
    /// Series whose episode fetch fails.
    failing_series: Arc<RwLock<HashSet<i64>>>,
    /// When set, every catalog fetch fails.
    catalogs_down: Arc<RwLock<bool>>,
    /// Episode fetches currently running.
    active: Arc<AtomicUsize>,
    /// Highest number of episode fetches seen running at once.
    peak: Arc<AtomicUsize>,
}

impl std::fmt::Debug for MockProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockProvider")
            .field("catalogs", &"<catalogs>")
            .field("episodes", &"<episodes>")
            .field("catalog_calls", &"<catalog_calls>")
            .field("episode_calls", &"<episode_calls>")
            .field("active", &self.active.load(Ordering::SeqCst))
            .field("peak", &self.peak.load(Ordering::SeqCst))
            .finish()
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProvider {
    /// Create a new mock provider with empty catalogs.
    pub fn new() -> Self {
        Self {
            catalogs: Arc::new(RwLock::new(HashMap::new())),
            episodes: Arc::new(RwLock::new(HashMap::new())),
            catalog_calls: Arc::new(RwLock::new(Vec::new())),
            episode_calls: Arc::new(RwLock::new(Vec::new())),
            episode_delay: Arc::new(RwLock::new(Duration::ZERO)),
            series_delays: Arc::new(RwLock::new(HashMap::new())),
            catalog_delay: Arc::new(RwLock::new(Duration::ZERO)),
            failing_series: Arc::new(RwLock::new(HashSet::new())),
            catalogs_down: Arc::new(RwLock::new(false)),
            active: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Set the catalog returned for `kind`.
    pub async fn set_catalog(&self, kind: CatalogKind, entries: Vec<RawCatalogEntry>) {
        self.catalogs.write().await.insert(kind, entries);
    }

    /// Set the raw episode payload returned for `series_id`.
    pub async fn set_episodes(&self, series_id: i64, payload: Value) {
        self.episodes.write().await.insert(series_id, payload);
    }

    /// Delay every episode fetch by `delay`.
    pub async fn set_episode_delay(&self, delay: Duration) {
        *self.episode_delay.write().await = delay;
    }

    /// Delay episode fetches for `series_id` only.
    pub async fn set_series_delay(&self, series_id: i64, delay: Duration) {
        self.series_delays.write().await.insert(series_id, delay);
    }

    /// Delay every catalog fetch by `delay`.
    pub async fn set_catalog_delay(&self, delay: Duration) {
        *self.catalog_delay.write().await = delay;
    }

    /// Make episode fetches for `series_id` fail.
    pub async fn fail_series(&self, series_id: i64) {
        self.failing_series.write().await.insert(series_id);
    }

    /// Make every catalog fetch fail, or succeed again.
    pub async fn set_catalogs_down(&self, down: bool) {
        *self.catalogs_down.write().await = down;
    }

    /// Series ids whose episode list was fetched, in call order.
    pub async fn episode_fetches(&self) -> Vec<i64> {
        self.episode_calls.read().await.clone()
    }

    /// Number of episode fetches performed.
    pub async fn episode_fetch_count(&self) -> usize {
        self.episode_calls.read().await.len()
    }

    /// Catalog kinds fetched, in call order.
    pub async fn catalog_fetches(&self) -> Vec<CatalogKind> {
        self.catalog_calls.read().await.clone()
    }

    /// Highest number of episode fetches that ran concurrently.
    pub fn peak_concurrent_fetches(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// Clear recorded calls.
    pub async fn clear_recorded(&self) {
        self.catalog_calls.write().await.clear();
        self.episode_calls.write().await.clear();
        self.peak.store(0, Ordering::SeqCst);
    }
}

/// Decrements the active-fetch gauge when a fetch ends, even if cancelled.
struct ActiveFetch(Arc<AtomicUsize>);

impl Drop for ActiveFetch {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl CatalogProvider for MockProvider {
    async fn fetch_raw_catalog(
        &self,
        _credentials: &ProviderCredentials,
        kind: CatalogKind,
    ) -> Result<Vec<RawCatalogEntry>, ProviderError> {
        self.catalog_calls.write().await.push(kind);

        let delay = *self.catalog_delay.read().await;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if *self.catalogs_down.read().await {
            return Err(ProviderError::ApiError {
                status: 503,
                message: "catalog unavailable".to_string(),
            });
        }

        Ok(self
            .catalogs
            .read()
            .await
            .get(&kind)
            .cloned()
            .unwrap_or_default())
    }

    async fn fetch_raw_episode_list(
        &self,
        _credentials: &ProviderCredentials,
        series_id: i64,
    ) -> Result<Value, ProviderError> {
        self.episode_calls.write().await.push(series_id);

        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        let _active = ActiveFetch(Arc::clone(&self.active));
        self.peak.fetch_max(now_active, Ordering::SeqCst);

        let delay = match self.series_delays.read().await.get(&series_id) {
            Some(delay) => *delay,
            None => *self.episode_delay.read().await,
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if self.failing_series.read().await.contains(&series_id) {
            return Err(ProviderError::ApiError {
                status: 500,
                message: format!("series {} failed", series_id),
            });
        }

        self.episodes
            .read()
            .await
            .get(&series_id)
            .cloned()
            .ok_or_else(|| ProviderError::ApiError {
                status: 404,
                message: format!("series {} not found", series_id),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;

    #[tokio::test]
    async fn test_serves_configured_catalog() {
        let provider = MockProvider::new();
        provider
            .set_catalog(
                CatalogKind::Series,
                vec![fixtures::raw_entry(1, "The Office", Some(2005))],
            )
            .await;

        let creds = fixtures::credentials();
        let series = provider
            .fetch_raw_catalog(&creds, CatalogKind::Series)
            .await
            .unwrap();
        assert_eq!(series.len(), 1);

        let movies = provider
            .fetch_raw_catalog(&creds, CatalogKind::Movies)
            .await
            .unwrap();
        assert!(movies.is_empty());

        assert_eq!(
            provider.catalog_fetches().await,
            vec![CatalogKind::Series, CatalogKind::Movies]
        );
    }

    #[tokio::test]
    async fn test_records_episode_fetches() {
        let provider = MockProvider::new();
        provider
            .set_episodes(7, fixtures::episode_payload(&[(1, 1, 701)]))
            .await;

        let creds = fixtures::credentials();
        assert!(provider.fetch_raw_episode_list(&creds, 7).await.is_ok());
        assert!(provider.fetch_raw_episode_list(&creds, 8).await.is_err());

        assert_eq!(provider.episode_fetches().await, vec![7, 8]);
        assert_eq!(provider.peak_concurrent_fetches(), 1);
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let provider = MockProvider::new();
        provider
            .set_episodes(7, fixtures::episode_payload(&[(1, 1, 701)]))
            .await;
        provider.fail_series(7).await;
        provider.set_catalogs_down(true).await;

        let creds = fixtures::credentials();
        assert!(matches!(
            provider.fetch_raw_episode_list(&creds, 7).await,
            Err(ProviderError::ApiError { status: 500, .. })
        ));
        assert!(provider
            .fetch_raw_catalog(&creds, CatalogKind::Series)
            .await
            .is_err());
    }
}
