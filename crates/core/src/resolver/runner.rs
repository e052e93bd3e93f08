//! Resolution orchestrator implementation.
//!
//! Drives one request through the state machine:
//! - BindingCheck: a sticky series binding skips ranking entirely
//! - CatalogReady: load the catalog index, refreshing it if stale
//! - Probing: fetch and match candidate episode lists under a shared budget
//! - Resolved / Exhausted: commit the answer to the caches, or give up

use std::cmp::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures::stream::{self, StreamExt};
use futures::FutureExt;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use super::budget::ProbeBudget;
use super::config::ResolverConfig;
use super::identity::{movie_binding_keys, resolved_key, series_binding_keys};
use super::types::{
    EpisodeResolution, PrefetchSeriesRequest, ResolutionSource, ResolutionState, ResolveEpisodeRequest,
    ResolveError, ResolveMovieRequest, ResolvedEpisode, SeriesBinding, SourceError,
};
use crate::cache::{catalog_key, episodes_key, CacheStore};
use crate::episodes::{find_match, parse_episode_list, Episode};
use crate::index::{CatalogEntry, CatalogIndex};
use crate::metrics::{CANDIDATES_PROBED, PROVIDER_FETCHES, RESOLUTIONS, RESOLUTION_DURATION};
use crate::provider::{CatalogKind, CatalogProvider, ProviderCredentials, ProviderError};
use crate::scorer::{rank, Candidate, CatalogQuery};
use crate::singleflight::SingleFlight;

/// Method reported for answers found through a series binding.
pub const BINDING_METHOD: &str = "series_binding";

type CatalogFlight = Result<Arc<CatalogIndex>, SourceError>;
type EpisodeFlight = Result<Arc<Vec<Episode>>, SourceError>;

/// Binding keys paired with the identity they stand for.
type BindingKeys = [(String, String)];

/// Result of probing one series.
enum ProbeOutcome {
    Hit { episode: Episode, score: i64 },
    Miss,
    Skipped,
}

/// The parts of a ranked candidate a probe needs, owned so probe futures
/// borrow nothing from the ranking.
#[derive(Debug, Clone)]
struct ProbeTarget {
    series_id: i64,
    confidence: f32,
    method: &'static str,
    candidate_score: i64,
}

impl From<&Candidate> for ProbeTarget {
    fn from(candidate: &Candidate) -> Self {
        Self {
            series_id: candidate.series_id(),
            confidence: candidate.confidence,
            method: candidate.method.as_str(),
            candidate_score: candidate.score,
        }
    }
}

/// A candidate whose episode list answered the request.
#[derive(Debug, Clone)]
struct ProbeHit {
    series_id: i64,
    confidence: f32,
    method: String,
    candidate_score: i64,
    episode: Episode,
    episode_score: i64,
}

impl ProbeHit {
    /// Higher confidence, then better episode match, then better candidate
    /// score, then lower series id.
    fn rank_cmp(&self, other: &Self) -> Ordering {
        self.confidence
            .total_cmp(&other.confidence)
            .then(self.episode_score.cmp(&other.episode_score))
            .then(self.candidate_score.cmp(&other.candidate_score))
            .then(other.series_id.cmp(&self.series_id))
    }
}

/// The resolution orchestrator.
///
/// Cheap to share behind an `Arc`; concurrent requests share the caches,
/// the in-flight fetch maps and the fetch permits.
pub struct Resolver {
    config: ResolverConfig,
    provider: Arc<dyn CatalogProvider>,
    credentials: ProviderCredentials,
    cache: Arc<CacheStore>,
    catalog_flights: SingleFlight<String, CatalogFlight>,
    episode_flights: SingleFlight<String, EpisodeFlight>,
    fetch_permits: Arc<Semaphore>,
}

impl Resolver {
    /// Create a new resolver.
    pub fn new(
        config: ResolverConfig,
        provider: Arc<dyn CatalogProvider>,
        credentials: ProviderCredentials,
        cache: Arc<CacheStore>,
    ) -> Self {
        let permits = config.max_concurrent_fetches.max(1);
        Self {
            config,
            provider,
            credentials,
            cache,
            catalog_flights: SingleFlight::new(),
            episode_flights: SingleFlight::new(),
            fetch_permits: Arc::new(Semaphore::new(permits)),
        }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<CacheStore> {
        &self.cache
    }

    pub fn credentials(&self) -> &ProviderCredentials {
        &self.credentials
    }

    /// Episode-list fetches currently in flight.
    pub fn episode_fetches_in_flight(&self) -> usize {
        self.episode_flights.in_flight()
    }

    /// Resolve an episode to a stream. `Ok(None)` means nothing matched.
    pub async fn resolve_episode(
        &self,
        request: &ResolveEpisodeRequest,
    ) -> Result<Option<ResolvedEpisode>, ResolveError> {
        Ok(self.resolve_episode_detailed(request).await?.result)
    }

    /// Like [`Resolver::resolve_episode`], also reporting the final state
    /// and how many candidates were probed.
    pub async fn resolve_episode_detailed(
        &self,
        request: &ResolveEpisodeRequest,
    ) -> Result<EpisodeResolution, ResolveError> {
        let started = Instant::now();
        let query = CatalogQuery::new(
            &request.title,
            request.year,
            request.tmdb_id.as_deref(),
            request.imdb_id.as_deref(),
        );
        validate(&request.title, &query)?;

        let outcome = self.run_episode(&query, request).await;

        let label = outcome.source.map_or("not_found", |s| s.as_str());
        let elapsed = started.elapsed();
        RESOLUTIONS.with_label_values(&["episode", label]).inc();
        RESOLUTION_DURATION
            .with_label_values(&["episode"])
            .observe(elapsed.as_secs_f64());
        CANDIDATES_PROBED.observe(outcome.candidates_probed as f64);

        match &outcome.result {
            Some(resolved) => info!(
                title = %request.title,
                season = request.season,
                episode = request.episode,
                series_id = resolved.series_id,
                stream_id = resolved.stream_id,
                method = %resolved.method,
                source = label,
                elapsed_ms = elapsed.as_millis() as u64,
                "Episode resolved"
            ),
            None => info!(
                title = %request.title,
                season = request.season,
                episode = request.episode,
                candidates_probed = outcome.candidates_probed,
                elapsed_ms = elapsed.as_millis() as u64,
                "No episode found"
            ),
        }

        Ok(outcome)
    }

    /// Resolve a movie to its catalog entry. `Ok(None)` means nothing matched.
    pub async fn resolve_movie(
        &self,
        request: &ResolveMovieRequest,
    ) -> Result<Option<CatalogEntry>, ResolveError> {
        let started = Instant::now();
        let query = CatalogQuery::new(
            &request.title,
            request.year,
            request.tmdb_id.as_deref(),
            request.imdb_id.as_deref(),
        );
        validate(&request.title, &query)?;

        let provider = self.credentials.provider_key();
        let binding_keys = movie_binding_keys(&provider, &query);
        let (entry, label) = self
            .find_movie(&query, &binding_keys, request.allow_network)
            .await;

        RESOLUTIONS.with_label_values(&["movie", label]).inc();
        RESOLUTION_DURATION
            .with_label_values(&["movie"])
            .observe(started.elapsed().as_secs_f64());

        match &entry {
            Some(found) => info!(
                title = %request.title,
                stream_id = found.series_id,
                source = label,
                "Movie resolved"
            ),
            None => info!(title = %request.title, "No movie found"),
        }
        Ok(entry)
    }

    /// Load both catalogs for `credentials` into the cache.
    ///
    /// Returns how many of the two catalogs are now available.
    pub async fn prefetch_catalog(&self, credentials: &ProviderCredentials) -> usize {
        let (series, movies) = tokio::join!(
            self.load_catalog(credentials, CatalogKind::Series, true),
            self.load_catalog(credentials, CatalogKind::Movies, true),
        );

        let mut loaded = 0;
        for (kind, result) in [(CatalogKind::Series, series), (CatalogKind::Movies, movies)] {
            match result {
                Ok(index) => {
                    loaded += 1;
                    debug!(kind = %kind, entries = index.len(), "Catalog prefetched");
                }
                Err(e) => warn!(kind = %kind, error = %e, "Catalog prefetch failed"),
            }
        }
        loaded
    }

    /// Warm the episode lists a later [`Resolver::resolve_episode`] for
    /// this series would probe.
    ///
    /// Returns how many episode lists are now cached.
    pub async fn prefetch_series_info(
        &self,
        request: &PrefetchSeriesRequest,
    ) -> Result<usize, ResolveError> {
        let query = CatalogQuery::new(
            &request.title,
            request.year,
            request.tmdb_id.as_deref(),
            request.imdb_id.as_deref(),
        );
        validate(&request.title, &query)?;

        let provider = self.credentials.provider_key();
        let binding_keys = series_binding_keys(&provider, &query);

        let mut series_ids = Vec::new();
        if let Some(series_id) = self.bound_series(&binding_keys) {
            series_ids.push(series_id);
        }
        match self
            .load_catalog(&self.credentials, CatalogKind::Series, true)
            .await
        {
            Ok(index) => {
                let candidates = rank(&index, &query, &self.config.scoring);
                for candidate in self.probe_prefix(&candidates) {
                    if !series_ids.contains(&candidate.series_id()) {
                        series_ids.push(candidate.series_id());
                    }
                }
            }
            Err(e) => warn!(error = %e, "Catalog unavailable for series prefetch"),
        }

        let budget = self.budget();
        let results: Vec<bool> = stream::iter(series_ids)
            .map(move |series_id| async move {
                self.episode_list(series_id, true, &budget).await.is_ok()
            })
            .buffer_unordered(self.config.max_concurrent_fetches.max(1))
            .collect()
            .await;

        let warmed = results.into_iter().filter(|ok| *ok).count();
        debug!(title = %request.title, warmed, "Series info prefetched");
        Ok(warmed)
    }

    async fn run_episode(
        &self,
        query: &CatalogQuery,
        request: &ResolveEpisodeRequest,
    ) -> EpisodeResolution {
        let provider = self.credentials.provider_key();
        let key = resolved_key(&provider, query, request.season, request.episode);

        enter(ResolutionState::Idle);
        let mut stale = None;
        if let Some(hit) = key.as_deref().and_then(|k| self.cache.resolved.get(k)) {
            if hit.fresh {
                return EpisodeResolution::resolved(hit.value, 0, ResolutionSource::Cache);
            }
            if !request.allow_network {
                return EpisodeResolution::resolved(hit.value, 0, ResolutionSource::StaleCache);
            }
            stale = Some(hit.value);
        }

        let outcome = self
            .probe_episode(query, &provider, request, key.as_deref())
            .await;

        match (outcome.result.is_none(), stale) {
            (true, Some(previous)) => {
                debug!(
                    stream_id = previous.stream_id,
                    "Re-resolution found nothing, keeping stale answer"
                );
                EpisodeResolution::resolved(
                    previous,
                    outcome.candidates_probed,
                    ResolutionSource::StaleCache,
                )
            }
            _ => outcome,
        }
    }

    async fn probe_episode(
        &self,
        query: &CatalogQuery,
        provider: &str,
        request: &ResolveEpisodeRequest,
        resolved_key: Option<&str>,
    ) -> EpisodeResolution {
        let (season, episode) = (request.season, request.episode);
        let allow_network = request.allow_network;
        let binding_keys = series_binding_keys(provider, query);
        let mut probed = 0;

        enter(ResolutionState::BindingCheck);
        if let Some(series_id) = self.bound_series(&binding_keys) {
            let budget = self.budget();
            match self
                .probe(series_id, season, episode, allow_network, &budget)
                .await
            {
                ProbeOutcome::Hit { episode: found, score } => {
                    let hit = ProbeHit {
                        series_id,
                        confidence: self.config.binding_confidence,
                        method: BINDING_METHOD.to_string(),
                        candidate_score: 0,
                        episode: found,
                        episode_score: score,
                    };
                    enter(ResolutionState::Resolved);
                    let resolved = self.commit(hit, resolved_key, &binding_keys).await;
                    return EpisodeResolution::resolved(resolved, 1, ResolutionSource::Binding);
                }
                ProbeOutcome::Miss => {
                    probed += 1;
                    debug!(series_id, "Bound series did not answer, ranking catalog");
                }
                ProbeOutcome::Skipped => {}
            }
        }

        enter(ResolutionState::CatalogReady);
        let index = match self
            .load_catalog(&self.credentials, CatalogKind::Series, allow_network)
            .await
        {
            Ok(index) => index,
            Err(e) => {
                warn!(error = %e, "No catalog to rank against");
                enter(ResolutionState::Exhausted);
                return EpisodeResolution::exhausted(probed);
            }
        };

        // The budget starts here so a slow catalog load cannot spend it.
        enter(ResolutionState::Probing);
        let budget = self.budget();
        let candidates = rank(&index, query, &self.config.scoring);
        let prefix = self.probe_prefix(&candidates);
        debug!(
            candidates = candidates.len(),
            probing = prefix.len(),
            "Ranked candidates"
        );

        // Id matches go first; a hit among them skips the title wave.
        let (id_wave, title_wave): (Vec<&Candidate>, Vec<&Candidate>) =
            prefix.iter().partition(|c| c.method.is_id());
        let waves: [Vec<ProbeTarget>; 2] = [
            id_wave.into_iter().map(ProbeTarget::from).collect(),
            title_wave.into_iter().map(ProbeTarget::from).collect(),
        ];

        let mut best = None;
        for wave in waves {
            if wave.is_empty() {
                continue;
            }
            let (hit, count) = self
                .probe_wave(wave, season, episode, allow_network, budget)
                .await;
            probed += count;
            if hit.is_some() {
                best = hit;
                break;
            }
        }

        match best {
            Some(hit) => {
                enter(ResolutionState::Resolved);
                let resolved = self.commit(hit, resolved_key, &binding_keys).await;
                EpisodeResolution::resolved(resolved, probed, ResolutionSource::Catalog)
            }
            None => {
                enter(ResolutionState::Exhausted);
                EpisodeResolution::exhausted(probed)
            }
        }
    }

    /// Probe a wave of candidates concurrently and keep the best hit.
    ///
    /// The reduction does not depend on completion order.
    async fn probe_wave(
        &self,
        wave: Vec<ProbeTarget>,
        season: u32,
        episode: u32,
        allow_network: bool,
        budget: ProbeBudget,
    ) -> (Option<ProbeHit>, usize) {
        let outcomes: Vec<(ProbeTarget, ProbeOutcome)> = stream::iter(wave)
            .map(move |target| async move {
                let outcome = self
                    .probe(target.series_id, season, episode, allow_network, &budget)
                    .await;
                (target, outcome)
            })
            .buffer_unordered(self.config.max_concurrent_fetches.max(1))
            .collect()
            .await;

        let mut probed = 0;
        let mut best: Option<ProbeHit> = None;
        for (target, outcome) in outcomes {
            let (found, score) = match outcome {
                ProbeOutcome::Skipped => continue,
                ProbeOutcome::Miss => {
                    probed += 1;
                    continue;
                }
                ProbeOutcome::Hit { episode, score } => (episode, score),
            };
            probed += 1;

            let hit = ProbeHit {
                series_id: target.series_id,
                confidence: target.confidence,
                method: target.method.to_string(),
                candidate_score: target.candidate_score,
                episode: found,
                episode_score: score,
            };
            best = match best {
                Some(current) if current.rank_cmp(&hit) != Ordering::Less => Some(current),
                _ => Some(hit),
            };
        }
        (best, probed)
    }

    /// Fetch one series' episode list and match the request against it.
    ///
    /// Failures and timeouts count as a miss.
    async fn probe(
        &self,
        series_id: i64,
        season: u32,
        episode: u32,
        allow_network: bool,
        budget: &ProbeBudget,
    ) -> ProbeOutcome {
        if budget.is_exhausted() {
            debug!(series_id, "Probe budget spent, skipping candidate");
            return ProbeOutcome::Skipped;
        }

        let list = match self.episode_list(series_id, allow_network, budget).await {
            Ok(list) => list,
            Err(e) => {
                debug!(series_id, error = %e, "Dropping candidate");
                return ProbeOutcome::Miss;
            }
        };

        match find_match(&list, season, episode) {
            Some(m) => {
                debug!(
                    series_id,
                    stream_id = m.episode.stream_id,
                    tier = m.tier.as_str(),
                    "Episode matched"
                );
                ProbeOutcome::Hit {
                    episode: m.episode.clone(),
                    score: m.score,
                }
            }
            None => {
                debug!(series_id, episodes = list.len(), "No matching episode");
                ProbeOutcome::Miss
            }
        }
    }

    /// Episode list for a series: fresh cache, then network, then stale cache.
    async fn episode_list(
        &self,
        series_id: i64,
        allow_network: bool,
        budget: &ProbeBudget,
    ) -> EpisodeFlight {
        let key = episodes_key(&self.credentials.provider_key(), series_id);
        let lookup_key = key.clone();
        let stale = match self
            .cache_blocking(move |cache| cache.episodes.get(&lookup_key))
            .await
        {
            Some(hit) if hit.fresh || !allow_network => return Ok(hit.value),
            Some(hit) => Some(hit.value),
            None => None,
        };
        if !allow_network {
            return Err(episodes_unavailable(
                series_id,
                "not cached and network not allowed",
            ));
        }

        let Some(timeout) = budget.per_call_timeout() else {
            return stale.ok_or_else(|| episodes_unavailable(series_id, "probe budget spent"));
        };

        // The flight keeps running for other waiters if this caller gives up.
        let fetched = match tokio::time::timeout(
            timeout,
            self.fetch_episode_list(key, series_id, timeout),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(episodes_unavailable(
                series_id,
                ProviderError::Timeout(timeout.as_millis() as u64).to_string(),
            )),
        };

        match (fetched, stale) {
            (Ok(list), _) => Ok(list),
            (Err(e), Some(previous)) => {
                debug!(series_id, error = %e, "Refresh failed, using stale episode list");
                Ok(previous)
            }
            (Err(e), None) => Err(e),
        }
    }

    async fn fetch_episode_list(
        &self,
        key: String,
        series_id: i64,
        timeout: Duration,
    ) -> EpisodeFlight {
        let provider = Arc::clone(&self.provider);
        let credentials = self.credentials.clone();
        let cache = Arc::clone(&self.cache);
        let permits = Arc::clone(&self.fetch_permits);

        let flight_key = key.clone();
        let work = async move {
            let fetch = async {
                let _permit = permits.clone().acquire_owned().await.ok();
                provider.fetch_raw_episode_list(&credentials, series_id).await
            };

            let payload = match tokio::time::timeout(timeout, fetch).await {
                Ok(Ok(payload)) => {
                    PROVIDER_FETCHES.with_label_values(&["episodes", "success"]).inc();
                    payload
                }
                Ok(Err(e)) => {
                    PROVIDER_FETCHES.with_label_values(&["episodes", "failure"]).inc();
                    return Err(episodes_unavailable(series_id, e.to_string()));
                }
                Err(_) => {
                    PROVIDER_FETCHES.with_label_values(&["episodes", "timeout"]).inc();
                    let e = ProviderError::Timeout(timeout.as_millis() as u64);
                    return Err(episodes_unavailable(series_id, e.to_string()));
                }
            };

            let parsed = parse_episode_list(&payload);
            if parsed.skipped > 0 {
                debug!(series_id, skipped = parsed.skipped, "Skipped malformed episode records");
            }
            let episodes = Arc::new(parsed.episodes);
            let stored = Arc::clone(&episodes);
            if let Err(e) =
                tokio::task::spawn_blocking(move || cache.episodes.put(&key, stored)).await
            {
                warn!(series_id, error = %e, "Failed to cache episode list");
            }
            debug!(series_id, episodes = episodes.len(), "Fetched episode list");
            Ok(episodes)
        };

        self.episode_flights
            .run(flight_key, move || work.map(Some))
            .await
            .unwrap_or_else(|| Err(episodes_unavailable(series_id, "episode fetch aborted")))
    }

    /// Catalog index for `credentials`: fresh cache, then network, then stale cache.
    async fn load_catalog(
        &self,
        credentials: &ProviderCredentials,
        kind: CatalogKind,
        allow_network: bool,
    ) -> CatalogFlight {
        let provider = credentials.provider_key();
        let key = catalog_key(&provider, kind);

        let lookup_key = key.clone();
        let stale = match self
            .cache_blocking(move |cache| cache.catalogs.get(&lookup_key))
            .await
        {
            Some(hit) if hit.fresh || !allow_network => return Ok(hit.value),
            Some(hit) => Some(hit.value),
            None => None,
        };
        if !allow_network {
            return Err(catalog_unavailable(
                &provider,
                kind,
                "not cached and network not allowed",
            ));
        }

        match self.fetch_catalog(credentials, kind, key).await {
            Ok(index) => Ok(index),
            Err(e) => match stale {
                Some(previous) => {
                    warn!(
                        provider = %provider,
                        kind = %kind,
                        error = %e,
                        "Catalog refresh failed, serving stale snapshot"
                    );
                    Ok(previous)
                }
                None => Err(e),
            },
        }
    }

    async fn fetch_catalog(
        &self,
        credentials: &ProviderCredentials,
        kind: CatalogKind,
        key: String,
    ) -> CatalogFlight {
        let provider = Arc::clone(&self.provider);
        let credentials = credentials.clone();
        let cache = Arc::clone(&self.cache);
        let timeout_ms = self.config.catalog_timeout_ms;
        let provider_key = credentials.provider_key();
        let flight_provider_key = provider_key.clone();

        let flight_key = key.clone();
        let work = async move {
            let provider_key = flight_provider_key;
            let started = Instant::now();
            let fetched = tokio::time::timeout(
                Duration::from_millis(timeout_ms),
                provider.fetch_raw_catalog(&credentials, kind),
            )
            .await;

            let raw = match fetched {
                Ok(Ok(raw)) => {
                    PROVIDER_FETCHES.with_label_values(&[kind.as_str(), "success"]).inc();
                    raw
                }
                Ok(Err(e)) => {
                    PROVIDER_FETCHES.with_label_values(&[kind.as_str(), "failure"]).inc();
                    return Err(catalog_unavailable(&provider_key, kind, e.to_string()));
                }
                Err(_) => {
                    PROVIDER_FETCHES.with_label_values(&[kind.as_str(), "timeout"]).inc();
                    let e = ProviderError::Timeout(timeout_ms);
                    return Err(catalog_unavailable(&provider_key, kind, e.to_string()));
                }
            };

            // Indexing and persisting a large catalog is CPU and disk work.
            let built = tokio::task::spawn_blocking(move || {
                let index = Arc::new(CatalogIndex::build(raw));
                cache.catalogs.put(&key, Arc::clone(&index));
                index
            })
            .await;
            let index = match built {
                Ok(index) => index,
                Err(e) => {
                    let reason = format!("index build failed: {}", e);
                    return Err(catalog_unavailable(&provider_key, kind, reason));
                }
            };

            info!(
                provider = %provider_key,
                kind = %kind,
                entries = index.len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Catalog index built"
            );
            Ok(index)
        };

        self.catalog_flights
            .run(flight_key, move || work.map(Some))
            .await
            .unwrap_or_else(|| Err(catalog_unavailable(&provider_key, kind, "catalog fetch aborted")))
    }

    async fn find_movie(
        &self,
        query: &CatalogQuery,
        binding_keys: &BindingKeys,
        allow_network: bool,
    ) -> (Option<CatalogEntry>, &'static str) {
        let index = match self
            .load_catalog(&self.credentials, CatalogKind::Movies, allow_network)
            .await
        {
            Ok(index) => index,
            Err(e) => {
                warn!(error = %e, "No movie catalog to rank against");
                return (None, "not_found");
            }
        };

        if let Some(entry) = self.bound_series(binding_keys).and_then(|id| index.get(id)) {
            debug!(stream_id = entry.series_id, "Movie found through binding");
            return (Some(entry.as_ref().clone()), "binding");
        }

        let Some(top) = rank(&index, query, &self.config.scoring).into_iter().next() else {
            return (None, "not_found");
        };
        debug!(
            stream_id = top.series_id(),
            method = %top.method,
            confidence = top.confidence,
            "Movie candidate selected"
        );
        let entry = top.entry.as_ref().clone();
        let bindings = self.bindings_for(binding_keys, entry.series_id);
        self.persist(None, bindings).await;
        (Some(entry), "resolved")
    }

    /// Candidates worth probing: fewer when the best one is already strong.
    fn probe_prefix<'a>(&self, candidates: &'a [Candidate]) -> &'a [Candidate] {
        let limit = match candidates.first() {
            Some(top) if top.method.is_strong() => self.config.strong_probe_limit,
            _ => self.config.probe_limit,
        };
        &candidates[..limit.min(candidates.len())]
    }

    fn budget(&self) -> ProbeBudget {
        ProbeBudget::new(
            Duration::from_millis(self.config.probe_budget_ms),
            Duration::from_millis(self.config.per_call_timeout_ms),
        )
    }

    /// First fresh binding among `keys`.
    fn bound_series(&self, keys: &BindingKeys) -> Option<i64> {
        keys.iter().find_map(|(key, _)| {
            self.cache
                .bindings
                .get(key)
                .filter(|hit| hit.fresh)
                .map(|hit| hit.value.series_id)
        })
    }

    fn bindings_for(&self, keys: &BindingKeys, series_id: i64) -> Vec<(String, SeriesBinding)> {
        keys.iter()
            .map(|(key, identity)| {
                let binding = SeriesBinding {
                    query_key: identity.clone(),
                    series_id,
                };
                (key.clone(), binding)
            })
            .collect()
    }

    /// Write an answer and its bindings. Shared-record tiers re-serialize
    /// their whole map on every write, so this runs off the async workers.
    async fn persist(
        &self,
        resolved: Option<(String, ResolvedEpisode)>,
        bindings: Vec<(String, SeriesBinding)>,
    ) {
        let write = self
            .cache_blocking(move |cache| {
                if let Some((key, value)) = resolved {
                    cache.resolved.put(&key, value);
                }
                for (key, binding) in bindings {
                    cache.bindings.put(&key, binding);
                }
                Some(())
            })
            .await;
        if write.is_none() {
            warn!("Resolution was not cached");
        }
    }

    /// Run a cache call that may read or write the persistent store on the
    /// blocking pool.
    async fn cache_blocking<T, F>(&self, call: F) -> Option<T>
    where
        F: FnOnce(&CacheStore) -> Option<T> + Send + 'static,
        T: Send + 'static,
    {
        let cache = Arc::clone(&self.cache);
        match tokio::task::spawn_blocking(move || call(&cache)).await {
            Ok(result) => result,
            Err(e) => {
                warn!(error = %e, "Cache task failed");
                None
            }
        }
    }

    /// Write the answer to the resolved-episode and binding tiers.
    async fn commit(
        &self,
        hit: ProbeHit,
        resolved_key: Option<&str>,
        binding_keys: &BindingKeys,
    ) -> ResolvedEpisode {
        let resolved = ResolvedEpisode {
            stream_id: hit.episode.stream_id,
            container_extension: hit.episode.container_extension,
            series_id: hit.series_id,
            season: hit.episode.season,
            episode: hit.episode.episode,
            confidence: hit.confidence,
            method: hit.method,
            resolved_at: Utc::now(),
        };
        let bindings = self.bindings_for(binding_keys, hit.series_id);
        let entry = resolved_key.map(|key| (key.to_string(), resolved.clone()));
        self.persist(entry, bindings).await;
        resolved
    }
}

fn enter(state: ResolutionState) {
    debug!(state = %state, "Resolver state");
}

/// Only a request with nothing to match on is rejected.
fn validate(title: &str, query: &CatalogQuery) -> Result<(), ResolveError> {
    if title.trim().is_empty() && !query.has_ids() {
        return Err(ResolveError::InvalidRequest(
            "a title or an external id is required".to_string(),
        ));
    }
    Ok(())
}

fn catalog_unavailable(provider: &str, kind: CatalogKind, reason: impl Into<String>) -> SourceError {
    SourceError::CatalogUnavailable {
        provider: provider.to_string(),
        kind,
        reason: reason.into(),
    }
}

fn episodes_unavailable(series_id: i64, reason: impl Into<String>) -> SourceError {
    SourceError::EpisodeListUnavailable {
        series_id,
        reason: reason.into(),
    }
}
