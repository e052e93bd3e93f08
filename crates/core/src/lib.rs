pub mod cache;
pub mod config;
pub mod episodes;
pub mod index;
pub mod metrics;
pub mod normalize;
pub mod provider;
pub mod resolver;
pub mod scorer;
pub mod singleflight;
pub mod testing;

mod fields;

pub use cache::{CacheConfig, CacheStore, KvStore, MemoryKvStore, SqliteKvStore, StoreError};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, ProviderConfig,
    SanitizedConfig,
};
pub use episodes::{find_match, parse_episode_list, Episode, MatchTier};
pub use index::{CatalogEntry, CatalogIndex, RawCatalogEntry};
pub use provider::{
    CatalogKind, CatalogProvider, ProviderCredentials, ProviderError, XtreamClient, XtreamConfig,
};
pub use resolver::{
    EpisodeResolution, PrefetchSeriesRequest, ResolutionSource, ResolutionState,
    ResolveEpisodeRequest, ResolveError, ResolveMovieRequest, ResolvedEpisode, Resolver,
    ResolverConfig, SeriesBinding,
};
pub use scorer::{rank, Candidate, CatalogQuery, MatchMethod, ScoringPolicy};
