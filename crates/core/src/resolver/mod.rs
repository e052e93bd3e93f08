//! Resolution orchestrator.
//!
//! Ties the catalog index, the scorer, the episode matcher and the cache
//! hierarchy together behind [`Resolver`].

mod budget;
mod config;
mod identity;
mod runner;
mod types;

pub use budget::ProbeBudget;
pub use config::ResolverConfig;
pub use runner::{Resolver, BINDING_METHOD};
pub use types::{
    EpisodeResolution, PrefetchSeriesRequest, ResolutionSource, ResolutionState,
    ResolveEpisodeRequest, ResolveError, ResolveMovieRequest, ResolvedEpisode, SeriesBinding,
    SourceError,
};
