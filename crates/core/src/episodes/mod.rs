//! Episode lists - parsing provider payloads and picking the requested episode.

mod matcher;
mod parser;

pub use matcher::{find_match, EpisodeMatch, MatchTier};
pub use parser::{parse_episode_list, MalformedEpisodeRecord, ParsedEpisodes};

use serde::{Deserialize, Serialize};

/// One playable episode of a series.
///
/// `season` and `episode` are the resolved numbers, after falling back
/// through explicit fields, enclosing season keys and title markers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Episode {
    pub stream_id: i64,
    pub season: u32,
    pub episode: u32,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_extension: Option<String>,
}
