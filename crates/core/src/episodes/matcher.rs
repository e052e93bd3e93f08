//! Tiered episode selection.

use serde::Serialize;

use super::Episode;

/// Which rule selected an episode. Earlier tiers are more trustworthy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchTier {
    /// Requested season and episode both match.
    Exact,
    /// Same episode number one season away.
    AdjacentSeason,
    /// The episode number occurs exactly once in the whole list.
    UniqueEpisodeNumber,
    /// Same episode number, closest season.
    NearestSeason,
}

impl MatchTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchTier::Exact => "exact",
            MatchTier::AdjacentSeason => "adjacent_season",
            MatchTier::UniqueEpisodeNumber => "unique_episode_number",
            MatchTier::NearestSeason => "nearest_season",
        }
    }
}

/// A selected episode with its tier and score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpisodeMatch<'a> {
    pub episode: &'a Episode,
    pub tier: MatchTier,
    /// 100 exact, 80 adjacent, 60 unique, 50 minus distance for nearest.
    pub score: i64,
}

/// Pick the episode that best answers `(season, episode)`.
///
/// Tiers are tried in order and the first that yields a result wins:
///
/// 1. exact season and episode
/// 2. same episode number in season ±1, lower season first
/// 3. an episode number that appears exactly once in the list
/// 4. same episode number in the nearest season, lower season on ties
pub fn find_match(episodes: &[Episode], season: u32, episode: u32) -> Option<EpisodeMatch<'_>> {
    if let Some(hit) = episodes
        .iter()
        .find(|e| e.season == season && e.episode == episode)
    {
        return Some(EpisodeMatch {
            episode: hit,
            tier: MatchTier::Exact,
            score: 100,
        });
    }

    let same_number: Vec<&Episode> = episodes.iter().filter(|e| e.episode == episode).collect();
    if same_number.is_empty() {
        return None;
    }

    let adjacent = [season.checked_sub(1), season.checked_add(1)]
        .into_iter()
        .flatten()
        .find_map(|s| same_number.iter().copied().find(|e| e.season == s));
    if let Some(hit) = adjacent {
        return Some(EpisodeMatch {
            episode: hit,
            tier: MatchTier::AdjacentSeason,
            score: 80,
        });
    }

    if let [only] = same_number.as_slice() {
        return Some(EpisodeMatch {
            episode: *only,
            tier: MatchTier::UniqueEpisodeNumber,
            score: 60,
        });
    }

    same_number
        .into_iter()
        .min_by_key(|e| (e.season.abs_diff(season), e.season))
        .map(|hit| EpisodeMatch {
            episode: hit,
            tier: MatchTier::NearestSeason,
            score: 50 - i64::from(hit.season.abs_diff(season)),
        })
}
