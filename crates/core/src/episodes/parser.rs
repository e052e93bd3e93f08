//! Episode-list extraction from provider payloads.
//!
//! Providers return per-series episode data in several shapes: an object of
//! arrays keyed by season number, a flat array, or records buried inside
//! arbitrary sub-objects. The scanner walks the whole JSON tree and treats
//! anything that looks like an episode record as one.

use std::collections::HashSet;

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use super::Episode;
use crate::fields::{has_any, int_field, str_field};
use crate::normalize::season_episode_marker;

const ID_KEYS: &[&str] = &["id", "stream_id", "episode_id"];
const EPISODE_KEYS: &[&str] = &["episode_num", "episode_number", "episode", "ep_num"];
const SEASON_KEYS: &[&str] = &["season", "season_num", "season_number"];
const TITLE_KEYS: &[&str] = &["title", "name"];
const EXT_KEYS: &[&str] = &["container_extension", "extension", "container"];

/// A single record that looked like an episode but could not be used.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedEpisodeRecord {
    #[error("episode record has no usable stream id")]
    MissingStreamId,

    #[error("episode record {stream_id} has no episode number")]
    MissingEpisodeNumber { stream_id: i64 },

    #[error("episode record {stream_id} has out-of-range {field}: {value}")]
    OutOfRange {
        stream_id: i64,
        field: &'static str,
        value: i64,
    },
}

/// Result of scanning a payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedEpisodes {
    /// Episodes sorted by season then episode, one per stream id.
    pub episodes: Vec<Episode>,
    /// Records that looked like episodes but were skipped.
    pub skipped: usize,
}

/// Extract every episode from a raw per-series payload.
///
/// Malformed records are skipped and counted; they never abort the scan.
pub fn parse_episode_list(payload: &Value) -> ParsedEpisodes {
    let mut scan = Scan::default();
    scan.walk(payload, None);

    let mut seen = HashSet::new();
    let mut episodes: Vec<Episode> = scan
        .found
        .into_iter()
        .filter(|e| seen.insert(e.stream_id))
        .collect();
    episodes.sort_by_key(|e| (e.season, e.episode));

    ParsedEpisodes {
        episodes,
        skipped: scan.skipped,
    }
}

#[derive(Default)]
struct Scan {
    found: Vec<Episode>,
    skipped: usize,
}

impl Scan {
    fn walk(&mut self, value: &Value, season_hint: Option<u32>) {
        match value {
            Value::Array(items) => {
                for item in items {
                    self.walk(item, season_hint);
                }
            }
            Value::Object(map) => {
                if is_season_summary(map) {
                    return;
                }
                if looks_like_episode(map) {
                    match parse_record(map, season_hint) {
                        Ok(episode) => self.found.push(episode),
                        Err(e) => {
                            debug!(error = %e, "Skipping malformed episode record");
                            self.skipped += 1;
                        }
                    }
                    return;
                }
                for (key, child) in map {
                    self.walk(child, season_from_key(key).or(season_hint));
                }
            }
            _ => {}
        }
    }
}

fn info_block(map: &Map<String, Value>) -> Option<&Map<String, Value>> {
    map.get("info").and_then(Value::as_object)
}

/// Season listings (`{"season_number": 1, "episode_count": 10, ...}`) carry
/// an id but are not episodes.
fn is_season_summary(map: &Map<String, Value>) -> bool {
    map.contains_key("episode_count") && !has_any(map, EPISODE_KEYS)
}

fn looks_like_episode(map: &Map<String, Value>) -> bool {
    let direct = has_any(map, ID_KEYS) || has_any(map, EPISODE_KEYS);
    direct
        || info_block(map).is_some_and(|info| has_any(info, ID_KEYS) || has_any(info, EPISODE_KEYS))
}

/// `"2"`, `"season_2"`, `"Season 2"` all hint season 2.
fn season_from_key(key: &str) -> Option<u32> {
    let trimmed = key.trim();
    let digits = match trimmed.get(..6) {
        Some(prefix) if prefix.eq_ignore_ascii_case("season") => {
            trimmed[6..].trim_start_matches(['_', '-', ' '])
        }
        _ => trimmed,
    };
    digits.parse().ok()
}

fn parse_record(
    map: &Map<String, Value>,
    season_hint: Option<u32>,
) -> Result<Episode, MalformedEpisodeRecord> {
    let info = info_block(map);
    let int = |keys: &[&str]| int_field(map, keys).or_else(|| info.and_then(|i| int_field(i, keys)));
    let text = |keys: &[&str]| str_field(map, keys).or_else(|| info.and_then(|i| str_field(i, keys)));

    let stream_id = int(ID_KEYS).ok_or(MalformedEpisodeRecord::MissingStreamId)?;
    let title = text(TITLE_KEYS).unwrap_or_default();
    let marker = season_episode_marker(&title);

    let episode = int(EPISODE_KEYS)
        .or(marker.map(|(_, e)| e))
        .ok_or(MalformedEpisodeRecord::MissingEpisodeNumber { stream_id })?;
    let season = int(SEASON_KEYS)
        .or(season_hint.map(i64::from))
        .or(marker.map(|(s, _)| s))
        .unwrap_or(1);

    Ok(Episode {
        stream_id,
        season: to_u32(stream_id, "season", season)?,
        episode: to_u32(stream_id, "episode", episode)?,
        title,
        container_extension: text(EXT_KEYS),
    })
}

fn to_u32(stream_id: i64, field: &'static str, value: i64) -> Result<u32, MalformedEpisodeRecord> {
    u32::try_from(value).map_err(|_| MalformedEpisodeRecord::OutOfRange {
        stream_id,
        field,
        value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn summary(parsed: &ParsedEpisodes) -> Vec<(i64, u32, u32)> {
        parsed
            .episodes
            .iter()
            .map(|e| (e.stream_id, e.season, e.episode))
            .collect()
    }

    #[test]
    fn test_season_keyed_object() {
        let payload = json!({
            "seasons": [
                {"id": 900, "season_number": 1, "episode_count": 2},
                {"id": 901, "season_number": 2, "episode_count": 1}
            ],
            "info": {"name": "Dark", "plot": "..."},
            "episodes": {
                "1": [
                    {"id": "101", "episode_num": 1, "title": "Secrets", "container_extension": "mkv"},
                    {"id": "102", "episode_num": "2", "title": "Lies", "container_extension": "mkv"}
                ],
                "2": [
                    {"id": "201", "episode_num": 1, "title": "Beginnings", "container_extension": "mp4"}
                ]
            }
        });

        let parsed = parse_episode_list(&payload);
        assert_eq!(summary(&parsed), vec![(101, 1, 1), (102, 1, 2), (201, 2, 1)]);
        assert_eq!(parsed.skipped, 0);
        assert_eq!(parsed.episodes[2].container_extension.as_deref(), Some("mp4"));
        assert_eq!(parsed.episodes[0].title, "Secrets");
    }

    #[test]
    fn test_flat_array_with_explicit_seasons() {
        let payload = json!([
            {"stream_id": 5, "season": 2, "episode_number": 3, "name": "C"},
            {"stream_id": 4, "season": 1, "episode_number": 9, "name": "B"},
        ]);
        let parsed = parse_episode_list(&payload);
        assert_eq!(summary(&parsed), vec![(4, 1, 9), (5, 2, 3)]);
    }

    #[test]
    fn test_nested_sub_objects_inherit_nearest_season_key() {
        let payload = json!({
            "data": {
                "series": {
                    "season_3": {
                        "items": [{"episode_id": 31, "ep_num": 1}]
                    },
                    "4": {
                        "inner": {"list": [{"episode_id": 41, "ep_num": 7}]}
                    }
                }
            }
        });
        let parsed = parse_episode_list(&payload);
        assert_eq!(summary(&parsed), vec![(31, 3, 1), (41, 4, 7)]);
    }

    #[test]
    fn test_fields_read_from_info_block() {
        let payload = json!({
            "episodes": [
                {"id": 77, "info": {"season": 5, "episode_num": 2, "container_extension": "avi"}}
            ]
        });
        let parsed = parse_episode_list(&payload);
        assert_eq!(summary(&parsed), vec![(77, 5, 2)]);
        assert_eq!(parsed.episodes[0].container_extension.as_deref(), Some("avi"));
    }

    #[test]
    fn test_episode_number_from_title_marker() {
        let payload = json!({"episodes": [{"id": 8, "title": "Dark S02E05"}]});
        let parsed = parse_episode_list(&payload);
        assert_eq!(summary(&parsed), vec![(8, 2, 5)]);
    }

    #[test]
    fn test_season_key_beats_title_marker() {
        let payload = json!({"3": [{"id": 8, "title": "Dark S02E05"}]});
        let parsed = parse_episode_list(&payload);
        assert_eq!(summary(&parsed), vec![(8, 3, 5)]);
    }

    #[test]
    fn test_missing_season_defaults_to_one() {
        let payload = json!([{"id": 1, "episode_num": 4}]);
        assert_eq!(summary(&parse_episode_list(&payload)), vec![(1, 1, 4)]);
    }

    #[test]
    fn test_malformed_records_are_skipped_not_fatal() {
        let payload = json!({
            "1": [
                {"episode_num": 1, "title": "no id"},
                {"id": 2, "title": "no number"},
                {"id": 3, "episode_num": -4},
                {"id": 4, "episode_num": 2, "title": "ok"}
            ]
        });
        let parsed = parse_episode_list(&payload);
        assert_eq!(summary(&parsed), vec![(4, 1, 2)]);
        assert_eq!(parsed.skipped, 3);
    }

    #[test]
    fn test_duplicate_stream_ids_keep_first() {
        let payload = json!({
            "1": [{"id": 10, "episode_num": 1, "title": "first"}],
            "2": [{"id": 10, "episode_num": 1, "title": "second"}]
        });
        let parsed = parse_episode_list(&payload);
        assert_eq!(parsed.episodes.len(), 1);
        assert_eq!(parsed.episodes[0].title, "first");
    }

    #[test]
    fn test_non_container_payloads_yield_nothing() {
        for payload in [json!(null), json!("text"), json!(42), json!({}), json!([])] {
            let parsed = parse_episode_list(&payload);
            assert!(parsed.episodes.is_empty());
            assert_eq!(parsed.skipped, 0);
        }
    }

    #[test]
    fn test_season_from_key() {
        assert_eq!(season_from_key("2"), Some(2));
        assert_eq!(season_from_key("season_2"), Some(2));
        assert_eq!(season_from_key("Season 10"), Some(10));
        assert_eq!(season_from_key("episodes"), None);
        assert_eq!(season_from_key("seasons"), None);
    }
}
