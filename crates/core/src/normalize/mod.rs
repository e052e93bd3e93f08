//! Title normalization shared by the catalog index and the candidate scorer.
//!
//! Provider catalogs decorate titles with release tags, bracketed group names,
//! years and episode markers. Everything here strips that noise so two
//! differently formatted names for the same show compare equal.
//!
//! All functions are pure: the same input always yields the same output.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex_lite::Regex;

/// Minimum token length (in chars) kept by [`tokenize`].
const MIN_TOKEN_LEN: usize = 3;

/// Tokens that carry no identity on their own.
const STOP_WORDS: &[&str] = &[
    "the", "and", "for", "with", "from", "season", "episode", "part", "complete", "collection",
    "series", "show", "saison", "temporada", "staffel", "les", "der", "die", "das", "una", "los",
    "las", "del", "edition", "vol", "volume",
];

/// Bracketed or parenthesized segments, including a parenthesized year.
static BRACKETED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[[^\]]*\]|\([^)]*\)|\{[^}]*\}").unwrap());

/// Season/episode markers: S01E02, S01, E02, 1x02, "season 1", "episode 3".
static EPISODE_MARKERS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\bs\d{1,2}\s*e\d{1,4}\b|\b\d{1,2}x\d{1,3}\b|\bs\d{1,2}\b|\be\d{1,4}\b|\bseason\s*\d+\b|\bepisode\s*\d+\b",
    )
    .unwrap()
});

/// Release quality vocabulary: resolution, codec, source and audio channel tags.
static QUALITY_TAGS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(2160p|1440p|1080p|1080i|720p|576p|480p|360p|4k|8k|uhd|fhd|hdr10\+?|hdr|dolby\s*vision|x264|x265|h\.?\s?264|h\.?\s?265|hevc|avc|xvid|divx|av1|10bit|8bit|blu-?ray|bdrip|brrip|bdremux|remux|web[\s.-]?dl|web[\s.-]?rip|hdtv|hdrip|dvdrip|dvdscr|hdcam|aac|ac3|e-?ac3|dts(-hd)?|atmos|truehd|ddp?\+?\s?[257]\.[01]|[257]\.[01]|multi|dual\s*audio|vostfr|subbed|dubbed)\b",
    )
    .unwrap()
});

/// Season/episode pair embedded in a title.
static SEASON_EPISODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bs(\d{1,2})\s*e(\d{1,4})\b|\b(\d{1,2})x(\d{1,3})\b").unwrap());

static PAREN_YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\(((?:19|20)\d{2})\)").unwrap());

static TRAILING_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\s\-.]((?:19|20)\d{2})\s*$").unwrap());

static IMDB_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)tt(\d{5,10})").unwrap());

/// Strip noise from a free-text title.
///
/// Removes bracketed segments, season/episode markers and release tags,
/// lowercases, and collapses the rest into alphanumeric words joined by a
/// single space.
pub fn normalize(text: &str) -> String {
    let lowered = text.to_lowercase();
    let s = BRACKETED.replace_all(&lowered, " ");
    let s = EPISODE_MARKERS.replace_all(&s, " ");
    let s = QUALITY_TAGS.replace_all(&s, " ");

    let mut out = String::with_capacity(s.len());
    for word in s
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    out
}

/// Normalize then split into significant tokens.
///
/// Drops tokens shorter than three characters and stop words.
pub fn tokenize(text: &str) -> BTreeSet<String> {
    normalize(text)
        .split_whitespace()
        .filter(|t| t.chars().count() >= MIN_TOKEN_LEN)
        .filter(|t| !STOP_WORDS.contains(t))
        .map(str::to_string)
        .collect()
}

/// Sorted, de-duplicated token signature of a title.
///
/// Returns an empty string when no token survives [`tokenize`].
pub fn canonical_key(text: &str) -> String {
    key_from_tokens(&tokenize(text))
}

/// Join an already tokenized title into its canonical key.
pub fn key_from_tokens(tokens: &BTreeSet<String>) -> String {
    tokens.iter().map(String::as_str).collect::<Vec<_>>().join(" ")
}

/// Extract a release year from a raw title, e.g. `"The Office (2005)"`.
pub fn extract_year(text: &str) -> Option<i32> {
    PAREN_YEAR
        .captures(text)
        .or_else(|| TRAILING_YEAR.captures(text))
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Parse a season/episode marker (`S02E05`, `2x05`) out of a title.
pub fn season_episode_marker(text: &str) -> Option<(i64, i64)> {
    let caps = SEASON_EPISODE.captures(text)?;
    let (season, episode) = match (caps.get(1), caps.get(2)) {
        (Some(s), Some(e)) => (s, e),
        _ => (caps.get(3)?, caps.get(4)?),
    };
    Some((season.as_str().parse().ok()?, episode.as_str().parse().ok()?))
}

/// Normalize a TMDB identifier to its digits.
///
/// Returns `None` for blank or all-zero input.
pub fn normalize_tmdb_id(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    let trimmed = digits.trim_start_matches('0');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Normalize an IMDB identifier to the `tt`-prefixed digit form.
///
/// Accepts `tt0386676`, `TT0386676`, a URL containing the id, or bare digits.
pub fn normalize_imdb_id(raw: &str) -> Option<String> {
    if let Some(caps) = IMDB_ID.captures(raw) {
        return Some(format!("tt{}", &caps[1]));
    }
    let trimmed = raw.trim();
    if !trimmed.is_empty() && trimmed.chars().all(|c| c.is_ascii_digit()) {
        return Some(format!("tt{:0>7}", trimmed));
    }
    None
}
