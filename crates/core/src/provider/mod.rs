//! Content provider integration.
//!
//! The resolver only talks to providers through [`CatalogProvider`]; the
//! Xtream-Codes HTTP client is one implementation, test doubles are another.

mod xtream;

pub use xtream::{parse_catalog_payload, XtreamClient, XtreamConfig};

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::index::RawCatalogEntry;

/// Errors that can occur when talking to a provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Provider returned a non-success status.
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    /// Response body was not what we expected.
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// The call did not finish in time.
    #[error("Request timed out after {0}ms")]
    Timeout(u64),

    /// Missing or rejected credentials.
    #[error("Provider not configured: {0}")]
    NotConfigured(String),
}

/// Which catalog listing to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogKind {
    /// TV series, resolved down to single episodes.
    Series,
    /// Movie (VOD) streams.
    Movies,
}

impl CatalogKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CatalogKind::Series => "series",
            CatalogKind::Movies => "movies",
        }
    }
}

impl fmt::Display for CatalogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Account on a provider.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderCredentials {
    pub base_url: String,
    pub username: String,
    pub password: String,
}

impl ProviderCredentials {
    pub fn new(
        base_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            username: username.into(),
            password: password.into(),
        }
    }

    /// Stable cache namespace for this account: `host/username`.
    ///
    /// Scheme, trailing slashes and host case do not change the key.
    pub fn provider_key(&self) -> String {
        let url = self.base_url.trim();
        let host = url
            .split_once("://")
            .map_or(url, |(_, rest)| rest)
            .trim_end_matches('/')
            .to_lowercase();
        if host.is_empty() {
            return "unconfigured".to_string();
        }
        format!("{}/{}", host, self.username.trim())
    }

    pub fn is_configured(&self) -> bool {
        !self.base_url.trim().is_empty()
    }
}

impl fmt::Debug for ProviderCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderCredentials")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Source of raw catalog and episode data.
#[async_trait]
pub trait CatalogProvider: Send + Sync {
    /// Fetch the full series or movie listing.
    async fn fetch_raw_catalog(
        &self,
        credentials: &ProviderCredentials,
        kind: CatalogKind,
    ) -> Result<Vec<RawCatalogEntry>, ProviderError>;

    /// Fetch the raw episode payload of one series, in whatever shape the
    /// provider uses.
    async fn fetch_raw_episode_list(
        &self,
        credentials: &ProviderCredentials,
        series_id: i64,
    ) -> Result<serde_json::Value, ProviderError>;
}
