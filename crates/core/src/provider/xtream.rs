//! Xtream-Codes `player_api.php` client.
//!
//! Catalogs come from `get_series` / `get_vod_streams`, episode payloads
//! from `get_series_info`. Servers disagree on field names and on whether
//! numbers are sent as numbers or strings, so parsing is lenient.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use super::{CatalogKind, CatalogProvider, ProviderCredentials, ProviderError};
use crate::fields::{int_field, str_field};
use crate::index::RawCatalogEntry;

const SERIES_ID_KEYS: &[&str] = &["series_id", "id"];
const STREAM_ID_KEYS: &[&str] = &["stream_id", "id"];
const NAME_KEYS: &[&str] = &["name", "title"];
const TMDB_KEYS: &[&str] = &["tmdb", "tmdb_id"];
const IMDB_KEYS: &[&str] = &["imdb", "imdb_id"];
const DATE_KEYS: &[&str] = &["releaseDate", "release_date", "releasedate"];

/// Xtream client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XtreamConfig {
    /// Per-request timeout (seconds).
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_timeout() -> u64 {
    30
}

impl Default for XtreamConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
        }
    }
}

/// Xtream-Codes API client. Stateless apart from the HTTP connection pool;
/// credentials are passed per call.
pub struct XtreamClient {
    client: Client,
}

impl XtreamClient {
    /// Create a new client.
    pub fn new(config: XtreamConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client })
    }

    async fn call(
        &self,
        credentials: &ProviderCredentials,
        params: &[(&str, String)],
    ) -> Result<Value, ProviderError> {
        let url = api_url(credentials)?;

        let response = self
            .client
            .get(&url)
            .query(&[
                ("username", credentials.username.as_str()),
                ("password", credentials.password.as_str()),
            ])
            .query(params)
            .send()
            .await?;

        let status = response.status();
        if status == 401 || status == 403 {
            return Err(ProviderError::NotConfigured(format!(
                "provider rejected credentials ({})",
                status.as_u16()
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(format!("invalid JSON body: {}", e)))?;

        if auth_rejected(&payload) {
            return Err(ProviderError::NotConfigured(
                "provider rejected credentials".to_string(),
            ));
        }
        Ok(payload)
    }
}

#[async_trait::async_trait]
impl CatalogProvider for XtreamClient {
    async fn fetch_raw_catalog(
        &self,
        credentials: &ProviderCredentials,
        kind: CatalogKind,
    ) -> Result<Vec<RawCatalogEntry>, ProviderError> {
        let action = match kind {
            CatalogKind::Series => "get_series",
            CatalogKind::Movies => "get_vod_streams",
        };
        debug!(action, provider = %credentials.provider_key(), "Xtream catalog fetch");

        let payload = self.call(credentials, &[("action", action.to_string())]).await?;
        parse_catalog_payload(kind, &payload)
    }

    async fn fetch_raw_episode_list(
        &self,
        credentials: &ProviderCredentials,
        series_id: i64,
    ) -> Result<Value, ProviderError> {
        debug!(series_id, provider = %credentials.provider_key(), "Xtream series info fetch");

        self.call(
            credentials,
            &[
                ("action", "get_series_info".to_string()),
                ("series_id", series_id.to_string()),
            ],
        )
        .await
    }
}

fn api_url(credentials: &ProviderCredentials) -> Result<String, ProviderError> {
    if !credentials.is_configured() {
        return Err(ProviderError::NotConfigured(
            "no provider base URL".to_string(),
        ));
    }
    let base = credentials.base_url.trim().trim_end_matches('/');
    let base = base.strip_suffix("/player_api.php").unwrap_or(base);
    Ok(format!("{}/player_api.php", base))
}

/// `{"user_info": {"auth": 0}}` is how many servers say "wrong password".
fn auth_rejected(payload: &Value) -> bool {
    payload
        .get("user_info")
        .and_then(|info| info.get("auth"))
        .and_then(crate::fields::as_int)
        == Some(0)
}

/// Turn a catalog listing into raw entries.
///
/// Accepts an array of records or an object whose values are records.
/// Records without an id or a name are dropped.
pub fn parse_catalog_payload(
    kind: CatalogKind,
    payload: &Value,
) -> Result<Vec<RawCatalogEntry>, ProviderError> {
    let records: Vec<&Value> = match payload {
        Value::Array(items) => items.iter().collect(),
        Value::Object(map) => map.values().collect(),
        other => {
            return Err(ProviderError::ParseError(format!(
                "expected a {} listing, got {}",
                kind,
                json_type(other)
            )))
        }
    };

    let id_keys = match kind {
        CatalogKind::Series => SERIES_ID_KEYS,
        CatalogKind::Movies => STREAM_ID_KEYS,
    };

    let total = records.len();
    let entries: Vec<RawCatalogEntry> = records
        .into_iter()
        .filter_map(Value::as_object)
        .filter_map(|record| {
            Some(RawCatalogEntry {
                id: int_field(record, id_keys)?,
                name: str_field(record, NAME_KEYS)?,
                tmdb: str_field(record, TMDB_KEYS),
                imdb: str_field(record, IMDB_KEYS),
                year: year_field(record),
            })
        })
        .collect();

    if entries.len() < total {
        debug!(
            kind = %kind,
            dropped = total - entries.len(),
            "Dropped catalog records without id or name"
        );
    }
    Ok(entries)
}

fn year_field(record: &Map<String, Value>) -> Option<i32> {
    let from_year = int_field(record, &["year"]).and_then(|y| i32::try_from(y).ok());
    from_year
        .or_else(|| str_field(record, &["year"]).and_then(|s| leading_year(&s)))
        .or_else(|| str_field(record, DATE_KEYS).and_then(|s| leading_year(&s)))
        .filter(|y| (1870..=2200).contains(y))
}

fn leading_year(text: &str) -> Option<i32> {
    text.get(..4)?.parse().ok()
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
