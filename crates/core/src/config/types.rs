use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

use crate::cache::CacheConfig;
use crate::provider::{ProviderCredentials, XtreamConfig};
use crate::resolver::ResolverConfig;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Provider account. Without it every fetch fails and only cached
    /// answers are served.
    #[serde(default)]
    pub provider: Option<ProviderConfig>,
    #[serde(default)]
    pub resolver: ResolverConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8080
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// SQLite file backing the persistent cache tiers.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("streamfind.db")
}

/// Xtream-Codes provider account
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderConfig {
    /// Server URL (e.g., "http://iptv.example.com:8080")
    pub base_url: String,
    pub username: String,
    pub password: String,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_timeout() -> u64 {
    30
}

impl ProviderConfig {
    pub fn credentials(&self) -> ProviderCredentials {
        ProviderCredentials::new(&self.base_url, &self.username, &self.password)
    }

    pub fn client_config(&self) -> XtreamConfig {
        XtreamConfig {
            timeout_secs: self.timeout_secs,
        }
    }
}

impl Config {
    /// Credentials of the configured provider, or an unconfigured
    /// placeholder.
    pub fn credentials(&self) -> ProviderCredentials {
        self.provider
            .as_ref()
            .map(ProviderConfig::credentials)
            .unwrap_or_else(|| ProviderCredentials::new("", "", ""))
    }
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<SanitizedProviderConfig>,
    pub resolver: ResolverConfig,
    pub cache: CacheConfig,
}

/// Sanitized provider config (password hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedProviderConfig {
    pub base_url: String,
    pub username: String,
    pub password_configured: bool,
    pub timeout_secs: u64,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            database: config.database.clone(),
            provider: config.provider.as_ref().map(|p| SanitizedProviderConfig {
                base_url: p.base_url.clone(),
                username: p.username.clone(),
                password_configured: !p.password.is_empty(),
                timeout_secs: p.timeout_secs,
            }),
            resolver: config.resolver.clone(),
            cache: config.cache.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_empty_config() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host.to_string(), "0.0.0.0");
        assert_eq!(config.database.path.to_str().unwrap(), "streamfind.db");
        assert!(config.provider.is_none());
        assert_eq!(config.resolver, ResolverConfig::default());
    }

    #[test]
    fn test_deserialize_full_config() {
        let toml = r#"
[server]
host = "127.0.0.1"
port = 9000

[database]
path = "/data/cache.sqlite"

[provider]
base_url = "http://iptv.example.com:8080"
username = "alice"
password = "hunter2"

[resolver]
probe_budget_ms = 10000
max_concurrent_fetches = 4

[resolver.scoring]
min_overlap_tokens = 3

[cache]
resolved_ttl_secs = 3600
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.database.path.to_str().unwrap(), "/data/cache.sqlite");

        let provider = config.provider.as_ref().unwrap();
        assert_eq!(provider.username, "alice");
        assert_eq!(provider.timeout_secs, 30); // default

        assert_eq!(config.resolver.probe_budget_ms, 10_000);
        assert_eq!(config.resolver.max_concurrent_fetches, 4);
        assert_eq!(config.resolver.scoring.min_overlap_tokens, 3);
        assert_eq!(config.cache.resolved_ttl_secs, 3600);
        assert_eq!(config.cache.binding_capacity, 2000);
    }

    #[test]
    fn test_credentials_without_provider() {
        let config = Config::default();
        let creds = config.credentials();
        assert!(!creds.is_configured());
        assert_eq!(creds.provider_key(), "unconfigured");
    }

    #[test]
    fn test_sanitized_config_hides_password() {
        let config = Config {
            provider: Some(ProviderConfig {
                base_url: "http://iptv.example.com".to_string(),
                username: "alice".to_string(),
                password: "hunter2".to_string(),
                timeout_secs: 15,
            }),
            ..Config::default()
        };

        let sanitized = SanitizedConfig::from(&config);
        let provider = sanitized.provider.as_ref().unwrap();
        assert!(provider.password_configured);
        assert_eq!(provider.timeout_secs, 15);

        let json = serde_json::to_string(&sanitized).unwrap();
        assert!(!json.contains("hunter2"));
    }
}
