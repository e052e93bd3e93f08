use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Fetch concurrency, probe limits and cache capacities are not 0
/// - Scoring bands are within [0, 1] and ordered
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let invalid = |msg: &str| Err(ConfigError::ValidationError(msg.to_string()));

    if config.server.port == 0 {
        return invalid("server.port cannot be 0");
    }

    let resolver = &config.resolver;
    if resolver.max_concurrent_fetches == 0 {
        return invalid("resolver.max_concurrent_fetches cannot be 0");
    }
    if resolver.probe_limit == 0 || resolver.strong_probe_limit == 0 {
        return invalid("resolver probe limits cannot be 0");
    }
    if !(0.0..=1.0).contains(&resolver.binding_confidence) {
        return invalid("resolver.binding_confidence must be within [0, 1]");
    }
    resolver
        .scoring
        .validate()
        .map_err(ConfigError::ValidationError)?;

    let cache = &config.cache;
    if cache.memory_catalogs == 0
        || cache.memory_episode_lists == 0
        || cache.resolved_capacity == 0
        || cache.binding_capacity == 0
    {
        return invalid("cache capacities cannot be 0");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use std::net::IpAddr;

    #[test]
    fn test_validate_valid_config() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_validate_port_zero_fails() {
        let config = Config {
            server: ServerConfig {
                host: "0.0.0.0".parse::<IpAddr>().unwrap(),
                port: 0,
            },
            ..Config::default()
        };
        let result = validate_config(&config);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_validate_zero_concurrency_fails() {
        let mut config = Config::default();
        config.resolver.max_concurrent_fetches = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_zero_capacity_fails() {
        let mut config = Config::default();
        config.cache.resolved_capacity = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_inverted_scoring_bands_fail() {
        let mut config = Config::default();
        config.resolver.scoring.token_weak = 0.9;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("weak <= strong <= full"));
    }
}
