//! Runtime configuration
//!
//! Defaults come from [`constants`](crate::constants); a handful of values can
//! be overridden through environment variables.

use crate::{
    constants::{
        COINPAPRIKA_API_URL, ENV_API_URL, ENV_PRICE_REFETCH_MS, ENV_REQUEST_TIMEOUT_SECS,
        PRICE_REFETCH_INTERVAL_MS, REQUEST_TIMEOUT_SECS,
    },
    error::ConfigError,
};
use std::time::Duration;

/// Settings shared by the provider and the query cache
#[derive(Debug, Clone, PartialEq)]
pub struct SdkConfig {
    /// Base URL of the CoinPaprika API
    pub api_url: String,
    /// Interval between price refetches while a coin view is mounted
    pub price_refetch_interval: Duration,
    /// HTTP request timeout
    pub request_timeout: Duration,
}

impl Default for SdkConfig {
    fn default() -> Self {
        Self {
            api_url: COINPAPRIKA_API_URL.to_string(),
            price_refetch_interval: Duration::from_millis(PRICE_REFETCH_INTERVAL_MS),
            request_timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
        }
    }
}

impl SdkConfig {
    /// Builds the configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup(ENV_API_URL) {
            let url = url.trim().trim_end_matches('/').to_string();
            if url.is_empty() {
                return Err(invalid(ENV_API_URL, &url));
            }
            config.api_url = url;
        }

        if let Some(ms) = lookup(ENV_PRICE_REFETCH_MS) {
            let parsed = parse_positive(ENV_PRICE_REFETCH_MS, &ms)?;
            config.price_refetch_interval = Duration::from_millis(parsed);
        }

        if let Some(secs) = lookup(ENV_REQUEST_TIMEOUT_SECS) {
            let parsed = parse_positive(ENV_REQUEST_TIMEOUT_SECS, &secs)?;
            config.request_timeout = Duration::from_secs(parsed);
        }

        tracing::debug!(
            api_url = %config.api_url,
            price_refetch_ms = config.price_refetch_interval.as_millis() as u64,
            "Loaded coin detail configuration"
        );

        Ok(config)
    }
}

fn parse_positive(var: &str, value: &str) -> Result<u64, ConfigError> {
    match value.trim().parse::<u64>() {
        Ok(parsed) if parsed > 0 => Ok(parsed),
        _ => Err(invalid(var, value)),
    }
}

fn invalid(var: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        var: var.to_string(),
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn test_defaults_without_overrides() {
        let config = SdkConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, SdkConfig::default());
        assert_eq!(config.price_refetch_interval, Duration::from_millis(10_000));
    }

    #[test]
    fn test_overrides() {
        let config = SdkConfig::from_lookup(lookup_from(&[
            (ENV_API_URL, "http://localhost:8080/v1/"),
            (ENV_PRICE_REFETCH_MS, "2500"),
        ]))
        .unwrap();
        assert_eq!(config.api_url, "http://localhost:8080/v1");
        assert_eq!(config.price_refetch_interval, Duration::from_millis(2500));
    }

    #[test]
    fn test_rejects_zero_interval() {
        let err = SdkConfig::from_lookup(lookup_from(&[(ENV_PRICE_REFETCH_MS, "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }
}
