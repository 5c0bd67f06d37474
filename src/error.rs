//! Error types for the coin detail view

use thiserror::Error;

/// Errors that can occur when fetching coin data from a provider
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Network request failed
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// Invalid response from provider
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// The provider does not know this coin
    #[error("Coin not found: {0}")]
    CoinNotFound(String),

    /// Provider API error
    #[error("Provider API error: {0}")]
    ApiError(String),

    /// Timeout waiting for response
    #[error("Request timeout")]
    Timeout,
}

impl ProviderError {
    /// Whether retrying the same request may succeed
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            ProviderError::CoinNotFound(_) | ProviderError::InvalidResponse(_)
        )
    }
}

/// Failure recorded in the query cache once a fetch has given up
///
/// Unlike [`ProviderError`] this is `Clone`, so it can live in a watched
/// [`QueryState`](crate::cache::QueryState).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct QueryError {
    /// Human readable failure message
    pub message: String,
    /// Whether the last failure was considered transient
    pub retryable: bool,
}

impl QueryError {
    /// Creates a query error from a message
    pub fn new(message: impl Into<String>, retryable: bool) -> Self {
        Self {
            message: message.into(),
            retryable,
        }
    }
}

impl From<&ProviderError> for QueryError {
    fn from(err: &ProviderError) -> Self {
        Self::new(err.to_string(), err.is_retryable())
    }
}

impl From<ProviderError> for QueryError {
    fn from(err: ProviderError) -> Self {
        Self::from(&err)
    }
}

/// Errors raised while resolving routes
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RouteError {
    /// The coin identifier segment is missing or empty
    #[error("Coin identifier is empty")]
    EmptyIdentifier,

    /// The path does not belong to the coin detail routes
    #[error("No route matches {path}")]
    NoMatch { path: String },
}

impl RouteError {
    /// Creates a NoMatch error
    pub fn no_match(path: &str) -> Self {
        Self::NoMatch {
            path: path.to_string(),
        }
    }
}

/// Errors raised while reading runtime configuration
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment variable holds a value that cannot be used
    #[error("Invalid value for {var}: {value}")]
    InvalidValue { var: String, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(ProviderError::RateLimitExceeded.is_retryable());
        assert!(ProviderError::Timeout.is_retryable());
        assert!(!ProviderError::CoinNotFound("nope".into()).is_retryable());

        let err = QueryError::from(ProviderError::ApiError("HTTP 500".into()));
        assert_eq!(err.message, "Provider API error: HTTP 500");
        assert!(err.retryable);
    }
}
