//! CoinPaprika coin data provider implementation

use crate::{
    config::SdkConfig,
    constants::{
        COINPAPRIKA_COINS_ENDPOINT, COINPAPRIKA_TICKERS_ENDPOINT, HISTORY_WINDOW_DAYS, USER_AGENT,
    },
    error::ProviderError,
    provider::CoinDataProvider,
    types::{CoinId, CoinMetadata, CoinPriceSnapshot, OhlcvEntry},
};
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;

/// CoinPaprika coin data provider
pub struct CoinPaprikaProvider {
    client: Client,
    base_url: String,
}

impl CoinPaprikaProvider {
    /// Creates a provider with the default configuration
    pub fn new() -> Result<Self, ProviderError> {
        Self::with_config(&SdkConfig::default())
    }

    /// Creates a provider using the base URL and timeout from `config`
    pub fn with_config(config: &SdkConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(ProviderError::NetworkError)?;

        Ok(Self {
            client,
            base_url: config.api_url.clone(),
        })
    }

    fn coin_url(&self, coin_id: &CoinId) -> String {
        format!("{}{}/{}", self.base_url, COINPAPRIKA_COINS_ENDPOINT, coin_id)
    }

    fn ticker_url(&self, coin_id: &CoinId) -> String {
        format!("{}{}/{}", self.base_url, COINPAPRIKA_TICKERS_ENDPOINT, coin_id)
    }

    fn history_url(&self, coin_id: &CoinId) -> String {
        let end = Utc::now().date_naive();
        let start = end - ChronoDuration::days(HISTORY_WINDOW_DAYS);
        format!(
            "{}{}/{}/ohlcv/historical?start={}&end={}",
            self.base_url,
            COINPAPRIKA_COINS_ENDPOINT,
            coin_id,
            start.format("%Y-%m-%d"),
            end.format("%Y-%m-%d")
        )
    }

    /// Issues a GET request and decodes the JSON body
    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        coin_id: &CoinId,
    ) -> Result<T, ProviderError> {
        tracing::debug!(url = %url, "Fetching from CoinPaprika");

        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout
            } else {
                ProviderError::NetworkError(e)
            }
        })?;

        match response.status() {
            StatusCode::TOO_MANY_REQUESTS => return Err(ProviderError::RateLimitExceeded),
            StatusCode::NOT_FOUND => return Err(ProviderError::CoinNotFound(coin_id.to_string())),
            status if !status.is_success() => {
                return Err(ProviderError::ApiError(format!(
                    "HTTP {}: {}",
                    status,
                    response.text().await.unwrap_or_default()
                )));
            }
            _ => {}
        }

        let response_text = response.text().await.map_err(ProviderError::NetworkError)?;

        parse_body(&response_text)
    }
}

fn parse_body<T: DeserializeOwned>(body: &str) -> Result<T, ProviderError> {
    serde_json::from_str(body).map_err(|e| {
        ProviderError::InvalidResponse(format!(
            "Failed to parse CoinPaprika response: {}. Response: {}",
            e, body
        ))
    })
}

#[async_trait]
impl CoinDataProvider for CoinPaprikaProvider {
    async fn fetch_coin_info(&self, coin_id: &CoinId) -> Result<CoinMetadata, ProviderError> {
        self.get_json(&self.coin_url(coin_id), coin_id).await
    }

    async fn fetch_coin_tickers(
        &self,
        coin_id: &CoinId,
    ) -> Result<CoinPriceSnapshot, ProviderError> {
        let ticker: CoinPriceSnapshot = self.get_json(&self.ticker_url(coin_id), coin_id).await?;

        tracing::debug!(
            coin = %coin_id,
            price_usd = ticker.price_usd(),
            "Fetched ticker from CoinPaprika"
        );

        Ok(ticker)
    }

    async fn fetch_coin_history(
        &self,
        coin_id: &CoinId,
    ) -> Result<Vec<OhlcvEntry>, ProviderError> {
        self.get_json(&self.history_url(coin_id), coin_id).await
    }

    fn provider_name(&self) -> &'static str {
        "coinpaprika"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> CoinPaprikaProvider {
        let config = SdkConfig {
            api_url: "http://paprika.test/v1".to_string(),
            ..SdkConfig::default()
        };
        CoinPaprikaProvider::with_config(&config).unwrap()
    }

    #[test]
    fn test_urls() {
        let provider = provider();
        let id = CoinId::new("btc-bitcoin").unwrap();
        assert_eq!(provider.coin_url(&id), "http://paprika.test/v1/coins/btc-bitcoin");
        assert_eq!(provider.ticker_url(&id), "http://paprika.test/v1/tickers/btc-bitcoin");
        assert!(provider
            .history_url(&id)
            .starts_with("http://paprika.test/v1/coins/btc-bitcoin/ohlcv/historical?start="));
    }

    #[test]
    fn test_parse_body_reports_invalid_response() {
        let err = parse_body::<CoinMetadata>("{\"error\":\"id not found\"}").unwrap_err();
        assert!(matches!(err, ProviderError::InvalidResponse(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_parse_history() {
        let body = r#"[{
            "time_open": "2024-01-01T00:00:00Z",
            "time_close": "2024-01-01T23:59:59Z",
            "open": 42000.0,
            "high": 43000.0,
            "low": 41000.0,
            "close": 42500.5,
            "volume": 1000,
            "market_cap": 830000000000
        }]"#;
        let history: Vec<OhlcvEntry> = parse_body(body).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].close, 42500.5);
    }
}
