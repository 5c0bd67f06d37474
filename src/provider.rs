//! Provider abstraction for fetching coin data from external APIs

use crate::{
    error::ProviderError,
    types::{CoinId, CoinMetadata, CoinPriceSnapshot, OhlcvEntry},
};
use async_trait::async_trait;

/// Trait for coin data providers
///
/// The coin detail view only talks to the network through this trait, so a
/// provider can be swapped for a mock in tests.
#[async_trait]
pub trait CoinDataProvider: Send + Sync {
    /// Fetches descriptive metadata for a coin
    async fn fetch_coin_info(&self, coin_id: &CoinId) -> Result<CoinMetadata, ProviderError>;

    /// Fetches the current price ticker for a coin
    async fn fetch_coin_tickers(&self, coin_id: &CoinId)
        -> Result<CoinPriceSnapshot, ProviderError>;

    /// Fetches recent daily OHLCV history for a coin
    async fn fetch_coin_history(&self, coin_id: &CoinId)
        -> Result<Vec<OhlcvEntry>, ProviderError>;

    /// Returns the name of this provider
    fn provider_name(&self) -> &'static str;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use crate::types::{QueryKind, Quotes, UsdQuote};
    use chrono::{Duration as ChronoDuration, TimeZone, Utc};
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// Mock provider for testing
    pub struct MockProvider {
        info: Arc<Mutex<HashMap<String, Result<CoinMetadata, String>>>>,
        tickers: Arc<Mutex<HashMap<String, Result<CoinPriceSnapshot, String>>>>,
        history: Arc<Mutex<HashMap<String, Vec<OhlcvEntry>>>>,
        calls: Arc<Mutex<HashMap<(QueryKind, String), usize>>>,
        delay: Arc<Mutex<Duration>>,
    }

    impl Default for MockProvider {
        fn default() -> Self {
            Self::new()
        }
    }

    impl MockProvider {
        pub fn new() -> Self {
            Self {
                info: Arc::new(Mutex::new(HashMap::new())),
                tickers: Arc::new(Mutex::new(HashMap::new())),
                history: Arc::new(Mutex::new(HashMap::new())),
                calls: Arc::new(Mutex::new(HashMap::new())),
                delay: Arc::new(Mutex::new(Duration::ZERO)),
            }
        }

        /// Registers a coin with metadata and a ticker at the given price
        pub fn set_coin(&self, id: &str, name: &str, symbol: &str, price_usd: f64) {
            self.info
                .lock()
                .unwrap()
                .insert(id.to_string(), Ok(metadata(id, name, symbol)));
            self.set_price(id, name, symbol, price_usd);
        }

        pub fn set_price(&self, id: &str, name: &str, symbol: &str, price_usd: f64) {
            self.tickers
                .lock()
                .unwrap()
                .insert(id.to_string(), Ok(ticker(id, name, symbol, price_usd)));
        }

        pub fn set_ticker(&self, ticker: CoinPriceSnapshot) {
            self.tickers
                .lock()
                .unwrap()
                .insert(ticker.id.clone(), Ok(ticker));
        }

        pub fn set_history(&self, id: &str, closes: &[f64]) {
            self.history
                .lock()
                .unwrap()
                .insert(id.to_string(), history(closes));
        }

        pub fn set_info_error(&self, id: &str, message: &str) {
            self.info
                .lock()
                .unwrap()
                .insert(id.to_string(), Err(message.to_string()));
        }

        pub fn set_ticker_error(&self, id: &str, message: &str) {
            self.tickers
                .lock()
                .unwrap()
                .insert(id.to_string(), Err(message.to_string()));
        }

        /// Every fetch sleeps this long before answering
        pub fn set_delay(&self, delay: Duration) {
            *self.delay.lock().unwrap() = delay;
        }

        pub fn call_count(&self, kind: QueryKind, id: &str) -> usize {
            self.calls
                .lock()
                .unwrap()
                .get(&(kind, id.to_string()))
                .copied()
                .unwrap_or(0)
        }

        async fn record(&self, kind: QueryKind, id: &CoinId) {
            *self
                .calls
                .lock()
                .unwrap()
                .entry((kind, id.to_string()))
                .or_insert(0) += 1;
            let delay = *self.delay.lock().unwrap();
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
    }

    #[async_trait]
    impl CoinDataProvider for MockProvider {
        async fn fetch_coin_info(&self, coin_id: &CoinId) -> Result<CoinMetadata, ProviderError> {
            self.record(QueryKind::Metadata, coin_id).await;
            match self.info.lock().unwrap().get(coin_id.as_str()) {
                Some(Ok(info)) => Ok(info.clone()),
                Some(Err(message)) => Err(ProviderError::ApiError(message.clone())),
                None => Err(ProviderError::CoinNotFound(coin_id.to_string())),
            }
        }

        async fn fetch_coin_tickers(
            &self,
            coin_id: &CoinId,
        ) -> Result<CoinPriceSnapshot, ProviderError> {
            self.record(QueryKind::Price, coin_id).await;
            match self.tickers.lock().unwrap().get(coin_id.as_str()) {
                Some(Ok(ticker)) => Ok(ticker.clone()),
                Some(Err(message)) => Err(ProviderError::ApiError(message.clone())),
                None => Err(ProviderError::CoinNotFound(coin_id.to_string())),
            }
        }

        async fn fetch_coin_history(
            &self,
            coin_id: &CoinId,
        ) -> Result<Vec<OhlcvEntry>, ProviderError> {
            self.record(QueryKind::History, coin_id).await;
            self.history
                .lock()
                .unwrap()
                .get(coin_id.as_str())
                .cloned()
                .ok_or_else(|| ProviderError::CoinNotFound(coin_id.to_string()))
        }

        fn provider_name(&self) -> &'static str {
            "mock"
        }
    }

    pub fn metadata(id: &str, name: &str, symbol: &str) -> CoinMetadata {
        CoinMetadata {
            id: id.to_string(),
            name: name.to_string(),
            symbol: symbol.to_string(),
            rank: 1,
            is_new: false,
            is_active: true,
            coin_type: "coin".to_string(),
            description: format!("{} is a cryptocurrency.", name),
            message: String::new(),
            open_source: true,
            started_at: None,
            development_status: None,
            hardware_wallet: true,
            proof_type: None,
            org_structure: None,
            hash_algorithm: None,
            first_data_at: None,
            last_data_at: None,
        }
    }

    pub fn ticker(id: &str, name: &str, symbol: &str, price_usd: f64) -> CoinPriceSnapshot {
        CoinPriceSnapshot {
            id: id.to_string(),
            name: name.to_string(),
            symbol: symbol.to_string(),
            rank: 1,
            circulating_supply: 19_600_000.0,
            total_supply: 19_600_000.0,
            max_supply: 21_000_000.0,
            beta_value: 1.0,
            first_data_at: None,
            last_updated: None,
            quotes: Quotes {
                usd: UsdQuote {
                    price: price_usd,
                    ..UsdQuote::default()
                },
            },
        }
    }

    pub fn history(closes: &[f64]) -> Vec<OhlcvEntry> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, close)| {
                let time_open = start + ChronoDuration::days(i as i64);
                OhlcvEntry {
                    time_open,
                    time_close: time_open + ChronoDuration::days(1),
                    open: *close,
                    high: *close,
                    low: *close,
                    close: *close,
                    volume: 0.0,
                    market_cap: 0.0,
                }
            })
            .collect()
    }
}
