//! Types for the coin detail view

use crate::error::RouteError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Identifier of a coin as it appears in the URL (e.g. `btc-bitcoin`)
///
/// Always non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CoinId(String);

impl CoinId {
    /// Creates a coin identifier, rejecting empty values
    pub fn new(id: impl Into<String>) -> Result<Self, RouteError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(RouteError::EmptyIdentifier);
        }
        Ok(Self(id))
    }

    /// Get the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CoinId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for CoinId {
    type Error = RouteError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CoinId> for String {
    fn from(id: CoinId) -> Self {
        id.0
    }
}

/// Descriptive, slowly-changing attributes of a coin (`/coins/{id}`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoinMetadata {
    pub id: String,
    pub name: String,
    pub symbol: String,
    pub rank: u32,
    #[serde(default)]
    pub is_new: bool,
    #[serde(default)]
    pub is_active: bool,
    #[serde(rename = "type", default)]
    pub coin_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub open_source: bool,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub development_status: Option<String>,
    #[serde(default)]
    pub hardware_wallet: bool,
    #[serde(default)]
    pub proof_type: Option<String>,
    #[serde(default)]
    pub org_structure: Option<String>,
    #[serde(default)]
    pub hash_algorithm: Option<String>,
    #[serde(default)]
    pub first_data_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_data_at: Option<DateTime<Utc>>,
}

/// USD quote block of a ticker
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsdQuote {
    pub price: f64,
    #[serde(default)]
    pub volume_24h: f64,
    #[serde(default)]
    pub volume_24h_change_24h: f64,
    #[serde(default)]
    pub market_cap: f64,
    #[serde(default)]
    pub market_cap_change_24h: f64,
    #[serde(default)]
    pub percent_change_15m: f64,
    #[serde(default)]
    pub percent_change_30m: f64,
    #[serde(default)]
    pub percent_change_1h: f64,
    #[serde(default)]
    pub percent_change_6h: f64,
    #[serde(default)]
    pub percent_change_12h: f64,
    #[serde(default)]
    pub percent_change_24h: f64,
    #[serde(default)]
    pub percent_change_7d: f64,
    #[serde(default)]
    pub percent_change_30d: f64,
    #[serde(default)]
    pub percent_change_1y: f64,
    #[serde(default)]
    pub ath_price: Option<f64>,
    #[serde(default)]
    pub ath_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub percent_from_price_ath: Option<f64>,
}

/// Quotes keyed by currency; only USD is requested
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Quotes {
    #[serde(rename = "USD")]
    pub usd: UsdQuote,
}

/// Frequently-changing numeric attributes of a coin (`/tickers/{id}`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoinPriceSnapshot {
    pub id: String,
    pub name: String,
    pub symbol: String,
    pub rank: u32,
    #[serde(default)]
    pub circulating_supply: f64,
    #[serde(default)]
    pub total_supply: f64,
    #[serde(default)]
    pub max_supply: f64,
    #[serde(default)]
    pub beta_value: f64,
    #[serde(default)]
    pub first_data_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
    pub quotes: Quotes,
}

impl CoinPriceSnapshot {
    /// Current USD price
    pub fn price_usd(&self) -> f64 {
        self.quotes.usd.price
    }
}

/// One day of OHLCV history (`/coins/{id}/ohlcv/historical`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OhlcvEntry {
    pub time_open: DateTime<Utc>,
    pub time_close: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: f64,
    #[serde(default)]
    pub market_cap: f64,
}

/// Kind of query held by the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryKind {
    /// Coin metadata, fetched once
    Metadata,
    /// Price ticker, polled
    Price,
    /// OHLCV history for the chart tab
    History,
}

impl QueryKind {
    /// Get the key prefix for this kind
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryKind::Metadata => "metadata",
            QueryKind::Price => "price",
            QueryKind::History => "history",
        }
    }
}

/// Identity of a cached request: `(kind, coin id)`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueryKey {
    pub kind: QueryKind,
    pub coin_id: CoinId,
}

impl QueryKey {
    pub fn metadata(coin_id: &CoinId) -> Self {
        Self {
            kind: QueryKind::Metadata,
            coin_id: coin_id.clone(),
        }
    }

    pub fn price(coin_id: &CoinId) -> Self {
        Self {
            kind: QueryKind::Price,
            coin_id: coin_id.clone(),
        }
    }

    pub fn history(coin_id: &CoinId) -> Self {
        Self {
            kind: QueryKind::History,
            coin_id: coin_id.clone(),
        }
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(\"{}\", \"{}\")", self.kind.as_str(), self.coin_id)
    }
}

/// Result payload stored in the query cache
#[derive(Debug, Clone, PartialEq)]
pub enum QueryData {
    Metadata(Arc<CoinMetadata>),
    Price(Arc<CoinPriceSnapshot>),
    History(Arc<Vec<OhlcvEntry>>),
}

impl QueryData {
    pub fn as_metadata(&self) -> Option<&CoinMetadata> {
        match self {
            QueryData::Metadata(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_price(&self) -> Option<&CoinPriceSnapshot> {
        match self {
            QueryData::Price(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_history(&self) -> Option<&[OhlcvEntry]> {
        match self {
            QueryData::History(data) => Some(data),
            _ => None,
        }
    }
}

/// Events emitted by the query cache
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CacheEvent {
    /// A fetch produced fresh data for a key
    FetchSucceeded {
        id: Uuid,
        key: QueryKey,
        timestamp: DateTime<Utc>,
    },

    /// A fetch gave up after exhausting its retries
    FetchFailed {
        id: Uuid,
        key: QueryKey,
        error_message: String,
        timestamp: DateTime<Utc>,
    },
}

impl CacheEvent {
    pub fn succeeded(key: QueryKey) -> Self {
        CacheEvent::FetchSucceeded {
            id: Uuid::new_v4(),
            key,
            timestamp: Utc::now(),
        }
    }

    pub fn failed(key: QueryKey, error_message: String) -> Self {
        CacheEvent::FetchFailed {
            id: Uuid::new_v4(),
            key,
            error_message,
            timestamp: Utc::now(),
        }
    }

    /// Get the event ID
    pub fn id(&self) -> Uuid {
        match self {
            CacheEvent::FetchSucceeded { id, .. } => *id,
            CacheEvent::FetchFailed { id, .. } => *id,
        }
    }

    /// Get the key the event refers to
    pub fn key(&self) -> &QueryKey {
        match self {
            CacheEvent::FetchSucceeded { key, .. } => key,
            CacheEvent::FetchFailed { key, .. } => key,
        }
    }
}

impl fmt::Display for CacheEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheEvent::FetchSucceeded { key, .. } => write!(f, "Fetched {}", key),
            CacheEvent::FetchFailed {
                key, error_message, ..
            } => write!(f, "Fetch failed for {}: {}", key, error_message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coin_id_rejects_empty() {
        assert_eq!(CoinId::new(""), Err(RouteError::EmptyIdentifier));
        assert_eq!(CoinId::new("  "), Err(RouteError::EmptyIdentifier));
        assert_eq!(CoinId::new("btc-bitcoin").unwrap().as_str(), "btc-bitcoin");
    }

    #[test]
    fn test_query_key_display() {
        let id = CoinId::new("eth-ethereum").unwrap();
        assert_eq!(QueryKey::price(&id).to_string(), "(\"price\", \"eth-ethereum\")");
        assert_ne!(QueryKey::price(&id), QueryKey::metadata(&id));
    }

    #[test]
    fn test_parse_ticker_payload() {
        let json = r#"{
            "id": "btc-bitcoin",
            "name": "Bitcoin",
            "symbol": "BTC",
            "rank": 1,
            "circulating_supply": 19600000,
            "total_supply": 19600000,
            "max_supply": 21000000,
            "beta_value": 0.9,
            "first_data_at": "2010-07-17T00:00:00Z",
            "last_updated": "2024-01-01T12:00:00Z",
            "quotes": {
                "USD": {
                    "price": 42000.123456,
                    "volume_24h": 1000.0,
                    "market_cap": 800000000000,
                    "percent_change_24h": -1.5,
                    "ath_price": 69000.0,
                    "ath_date": "2021-11-10T16:51:15Z",
                    "percent_from_price_ath": -39.1
                }
            }
        }"#;

        let ticker: CoinPriceSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(ticker.price_usd(), 42000.123456);
        assert_eq!(ticker.max_supply, 21000000.0);
        assert_eq!(ticker.quotes.usd.percent_change_24h, -1.5);
        assert_eq!(ticker.quotes.usd.percent_change_1y, 0.0);
    }

    #[test]
    fn test_parse_metadata_with_nulls() {
        let json = r#"{
            "id": "btc-bitcoin",
            "name": "Bitcoin",
            "symbol": "BTC",
            "rank": 1,
            "is_new": false,
            "is_active": true,
            "type": "coin",
            "description": "Bitcoin is a cryptocurrency.",
            "message": "",
            "open_source": true,
            "started_at": "2009-01-03T00:00:00Z",
            "development_status": "Working product",
            "hardware_wallet": true,
            "proof_type": "Proof of Work",
            "org_structure": null,
            "hash_algorithm": "SHA256",
            "first_data_at": "2010-07-17T00:00:00Z",
            "last_data_at": "2024-01-01T00:00:00Z"
        }"#;

        let info: CoinMetadata = serde_json::from_str(json).unwrap();
        assert_eq!(info.name, "Bitcoin");
        assert_eq!(info.coin_type, "coin");
        assert!(info.org_structure.is_none());
        assert!(info.hardware_wallet);
    }
}
