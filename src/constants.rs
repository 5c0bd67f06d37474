//! Constants for the coin detail view
//!
//! Defaults for the query cache, the CoinPaprika client and the view texts are
//! centralized here. A few of them can be overridden at runtime through
//! [`SdkConfig::from_env`](crate::config::SdkConfig::from_env).

/// How often the price ticker is refetched while a coin view is mounted (in milliseconds)
pub const PRICE_REFETCH_INTERVAL_MS: u64 = 10_000;

/// HTTP request timeout when fetching coin data (in seconds)
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Maximum number of attempts for a single query fetch
pub const MAX_RETRY_ATTEMPTS: u32 = 3;

/// Initial backoff delay for retries (in milliseconds)
pub const INITIAL_BACKOFF_MS: u64 = 1000;

/// Maximum backoff delay for retries (in milliseconds)
pub const MAX_BACKOFF_MS: u64 = 30000;

/// Number of days of OHLCV history shown by the chart tab
pub const HISTORY_WINDOW_DAYS: i64 = 7;

/// CoinPaprika API base URL
pub const COINPAPRIKA_API_URL: &str = "https://api.coinpaprika.com/v1";

/// CoinPaprika endpoint prefix for coin metadata (`/coins/{id}`)
pub const COINPAPRIKA_COINS_ENDPOINT: &str = "/coins";

/// CoinPaprika endpoint prefix for tickers (`/tickers/{id}`)
pub const COINPAPRIKA_TICKERS_ENDPOINT: &str = "/tickers";

/// User agent for HTTP requests
pub const USER_AGENT: &str = "coin-detail-sdk/0.1.0";

/// Title and heading text shown while coin data is loading
pub const LOADING_PLACEHOLDER: &str = "Loading...";

/// Fixed first line of the coin heading ("당신의 코인코인", rendered in English)
pub const HEADING_BANNER: &str = "Your Coin";

/// Document title when no view has pushed one
pub const DEFAULT_DOCUMENT_TITLE: &str = "Coins";

/// Environment variable overriding [`COINPAPRIKA_API_URL`]
pub const ENV_API_URL: &str = "COINPAPRIKA_API_URL";

/// Environment variable overriding [`PRICE_REFETCH_INTERVAL_MS`]
pub const ENV_PRICE_REFETCH_MS: &str = "COIN_PRICE_REFETCH_MS";

/// Environment variable overriding [`REQUEST_TIMEOUT_SECS`]
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "COIN_REQUEST_TIMEOUT_SECS";
