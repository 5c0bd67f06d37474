//! # Coin Detail SDK
//!
//! Headless coin detail page backed by the CoinPaprika API: descriptive
//! metadata fetched once, a price ticker polled every 10 seconds, and two
//! route-driven sub-views (chart and price).
//!
//! The page is a function of `(current location, query cache state)`. The
//! [`QueryCache`] owns fetching, de-duplication, polling and cancellation;
//! [`CoinDetailView`] only derives what to show.
//!
//! ## Usage
//!
//! ```no_run
//! use coin_detail_sdk::{AppContext, CoinDetailView, Location, SdkConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let ctx = AppContext::coinpaprika(SdkConfig::from_env()?)?;
//! let mut view = CoinDetailView::mount(&ctx, Location::new("/btc-bitcoin/price"))?;
//!
//! while view.is_loading() {
//!     view.changed().await;
//! }
//! println!("{}", view.render());
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Router (location + navigation hint)
//!     ↓
//! CoinDetailView ──► ("metadata", id)  once
//!     │          └─► ("price", id)     every 10s while mounted
//!     ↓                     ↓
//! OutletView (chart/price)  QueryCache ──► CoinDataProvider (CoinPaprika)
//!     ↓
//! CoinDetailScreen (JSON / text)
//! ```
//!
//! ## Failures
//!
//! A fetch that still fails after its retries leaves the query in
//! [`QueryStatus::Error`]; the view then stops showing the loading placeholder,
//! renders [`Body::Failed`] and [`CoinDetailView::retry`] issues the failed
//! queries again.

pub mod app;
pub mod cache;
pub mod config;
pub mod constants;
pub mod context;
pub mod error;
pub mod head;
pub mod metrics;
pub mod outlet;
pub mod provider;
pub mod providers;
pub mod router;
pub mod screen;
pub mod theme;
pub mod types;
pub mod view;

// Re-export commonly used types
pub use app::{App, Screen};
pub use cache::{QueryCache, QueryHandle, QueryOptions, QueryState, QueryStatus, RetryPolicy};
pub use config::SdkConfig;
pub use context::AppContext;
pub use error::{ConfigError, ProviderError, QueryError, RouteError};
pub use metrics::FetchStats;
pub use provider::CoinDataProvider;
pub use providers::CoinPaprikaProvider;
pub use router::{Location, Route, Router, SubRoute};
pub use screen::{Body, CoinDetailScreen};
pub use types::{CoinId, CoinMetadata, CoinPriceSnapshot, QueryKey, QueryKind};
pub use view::CoinDetailView;
