//! Shared application context and the coin queries built on it

use crate::{
    cache::{Fetcher, QueryCache, QueryHandle, QueryOptions},
    config::SdkConfig,
    error::ProviderError,
    head::PageHead,
    provider::CoinDataProvider,
    providers::CoinPaprikaProvider,
    router::{Location, Router},
    theme::Theme,
    types::{CoinId, QueryData, QueryKey},
};
use futures::FutureExt;
use std::sync::Arc;

/// Everything a view needs from its surroundings
///
/// Cheap to clone; all members share state.
#[derive(Clone)]
pub struct AppContext {
    pub cache: QueryCache,
    pub provider: Arc<dyn CoinDataProvider>,
    pub router: Router,
    pub head: PageHead,
    pub theme: Theme,
    pub config: SdkConfig,
}

impl AppContext {
    /// Creates a context around a provider, starting at `/`
    pub fn new(provider: Arc<dyn CoinDataProvider>, config: SdkConfig) -> Self {
        Self {
            cache: QueryCache::new(),
            provider,
            router: Router::new(Location::new("/")),
            head: PageHead::default(),
            theme: Theme::default(),
            config,
        }
    }

    /// Creates a context talking to CoinPaprika with the given configuration
    pub fn coinpaprika(config: SdkConfig) -> Result<Self, ProviderError> {
        let provider = CoinPaprikaProvider::with_config(&config)?;
        Ok(Self::new(Arc::new(provider), config))
    }

    /// Subscribes to `("metadata", id)`
    pub fn metadata_query(&self, coin_id: &CoinId) -> QueryHandle {
        let provider = Arc::clone(&self.provider);
        let id = coin_id.clone();
        let fetcher: Fetcher = Arc::new(move || {
            let provider = Arc::clone(&provider);
            let id = id.clone();
            async move {
                let info = provider.fetch_coin_info(&id).await?;
                Ok::<_, ProviderError>(QueryData::Metadata(Arc::new(info)))
            }
            .boxed()
        });

        self.cache
            .get_or_fetch(QueryKey::metadata(coin_id), fetcher, QueryOptions::metadata())
    }

    /// Subscribes to `("price", id)`, polled on the configured interval
    pub fn price_query(&self, coin_id: &CoinId) -> QueryHandle {
        let provider = Arc::clone(&self.provider);
        let id = coin_id.clone();
        let fetcher: Fetcher = Arc::new(move || {
            let provider = Arc::clone(&provider);
            let id = id.clone();
            async move {
                let ticker = provider.fetch_coin_tickers(&id).await?;
                Ok::<_, ProviderError>(QueryData::Price(Arc::new(ticker)))
            }
            .boxed()
        });

        self.cache.get_or_fetch(
            QueryKey::price(coin_id),
            fetcher,
            QueryOptions::price(self.config.price_refetch_interval),
        )
    }

    /// Subscribes to `("history", id)`
    pub fn history_query(&self, coin_id: &CoinId) -> QueryHandle {
        let provider = Arc::clone(&self.provider);
        let id = coin_id.clone();
        let fetcher: Fetcher = Arc::new(move || {
            let provider = Arc::clone(&provider);
            let id = id.clone();
            async move {
                let history = provider.fetch_coin_history(&id).await?;
                Ok::<_, ProviderError>(QueryData::History(Arc::new(history)))
            }
            .boxed()
        });

        self.cache
            .get_or_fetch(QueryKey::history(coin_id), fetcher, QueryOptions::history())
    }
}
