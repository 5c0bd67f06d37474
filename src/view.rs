//! Coin detail view
//!
//! Mounted for `/:coinId` and its `chart`/`price` sub-routes. The view owns
//! two query handles (`("metadata", id)` once, `("price", id)` polled) and
//! turns their current state into a [`CoinDetailScreen`]. It never stores
//! fetched data itself; re-render when [`CoinDetailView::changed`] resolves.

use crate::{
    cache::QueryHandle,
    constants::{HEADING_BANNER, LOADING_PLACEHOLDER},
    context::AppContext,
    error::RouteError,
    head::TitleGuard,
    outlet::{OutletContext, OutletView},
    router::{Location, Route, SubRoute, HOME_ROUTE},
    screen::{Body, CoinDetailScreen, Header, OverviewItem, Summary, Tab},
    types::{CoinId, CoinMetadata, CoinPriceSnapshot},
};
use futures::future;

/// Formats a USD price with exactly three decimals (`1234.5` → `1234.500`)
pub fn format_price(price: f64) -> String {
    format!("{:.3}", price)
}

/// Builds the summary panel from resolved metadata and ticker
pub fn summarize(info: &CoinMetadata, ticker: &CoinPriceSnapshot) -> Summary {
    Summary {
        overview: vec![
            OverviewItem::new("Rank", info.rank.to_string()),
            OverviewItem::new("Symbol", format!("${}", info.symbol)),
            OverviewItem::new("Price", format!("${}", format_price(ticker.price_usd()))),
        ],
        description: info.description.clone(),
        supply: vec![
            OverviewItem::new("Total Supply", ticker.total_supply.to_string()),
            OverviewItem::new("Max Supply", ticker.max_supply.to_string()),
        ],
    }
}

fn coin_route(location: &Location) -> Result<(CoinId, Option<SubRoute>), RouteError> {
    match location.route() {
        Route::Coin { coin_id, sub } => Ok((coin_id, sub)),
        _ => Err(RouteError::no_match(&location.pathname)),
    }
}

/// Coin detail page bound to one location at a time
pub struct CoinDetailView {
    ctx: AppContext,
    coin_id: CoinId,
    location: Location,
    metadata: QueryHandle,
    price: QueryHandle,
    outlet: Option<OutletView>,
    title_guard: TitleGuard,
}

impl CoinDetailView {
    /// Mounts the view for a coin location, issuing both queries
    pub fn mount(ctx: &AppContext, location: Location) -> Result<Self, RouteError> {
        let (coin_id, sub) = coin_route(&location)?;

        tracing::info!(coin = %coin_id, path = %location.pathname, "Mounting coin detail view");

        let metadata = ctx.metadata_query(&coin_id);
        let price = ctx.price_query(&coin_id);
        let outlet = sub.map(|sub| {
            OutletView::mount(
                ctx,
                OutletContext {
                    coin_id: coin_id.clone(),
                },
                sub,
            )
        });
        let title_guard = ctx.head.push(LOADING_PLACEHOLDER);

        let view = Self {
            ctx: ctx.clone(),
            coin_id,
            location,
            metadata,
            price,
            outlet,
            title_guard,
        };
        view.title_guard.set(&view.title());
        Ok(view)
    }

    pub fn coin_id(&self) -> &CoinId {
        &self.coin_id
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    /// Follows a location change within the coin routes
    ///
    /// A new identifier swaps both queries for fresh ones; the previous price
    /// polling stops with its handle.
    pub fn set_location(&mut self, location: Location) -> Result<(), RouteError> {
        let (coin_id, sub) = coin_route(&location)?;

        if coin_id != self.coin_id {
            tracing::info!(from = %self.coin_id, to = %coin_id, "Coin identifier changed");
            self.metadata = self.ctx.metadata_query(&coin_id);
            self.price = self.ctx.price_query(&coin_id);
            self.coin_id = coin_id;
        }
        self.location = location;

        let current = self
            .outlet
            .as_ref()
            .map(|outlet| (outlet.sub_route(), outlet.coin_id().clone()));
        if current != sub.map(|sub| (sub, self.coin_id.clone())) {
            // Drop the old child first so its handles are released
            self.outlet = None;
            self.outlet = sub.map(|sub| {
                OutletView::mount(
                    &self.ctx,
                    OutletContext {
                        coin_id: self.coin_id.clone(),
                    },
                    sub,
                )
            });
        }

        self.title_guard.set(&self.title());
        Ok(())
    }

    /// True while metadata or price has not produced a first result
    pub fn is_loading(&self) -> bool {
        self.metadata.is_pending() || self.price.is_pending()
    }

    /// True once both queries settled and at least one of them failed
    pub fn has_failed(&self) -> bool {
        !self.is_loading() && (self.metadata.is_error() || self.price.is_error())
    }

    /// Title and heading text
    pub fn title(&self) -> String {
        if let Some(hint) = self.location.state.as_deref().filter(|s| !s.is_empty()) {
            return hint.to_string();
        }
        if self.is_loading() {
            return LOADING_PLACEHOLDER.to_string();
        }
        match self.metadata.data() {
            Some(data) => data
                .as_metadata()
                .map(|info| info.name.clone())
                .unwrap_or_else(|| self.coin_id.to_string()),
            None => self.coin_id.to_string(),
        }
    }

    /// Tab whose pattern matches the current path exactly
    pub fn active_tab(&self) -> Option<SubRoute> {
        SubRoute::all()
            .iter()
            .copied()
            .find(|sub| sub.pattern().matches(&self.location.pathname).is_some())
    }

    /// Re-issues the queries that ended in an error
    pub fn retry(&self) {
        for handle in [&self.metadata, &self.price] {
            if handle.is_error() {
                tracing::info!(key = %handle.key(), "Retrying failed query");
                self.ctx.cache.invalidate(handle.key());
            }
        }
    }

    /// Waits until any query feeding this view changes
    ///
    /// The document title follows the change. Returns `false` when a query
    /// entry was removed from the cache.
    pub async fn changed(&mut self) -> bool {
        let outlet = self.outlet.as_mut();
        let outlet_changed = async move {
            match outlet {
                Some(outlet) => outlet.changed().await,
                None => future::pending().await,
            }
        };

        let ok = tokio::select! {
            ok = self.metadata.changed() => ok,
            ok = self.price.changed() => ok,
            ok = outlet_changed => ok,
        };
        self.title_guard.set(&self.title());
        ok
    }

    /// Navigates home; the view is unmounted on the way
    pub fn go_home(self) {
        let router = self.ctx.router.clone();
        tracing::info!(coin = %self.coin_id, "Leaving coin detail view");
        drop(self);
        router.navigate(HOME_ROUTE);
    }

    /// Produces the current render tree and refreshes the document title
    pub fn render(&self) -> CoinDetailScreen {
        let title = self.title();
        self.title_guard.set(&title);

        let body = if self.is_loading() {
            Body::Loading {
                placeholder: LOADING_PLACEHOLDER.to_string(),
            }
        } else {
            let info = self.metadata.data();
            let ticker = self.price.data();
            match (
                info.as_ref().and_then(|d| d.as_metadata()),
                ticker.as_ref().and_then(|d| d.as_price()),
            ) {
                (Some(info), Some(ticker)) => Body::Loaded(summarize(info, ticker)),
                _ => Body::Failed {
                    message: self.failure_message(),
                    can_retry: true,
                },
            }
        };

        let active = self.active_tab();
        let tabs = SubRoute::all()
            .iter()
            .map(|sub| {
                let is_active = active == Some(*sub);
                Tab {
                    sub_route: *sub,
                    label: sub.label().to_string(),
                    href: sub.path_for(&self.coin_id),
                    is_active,
                    color: self.ctx.theme.tab_color(is_active).to_string(),
                }
            })
            .collect();

        CoinDetailScreen {
            header: Header {
                home_path: HOME_ROUTE.to_string(),
                banner: HEADING_BANNER.to_string(),
                heading: title.clone(),
            },
            title,
            body,
            tabs,
            outlet: self.outlet.as_ref().map(OutletView::render),
        }
    }

    fn failure_message(&self) -> String {
        [&self.metadata, &self.price]
            .iter()
            .filter_map(|handle| handle.state().error)
            .map(|e| e.message)
            .collect::<Vec<_>>()
            .join("; ")
    }
}

impl std::fmt::Debug for CoinDetailView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoinDetailView")
            .field("coin_id", &self.coin_id)
            .field("location", &self.location)
            .field("metadata", &self.metadata)
            .field("price", &self.price)
            .field("outlet", &self.outlet)
            .finish()
    }
}

impl Drop for CoinDetailView {
    fn drop(&mut self) {
        tracing::debug!(coin = %self.coin_id, "Unmounting coin detail view");
    }
}
