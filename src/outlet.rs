//! Child views rendered in the coin detail outlet
//!
//! The parent hands each child an explicit [`OutletContext`] carrying the coin
//! identifier; children never look at the URL themselves.

use crate::{
    cache::QueryHandle,
    constants::LOADING_PLACEHOLDER,
    context::AppContext,
    router::SubRoute,
    types::{CoinId, OhlcvEntry, UsdQuote},
    view::format_price,
};
use serde::Serialize;
use std::fmt;

const SPARK_LEVELS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Value passed from the coin view to its active child
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutletContext {
    pub coin_id: CoinId,
}

/// The child view mounted for the active sub-route
#[derive(Debug)]
pub enum OutletView {
    Chart(ChartTab),
    Price(PriceTab),
}

impl OutletView {
    pub fn mount(ctx: &AppContext, outlet: OutletContext, sub: SubRoute) -> Self {
        match sub {
            SubRoute::Chart => OutletView::Chart(ChartTab::mount(ctx, outlet)),
            SubRoute::Price => OutletView::Price(PriceTab::mount(ctx, outlet)),
        }
    }

    pub fn sub_route(&self) -> SubRoute {
        match self {
            OutletView::Chart(_) => SubRoute::Chart,
            OutletView::Price(_) => SubRoute::Price,
        }
    }

    pub fn coin_id(&self) -> &CoinId {
        match self {
            OutletView::Chart(tab) => &tab.outlet.coin_id,
            OutletView::Price(tab) => &tab.outlet.coin_id,
        }
    }

    pub async fn changed(&mut self) -> bool {
        match self {
            OutletView::Chart(tab) => tab.history.changed().await,
            OutletView::Price(tab) => tab.price.changed().await,
        }
    }

    pub fn render(&self) -> OutletScreen {
        match self {
            OutletView::Chart(tab) => OutletScreen::Chart(tab.render()),
            OutletView::Price(tab) => OutletScreen::Price(tab.render()),
        }
    }
}

/// Price history of the last days as a sparkline
#[derive(Debug)]
pub struct ChartTab {
    outlet: OutletContext,
    history: QueryHandle,
}

impl ChartTab {
    pub fn mount(ctx: &AppContext, outlet: OutletContext) -> Self {
        let history = ctx.history_query(&outlet.coin_id);
        Self { outlet, history }
    }

    pub fn render(&self) -> ChartScreen {
        let state = self.history.state();
        match state.data.as_ref().and_then(|d| d.as_history()) {
            Some(history) => ChartScreen::from_history(history),
            None if state.is_error() => ChartScreen::Failed {
                message: state.error.map(|e| e.message).unwrap_or_default(),
            },
            None => ChartScreen::Loading,
        }
    }
}

/// Percent changes of the polled ticker
#[derive(Debug)]
pub struct PriceTab {
    outlet: OutletContext,
    price: QueryHandle,
}

impl PriceTab {
    /// Shares the parent's `("price", id)` entry, so no extra request is made
    pub fn mount(ctx: &AppContext, outlet: OutletContext) -> Self {
        let price = ctx.price_query(&outlet.coin_id);
        Self { outlet, price }
    }

    pub fn render(&self) -> PriceScreen {
        let state = self.price.state();
        match state.data.as_ref().and_then(|d| d.as_price()) {
            Some(ticker) => PriceScreen::from_quote(&ticker.quotes.usd),
            None if state.is_error() => PriceScreen::Failed {
                message: state.error.map(|e| e.message).unwrap_or_default(),
            },
            None => PriceScreen::Loading,
        }
    }
}

/// Rendered outlet content
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum OutletScreen {
    Chart(ChartScreen),
    Price(PriceScreen),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ChartScreen {
    Loading,
    Failed {
        message: String,
    },
    Empty,
    Ready {
        closes: Vec<f64>,
        low: f64,
        high: f64,
        last: f64,
        sparkline: String,
    },
}

impl ChartScreen {
    pub fn from_history(history: &[OhlcvEntry]) -> Self {
        let closes: Vec<f64> = history.iter().map(|e| e.close).collect();
        let Some(&last) = closes.last() else {
            return ChartScreen::Empty;
        };

        let low = closes.iter().copied().fold(f64::INFINITY, f64::min);
        let high = closes.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        ChartScreen::Ready {
            sparkline: sparkline(&closes, low, high),
            closes,
            low,
            high,
            last,
        }
    }
}

fn sparkline(values: &[f64], low: f64, high: f64) -> String {
    let range = high - low;
    values
        .iter()
        .map(|v| {
            if range <= f64::EPSILON {
                SPARK_LEVELS[SPARK_LEVELS.len() / 2]
            } else {
                let level = ((v - low) / range * (SPARK_LEVELS.len() - 1) as f64).round() as usize;
                SPARK_LEVELS[level.min(SPARK_LEVELS.len() - 1)]
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PriceRow {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PriceScreen {
    Loading,
    Failed { message: String },
    Ready { rows: Vec<PriceRow> },
}

impl PriceScreen {
    pub fn from_quote(quote: &UsdQuote) -> Self {
        let changes = [
            ("15m", quote.percent_change_15m),
            ("30m", quote.percent_change_30m),
            ("1h", quote.percent_change_1h),
            ("6h", quote.percent_change_6h),
            ("12h", quote.percent_change_12h),
            ("24h", quote.percent_change_24h),
            ("7d", quote.percent_change_7d),
            ("30d", quote.percent_change_30d),
            ("1y", quote.percent_change_1y),
        ];

        let mut rows: Vec<PriceRow> = changes
            .iter()
            .map(|(label, change)| PriceRow {
                label: label.to_string(),
                value: format!("{:+.2}%", change),
            })
            .collect();

        if let Some(ath) = quote.ath_price {
            let date = quote
                .ath_date
                .map(|d| format!(" ({})", d.format("%Y-%m-%d")))
                .unwrap_or_default();
            rows.push(PriceRow {
                label: "ATH".to_string(),
                value: format!("${}{}", format_price(ath), date),
            });
        }
        if let Some(from_ath) = quote.percent_from_price_ath {
            rows.push(PriceRow {
                label: "From ATH".to_string(),
                value: format!("{:+.2}%", from_ath),
            });
        }

        PriceScreen::Ready { rows }
    }
}

impl fmt::Display for OutletScreen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutletScreen::Chart(ChartScreen::Loading)
            | OutletScreen::Price(PriceScreen::Loading) => {
                writeln!(f, "{}", LOADING_PLACEHOLDER)
            }
            OutletScreen::Chart(ChartScreen::Failed { message })
            | OutletScreen::Price(PriceScreen::Failed { message }) => {
                writeln!(f, "Failed to load: {}", message)
            }
            OutletScreen::Chart(ChartScreen::Empty) => writeln!(f, "No price history"),
            OutletScreen::Chart(ChartScreen::Ready {
                low,
                high,
                last,
                sparkline,
                ..
            }) => {
                writeln!(f, "{}", sparkline)?;
                writeln!(
                    f,
                    "low ${}  high ${}  last ${}",
                    format_price(*low),
                    format_price(*high),
                    format_price(*last)
                )
            }
            OutletScreen::Price(PriceScreen::Ready { rows }) => {
                for row in rows {
                    writeln!(f, "{:<10}{}", row.label, row.value)?;
                }
                Ok(())
            }
        }
    }
}
