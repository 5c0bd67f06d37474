//! Render tree of the coin detail page
//!
//! Plain data: serializable to JSON for a front end, printable as text for a
//! terminal.

use crate::{outlet::OutletScreen, router::SubRoute};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoinDetailScreen {
    /// Document title
    pub title: String,
    pub header: Header,
    pub body: Body,
    /// Always the chart and price tabs, in that order
    pub tabs: Vec<Tab>,
    /// Content of the active sub-route, if any
    pub outlet: Option<OutletScreen>,
}

impl CoinDetailScreen {
    pub fn active_tab(&self) -> Option<SubRoute> {
        self.tabs.iter().find(|t| t.is_active).map(|t| t.sub_route)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Header {
    /// Target of the home button
    pub home_path: String,
    pub banner: String,
    pub heading: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Body {
    Loading { placeholder: String },
    Failed { message: String, can_retry: bool },
    Loaded(Summary),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    /// Rank, symbol and price
    pub overview: Vec<OverviewItem>,
    pub description: String,
    /// Total and max supply
    pub supply: Vec<OverviewItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OverviewItem {
    pub label: String,
    pub value: String,
}

impl OverviewItem {
    pub fn new(label: &str, value: impl Into<String>) -> Self {
        Self {
            label: label.to_string(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tab {
    pub sub_route: SubRoute,
    pub label: String,
    pub href: String,
    pub is_active: bool,
    /// Theme colour picked from the active state
    pub color: String,
}

impl fmt::Display for CoinDetailScreen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[⌂ {}]", self.header.home_path)?;
        writeln!(f, "{}", self.header.banner)?;
        writeln!(f, "{}", self.header.heading)?;
        writeln!(f)?;

        match &self.body {
            Body::Loading { placeholder } => writeln!(f, "{}", placeholder)?,
            Body::Failed { message, can_retry } => {
                writeln!(f, "Failed to load coin: {}", message)?;
                if *can_retry {
                    writeln!(f, "(retry available)")?;
                }
            }
            Body::Loaded(summary) => {
                write_overview(f, &summary.overview)?;
                writeln!(f)?;
                writeln!(f, "{}", summary.description)?;
                writeln!(f)?;
                write_overview(f, &summary.supply)?;
            }
        }
        writeln!(f)?;

        let tabs: Vec<String> = self
            .tabs
            .iter()
            .map(|t| {
                if t.is_active {
                    format!("[{}]", t.label.to_uppercase())
                } else {
                    format!(" {} ", t.label.to_uppercase())
                }
            })
            .collect();
        writeln!(f, "{}", tabs.join("  "))?;

        if let Some(outlet) = &self.outlet {
            writeln!(f)?;
            write!(f, "{}", outlet)?;
        }
        Ok(())
    }
}

fn write_overview(f: &mut fmt::Formatter<'_>, items: &[OverviewItem]) -> fmt::Result {
    let line: Vec<String> = items
        .iter()
        .map(|item| format!("{}: {}", item.label.to_uppercase(), item.value))
        .collect();
    writeln!(f, "{}", line.join(" | "))
}
