//! Client-side routing: patterns, location, navigation
//!
//! Route table:
//!
//! ```text
//! /                  home
//! /:coinId           coin detail
//! /:coinId/chart     coin detail, chart tab
//! /:coinId/price     coin detail, price tab
//! ```

use crate::{error::RouteError, types::CoinId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;

/// Name of the coin identifier parameter
pub const COIN_ID_PARAM: &str = "coinId";

pub const HOME_ROUTE: &str = "/";
pub const COIN_ROUTE: &str = "/:coinId";
pub const CHART_ROUTE: &str = "/:coinId/chart";
pub const PRICE_ROUTE: &str = "/:coinId/price";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Static(String),
    Param(String),
}

/// A path pattern such as `/:coinId/chart`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePattern {
    raw: String,
    segments: Vec<Segment>,
}

impl RoutePattern {
    pub fn parse(pattern: &str) -> Self {
        let segments = split_path(pattern)
            .into_iter()
            .map(|segment| match segment.strip_prefix(':') {
                Some(name) => Segment::Param(name.to_string()),
                None => Segment::Static(segment.to_string()),
            })
            .collect();

        Self {
            raw: pattern.to_string(),
            segments,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Matches the whole path against the pattern
    ///
    /// A single trailing slash is ignored; parameters never match an empty
    /// segment.
    pub fn matches(&self, path: &str) -> Option<RouteParams> {
        let parts = split_path(path);
        if parts.len() != self.segments.len() {
            return None;
        }

        let mut params = HashMap::new();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Static(expected) if expected == part => {}
                Segment::Param(name) if !part.is_empty() => {
                    params.insert(name.clone(), part.to_string());
                }
                _ => return None,
            }
        }

        Some(RouteParams(params))
    }
}

impl fmt::Display for RoutePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn split_path(path: &str) -> Vec<&str> {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    let path = path.strip_prefix('/').unwrap_or(path);
    let path = path.strip_suffix('/').unwrap_or(path);
    if path.is_empty() {
        Vec::new()
    } else {
        path.split('/').collect()
    }
}

/// Parameters captured by a pattern match
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteParams(HashMap<String, String>);

impl RouteParams {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// The coin identifier parameter
    pub fn coin_id(&self) -> Result<CoinId, RouteError> {
        CoinId::new(self.get(COIN_ID_PARAM).unwrap_or_default())
    }
}

/// One of the two tabs nested under the coin detail route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubRoute {
    Chart,
    Price,
}

impl SubRoute {
    pub fn all() -> &'static [SubRoute] {
        &[SubRoute::Chart, SubRoute::Price]
    }

    pub fn label(&self) -> &'static str {
        match self {
            SubRoute::Chart => "Chart",
            SubRoute::Price => "Price",
        }
    }

    pub fn pattern(&self) -> RoutePattern {
        match self {
            SubRoute::Chart => RoutePattern::parse(CHART_ROUTE),
            SubRoute::Price => RoutePattern::parse(PRICE_ROUTE),
        }
    }

    /// Link target of this tab for a coin
    pub fn path_for(&self, coin_id: &CoinId) -> String {
        match self {
            SubRoute::Chart => format!("/{}/chart", coin_id),
            SubRoute::Price => format!("/{}/price", coin_id),
        }
    }
}

/// Screen selected by a path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Home,
    Coin {
        coin_id: CoinId,
        sub: Option<SubRoute>,
    },
    NotFound,
}

impl Route {
    pub fn resolve(path: &str) -> Self {
        if RoutePattern::parse(HOME_ROUTE).matches(path).is_some() {
            return Route::Home;
        }

        if let Some(params) = RoutePattern::parse(COIN_ROUTE).matches(path) {
            return match params.coin_id() {
                Ok(coin_id) => Route::Coin { coin_id, sub: None },
                Err(_) => Route::NotFound,
            };
        }

        for sub in SubRoute::all() {
            if let Some(params) = sub.pattern().matches(path) {
                return match params.coin_id() {
                    Ok(coin_id) => Route::Coin {
                        coin_id,
                        sub: Some(*sub),
                    },
                    Err(_) => Route::NotFound,
                };
            }
        }

        Route::NotFound
    }
}

/// Current location: URL path plus an optional in-app navigation hint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub pathname: String,
    /// Carried by in-app navigation only; absent on direct loads
    pub state: Option<String>,
}

impl Location {
    pub fn new(pathname: impl Into<String>) -> Self {
        Self {
            pathname: pathname.into(),
            state: None,
        }
    }

    pub fn with_state(pathname: impl Into<String>, state: impl Into<String>) -> Self {
        Self {
            pathname: pathname.into(),
            state: Some(state.into()),
        }
    }

    pub fn route(&self) -> Route {
        Route::resolve(&self.pathname)
    }
}

/// Shared router holding the current location
#[derive(Clone)]
pub struct Router {
    tx: Arc<watch::Sender<Location>>,
}

impl Router {
    pub fn new(initial: Location) -> Self {
        let (tx, _) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    pub fn location(&self) -> Location {
        self.tx.borrow().clone()
    }

    /// Navigates to `path` without a navigation hint
    pub fn navigate(&self, path: &str) {
        self.set(Location::new(path));
    }

    /// Navigates to `path` carrying `state` (e.g. the coin name from a list)
    pub fn navigate_with_state(&self, path: &str, state: &str) {
        self.set(Location::with_state(path, state));
    }

    fn set(&self, location: Location) {
        tracing::debug!(
            path = %location.pathname,
            has_state = location.state.is_some(),
            "Navigating"
        );
        self.tx.send_replace(location);
    }

    /// Whether the current path matches `pattern` exactly
    pub fn is_match(&self, pattern: &RoutePattern) -> bool {
        pattern.matches(&self.tx.borrow().pathname).is_some()
    }

    pub fn subscribe(&self) -> watch::Receiver<Location> {
        self.tx.subscribe()
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new(Location::new(HOME_ROUTE))
    }
}
