//! Route-driven host for the coin pages
//!
//! Keeps the mounted screen in line with the router: `/` shows home, coin
//! routes mount (or re-target) a [`CoinDetailView`], anything else is not found.

use crate::{
    context::AppContext,
    router::{Location, Route},
    view::CoinDetailView,
};
use tokio::sync::watch;

/// Screen currently mounted by the app
#[derive(Debug)]
pub enum Screen {
    Home,
    Coin(Box<CoinDetailView>),
    NotFound { path: String },
}

pub struct App {
    ctx: AppContext,
    location_rx: watch::Receiver<Location>,
    screen: Screen,
}

impl App {
    pub fn new(ctx: AppContext) -> Self {
        let location_rx = ctx.router.subscribe();
        let mut app = Self {
            ctx,
            location_rx,
            screen: Screen::Home,
        };
        app.sync();
        app
    }

    pub fn context(&self) -> &AppContext {
        &self.ctx
    }

    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    pub fn screen_mut(&mut self) -> &mut Screen {
        &mut self.screen
    }

    /// Reconciles the mounted screen with the router's current location
    pub fn sync(&mut self) {
        let location = self.location_rx.borrow_and_update().clone();
        let route = location.route();

        if matches!(route, Route::Coin { .. }) {
            if let Screen::Coin(view) = &mut self.screen {
                if let Err(e) = view.set_location(location) {
                    tracing::warn!(error = %e, "Coin view rejected location");
                }
                return;
            }
        }

        self.screen = match route {
            Route::Home => Screen::Home,
            Route::Coin { .. } => {
                let path = location.pathname.clone();
                match CoinDetailView::mount(&self.ctx, location) {
                    Ok(view) => Screen::Coin(Box::new(view)),
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to mount coin view");
                        Screen::NotFound { path }
                    }
                }
            }
            Route::NotFound => Screen::NotFound {
                path: location.pathname,
            },
        };
    }

    /// Waits for navigation and applies it
    ///
    /// Returns `false` once the router is gone.
    pub async fn next_navigation(&mut self) -> bool {
        if self.location_rx.changed().await.is_err() {
            return false;
        }
        self.sync();
        true
    }

    /// Navigates home through the mounted coin view, if any
    pub fn go_home(&mut self) {
        match std::mem::replace(&mut self.screen, Screen::Home) {
            Screen::Coin(view) => view.go_home(),
            _ => self.ctx.router.navigate("/"),
        }
        self.sync();
    }
}
