//! # Route State
//!
//! Which page is showing, and how we got there.
//!
//! ## Persistence
//! ```text
//! navigate(Orders) ──► current = Orders, history += [previous]
//!        │
//!        └──► LocalStore  "route"         = "orders"
//!                         "route.history" = ["dashboard", ...]
//!
//! startup ──► RouteState::restore(store)
//!               "route" parses    → that page
//!               missing / garbage → Route::default() (dashboard)
//! ```
//!
//! The route is kept in memory and mirrored to the store on every change;
//! a failed mirror write is logged and does not block navigation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

use crate::storage::LocalStore;

pub const ROUTE_KEY: &str = "route";
pub const HISTORY_KEY: &str = "route.history";

/// Oldest entries are dropped beyond this.
const MAX_HISTORY: usize = 50;

/// A page of the app.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "page", rename_all = "snake_case")]
pub enum Route {
    Login,
    #[default]
    Dashboard,
    Clients,
    Products,
    Orders,
    OrderDetail { id: String },
    Inventory,
    InventoryItem { id: String },
}

impl Route {
    /// Path form, as stored and as typed on the command line.
    pub fn path(&self) -> String {
        match self {
            Route::Login => "login".to_string(),
            Route::Dashboard => "dashboard".to_string(),
            Route::Clients => "clients".to_string(),
            Route::Products => "products".to_string(),
            Route::Orders => "orders".to_string(),
            Route::OrderDetail { id } => format!("orders/{id}"),
            Route::Inventory => "inventory".to_string(),
            Route::InventoryItem { id } => format!("inventory/{id}"),
        }
    }

    /// Every page but the login page needs a session.
    pub fn requires_session(&self) -> bool {
        !matches!(self, Route::Login)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

impl FromStr for Route {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let path = s.trim().trim_matches('/');
        let (page, id) = match path.split_once('/') {
            Some((page, id)) => (page, Some(id.trim())),
            None => (path, None),
        };

        match (page.to_lowercase().as_str(), id) {
            ("login", None) => Ok(Route::Login),
            ("" | "dashboard", None) => Ok(Route::Dashboard),
            ("clients", None) => Ok(Route::Clients),
            ("products", None) => Ok(Route::Products),
            ("orders", None) => Ok(Route::Orders),
            ("orders", Some(id)) if !id.is_empty() => Ok(Route::OrderDetail { id: id.to_string() }),
            ("inventory", None) => Ok(Route::Inventory),
            ("inventory", Some(id)) if !id.is_empty() => Ok(Route::InventoryItem { id: id.to_string() }),
            _ => Err(format!(
                "unknown page '{s}', expected login, dashboard, clients, products, orders[/ID] or inventory[/ID]"
            )),
        }
    }
}

#[derive(Debug)]
struct RouteStack {
    current: Route,
    history: Vec<Route>,
}

/// Current route plus back history, mirrored to the local store.
#[derive(Debug)]
pub struct RouteState {
    store: Arc<LocalStore>,
    stack: Mutex<RouteStack>,
}

impl RouteState {
    /// Restores the last route and history from the store.
    pub fn restore(store: Arc<LocalStore>) -> Self {
        let current = match store.get::<String>(ROUTE_KEY) {
            Some(path) => path.parse().unwrap_or_else(|err| {
                warn!(%path, error = %err, "Stored route is invalid, using default");
                Route::default()
            }),
            None => Route::default(),
        };

        let history = store
            .get::<Vec<String>>(HISTORY_KEY)
            .unwrap_or_default()
            .iter()
            .filter_map(|p| p.parse().ok())
            .collect();

        debug!(route = %current, "Route restored");
        RouteState {
            store,
            stack: Mutex::new(RouteStack { current, history }),
        }
    }

    fn stack(&self) -> MutexGuard<'_, RouteStack> {
        self.stack.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn current(&self) -> Route {
        self.stack().current.clone()
    }

    pub fn history(&self) -> Vec<Route> {
        self.stack().history.clone()
    }

    /// Goes to `route`, remembering the current page for `back`.
    pub fn navigate(&self, route: Route) -> Route {
        let mut stack = self.stack();
        if stack.current != route {
            let previous = std::mem::replace(&mut stack.current, route);
            stack.history.push(previous);
            if stack.history.len() > MAX_HISTORY {
                stack.history.remove(0);
            }
            self.persist(&stack);
        }
        debug!(route = %stack.current, "Navigated");
        stack.current.clone()
    }

    /// Returns to the previous page, if any.
    pub fn back(&self) -> Option<Route> {
        let mut stack = self.stack();
        let previous = stack.history.pop()?;
        stack.current = previous.clone();
        self.persist(&stack);
        Some(previous)
    }

    /// Replaces the route and forgets the history.
    pub fn reset(&self, route: Route) {
        let mut stack = self.stack();
        stack.current = route;
        stack.history.clear();
        self.persist(&stack);
    }

    fn persist(&self, stack: &RouteStack) {
        let history: Vec<String> = stack.history.iter().map(Route::path).collect();
        let result = self
            .store
            .set(ROUTE_KEY, &stack.current.path())
            .and_then(|_| self.store.set(HISTORY_KEY, &history));
        if let Err(err) = result {
            warn!(error = %err, "Could not persist route");
        }
    }
}
