//! # Pages
//!
//! One module per screen. Each page function loads what the screen shows
//! (returning a view model) or performs a user action and returns the
//! written row so the caller can reload.
//!
//! ## Page Categories
//! - **auth**: sign in, sign out, who am I
//! - **dashboard**: counts, revenue, low stock, recent orders
//! - **clients**: list / search, create, update, delete
//! - **products**: catalog with variants, wholesale prices masked when not allowed
//! - **orders**: list, open (reconciled draft), create, save, status, delete
//! - **inventory**: stock levels, item history, movements, transfers
//!
//! ## Guard Order
//! ```text
//! page fn ──► signed in? ──no──► ApiError(UNAUTHORIZED)
//!                │yes
//!                ▼
//!             delete? ──► can_delete (cached RPC) ──no──► ApiError(FORBIDDEN)
//!                │
//!                ▼
//!             repository call ──► view model
//! ```

pub mod auth;
pub mod clients;
pub mod dashboard;
pub mod inventory;
pub mod orders;
pub mod products;

use stockroom_backend::Session;

use crate::error::ApiError;
use crate::state::Route;
use crate::App;

/// The signed-in session, or `Unauthorized`.
pub(crate) fn require_session(app: &App) -> Result<Session, ApiError> {
    app.session.require_session().map_err(|_| ApiError::unauthorized())
}

/// Opens a page: requires a session and records the route.
pub(crate) fn open(app: &App, route: Route) -> Result<Session, ApiError> {
    let session = require_session(app)?;
    app.routes.navigate(route);
    Ok(session)
}

/// Checks the delete permission before any delete is attempted.
pub(crate) async fn ensure_can_delete(app: &App, what: &str) -> Result<(), ApiError> {
    require_session(app)?;
    app.session.permissions().await.ensure_can_delete(what)?;
    Ok(())
}

#[cfg(test)]
pub(crate) mod testing {
    use serde_json::json;
    use std::sync::Arc;

    use stockroom_backend::authz::{CAN_DELETE_RECORDS, CAN_VIEW_WHOLESALE_PRICES};
    use stockroom_backend::MemoryBackend;

    use crate::demo::{demo_backend, DEMO_EMAIL, DEMO_PASSWORD};
    use crate::state::ConfigState;
    use crate::storage::LocalStore;
    use crate::App;

    pub(crate) struct TestApp {
        pub app: App,
        pub memory: Arc<MemoryBackend>,
    }

    /// The demo data, not signed in yet.
    pub(crate) async fn signed_out(can_delete: bool, can_view_wholesale: bool) -> TestApp {
        let memory = Arc::new(demo_backend().unwrap());
        memory.set_rpc(CAN_DELETE_RECORDS, json!(can_delete));
        memory.set_rpc(CAN_VIEW_WHOLESALE_PRICES, json!(can_view_wholesale));

        let app = App::new(
            ConfigState::default(),
            memory.clone(),
            Arc::new(LocalStore::in_memory()),
        );
        app.start().await;
        TestApp { app, memory }
    }

    pub(crate) async fn signed_in(can_delete: bool, can_view_wholesale: bool) -> TestApp {
        let t = signed_out(can_delete, can_view_wholesale).await;
        super::auth::sign_in(&t.app, DEMO_EMAIL, DEMO_PASSWORD)
            .await
            .unwrap();
        t
    }
}
