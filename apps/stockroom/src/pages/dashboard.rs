//! # Dashboard Page
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  Clients 12    Products 40    Orders 85 (7 pending)          │
//! │  Revenue $12,480.00                                          │
//! │                                                              │
//! │  Low stock                    Recent orders                  │
//! │  Flour (store)  2 / 10 kg     2024-05-02  Bakery Co  $120.00 │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The four reads run concurrently; any failure fails the page.

use serde::Serialize;
use std::time::Instant;
use tracing::{debug, info};

use stockroom_core::dashboard::DashboardSummary;

use super::open;
use crate::error::ApiError;
use crate::state::Route;
use crate::App;

/// What the dashboard shows.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub summary: DashboardSummary,
    /// Revenue with the configured currency symbol.
    pub revenue: String,
}

pub async fn load(app: &App) -> Result<DashboardView, ApiError> {
    open(app, Route::Dashboard)?;
    let start = Instant::now();
    debug!("dashboard load");

    let clients = app.backend.clients();
    let catalog = app.backend.catalog();
    let orders = app.backend.orders();
    let inventory = app.backend.inventory();

    let (clients, products, orders, levels) = tokio::try_join!(
        clients.list(None),
        catalog.products(),
        orders.list(None),
        inventory.stock_levels(),
    )?;

    let summary = DashboardSummary::compute(&clients, &products, &orders, &levels);
    let revenue = app.config.format_currency(summary.revenue.cents());

    info!(
        elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
        orders = summary.order_count,
        low_stock = summary.low_stock.len(),
        "dashboard loaded"
    );
    Ok(DashboardView { summary, revenue })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::pages::testing::{signed_in, signed_out};

    #[tokio::test]
    async fn test_load_summary() {
        let t = signed_in(true, true).await;
        let view = load(&t.app).await.unwrap();

        assert_eq!(view.summary.client_count, 3);
        assert_eq!(view.summary.product_count, 2);
        assert_eq!(view.summary.order_count, 3);
        assert_eq!(view.summary.pending_orders, 1);
        assert_eq!(view.revenue, "$226.96");
        assert_eq!(view.summary.low_stock.len(), 1);
        assert_eq!(view.summary.low_stock[0].item.label(), "Flour (store)");
        assert_eq!(t.app.routes.current(), Route::Dashboard);
    }

    #[tokio::test]
    async fn test_requires_session() {
        let t = signed_out(true, true).await;
        let err = load(&t.app).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Unauthorized);
        assert_eq!(t.app.routes.current(), Route::Login);
    }
}
