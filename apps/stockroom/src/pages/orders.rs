//! # Orders Page
//!
//! Order table, the order form, status changes and delete.
//!
//! ## Opening a Saved Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  open(id)                                                               │
//! │    ├── catalog (masked)                                                 │
//! │    ├── orders.get(id)      ┐                                            │
//! │    └── orders.items(id)    ┘ concurrently                               │
//! │             │                                                           │
//! │             ▼                                                           │
//! │  each saved line ──► catalog.match_names(product_name, variant_name)    │
//! │             │             first product with that exact name,           │
//! │             │             then first variant of it with that name       │
//! │             ▼                                                           │
//! │  OrderDraft (saved names and prices kept, ids from the match)           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Lines whose product was renamed or deleted come back unmatched; they
//! still save with their stored names and prices.

use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info};

use stockroom_backend::BackendError;
use stockroom_core::order::{reconcile_items, Catalog, OrderDraft, ReconciledItem};
use stockroom_core::{Client, Order, OrderStatus};

use super::{ensure_can_delete, open, products, require_session};
use crate::error::ApiError;
use crate::state::Route;
use crate::App;

/// One row of the orders table.
#[derive(Debug, Clone, Serialize)]
pub struct OrderRow {
    pub order: Order,
    pub client_name: Option<String>,
    /// Total with the configured currency symbol.
    pub total: String,
}

/// The order form for a saved order.
#[derive(Debug, Clone, Serialize)]
pub struct OrderView {
    pub order: Order,
    pub client_name: Option<String>,
    pub draft: OrderDraft,
    /// How each saved line matched the current catalog.
    pub items: Vec<ReconciledItem>,
    /// Catalog to pick new lines from.
    pub catalog: Catalog,
}

fn client_names(clients: Vec<Client>) -> HashMap<String, String> {
    clients.into_iter().map(|c| (c.id, c.name)).collect()
}

/// Lists orders, newest first, optionally one status only.
pub async fn list(app: &App, status: Option<OrderStatus>) -> Result<Vec<OrderRow>, ApiError> {
    open(app, Route::Orders)?;
    debug!(status = ?status, "orders list");

    let orders_repo = app.backend.orders();
    let clients_repo = app.backend.clients();
    let (orders, clients) = tokio::try_join!(orders_repo.list(status), clients_repo.list(None))?;
    let names = client_names(clients);

    Ok(orders
        .into_iter()
        .map(|order| OrderRow {
            client_name: order.client_id.as_ref().and_then(|id| names.get(id).cloned()),
            total: app.config.format_currency(order.total_cents),
            order,
        })
        .collect())
}

/// Opens a saved order as an editable draft.
pub async fn open_order(app: &App, id: &str) -> Result<OrderView, ApiError> {
    open(app, Route::OrderDetail { id: id.to_string() })?;

    let catalog = products::catalog(app).await?;
    let orders = app.backend.orders();
    let (order, items) = tokio::try_join!(orders.get(id), orders.items(id))?;

    // the client may have been deleted since
    let client_name = match &order.client_id {
        Some(client_id) => match app.backend.clients().get(client_id).await {
            Ok(client) => Some(client.name),
            Err(BackendError::NotFound { .. }) => None,
            Err(err) => return Err(err.into()),
        },
        None => None,
    };

    let reconciled = reconcile_items(&catalog, &items);
    let unmatched = reconciled
        .iter()
        .filter(|r| r.matched.product_id().is_none())
        .count();
    debug!(order_id = %id, lines = reconciled.len(), unmatched, "order opened");

    Ok(OrderView {
        draft: OrderDraft::from_saved(&order, &items, &catalog),
        order,
        client_name,
        items: reconciled,
        catalog,
    })
}

/// Creates an order from a new draft.
pub async fn create(app: &App, draft: &OrderDraft) -> Result<Order, ApiError> {
    require_session(app)?;
    if draft.order_id.is_some() {
        return Err(ApiError::validation("This order is already saved, use save instead"));
    }
    let order = app.backend.orders().create(draft).await?;
    info!(order_id = %order.id, "order created");
    Ok(order)
}

/// Saves an edited draft (header, then the full line set).
pub async fn save(app: &App, draft: &OrderDraft) -> Result<Order, ApiError> {
    require_session(app)?;
    if draft.order_id.is_none() {
        return Err(ApiError::validation("This order has not been created yet"));
    }
    Ok(app.backend.orders().save(draft).await?)
}

pub async fn change_status(app: &App, id: &str, status: OrderStatus) -> Result<Order, ApiError> {
    require_session(app)?;
    Ok(app.backend.orders().set_status(id, status).await?)
}

/// Deletes an order and its lines. Needs the delete permission.
pub async fn delete(app: &App, id: &str) -> Result<(), ApiError> {
    ensure_can_delete(app, "orders").await?;
    app.backend.orders().delete(id).await?;
    info!(order_id = %id, "order deleted");
    Ok(())
}
