//! # Order Repository
//!
//! Order headers (`orders`) and their lines (`order_items`).
//!
//! ## Write Sequences
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  create(draft)                                                          │
//! │    1. INSERT orders        (header, total from the draft)               │
//! │    2. INSERT order_items   (snapshot lines)                             │
//! │         └─ fails ──► DELETE orders WHERE id  (best effort)              │
//! │                                                                         │
//! │  save(draft)                                                            │
//! │    1. PATCH  orders WHERE id                                            │
//! │    2. DELETE order_items WHERE order_id                                 │
//! │    3. INSERT order_items                                                │
//! │                                                                         │
//! │  delete(id)                                                             │
//! │    1. DELETE order_items WHERE order_id                                 │
//! │    2. DELETE orders WHERE id                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! None of these are transactions. A failure part-way leaves whatever was
//! already written; the page reloads and shows the backend's state.

use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, warn};

use stockroom_core::order::OrderDraft;
use stockroom_core::{CoreError, Order, OrderItem, OrderStatus};

use super::{ORDERS, ORDER_ITEMS};
use crate::backend::{decode_one, decode_rows, encode_rows, Backend};
use crate::error::{BackendError, BackendResult};
use crate::query::Query;

/// Repository for the `orders` and `order_items` tables.
#[derive(Clone)]
pub struct OrderRepository {
    backend: Arc<dyn Backend>,
}

impl OrderRepository {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        OrderRepository { backend }
    }

    /// Orders, newest first, optionally only one status.
    pub async fn list(&self, status: Option<OrderStatus>) -> BackendResult<Vec<Order>> {
        let mut query = Query::table(ORDERS).order_by("created_at", false);
        if let Some(status) = status {
            query = query.eq("status", status.as_str());
        }

        let orders: Vec<Order> = decode_rows(self.backend.select(&query).await?)?;
        debug!(count = orders.len(), "Loaded orders");
        Ok(orders)
    }

    pub async fn get(&self, id: &str) -> BackendResult<Order> {
        let rows = self
            .backend
            .select(&Query::table(ORDERS).eq("id", id).limit(1))
            .await?;
        decode_one(rows, "Order", id)
    }

    /// Lines of one order.
    pub async fn items(&self, order_id: &str) -> BackendResult<Vec<OrderItem>> {
        let rows = self
            .backend
            .select(&Query::table(ORDER_ITEMS).eq("order_id", order_id))
            .await?;
        decode_rows(rows)
    }

    /// Inserts a new order from a draft.
    pub async fn create(&self, draft: &OrderDraft) -> BackendResult<Order> {
        let now = Utc::now();
        let header = draft.to_order(now, now)?;
        let items = draft.to_items(&header.id);

        let rows = self
            .backend
            .insert(ORDERS, encode_rows(&[header.clone()])?)
            .await?;
        let order: Order = decode_one(rows, "Order", &header.id)?;

        if let Err(err) = self.backend.insert(ORDER_ITEMS, encode_rows(&items)?).await {
            warn!(order_id = %order.id, error = %err, "Item insert failed, removing order header");
            if let Err(cleanup) = self
                .backend
                .delete(&Query::table(ORDERS).eq("id", order.id.as_str()))
                .await
            {
                warn!(order_id = %order.id, error = %cleanup, "Could not remove order header");
            }
            return Err(err);
        }

        info!(order_id = %order.id, lines = items.len(), total = %order.total(), "Created order");
        Ok(order)
    }

    /// Saves an edited order: header fields, then the full line set.
    pub async fn save(&self, draft: &OrderDraft) -> BackendResult<Order> {
        let id = draft
            .order_id
            .as_deref()
            .ok_or_else(|| BackendError::not_found("Order", "(unsaved draft)"))?;

        let existing = self.get(id).await?;
        let header = draft.to_order(existing.created_at, Utc::now())?;
        let items = draft.to_items(id);

        let patch = json!({
            "client_id": header.client_id,
            "notes": header.notes,
            "total_cents": header.total_cents,
            "updated_at": header.updated_at,
        });
        let rows = self
            .backend
            .update(&Query::table(ORDERS).eq("id", id), patch)
            .await?;
        let order: Order = decode_one(rows, "Order", id)?;

        self.backend
            .delete(&Query::table(ORDER_ITEMS).eq("order_id", id))
            .await?;
        self.backend
            .insert(ORDER_ITEMS, encode_rows(&items)?)
            .await?;

        info!(order_id = %id, lines = items.len(), "Saved order");
        Ok(order)
    }

    /// Moves an order to a new status, if the transition is allowed.
    pub async fn set_status(&self, id: &str, next: OrderStatus) -> BackendResult<Order> {
        let current = self.get(id).await?;
        if !current.status.can_transition_to(next) {
            return Err(CoreError::InvalidStatusChange {
                order_id: id.to_string(),
                from: current.status.to_string(),
                to: next.to_string(),
            }
            .into());
        }

        let patch = json!({ "status": next, "updated_at": Utc::now() });
        let rows = self
            .backend
            .update(&Query::table(ORDERS).eq("id", id), patch)
            .await?;

        info!(order_id = %id, from = %current.status, to = %next, "Order status changed");
        decode_one(rows, "Order", id)
    }

    /// Deletes an order's lines, then the order.
    pub async fn delete(&self, id: &str) -> BackendResult<()> {
        self.backend
            .delete(&Query::table(ORDER_ITEMS).eq("order_id", id))
            .await?;
        let deleted = self
            .backend
            .delete(&Query::table(ORDERS).eq("id", id))
            .await?;
        if deleted.is_empty() {
            return Err(BackendError::not_found("Order", id));
        }
        info!(order_id = %id, "Deleted order");
        Ok(())
    }
}
