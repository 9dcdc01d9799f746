//! # Inventory Page
//!
//! Stock levels per item, one item's movement history, receipts / issues,
//! and transfers between items with unit conversion.
//!
//! ## Transfer Outcome
//! ```text
//! transfer(req)
//!   ├── Ok(plan)                                   both movements recorded
//!   ├── Err(INSUFFICIENT_STOCK)                    nothing written
//!   └── Err(TRANSFER_FAILED)
//!         "(outbound movement reversed)"           source back to before
//!         "(REVERSAL ALSO FAILED)"                 source short, fix by hand
//! ```

use serde::Serialize;
use tracing::{debug, info};

use stockroom_backend::{InventoryItemInput, TransferRequest};
use stockroom_core::stock::{StockLevel, TransferPlan};
use stockroom_core::{InventoryItem, InventoryMovement, MovementKind, Quantity};

use super::{ensure_can_delete, open, require_session};
use crate::error::ApiError;
use crate::state::Route;
use crate::App;

/// Movements shown on the item page.
const HISTORY_LIMIT: usize = 100;

/// One inventory item with its history.
#[derive(Debug, Clone, Serialize)]
pub struct ItemView {
    pub item: InventoryItem,
    pub on_hand: Quantity,
    pub low: bool,
    /// Newest first.
    pub movements: Vec<InventoryMovement>,
}

/// Stock levels of every item.
pub async fn stock(app: &App) -> Result<Vec<StockLevel>, ApiError> {
    open(app, Route::Inventory)?;
    let levels = app.backend.inventory().stock_levels().await?;
    debug!(items = levels.len(), low = levels.iter().filter(|l| l.low).count(), "stock levels");
    Ok(levels)
}

pub async fn item(app: &App, id: &str) -> Result<ItemView, ApiError> {
    open(app, Route::InventoryItem { id: id.to_string() })?;

    let inventory = app.backend.inventory();
    let (item, on_hand, movements) = tokio::try_join!(
        inventory.get_item(id),
        inventory.on_hand(id),
        inventory.movements(Some(id), Some(HISTORY_LIMIT)),
    )?;

    Ok(ItemView {
        low: on_hand < item.min_quantity,
        item,
        on_hand,
        movements,
    })
}

pub async fn create_item(app: &App, input: &InventoryItemInput) -> Result<InventoryItem, ApiError> {
    require_session(app)?;
    let item = app.backend.inventory().create_item(input).await?;
    info!(item_id = %item.id, "inventory item created");
    Ok(item)
}

pub async fn update_item(
    app: &App,
    id: &str,
    input: &InventoryItemInput,
) -> Result<InventoryItem, ApiError> {
    require_session(app)?;
    Ok(app.backend.inventory().update_item(id, input).await?)
}

/// Deletes an item and its movements. Needs the delete permission.
pub async fn delete_item(app: &App, id: &str) -> Result<(), ApiError> {
    ensure_can_delete(app, "inventory items").await?;
    app.backend.inventory().delete_item(id).await?;
    info!(item_id = %id, "inventory item deleted");
    Ok(())
}

/// Records a receipt (`In`) or an issue (`Out`).
pub async fn record_movement(
    app: &App,
    item_id: &str,
    kind: MovementKind,
    quantity: Quantity,
    note: Option<&str>,
) -> Result<InventoryMovement, ApiError> {
    require_session(app)?;
    Ok(app
        .backend
        .inventory()
        .record_movement(item_id, kind, quantity, note)
        .await?)
}

/// Moves stock between two items, converting units with the request's rate.
pub async fn transfer(app: &App, request: &TransferRequest) -> Result<TransferPlan, ApiError> {
    require_session(app)?;
    let plan = app.backend.inventory().transfer(request).await?;
    info!(
        transfer_id = %plan.transfer_id,
        out = %plan.outbound.quantity,
        received = %plan.inbound.quantity,
        "transfer complete"
    );
    Ok(plan)
}
