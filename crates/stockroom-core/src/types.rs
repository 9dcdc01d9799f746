//! # Domain Types
//!
//! Rows of the hosted backend, as the client reads and writes them.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Backend Tables                                  │
//! │                                                                         │
//! │  ┌───────────────┐        ┌───────────────┐        ┌───────────────┐   │
//! │  │   clients     │◄───────│    orders     │───────►│  order_items  │   │
//! │  │  id, name     │ client │  id, status   │ order  │ product_name  │   │
//! │  │  email, phone │   _id  │  total_cents  │   _id  │ variant_name  │   │
//! │  └───────────────┘        └───────────────┘        └───────┬───────┘   │
//! │                                                     by name │           │
//! │  ┌───────────────┐        ┌───────────────┐                ▼           │
//! │  │   products    │◄───────│   variants    │   (reconciliation)         │
//! │  │  id, name     │product │  name, unit   │                            │
//! │  │  category     │   _id  │  price_cents  │                            │
//! │  └───────────────┘        └───────────────┘                            │
//! │                                                                         │
//! │  ┌───────────────────┐        ┌─────────────────────────┐              │
//! │  │  inventory_items  │◄───────│   inventory_movements   │              │
//! │  │  name, unit       │  item  │  kind, quantity         │              │
//! │  │  min_quantity     │   _id  │  transfer_id            │              │
//! │  └───────────────────┘        └─────────────────────────┘              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Identifiers are UUID v4 strings generated on the client before insert, so
//! dependent rows (order items, the two halves of a transfer) can reference
//! each other without a round-trip.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;
use crate::quantity::Quantity;

/// Generates a fresh row identifier.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

// =============================================================================
// Client
// =============================================================================

/// A customer of the sales operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Client {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Product & Variant
// =============================================================================

/// A catalog product. Prices live on its variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Product {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// A purchasable configuration of a product (price, unit).
///
/// `wholesale_price_cents` is only present when the backend lets the current
/// user see it; the client also masks it when the permission RPC says no.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Variant {
    pub id: String,
    pub product_id: String,
    pub name: String,
    pub unit: String,
    pub price_cents: i64,
    #[serde(default)]
    pub wholesale_price_cents: Option<i64>,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Variant {
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    #[inline]
    pub fn wholesale_price(&self) -> Option<Money> {
        self.wholesale_price_cents.map(Money::from_cents)
    }
}

fn default_true() -> bool {
    true
}

// =============================================================================
// Order Status
// =============================================================================

/// Lifecycle of an order.
///
/// ```text
/// pending ──► confirmed ──► delivered
///    │            │
///    └────────────┴──────► cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// Whether the client offers this status change.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed)
                | (Confirmed, Delivered)
                | (Pending, Cancelled)
                | (Confirmed, Cancelled)
        )
    }

    /// Whether the order counts towards revenue.
    pub fn is_billable(&self) -> bool {
        !matches!(self, OrderStatus::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(OrderStatus::Pending),
            "confirmed" => Ok(OrderStatus::Confirmed),
            "delivered" => Ok(OrderStatus::Delivered),
            "cancelled" | "canceled" => Ok(OrderStatus::Cancelled),
            other => Err(ValidationError::InvalidFormat {
                field: "status".to_string(),
                reason: format!(
                    "unknown status '{}', expected pending, confirmed, delivered or cancelled",
                    other
                ),
            }),
        }
    }
}

// =============================================================================
// Order & Order Item
// =============================================================================

/// An order header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Order {
    pub id: String,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default)]
    pub notes: Option<String>,
    pub total_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Order {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

/// A line of an order.
///
/// Uses the snapshot pattern: product name, variant name, unit and price are
/// frozen at the time the line was saved. The ids are optional because lines
/// may be typed in freely or outlive the catalog row they came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderItem {
    pub id: String,
    pub order_id: String,
    #[serde(default)]
    pub product_id: Option<String>,
    #[serde(default)]
    pub variant_id: Option<String>,
    pub product_name: String,
    #[serde(default)]
    pub variant_name: Option<String>,
    #[serde(default)]
    pub unit: String,
    pub unit_price_cents: i64,
    pub quantity: i64,
    pub line_total_cents: i64,
}

impl OrderItem {
    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.line_total_cents)
    }
}

// =============================================================================
// Inventory
// =============================================================================

/// A stock-keeping row at a location.
///
/// The on-hand quantity is not stored here: it is the reduction of the
/// item's movements (see [`crate::stock`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InventoryItem {
    pub id: String,
    #[serde(default)]
    pub product_id: Option<String>,
    #[serde(default)]
    pub variant_id: Option<String>,
    pub name: String,
    pub unit: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub min_quantity: Quantity,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl InventoryItem {
    /// Name plus location, as shown in tables and error messages.
    pub fn label(&self) -> String {
        match &self.location {
            Some(location) if !location.trim().is_empty() => {
                format!("{} ({})", self.name, location)
            }
            _ => self.name.clone(),
        }
    }
}

/// Kind of an inventory quantity change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum MovementKind {
    /// Goods received.
    In,
    /// Goods issued.
    Out,
    /// Outbound half of a transfer.
    TransferOut,
    /// Inbound half of a transfer, in the destination unit.
    TransferIn,
    /// Compensation for a transfer whose inbound half failed.
    Reversal,
}

impl MovementKind {
    /// Whether the movement adds to on-hand stock.
    pub fn is_inbound(&self) -> bool {
        matches!(
            self,
            MovementKind::In | MovementKind::TransferIn | MovementKind::Reversal
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MovementKind::In => "in",
            MovementKind::Out => "out",
            MovementKind::TransferOut => "transfer_out",
            MovementKind::TransferIn => "transfer_in",
            MovementKind::Reversal => "reversal",
        }
    }
}

impl fmt::Display for MovementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An inventory quantity change record. `quantity` is always positive; the
/// direction comes from `kind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InventoryMovement {
    pub id: String,
    pub inventory_item_id: String,
    pub kind: MovementKind,
    pub quantity: Quantity,
    #[serde(default)]
    pub transfer_id: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl InventoryMovement {
    /// Signed effect on the item's on-hand quantity.
    pub fn signed_quantity(&self) -> Quantity {
        if self.kind.is_inbound() {
            self.quantity
        } else {
            -self.quantity
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_status_transitions() {
        use OrderStatus::*;
        assert!(Pending.can_transition_to(Confirmed));
        assert!(Confirmed.can_transition_to(Delivered));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(!Delivered.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Pending));
        assert!(!Pending.can_transition_to(Delivered));
    }

    #[test]
    fn test_order_status_parse() {
        assert_eq!("Confirmed".parse::<OrderStatus>().unwrap(), OrderStatus::Confirmed);
        assert_eq!("canceled".parse::<OrderStatus>().unwrap(), OrderStatus::Cancelled);
        assert!("shipped".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_movement_direction() {
        assert!(MovementKind::In.is_inbound());
        assert!(MovementKind::Reversal.is_inbound());
        assert!(!MovementKind::TransferOut.is_inbound());
        assert_eq!(
            serde_json::to_string(&MovementKind::TransferIn).unwrap(),
            "\"transfer_in\""
        );
    }

    #[test]
    fn test_row_with_missing_optionals_decodes() {
        let row = serde_json::json!({
            "id": "v1",
            "product_id": "p1",
            "name": "1 kg",
            "unit": "bag",
            "price_cents": 450,
            "created_at": "2024-03-01T10:00:00Z"
        });
        let variant: Variant = serde_json::from_value(row).unwrap();
        assert!(variant.is_active);
        assert_eq!(variant.wholesale_price(), None);
        assert_eq!(variant.price().cents(), 450);
    }

    #[test]
    fn test_inventory_label() {
        let mut item = InventoryItem {
            id: new_id(),
            product_id: None,
            variant_id: None,
            name: "Flour".to_string(),
            unit: "kg".to_string(),
            location: Some("Back room".to_string()),
            min_quantity: Quantity::zero(),
            created_at: Utc::now(),
        };
        assert_eq!(item.label(), "Flour (Back room)");
        item.location = None;
        assert_eq!(item.label(), "Flour");
    }
}
