//! # Stock Levels and Movement Planning
//!
//! On-hand stock is never stored: it is the sum of an item's movements.
//! Every write to inventory is an insert into `inventory_movements`, planned
//! here and executed by the backend crate.
//!
//! ## Transfer With Conversion
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Source: "Flour sacks" (sack)         Destination: "Flour" (kg)         │
//! │  Rate: 1 sack → 25 kg                 Quantity: 2 sacks                 │
//! │                                                                         │
//! │  plan_transfer()                                                        │
//! │     │                                                                   │
//! │     ├── outbound: transfer_out  2 sacks  on source  ┐ same             │
//! │     └── inbound:  transfer_in  50 kg     on dest    ┘ transfer_id      │
//! │                                                                         │
//! │  Executed in order by the backend crate:                               │
//! │     insert outbound ──► insert inbound ──► done                         │
//! │                              │                                          │
//! │                              └─ fails ──► insert reversal_of(outbound) │
//! │                                           (reversal  2 sacks on source) │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::quantity::{ConversionRate, Quantity};
use crate::types::{new_id, InventoryItem, InventoryMovement, MovementKind};
use crate::validation::{validate_movement_quantity, validate_optional_text};

// =============================================================================
// Stock Levels
// =============================================================================

/// Current on-hand quantity of one item.
pub fn on_hand(item_id: &str, movements: &[InventoryMovement]) -> Quantity {
    movements
        .iter()
        .filter(|m| m.inventory_item_id == item_id)
        .map(InventoryMovement::signed_quantity)
        .sum()
}

/// One row of the inventory table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockLevel {
    pub item: InventoryItem,
    pub on_hand: Quantity,
    /// `on_hand` is below the item's minimum.
    pub low: bool,
}

/// Computes the stock level of every item, in item order.
pub fn stock_levels(items: &[InventoryItem], movements: &[InventoryMovement]) -> Vec<StockLevel> {
    items
        .iter()
        .map(|item| {
            let on_hand = on_hand(&item.id, movements);
            StockLevel {
                item: item.clone(),
                on_hand,
                low: on_hand < item.min_quantity,
            }
        })
        .collect()
}

// =============================================================================
// Plain Movements
// =============================================================================

/// Plans a plain receipt (`In`) or issue (`Out`) movement.
///
/// Outbound movements may not take stock below zero.
pub fn plan_movement(
    item: &InventoryItem,
    kind: MovementKind,
    quantity: Quantity,
    available: Quantity,
    note: Option<&str>,
    now: DateTime<Utc>,
) -> CoreResult<InventoryMovement> {
    if !matches!(kind, MovementKind::In | MovementKind::Out) {
        return Err(CoreError::InvalidTransfer(format!(
            "{} movements are created by transfers only",
            kind
        )));
    }

    validate_movement_quantity(quantity)?;

    if kind == MovementKind::Out && quantity > available {
        return Err(CoreError::InsufficientStock {
            item: item.label(),
            available,
            requested: quantity,
        });
    }

    Ok(InventoryMovement {
        id: new_id(),
        inventory_item_id: item.id.clone(),
        kind,
        quantity,
        transfer_id: None,
        note: validate_optional_text("note", note)?,
        created_at: now,
    })
}

// =============================================================================
// Transfers
// =============================================================================

/// The two dependent inserts of a transfer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TransferPlan {
    pub transfer_id: String,
    pub outbound: InventoryMovement,
    pub inbound: InventoryMovement,
    pub rate: ConversionRate,
}

/// Plans a transfer from `source` to `destination`.
///
/// ## Rules
/// - Source and destination must differ
/// - Quantity must be positive and not exceed `available` on the source
/// - The converted quantity must not round to zero
pub fn plan_transfer(
    source: &InventoryItem,
    destination: &InventoryItem,
    quantity: Quantity,
    rate: ConversionRate,
    available: Quantity,
    note: Option<&str>,
    now: DateTime<Utc>,
) -> CoreResult<TransferPlan> {
    if source.id == destination.id {
        return Err(CoreError::InvalidTransfer(
            "source and destination are the same item".to_string(),
        ));
    }

    if !rate.is_valid() {
        return Err(CoreError::InvalidTransfer(
            "conversion rate must be non-zero on both sides".to_string(),
        ));
    }

    validate_movement_quantity(quantity)?;

    if quantity > available {
        return Err(CoreError::InsufficientStock {
            item: source.label(),
            available,
            requested: quantity,
        });
    }

    let converted = rate.convert(quantity);
    if !converted.is_positive() {
        return Err(CoreError::InvalidTransfer(format!(
            "{} {} converts to nothing in {}",
            quantity, source.unit, destination.unit
        )));
    }

    let transfer_id = new_id();
    let note = validate_optional_text("note", note)?;

    let outbound = InventoryMovement {
        id: new_id(),
        inventory_item_id: source.id.clone(),
        kind: MovementKind::TransferOut,
        quantity,
        transfer_id: Some(transfer_id.clone()),
        note: note.clone(),
        created_at: now,
    };

    let inbound = InventoryMovement {
        id: new_id(),
        inventory_item_id: destination.id.clone(),
        kind: MovementKind::TransferIn,
        quantity: converted,
        transfer_id: Some(transfer_id.clone()),
        note,
        created_at: now,
    };

    Ok(TransferPlan {
        transfer_id,
        outbound,
        inbound,
        rate,
    })
}

/// The compensating movement for an outbound transfer half.
pub fn reversal_of(outbound: &InventoryMovement, now: DateTime<Utc>) -> InventoryMovement {
    InventoryMovement {
        id: new_id(),
        inventory_item_id: outbound.inventory_item_id.clone(),
        kind: MovementKind::Reversal,
        quantity: outbound.quantity,
        transfer_id: outbound.transfer_id.clone(),
        note: Some(format!("Reversal of failed transfer movement {}", outbound.id)),
        created_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, unit: &str, min: i64) -> InventoryItem {
        InventoryItem {
            id: id.to_string(),
            product_id: None,
            variant_id: None,
            name: format!("Item {}", id),
            unit: unit.to_string(),
            location: None,
            min_quantity: Quantity::from_units(min),
            created_at: Utc::now(),
        }
    }

    fn movement(item_id: &str, kind: MovementKind, units: i64) -> InventoryMovement {
        InventoryMovement {
            id: new_id(),
            inventory_item_id: item_id.to_string(),
            kind,
            quantity: Quantity::from_units(units),
            transfer_id: None,
            note: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_on_hand_reduces_movements() {
        let movements = vec![
            movement("a", MovementKind::In, 10),
            movement("a", MovementKind::Out, 3),
            movement("a", MovementKind::TransferOut, 2),
            movement("a", MovementKind::Reversal, 2),
            movement("b", MovementKind::TransferIn, 24),
        ];
        assert_eq!(on_hand("a", &movements), Quantity::from_units(7));
        assert_eq!(on_hand("b", &movements), Quantity::from_units(24));
        assert_eq!(on_hand("c", &movements), Quantity::zero());
    }

    #[test]
    fn test_stock_levels_flag_low() {
        let items = vec![item("a", "kg", 5), item("b", "kg", 0)];
        let movements = vec![movement("a", MovementKind::In, 4)];
        let levels = stock_levels(&items, &movements);
        assert!(levels[0].low);
        assert!(!levels[1].low);
        assert_eq!(levels[0].on_hand, Quantity::from_units(4));
    }

    #[test]
    fn test_plan_movement_rules() {
        let a = item("a", "kg", 0);
        let now = Utc::now();
        let available = Quantity::from_units(2);

        let ok = plan_movement(&a, MovementKind::In, Quantity::from_units(5), available, Some(" delivery "), now)
            .unwrap();
        assert_eq!(ok.note.as_deref(), Some("delivery"));

        let too_much = plan_movement(&a, MovementKind::Out, Quantity::from_units(3), available, None, now);
        assert!(matches!(too_much, Err(CoreError::InsufficientStock { .. })));

        let zero = plan_movement(&a, MovementKind::In, Quantity::zero(), available, None, now);
        assert!(zero.is_err());

        let transfer_kind = plan_movement(&a, MovementKind::TransferIn, Quantity::from_units(1), available, None, now);
        assert!(matches!(transfer_kind, Err(CoreError::InvalidTransfer(_))));
    }

    #[test]
    fn test_plan_transfer_converts_and_links() {
        let sacks = item("sacks", "sack", 0);
        let flour = item("flour", "kg", 0);
        let rate = ConversionRate::new(1, 25).unwrap();

        let plan = plan_transfer(
            &sacks,
            &flour,
            Quantity::from_units(2),
            rate,
            Quantity::from_units(3),
            None,
            Utc::now(),
        )
        .unwrap();

        assert_eq!(plan.outbound.kind, MovementKind::TransferOut);
        assert_eq!(plan.outbound.inventory_item_id, "sacks");
        assert_eq!(plan.inbound.kind, MovementKind::TransferIn);
        assert_eq!(plan.inbound.inventory_item_id, "flour");
        assert_eq!(plan.inbound.quantity, Quantity::from_units(50));
        assert_eq!(plan.outbound.transfer_id.as_deref(), Some(plan.transfer_id.as_str()));
        assert_eq!(plan.inbound.transfer_id, plan.outbound.transfer_id);
        assert_ne!(plan.inbound.id, plan.outbound.id);
    }

    #[test]
    fn test_plan_transfer_rejections() {
        let a = item("a", "piece", 0);
        let b = item("b", "kg", 0);
        let now = Utc::now();
        let plenty = Quantity::from_units(100);

        let same = plan_transfer(&a, &a, Quantity::from_units(1), ConversionRate::identity(), plenty, None, now);
        assert!(matches!(same, Err(CoreError::InvalidTransfer(_))));

        let short = plan_transfer(&a, &b, Quantity::from_units(5), ConversionRate::identity(), Quantity::from_units(4), None, now);
        assert!(matches!(short, Err(CoreError::InsufficientStock { .. })));

        // 1 thousandth of a piece at 1000 pieces per kg rounds to zero kg
        let tiny = ConversionRate::new(1_000, 1).unwrap();
        let vanishes = plan_transfer(&a, &b, Quantity::from_milli(1), tiny, plenty, None, now);
        assert!(matches!(vanishes, Err(CoreError::InvalidTransfer(_))));

        let zero = plan_transfer(&a, &b, Quantity::from_units(1), ConversionRate::unchecked(0, 12), plenty, None, now);
        assert!(matches!(zero, Err(CoreError::InvalidTransfer(_))));
    }

    #[test]
    fn test_reversal_restores_source() {
        let a = item("a", "kg", 0);
        let b = item("b", "kg", 0);
        let plan = plan_transfer(
            &a,
            &b,
            Quantity::from_units(4),
            ConversionRate::identity(),
            Quantity::from_units(10),
            None,
            Utc::now(),
        )
        .unwrap();

        let reversal = reversal_of(&plan.outbound, Utc::now());
        assert_eq!(reversal.kind, MovementKind::Reversal);
        assert_eq!(reversal.transfer_id, plan.outbound.transfer_id);

        let movements = vec![
            movement("a", MovementKind::In, 10),
            plan.outbound.clone(),
            reversal,
        ];
        assert_eq!(on_hand("a", &movements), Quantity::from_units(10));
    }
}
