//! # Orders: Drafts and Reconciliation
//!
//! The order form works on an [`OrderDraft`]: a client, some notes and a list
//! of lines picked from the [`Catalog`]. Saving turns the draft into an
//! `orders` row plus `order_items` rows; opening a saved order turns the rows
//! back into a draft.
//!
//! ## Reconciliation
//! Saved items carry a frozen snapshot of product name, variant name and
//! price. After a reload the form needs catalog ids again so the pickers can
//! show the current selection, and those are recovered by name:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  order_items row                     Catalog                            │
//! │  ───────────────                     ───────                            │
//! │  product_name = "Sourdough"   ──►  first product named "Sourdough"     │
//! │                                        │                                │
//! │  variant_name = "800 g"       ──►  first of ITS variants named "800 g" │
//! │                                                                         │
//! │  both found      → Matched      (product_id, variant_id)               │
//! │  product only    → ProductOnly  (product_id, None)                     │
//! │  nothing         → Unmatched    (None, None), snapshot kept            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Names are not unique; the first match in catalog order wins. Matching is
//! exact string equality, so a renamed product no longer matches and its
//! old lines show up as free-text lines.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{new_id, Order, OrderItem, OrderStatus, Product, Variant};
use crate::validation::{validate_optional_text, validate_order_quantity};
use crate::MAX_ORDER_LINES;

// =============================================================================
// Catalog
// =============================================================================

/// A product with its variants, in backend order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CatalogEntry {
    pub product: Product,
    pub variants: Vec<Variant>,
}

/// The product/variant catalog as loaded by the order and product pages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Catalog {
    pub entries: Vec<CatalogEntry>,
}

impl Catalog {
    /// Groups variant rows under their product rows.
    ///
    /// Product order is preserved; variants keep their relative order.
    /// Variants whose product is missing are dropped.
    pub fn assemble(products: Vec<Product>, variants: Vec<Variant>) -> Self {
        let mut entries: Vec<CatalogEntry> = products
            .into_iter()
            .map(|product| CatalogEntry {
                product,
                variants: Vec::new(),
            })
            .collect();

        for variant in variants {
            if let Some(entry) = entries
                .iter_mut()
                .find(|e| e.product.id == variant.product_id)
            {
                entry.variants.push(variant);
            }
        }

        Catalog { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn product(&self, product_id: &str) -> Option<&CatalogEntry> {
        self.entries.iter().find(|e| e.product.id == product_id)
    }

    pub fn variant(&self, variant_id: &str) -> Option<(&Product, &Variant)> {
        self.entries.iter().find_map(|e| {
            e.variants
                .iter()
                .find(|v| v.id == variant_id)
                .map(|v| (&e.product, v))
        })
    }

    /// Name-based lookup used by reconciliation.
    pub fn match_names(&self, product_name: &str, variant_name: Option<&str>) -> LineMatch {
        let Some(entry) = self
            .entries
            .iter()
            .find(|e| e.product.name == product_name)
        else {
            return LineMatch::Unmatched;
        };

        let variant = variant_name.and_then(|name| entry.variants.iter().find(|v| v.name == name));

        match variant {
            Some(v) => LineMatch::Matched {
                product_id: entry.product.id.clone(),
                variant_id: v.id.clone(),
            },
            None => LineMatch::ProductOnly {
                product_id: entry.product.id.clone(),
            },
        }
    }

    /// Removes wholesale prices from every variant.
    pub fn mask_wholesale(&mut self) {
        for entry in &mut self.entries {
            for variant in &mut entry.variants {
                variant.wholesale_price_cents = None;
            }
        }
    }
}

// =============================================================================
// Reconciliation
// =============================================================================

/// Result of matching one saved line back to the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LineMatch {
    Matched {
        product_id: String,
        variant_id: String,
    },
    ProductOnly {
        product_id: String,
    },
    Unmatched,
}

impl LineMatch {
    pub fn product_id(&self) -> Option<&str> {
        match self {
            LineMatch::Matched { product_id, .. } | LineMatch::ProductOnly { product_id } => {
                Some(product_id)
            }
            LineMatch::Unmatched => None,
        }
    }

    pub fn variant_id(&self) -> Option<&str> {
        match self {
            LineMatch::Matched { variant_id, .. } => Some(variant_id),
            _ => None,
        }
    }
}

/// A saved item together with its match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReconciledItem {
    pub item: OrderItem,
    pub matched: LineMatch,
}

/// Matches every saved item back to the catalog by name.
pub fn reconcile_items(catalog: &Catalog, items: &[OrderItem]) -> Vec<ReconciledItem> {
    items
        .iter()
        .map(|item| ReconciledItem {
            item: item.clone(),
            matched: catalog.match_names(&item.product_name, item.variant_name.as_deref()),
        })
        .collect()
}

// =============================================================================
// Order Draft
// =============================================================================

/// One line of the order form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DraftLine {
    pub product_id: Option<String>,
    pub variant_id: Option<String>,
    pub product_name: String,
    pub variant_name: Option<String>,
    pub unit: String,
    pub unit_price_cents: i64,
    pub quantity: i64,
}

impl DraftLine {
    /// Snapshot of a catalog variant.
    pub fn from_variant(product: &Product, variant: &Variant, quantity: i64) -> Self {
        DraftLine {
            product_id: Some(product.id.clone()),
            variant_id: Some(variant.id.clone()),
            product_name: product.name.clone(),
            variant_name: Some(variant.name.clone()),
            unit: variant.unit.clone(),
            unit_price_cents: variant.price_cents,
            quantity,
        }
    }

    /// Rebuilds a line from a saved item and its reconciliation result.
    ///
    /// The saved price is kept even when the catalog price has changed since.
    pub fn from_reconciled(reconciled: &ReconciledItem) -> Self {
        let item = &reconciled.item;
        DraftLine {
            product_id: reconciled.matched.product_id().map(str::to_string),
            variant_id: reconciled.matched.variant_id().map(str::to_string),
            product_name: item.product_name.clone(),
            variant_name: item.variant_name.clone(),
            unit: item.unit.clone(),
            unit_price_cents: item.unit_price_cents,
            quantity: item.quantity,
        }
    }

    pub fn line_total(&self) -> Money {
        Money::from_cents(self.unit_price_cents).multiply_quantity(self.quantity)
    }
}

/// The order being created or edited.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderDraft {
    /// Set when editing an existing order.
    pub order_id: Option<String>,
    pub client_id: Option<String>,
    pub status: OrderStatus,
    pub notes: Option<String>,
    pub lines: Vec<DraftLine>,
}

impl OrderDraft {
    pub fn new(client_id: Option<String>) -> Self {
        OrderDraft {
            client_id,
            ..OrderDraft::default()
        }
    }

    /// Rebuilds the form for a saved order, reconciling items to the catalog.
    pub fn from_saved(order: &Order, items: &[OrderItem], catalog: &Catalog) -> Self {
        let lines = reconcile_items(catalog, items)
            .iter()
            .map(DraftLine::from_reconciled)
            .collect();

        OrderDraft {
            order_id: Some(order.id.clone()),
            client_id: order.client_id.clone(),
            status: order.status,
            notes: order.notes.clone(),
            lines,
        }
    }

    /// Adds a catalog variant; the same variant again increases its quantity.
    pub fn add_variant(
        &mut self,
        catalog: &Catalog,
        variant_id: &str,
        quantity: i64,
    ) -> CoreResult<()> {
        validate_order_quantity(quantity)?;

        let (product, variant) = catalog
            .variant(variant_id)
            .ok_or_else(|| CoreError::not_found("Variant", variant_id))?;

        if let Some(line) = self
            .lines
            .iter_mut()
            .find(|l| l.variant_id.as_deref() == Some(variant_id))
        {
            let new_quantity = line.quantity + quantity;
            validate_order_quantity(new_quantity)?;
            line.quantity = new_quantity;
            return Ok(());
        }

        if self.lines.len() >= MAX_ORDER_LINES {
            return Err(CoreError::OrderTooLarge {
                max: MAX_ORDER_LINES,
            });
        }

        self.lines
            .push(DraftLine::from_variant(product, variant, quantity));
        Ok(())
    }

    /// Sets the quantity of a line by position.
    pub fn set_quantity(&mut self, index: usize, quantity: i64) -> CoreResult<()> {
        validate_order_quantity(quantity)?;
        let line = self
            .lines
            .get_mut(index)
            .ok_or_else(|| CoreError::not_found("Order line", index.to_string()))?;
        line.quantity = quantity;
        Ok(())
    }

    /// Removes a line by position.
    pub fn remove_line(&mut self, index: usize) -> CoreResult<DraftLine> {
        if index >= self.lines.len() {
            return Err(CoreError::not_found("Order line", index.to_string()));
        }
        Ok(self.lines.remove(index))
    }

    pub fn total(&self) -> Money {
        self.lines.iter().map(DraftLine::line_total).sum()
    }

    /// Checks the draft before save.
    pub fn validate(&self) -> CoreResult<()> {
        if self.lines.is_empty() {
            return Err(CoreError::EmptyOrder);
        }
        if self.lines.len() > MAX_ORDER_LINES {
            return Err(CoreError::OrderTooLarge {
                max: MAX_ORDER_LINES,
            });
        }
        for line in &self.lines {
            validate_order_quantity(line.quantity)?;
        }
        validate_optional_text("notes", self.notes.as_deref())?;
        Ok(())
    }

    /// Builds the order header row.
    ///
    /// Reuses `order_id` when editing; `created_at` is supplied by the caller
    /// (the saved value when editing, now when creating).
    pub fn to_order(&self, created_at: DateTime<Utc>, now: DateTime<Utc>) -> CoreResult<Order> {
        self.validate()?;
        Ok(Order {
            id: self.order_id.clone().unwrap_or_else(new_id),
            client_id: self.client_id.clone(),
            status: self.status,
            notes: validate_optional_text("notes", self.notes.as_deref())?,
            total_cents: self.total().cents(),
            created_at,
            updated_at: now,
        })
    }

    /// Builds the item rows for an order header.
    pub fn to_items(&self, order_id: &str) -> Vec<OrderItem> {
        self.lines
            .iter()
            .map(|line| OrderItem {
                id: new_id(),
                order_id: order_id.to_string(),
                product_id: line.product_id.clone(),
                variant_id: line.variant_id.clone(),
                product_name: line.product_name.clone(),
                variant_name: line.variant_name.clone(),
                unit: line.unit.clone(),
                unit_price_cents: line.unit_price_cents,
                quantity: line.quantity,
                line_total_cents: line.line_total().cents(),
            })
            .collect()
    }
}
