//! # stockroom-core: Pure Business Logic for Stockroom
//!
//! Everything the client decides on its own lives here, as pure functions
//! with zero I/O dependencies. The hosted backend owns persistence and
//! authorization; this crate only shapes what is sent and what is shown.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Stockroom Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Pages (apps/stockroom)                       │   │
//! │  │  Dashboard ── Clients ── Products ── Orders ── Inventory        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             ★ stockroom-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   order   │  │   stock   │  │ dashboard │  │   │
//! │  │   │  Client   │  │  Draft    │  │  Levels   │  │  Summary  │  │   │
//! │  │   │  Variant  │  │ Reconcile │  │ Transfer  │  │           │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO BACKEND • NO NETWORK • PURE FUNCTIONS            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              stockroom-backend (hosted backend client)          │   │
//! │  │          select / insert / update / delete / rpc / auth         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Backend rows (Client, Product, Variant, Order, ...)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`quantity`] - Fixed-point stock quantities and unit conversion
//! - [`order`] - Order drafts and catalog reconciliation
//! - [`stock`] - Stock levels and movement / transfer planning
//! - [`dashboard`] - Dashboard summary
//! - [`error`] - Domain error types
//! - [`validation`] - Form validation
//!
//! ## Example Usage
//!
//! ```rust
//! use stockroom_core::quantity::{ConversionRate, Quantity};
//!
//! // 1 box holds 12 units
//! let rate = ConversionRate::new(1, 12).unwrap();
//! let boxes = Quantity::from_units(3);
//!
//! assert_eq!(rate.convert(boxes), Quantity::from_units(36));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod dashboard;
pub mod error;
pub mod money;
pub mod order;
pub mod quantity;
pub mod stock;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, ValidationError};
pub use money::Money;
pub use quantity::{ConversionRate, Quantity};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum number of lines on a single order.
///
/// ## Business Reason
/// Orders are typed in by hand; anything bigger is almost certainly a
/// duplicated paste.
pub const MAX_ORDER_LINES: usize = 200;

/// Maximum quantity of a single order line.
pub const MAX_LINE_QUANTITY: i64 = 9_999;

/// Number of orders shown in the dashboard "recent orders" table.
pub const RECENT_ORDERS: usize = 5;
