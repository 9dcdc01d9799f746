//! # Repository Module
//!
//! Typed access to the backend tables, one repository per page area.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Page (apps/stockroom)                                                  │
//! │       │                                                                 │
//! │       │  orders.create(&draft)                                          │
//! │       ▼                                                                 │
//! │  OrderRepository                                                        │
//! │  ├── builds rows with stockroom-core (draft → header + items)          │
//! │  ├── issues Query / insert / update / delete on Arc<dyn Backend>       │
//! │  └── decodes the answer back into typed rows                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  RestBackend (HTTP)  or  MemoryBackend (tests, --offline)               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ClientRepository`] - Client CRUD and search
//! - [`CatalogRepository`] - Products and variants
//! - [`OrderRepository`] - Order headers and items
//! - [`InventoryRepository`] - Inventory items, movements and transfers

pub mod catalog;
pub mod clients;
pub mod inventory;
pub mod orders;

pub use catalog::{CatalogRepository, ProductInput, VariantInput};
pub use clients::{ClientInput, ClientRepository};
pub use inventory::{InventoryItemInput, InventoryRepository, TransferRequest};
pub use orders::OrderRepository;

// =============================================================================
// Table Names
// =============================================================================

pub const CLIENTS: &str = "clients";
pub const PRODUCTS: &str = "products";
pub const VARIANTS: &str = "variants";
pub const ORDERS: &str = "orders";
pub const ORDER_ITEMS: &str = "order_items";
pub const INVENTORY_ITEMS: &str = "inventory_items";
pub const INVENTORY_MOVEMENTS: &str = "inventory_movements";
