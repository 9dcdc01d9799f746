//! # stockroom-backend: Hosted Backend Client for Stockroom
//!
//! Stockroom keeps no database of its own. Persistence, authentication and
//! authorization (row-level security) belong to a hosted PostgREST-style
//! backend; this crate is the only code that talks to it.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Stockroom Data Flow                              │
//! │                                                                         │
//! │  Page action (create order, transfer stock, ...)                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                stockroom-backend (THIS CRATE)                   │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐   ┌───────────────┐   ┌───────────────┐    │   │
//! │  │   │ Repositories  │   │    authz      │   │     auth      │    │   │
//! │  │   │ Client, Order │   │ can_delete    │   │ Session       │    │   │
//! │  │   │ Catalog, Inv. │   │ can_view_     │   │ AuthEvent     │    │   │
//! │  │   │               │   │   wholesale   │   │ broadcast     │    │   │
//! │  │   └───────┬───────┘   └───────┬───────┘   └───────┬───────┘    │   │
//! │  │           └───────────────────┼───────────────────┘            │   │
//! │  │                               ▼                                 │   │
//! │  │                      dyn Backend + Query                        │   │
//! │  │                ┌──────────────┴──────────────┐                  │   │
//! │  │          RestBackend (reqwest)       MemoryBackend              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  https://<project>/rest/v1/...   https://<project>/auth/v1/...          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`backend`] - The `Backend` trait and typed row helpers
//! - [`query`] - Filter / order / limit query builder
//! - [`auth`] - Sessions and auth-state change notifications
//! - [`rest`] - HTTP implementation
//! - [`memory`] - In-memory implementation (tests, offline mode)
//! - [`authz`] - Permission RPCs
//! - [`repository`] - Typed repositories per table group
//! - [`error`] - Backend error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use stockroom_backend::{BackendConfig, ClientRepository, RestBackend};
//!
//! let config = BackendConfig::new("abc.example.co", anon_key)?;
//! let backend = Arc::new(RestBackend::new(config)?);
//!
//! let clients = ClientRepository::new(backend).list(Some("bakery")).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod auth;
pub mod authz;
pub mod backend;
pub mod error;
pub mod memory;
pub mod query;
pub mod repository;
pub mod rest;

// =============================================================================
// Re-exports
// =============================================================================

pub use auth::{AuthEvent, AuthState, AuthUser, Credentials, Session};
pub use authz::{load_permissions, Permissions};
pub use backend::Backend;
pub use error::{BackendError, BackendResult};
pub use memory::MemoryBackend;
pub use query::Query;
pub use rest::{BackendConfig, RestBackend};

// Repository re-exports for convenience
pub use repository::{
    CatalogRepository, ClientInput, ClientRepository, InventoryItemInput, InventoryRepository,
    OrderRepository, ProductInput, TransferRequest, VariantInput,
};
