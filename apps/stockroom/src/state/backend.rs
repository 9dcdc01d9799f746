//! # Backend State
//!
//! Wraps the shared `dyn Backend` and hands out repositories.
//!
//! ## Usage in Pages
//! ```rust,ignore
//! pub async fn list_clients(app: &App, search: Option<&str>) -> Result<Vec<Client>, ApiError> {
//!     Ok(app.backend.clients().list(search).await?)
//! }
//! ```

use std::sync::Arc;

use stockroom_backend::{
    Backend, CatalogRepository, ClientRepository, InventoryRepository, OrderRepository,
};

/// Shared handle to the hosted backend.
///
/// Repositories are cheap to build (one `Arc` clone), so each call gets a
/// fresh one instead of the state holding four of them.
#[derive(Clone)]
pub struct BackendState {
    backend: Arc<dyn Backend>,
}

impl BackendState {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        BackendState { backend }
    }

    /// Returns a reference to the inner backend.
    pub fn inner(&self) -> &dyn Backend {
        self.backend.as_ref()
    }

    pub fn shared(&self) -> Arc<dyn Backend> {
        self.backend.clone()
    }

    pub fn clients(&self) -> ClientRepository {
        ClientRepository::new(self.shared())
    }

    pub fn catalog(&self) -> CatalogRepository {
        CatalogRepository::new(self.shared())
    }

    pub fn orders(&self) -> OrderRepository {
        OrderRepository::new(self.shared())
    }

    pub fn inventory(&self) -> InventoryRepository {
        InventoryRepository::new(self.shared())
    }
}
