//! # Products Page
//!
//! Products with their variants. Wholesale prices are only shown (and only
//! written) for users the backend allows to see them.
//!
//! ```text
//! load_catalog() ──► Catalog ──► can_view_wholesale? ──no──► mask_wholesale()
//!                                        │yes
//!                                        ▼
//!                                   ProductsView
//! ```

use serde::Serialize;
use tracing::{debug, info};

use stockroom_backend::{Permissions, ProductInput, VariantInput};
use stockroom_core::order::{Catalog, CatalogEntry};
use stockroom_core::{Product, Variant};

use super::{ensure_can_delete, open, require_session};
use crate::error::ApiError;
use crate::state::Route;
use crate::App;

/// What the products page shows.
#[derive(Debug, Clone, Serialize)]
pub struct ProductsView {
    pub catalog: Catalog,
    pub show_wholesale: bool,
    pub can_delete: bool,
}

async fn permissions(app: &App) -> Result<Permissions, ApiError> {
    require_session(app)?;
    Ok(app.session.permissions().await)
}

/// The catalog as this user may see it.
pub async fn catalog(app: &App) -> Result<Catalog, ApiError> {
    let permissions = permissions(app).await?;
    let mut catalog = app.backend.catalog().load_catalog().await?;
    if !permissions.can_view_wholesale {
        catalog.mask_wholesale();
    }
    Ok(catalog)
}

pub async fn list(app: &App) -> Result<ProductsView, ApiError> {
    open(app, Route::Products)?;
    let permissions = app.session.permissions().await;
    let catalog = catalog(app).await?;
    debug!(products = catalog.entries.len(), "products list");

    Ok(ProductsView {
        catalog,
        show_wholesale: permissions.can_view_wholesale,
        can_delete: permissions.can_delete,
    })
}

// a user who cannot see wholesale prices cannot set them either
fn strip_wholesale(input: &VariantInput, permissions: Permissions) -> VariantInput {
    let mut input = input.clone();
    if !permissions.can_view_wholesale {
        input.wholesale_price_cents = None;
    }
    input
}

fn mask(mut variant: Variant, permissions: Permissions) -> Variant {
    if !permissions.can_view_wholesale {
        variant.wholesale_price_cents = None;
    }
    variant
}

/// Creates a product with its first variants.
pub async fn create(
    app: &App,
    input: &ProductInput,
    variants: &[VariantInput],
) -> Result<CatalogEntry, ApiError> {
    let permissions = permissions(app).await?;
    let variants: Vec<VariantInput> = variants
        .iter()
        .map(|v| strip_wholesale(v, permissions))
        .collect();

    let mut entry = app.backend.catalog().create_product(input, &variants).await?;
    entry.variants = entry
        .variants
        .into_iter()
        .map(|v| mask(v, permissions))
        .collect();

    info!(product_id = %entry.product.id, variants = entry.variants.len(), "product created");
    Ok(entry)
}

pub async fn update(app: &App, id: &str, input: &ProductInput) -> Result<Product, ApiError> {
    require_session(app)?;
    Ok(app.backend.catalog().update_product(id, input).await?)
}

pub async fn add_variant(app: &App, product_id: &str, input: &VariantInput) -> Result<Variant, ApiError> {
    let permissions = permissions(app).await?;
    let variant = app
        .backend
        .catalog()
        .add_variant(product_id, &strip_wholesale(input, permissions))
        .await?;
    info!(product_id, variant_id = %variant.id, "variant added");
    Ok(mask(variant, permissions))
}

pub async fn update_variant(app: &App, id: &str, input: &VariantInput) -> Result<Variant, ApiError> {
    let permissions = permissions(app).await?;
    let variant = app
        .backend
        .catalog()
        .update_variant(id, &strip_wholesale(input, permissions))
        .await?;
    Ok(mask(variant, permissions))
}

/// Deletes a product and its variants. Needs the delete permission.
pub async fn delete(app: &App, id: &str) -> Result<(), ApiError> {
    ensure_can_delete(app, "products").await?;
    app.backend.catalog().delete_product(id).await?;
    info!(product_id = %id, "product deleted");
    Ok(())
}

pub async fn delete_variant(app: &App, id: &str) -> Result<(), ApiError> {
    ensure_can_delete(app, "variants").await?;
    app.backend.catalog().delete_variant(id).await?;
    Ok(())
}
