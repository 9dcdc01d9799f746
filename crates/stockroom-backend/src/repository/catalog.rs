//! # Catalog Repository
//!
//! Products and their variants.
//!
//! ## Delete Order
//! ```text
//! delete_product(id)
//!     │
//!     ├── 1. DELETE variants WHERE product_id = id
//!     └── 2. DELETE products WHERE id = id
//! ```
//! Variants go first so the product delete never trips a foreign key.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

use stockroom_core::order::{Catalog, CatalogEntry};
use stockroom_core::validation::{validate_name, validate_optional_text, validate_price_cents, validate_unit};
use stockroom_core::{new_id, Product, Variant};

use super::{PRODUCTS, VARIANTS};
use crate::backend::{decode_one, decode_rows, encode_rows, Backend};
use crate::error::{BackendError, BackendResult};
use crate::query::Query;

// =============================================================================
// Forms
// =============================================================================

/// The product form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductInput {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

/// The variant form.
///
/// `wholesale_price_cents` left empty is not written on update, so a user who
/// cannot see wholesale prices does not wipe them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantInput {
    pub name: String,
    pub unit: String,
    pub price_cents: i64,
    #[serde(default)]
    pub wholesale_price_cents: Option<i64>,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl ProductInput {
    pub fn named(name: impl Into<String>) -> Self {
        ProductInput {
            name: name.into(),
            description: None,
            category: None,
            is_active: true,
        }
    }

    pub fn validate(&self) -> BackendResult<ProductInput> {
        Ok(ProductInput {
            name: validate_name("name", &self.name)?,
            description: validate_optional_text("description", self.description.as_deref())?,
            category: validate_optional_text("category", self.category.as_deref())?,
            is_active: self.is_active,
        })
    }
}

impl VariantInput {
    pub fn new(name: impl Into<String>, unit: impl Into<String>, price_cents: i64) -> Self {
        VariantInput {
            name: name.into(),
            unit: unit.into(),
            price_cents,
            wholesale_price_cents: None,
            sku: None,
            is_active: true,
        }
    }

    pub fn validate(&self) -> BackendResult<VariantInput> {
        validate_price_cents("price", self.price_cents)?;
        if let Some(wholesale) = self.wholesale_price_cents {
            validate_price_cents("wholesale price", wholesale)?;
        }
        Ok(VariantInput {
            name: validate_name("variant name", &self.name)?,
            unit: validate_unit(&self.unit)?,
            price_cents: self.price_cents,
            wholesale_price_cents: self.wholesale_price_cents,
            sku: validate_optional_text("sku", self.sku.as_deref())?,
            is_active: self.is_active,
        })
    }

    fn into_variant(self, product_id: &str) -> Variant {
        Variant {
            id: new_id(),
            product_id: product_id.to_string(),
            name: self.name,
            unit: self.unit,
            price_cents: self.price_cents,
            wholesale_price_cents: self.wholesale_price_cents,
            sku: self.sku,
            is_active: self.is_active,
            created_at: Utc::now(),
        }
    }

    fn to_patch(&self) -> Value {
        let mut patch = Map::new();
        patch.insert("name".into(), json!(self.name));
        patch.insert("unit".into(), json!(self.unit));
        patch.insert("price_cents".into(), json!(self.price_cents));
        patch.insert("sku".into(), json!(self.sku));
        patch.insert("is_active".into(), json!(self.is_active));
        if let Some(wholesale) = self.wholesale_price_cents {
            patch.insert("wholesale_price_cents".into(), json!(wholesale));
        }
        Value::Object(patch)
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for the `products` and `variants` tables.
#[derive(Clone)]
pub struct CatalogRepository {
    backend: Arc<dyn Backend>,
}

impl CatalogRepository {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        CatalogRepository { backend }
    }

    /// Products by name, oldest first among equal names.
    pub async fn products(&self) -> BackendResult<Vec<Product>> {
        let query = Query::table(PRODUCTS)
            .order_by("name", true)
            .order_by("created_at", true);
        decode_rows(self.backend.select(&query).await?)
    }

    /// All variants, oldest first.
    pub async fn variants(&self) -> BackendResult<Vec<Variant>> {
        let query = Query::table(VARIANTS).order_by("created_at", true);
        decode_rows(self.backend.select(&query).await?)
    }

    /// Products with their variants.
    pub async fn load_catalog(&self) -> BackendResult<Catalog> {
        let products = self.products().await?;
        let variants = self.variants().await?;
        let catalog = Catalog::assemble(products, variants);
        debug!(products = catalog.entries.len(), "Loaded catalog");
        Ok(catalog)
    }

    /// Creates a product and its initial variants.
    ///
    /// When the variant insert fails the product row is removed again
    /// (best effort) and the insert error is returned.
    pub async fn create_product(
        &self,
        input: &ProductInput,
        variants: &[VariantInput],
    ) -> BackendResult<CatalogEntry> {
        let input = input.validate()?;
        let variants = variants
            .iter()
            .map(VariantInput::validate)
            .collect::<BackendResult<Vec<_>>>()?;

        let product = Product {
            id: new_id(),
            name: input.name,
            description: input.description,
            category: input.category,
            is_active: input.is_active,
            created_at: Utc::now(),
        };

        let rows = self
            .backend
            .insert(PRODUCTS, encode_rows(&[product.clone()])?)
            .await?;
        let product: Product = decode_one(rows, "Product", &product.id)?;

        let variant_rows: Vec<Variant> = variants
            .into_iter()
            .map(|v| v.into_variant(&product.id))
            .collect();

        let variants = if variant_rows.is_empty() {
            Vec::new()
        } else {
            match self.backend.insert(VARIANTS, encode_rows(&variant_rows)?).await {
                Ok(rows) => decode_rows(rows)?,
                Err(err) => {
                    warn!(product_id = %product.id, error = %err, "Variant insert failed, removing product");
                    if let Err(cleanup) = self
                        .backend
                        .delete(&Query::table(PRODUCTS).eq("id", product.id.as_str()))
                        .await
                    {
                        warn!(product_id = %product.id, error = %cleanup, "Could not remove product");
                    }
                    return Err(err);
                }
            }
        };

        info!(product_id = %product.id, variants = variants.len(), "Created product");
        Ok(CatalogEntry { product, variants })
    }

    pub async fn update_product(&self, id: &str, input: &ProductInput) -> BackendResult<Product> {
        let input = input.validate()?;
        let patch = json!({
            "name": input.name,
            "description": input.description,
            "category": input.category,
            "is_active": input.is_active,
        });

        let rows = self
            .backend
            .update(&Query::table(PRODUCTS).eq("id", id), patch)
            .await?;
        info!(product_id = %id, "Updated product");
        decode_one(rows, "Product", id)
    }

    pub async fn add_variant(&self, product_id: &str, input: &VariantInput) -> BackendResult<Variant> {
        let variant = input.validate()?.into_variant(product_id);
        let rows = self
            .backend
            .insert(VARIANTS, encode_rows(&[variant.clone()])?)
            .await?;
        info!(product_id, variant_id = %variant.id, "Added variant");
        decode_one(rows, "Variant", &variant.id)
    }

    pub async fn update_variant(&self, id: &str, input: &VariantInput) -> BackendResult<Variant> {
        let patch = input.validate()?.to_patch();
        let rows = self
            .backend
            .update(&Query::table(VARIANTS).eq("id", id), patch)
            .await?;
        info!(variant_id = %id, "Updated variant");
        decode_one(rows, "Variant", id)
    }

    pub async fn delete_variant(&self, id: &str) -> BackendResult<()> {
        let deleted = self
            .backend
            .delete(&Query::table(VARIANTS).eq("id", id))
            .await?;
        if deleted.is_empty() {
            return Err(BackendError::not_found("Variant", id));
        }
        info!(variant_id = %id, "Deleted variant");
        Ok(())
    }

    /// Deletes a product's variants, then the product.
    pub async fn delete_product(&self, id: &str) -> BackendResult<()> {
        let variants = self
            .backend
            .delete(&Query::table(VARIANTS).eq("product_id", id))
            .await?;
        let deleted = self
            .backend
            .delete(&Query::table(PRODUCTS).eq("id", id))
            .await?;
        if deleted.is_empty() {
            return Err(BackendError::not_found("Product", id));
        }
        info!(product_id = %id, variants = variants.len(), "Deleted product");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryBackend;

    fn repo() -> (Arc<MemoryBackend>, CatalogRepository) {
        let backend = Arc::new(MemoryBackend::new());
        (backend.clone(), CatalogRepository::new(backend))
    }

    fn wholesale(name: &str, price: i64, wholesale: i64) -> VariantInput {
        let mut input = VariantInput::new(name, "box", price);
        input.wholesale_price_cents = Some(wholesale);
        input
    }

    #[tokio::test]
    async fn test_create_product_and_load_catalog() {
        let (_, repo) = repo();
        repo.create_product(
            &ProductInput::named("Sourdough"),
            &[VariantInput::new("Small", "loaf", 450), VariantInput::new("Large", "loaf", 700)],
        )
        .await
        .unwrap();
        repo.create_product(&ProductInput::named("Baguette"), &[])
            .await
            .unwrap();

        let catalog = repo.load_catalog().await.unwrap();
        assert_eq!(catalog.entries.len(), 2);
        assert_eq!(catalog.entries[0].product.name, "Baguette");
        assert_eq!(catalog.entries[1].variants.len(), 2);
        assert_eq!(catalog.entries[1].variants[0].name, "Small");
    }

    #[tokio::test]
    async fn test_variant_failure_removes_product() {
        let (backend, repo) = repo();
        backend.fail_next_insert(VARIANTS, "check constraint violated");

        let result = repo
            .create_product(&ProductInput::named("Rye"), &[VariantInput::new("Loaf", "loaf", 500)])
            .await;

        assert!(matches!(result, Err(BackendError::Http { status: 500, .. })));
        assert!(backend.rows(PRODUCTS).is_empty());
    }

    #[tokio::test]
    async fn test_update_variant_keeps_hidden_wholesale() {
        let (backend, repo) = repo();
        let entry = repo
            .create_product(&ProductInput::named("Flour"), &[wholesale("25 kg", 3_000, 2_100)])
            .await
            .unwrap();
        let variant_id = entry.variants[0].id.clone();

        // a user without wholesale access submits the form without it
        let updated = repo
            .update_variant(&variant_id, &VariantInput::new("25 kg", "sack", 3_200))
            .await
            .unwrap();
        assert_eq!(updated.price_cents, 3_200);
        assert_eq!(updated.wholesale_price_cents, Some(2_100));
        assert_eq!(backend.rows(VARIANTS).len(), 1);
    }

    #[tokio::test]
    async fn test_delete_product_removes_variants_first() {
        let (backend, repo) = repo();
        let entry = repo
            .create_product(&ProductInput::named("Rolls"), &[VariantInput::new("6-pack", "pack", 300)])
            .await
            .unwrap();
        repo.add_variant(&entry.product.id, &VariantInput::new("12-pack", "pack", 550))
            .await
            .unwrap();

        repo.delete_product(&entry.product.id).await.unwrap();

        assert!(backend.rows(VARIANTS).is_empty());
        assert!(backend.rows(PRODUCTS).is_empty());
        let calls = backend.calls();
        let deletes: Vec<&String> = calls.iter().filter(|c| c.starts_with("delete")).collect();
        assert_eq!(deletes, vec!["delete variants", "delete products"]);
    }

    #[tokio::test]
    async fn test_invalid_variant_rejected_before_any_write() {
        let (backend, repo) = repo();
        let result = repo
            .create_product(&ProductInput::named("Cake"), &[VariantInput::new("Slice", " ", 100)])
            .await;
        assert!(result.is_err());
        assert!(backend.calls().is_empty());
    }
}
