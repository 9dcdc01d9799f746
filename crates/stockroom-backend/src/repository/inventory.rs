//! # Inventory Repository
//!
//! Inventory items, their movement history, and transfers between items.
//!
//! ## Transfer Execution
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  transfer(request)                                                      │
//! │     │                                                                   │
//! │     ├── load source, destination, source on-hand                        │
//! │     ├── plan_transfer()  (stockroom-core: checks + conversion)          │
//! │     │                                                                   │
//! │     ├── 1. INSERT outbound ──── fails ──► error, nothing written        │
//! │     │                                                                   │
//! │     ├── 2. INSERT inbound  ──── ok ─────► Ok(plan)                      │
//! │     │         │                                                         │
//! │     │         └── fails                                                 │
//! │     │              │                                                    │
//! │     │              ▼                                                    │
//! │     └── 3. INSERT reversal_of(outbound)                                 │
//! │                ├── ok    ──► TransferFailed { compensated: true }       │
//! │                └── fails ──► TransferFailed { compensated: false }      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Best effort only: if the reversal also fails, the source stays short by
//! the outbound quantity and the error says so.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use stockroom_core::stock::{self, plan_movement, plan_transfer, reversal_of, StockLevel, TransferPlan};
use stockroom_core::validation::{validate_min_quantity, validate_name, validate_optional_text, validate_unit};
use stockroom_core::{new_id, ConversionRate, InventoryItem, InventoryMovement, MovementKind, Quantity};

use super::{INVENTORY_ITEMS, INVENTORY_MOVEMENTS};
use crate::backend::{decode_one, decode_rows, encode_rows, Backend};
use crate::error::{BackendError, BackendResult};
use crate::query::Query;

// =============================================================================
// Forms
// =============================================================================

/// The inventory item form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryItemInput {
    pub name: String,
    pub unit: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub min_quantity: Quantity,
    #[serde(default)]
    pub product_id: Option<String>,
    #[serde(default)]
    pub variant_id: Option<String>,
}

impl InventoryItemInput {
    pub fn new(name: impl Into<String>, unit: impl Into<String>) -> Self {
        InventoryItemInput {
            name: name.into(),
            unit: unit.into(),
            location: None,
            min_quantity: Quantity::zero(),
            product_id: None,
            variant_id: None,
        }
    }

    pub fn validate(&self) -> BackendResult<InventoryItemInput> {
        validate_min_quantity(self.min_quantity)?;
        Ok(InventoryItemInput {
            name: validate_name("name", &self.name)?,
            unit: validate_unit(&self.unit)?,
            location: validate_optional_text("location", self.location.as_deref())?,
            min_quantity: self.min_quantity,
            product_id: self.product_id.clone(),
            variant_id: self.variant_id.clone(),
        })
    }
}

/// The transfer form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferRequest {
    pub source_id: String,
    pub destination_id: String,
    /// In source units.
    pub quantity: Quantity,
    #[serde(default)]
    pub rate: ConversionRate,
    #[serde(default)]
    pub note: Option<String>,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for the `inventory_items` and `inventory_movements` tables.
#[derive(Clone)]
pub struct InventoryRepository {
    backend: Arc<dyn Backend>,
}

impl InventoryRepository {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        InventoryRepository { backend }
    }

    /// Items by name, then location.
    pub async fn items(&self) -> BackendResult<Vec<InventoryItem>> {
        let query = Query::table(INVENTORY_ITEMS)
            .order_by("name", true)
            .order_by("location", true);
        decode_rows(self.backend.select(&query).await?)
    }

    pub async fn get_item(&self, id: &str) -> BackendResult<InventoryItem> {
        let rows = self
            .backend
            .select(&Query::table(INVENTORY_ITEMS).eq("id", id).limit(1))
            .await?;
        decode_one(rows, "Inventory item", id)
    }

    /// Movement history, newest first, optionally of one item only.
    pub async fn movements(
        &self,
        item_id: Option<&str>,
        limit: Option<usize>,
    ) -> BackendResult<Vec<InventoryMovement>> {
        let mut query = Query::table(INVENTORY_MOVEMENTS).order_by("created_at", false);
        if let Some(id) = item_id {
            query = query.eq("inventory_item_id", id);
        }
        if let Some(limit) = limit {
            query = query.limit(limit);
        }
        decode_rows(self.backend.select(&query).await?)
    }

    /// Current on-hand quantity of one item.
    pub async fn on_hand(&self, item_id: &str) -> BackendResult<Quantity> {
        let movements = self.movements(Some(item_id), None).await?;
        Ok(stock::on_hand(item_id, &movements))
    }

    /// Every item with its on-hand quantity and low-stock flag.
    pub async fn stock_levels(&self) -> BackendResult<Vec<StockLevel>> {
        let items = self.items().await?;
        let movements = self.movements(None, None).await?;
        let levels = stock::stock_levels(&items, &movements);
        debug!(items = levels.len(), low = levels.iter().filter(|l| l.low).count(), "Computed stock levels");
        Ok(levels)
    }

    pub async fn create_item(&self, input: &InventoryItemInput) -> BackendResult<InventoryItem> {
        let input = input.validate()?;
        let item = InventoryItem {
            id: new_id(),
            product_id: input.product_id,
            variant_id: input.variant_id,
            name: input.name,
            unit: input.unit,
            location: input.location,
            min_quantity: input.min_quantity,
            created_at: Utc::now(),
        };

        let rows = self
            .backend
            .insert(INVENTORY_ITEMS, encode_rows(&[item.clone()])?)
            .await?;
        info!(item_id = %item.id, name = %item.name, "Created inventory item");
        decode_one(rows, "Inventory item", &item.id)
    }

    pub async fn update_item(&self, id: &str, input: &InventoryItemInput) -> BackendResult<InventoryItem> {
        let input = input.validate()?;
        let patch = json!({
            "name": input.name,
            "unit": input.unit,
            "location": input.location,
            "min_quantity": input.min_quantity,
            "product_id": input.product_id,
            "variant_id": input.variant_id,
        });

        let rows = self
            .backend
            .update(&Query::table(INVENTORY_ITEMS).eq("id", id), patch)
            .await?;
        info!(item_id = %id, "Updated inventory item");
        decode_one(rows, "Inventory item", id)
    }

    /// Deletes an item's movements, then the item.
    pub async fn delete_item(&self, id: &str) -> BackendResult<()> {
        let movements = self
            .backend
            .delete(&Query::table(INVENTORY_MOVEMENTS).eq("inventory_item_id", id))
            .await?;
        let deleted = self
            .backend
            .delete(&Query::table(INVENTORY_ITEMS).eq("id", id))
            .await?;
        if deleted.is_empty() {
            return Err(BackendError::not_found("Inventory item", id));
        }
        info!(item_id = %id, movements = movements.len(), "Deleted inventory item");
        Ok(())
    }

    /// Records a plain receipt (`In`) or issue (`Out`).
    pub async fn record_movement(
        &self,
        item_id: &str,
        kind: MovementKind,
        quantity: Quantity,
        note: Option<&str>,
    ) -> BackendResult<InventoryMovement> {
        let item = self.get_item(item_id).await?;
        let available = self.on_hand(item_id).await?;
        let movement = plan_movement(&item, kind, quantity, available, note, Utc::now())?;

        let rows = self
            .backend
            .insert(INVENTORY_MOVEMENTS, encode_rows(&[movement.clone()])?)
            .await?;
        info!(item_id, kind = %kind, quantity = %quantity, "Recorded movement");
        decode_one(rows, "Movement", &movement.id)
    }

    /// Moves stock from one item to another, converting units.
    pub async fn transfer(&self, request: &TransferRequest) -> BackendResult<TransferPlan> {
        let source = self.get_item(&request.source_id).await?;
        let destination = self.get_item(&request.destination_id).await?;
        let available = self.on_hand(&source.id).await?;

        let plan = plan_transfer(
            &source,
            &destination,
            request.quantity,
            request.rate,
            available,
            request.note.as_deref(),
            Utc::now(),
        )?;

        self.backend
            .insert(INVENTORY_MOVEMENTS, encode_rows(&[plan.outbound.clone()])?)
            .await?;

        if let Err(err) = self
            .backend
            .insert(INVENTORY_MOVEMENTS, encode_rows(&[plan.inbound.clone()])?)
            .await
        {
            return Err(self.compensate(&plan, err).await);
        }

        info!(
            transfer_id = %plan.transfer_id,
            from = %source.label(),
            to = %destination.label(),
            outbound = %plan.outbound.quantity,
            inbound = %plan.inbound.quantity,
            "Transfer recorded"
        );
        Ok(plan)
    }

    /// Reverses the outbound half after the inbound insert failed.
    async fn compensate(&self, plan: &TransferPlan, cause: BackendError) -> BackendError {
        warn!(transfer_id = %plan.transfer_id, error = %cause, "Inbound insert failed, reversing outbound movement");

        let reversal = reversal_of(&plan.outbound, Utc::now());
        let compensated = match encode_rows(&[reversal]) {
            Ok(rows) => match self.backend.insert(INVENTORY_MOVEMENTS, rows).await {
                Ok(_) => true,
                Err(reversal_err) => {
                    error!(
                        transfer_id = %plan.transfer_id,
                        item_id = %plan.outbound.inventory_item_id,
                        error = %reversal_err,
                        "Reversal failed, source item is short"
                    );
                    false
                }
            },
            Err(encode_err) => {
                error!(transfer_id = %plan.transfer_id, error = %encode_err, "Could not encode reversal");
                false
            }
        };

        BackendError::TransferFailed {
            transfer_id: plan.transfer_id.clone(),
            compensated,
            cause: cause.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryBackend;
    use stockroom_core::CoreError;

    struct Fixture {
        backend: Arc<MemoryBackend>,
        repo: InventoryRepository,
        sacks: InventoryItem,
        flour: InventoryItem,
    }

    async fn fixture() -> Fixture {
        let backend = Arc::new(MemoryBackend::new());
        let repo = InventoryRepository::new(backend.clone());

        let sacks = repo
            .create_item(&InventoryItemInput::new("Flour sacks", "sack"))
            .await
            .unwrap();
        let mut flour_input = InventoryItemInput::new("Flour", "kg");
        flour_input.min_quantity = Quantity::from_units(10);
        let flour = repo.create_item(&flour_input).await.unwrap();

        repo.record_movement(&sacks.id, MovementKind::In, Quantity::from_units(4), Some("delivery"))
            .await
            .unwrap();

        Fixture {
            backend,
            repo,
            sacks,
            flour,
        }
    }

    fn request(f: &Fixture, units: i64) -> TransferRequest {
        TransferRequest {
            source_id: f.sacks.id.clone(),
            destination_id: f.flour.id.clone(),
            quantity: Quantity::from_units(units),
            rate: ConversionRate::new(1, 25).unwrap(),
            note: None,
        }
    }

    #[tokio::test]
    async fn test_transfer_converts_units() {
        let f = fixture().await;
        let plan = f.repo.transfer(&request(&f, 2)).await.unwrap();

        assert_eq!(plan.inbound.quantity, Quantity::from_units(50));
        assert_eq!(f.repo.on_hand(&f.sacks.id).await.unwrap(), Quantity::from_units(2));
        assert_eq!(f.repo.on_hand(&f.flour.id).await.unwrap(), Quantity::from_units(50));

        let linked: Vec<InventoryMovement> = f
            .repo
            .movements(None, None)
            .await
            .unwrap()
            .into_iter()
            .filter(|m| m.transfer_id.as_deref() == Some(plan.transfer_id.as_str()))
            .collect();
        assert_eq!(linked.len(), 2);
    }

    #[tokio::test]
    async fn test_transfer_compensates_failed_inbound() {
        let f = fixture().await;

        // the outbound insert succeeds, the inbound one fails
        let inbound_failure = Arc::new(FailSecondInsert::new(f.backend.clone()));
        let repo = InventoryRepository::new(inbound_failure);

        let result = repo.transfer(&request(&f, 3)).await;
        match result {
            Err(BackendError::TransferFailed { compensated, .. }) => assert!(compensated),
            other => panic!("unexpected {other:?}"),
        }

        // outbound and reversal cancel out
        assert_eq!(f.repo.on_hand(&f.sacks.id).await.unwrap(), Quantity::from_units(4));
        assert_eq!(f.repo.on_hand(&f.flour.id).await.unwrap(), Quantity::zero());
        let kinds: Vec<MovementKind> = f
            .repo
            .movements(Some(f.sacks.id.as_str()), None)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.kind)
            .collect();
        assert!(kinds.contains(&MovementKind::Reversal));
    }

    #[tokio::test]
    async fn test_transfer_reports_failed_compensation() {
        let f = fixture().await;
        let backend = Arc::new(FailSecondInsert::new(f.backend.clone()).and_third());
        let repo = InventoryRepository::new(backend);

        let result = repo.transfer(&request(&f, 1)).await;
        match result {
            Err(err @ BackendError::TransferFailed { compensated: false, .. }) => {
                assert!(err.to_string().contains("REVERSAL ALSO FAILED"));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(f.repo.on_hand(&f.sacks.id).await.unwrap(), Quantity::from_units(3));
    }

    #[tokio::test]
    async fn test_transfer_rejected_before_writes() {
        let f = fixture().await;
        let before = f.backend.rows(INVENTORY_MOVEMENTS).len();

        let result = f.repo.transfer(&request(&f, 5)).await;
        assert!(matches!(
            result,
            Err(BackendError::Core(CoreError::InsufficientStock { .. }))
        ));
        assert_eq!(f.backend.rows(INVENTORY_MOVEMENTS).len(), before);
    }

    #[test]
    fn test_transfer_form_rejects_zero_rate() {
        let form = serde_json::json!({
            "source_id": "a",
            "destination_id": "b",
            "quantity": 2,
            "rate": { "from_units": 0, "to_units": 12 },
        });
        let err = serde_json::from_value::<TransferRequest>(form).unwrap_err();
        assert!(err.to_string().contains("conversion rate"), "{err}");

        let form = serde_json::json!({ "source_id": "a", "destination_id": "b", "quantity": 2 });
        let request: TransferRequest = serde_json::from_value(form).unwrap();
        assert!(request.rate.is_identity());
    }

    #[tokio::test]
    async fn test_out_movement_cannot_go_negative() {
        let f = fixture().await;
        let result = f
            .repo
            .record_movement(&f.sacks.id, MovementKind::Out, Quantity::from_units(5), None)
            .await;
        assert!(result.is_err());

        f.repo
            .record_movement(&f.sacks.id, MovementKind::Out, Quantity::from_units(4), None)
            .await
            .unwrap();
        assert!(f.repo.on_hand(&f.sacks.id).await.unwrap().is_zero());
    }

    #[tokio::test]
    async fn test_stock_levels_and_delete() {
        let f = fixture().await;
        let levels = f.repo.stock_levels().await.unwrap();
        let flour = levels.iter().find(|l| l.item.id == f.flour.id).unwrap();
        assert!(flour.low);

        f.repo.delete_item(&f.sacks.id).await.unwrap();
        assert!(f
            .backend
            .rows(INVENTORY_MOVEMENTS)
            .iter()
            .all(|m| m["inventory_item_id"] != f.sacks.id.as_str()));
    }

    /// Delegates to a memory backend but fails the 2nd (and optionally 3rd)
    /// movement insert, to exercise the compensation path.
    struct FailSecondInsert {
        inner: Arc<MemoryBackend>,
        inserts: std::sync::atomic::AtomicUsize,
        fail_third: bool,
    }

    impl FailSecondInsert {
        fn new(inner: Arc<MemoryBackend>) -> Self {
            FailSecondInsert {
                inner,
                inserts: std::sync::atomic::AtomicUsize::new(0),
                fail_third: false,
            }
        }

        fn and_third(mut self) -> Self {
            self.fail_third = true;
            self
        }
    }

    #[async_trait::async_trait]
    impl Backend for FailSecondInsert {
        fn name(&self) -> &str {
            "fail-second-insert"
        }

        async fn select(&self, query: &Query) -> BackendResult<Vec<serde_json::Value>> {
            self.inner.select(query).await
        }

        async fn insert(&self, table: &str, rows: Vec<serde_json::Value>) -> BackendResult<Vec<serde_json::Value>> {
            if table == INVENTORY_MOVEMENTS {
                let n = self.inserts.fetch_add(1, std::sync::atomic::Ordering::SeqCst) + 1;
                if n == 2 || (n == 3 && self.fail_third) {
                    return Err(BackendError::Network("connection reset".to_string()));
                }
            }
            self.inner.insert(table, rows).await
        }

        async fn update(&self, query: &Query, patch: serde_json::Value) -> BackendResult<Vec<serde_json::Value>> {
            self.inner.update(query, patch).await
        }

        async fn delete(&self, query: &Query) -> BackendResult<Vec<serde_json::Value>> {
            self.inner.delete(query).await
        }

        async fn rpc(&self, name: &str, args: serde_json::Value) -> BackendResult<serde_json::Value> {
            self.inner.rpc(name, args).await
        }

        async fn sign_in(&self, credentials: &crate::auth::Credentials) -> BackendResult<crate::auth::Session> {
            self.inner.sign_in(credentials).await
        }

        async fn sign_out(&self) -> BackendResult<()> {
            self.inner.sign_out().await
        }

        async fn restore_session(&self, session: Option<crate::auth::Session>) -> BackendResult<()> {
            self.inner.restore_session(session).await
        }

        async fn refresh_session(&self) -> BackendResult<crate::auth::Session> {
            self.inner.refresh_session().await
        }

        fn auth(&self) -> &crate::auth::AuthState {
            self.inner.auth()
        }
    }
}
