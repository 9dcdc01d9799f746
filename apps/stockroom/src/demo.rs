//! # Offline Demo Data
//!
//! A `MemoryBackend` seeded with a small bakery-supply catalog, for
//! `stockroom --offline`. Ids are fixed so commands like
//! `stockroom --offline order <id>` work across runs.
//!
//! ```text
//! clients      Bakery Co, Corner Café, Hilltop Deli
//! products     Flour (1 kg bag, 25 kg sack), Olive Oil (500 ml, 5 l)
//! orders       confirmed, pending, delivered
//! inventory    Flour sacks (warehouse), Flour kg (store), Olive Oil (store)
//! user         demo@stockroom.local / demo   (may delete, sees wholesale)
//! ```

use chrono::{DateTime, Duration, Utc};
use serde_json::json;

use stockroom_backend::authz::{CAN_DELETE_RECORDS, CAN_VIEW_WHOLESALE_PRICES};
use stockroom_backend::repository::{
    CLIENTS, INVENTORY_ITEMS, INVENTORY_MOVEMENTS, ORDERS, ORDER_ITEMS, PRODUCTS, VARIANTS,
};
use stockroom_backend::{BackendResult, MemoryBackend};
use stockroom_core::{
    Client, InventoryItem, InventoryMovement, MovementKind, Order, OrderItem, OrderStatus, Product,
    Quantity, Variant,
};

use crate::error::ApiError;
use crate::pages;
use crate::App;

pub const DEMO_EMAIL: &str = "demo@stockroom.local";
pub const DEMO_PASSWORD: &str = "demo";

pub(crate) fn demo_id(n: u32) -> String {
    format!("00000000-0000-4000-8000-{n:012}")
}

fn client(n: u32, name: &str, email: &str, at: DateTime<Utc>) -> Client {
    Client {
        id: demo_id(n),
        name: name.to_string(),
        email: Some(email.to_string()),
        phone: None,
        address: None,
        notes: None,
        created_at: at,
    }
}

fn product(n: u32, name: &str, category: &str, at: DateTime<Utc>) -> Product {
    Product {
        id: demo_id(n),
        name: name.to_string(),
        description: None,
        category: Some(category.to_string()),
        is_active: true,
        created_at: at,
    }
}

fn variant(
    n: u32,
    product: u32,
    name: &str,
    unit: &str,
    price_cents: i64,
    wholesale_price_cents: Option<i64>,
    at: DateTime<Utc>,
) -> Variant {
    Variant {
        id: demo_id(n),
        product_id: demo_id(product),
        name: name.to_string(),
        unit: unit.to_string(),
        price_cents,
        wholesale_price_cents,
        sku: None,
        is_active: true,
        created_at: at,
    }
}

fn order(n: u32, client: u32, status: OrderStatus, total_cents: i64, at: DateTime<Utc>) -> Order {
    Order {
        id: demo_id(n),
        client_id: Some(demo_id(client)),
        status,
        notes: None,
        total_cents,
        created_at: at,
        updated_at: at,
    }
}

fn line(n: u32, order: u32, v: &Variant, product_name: &str, quantity: i64) -> OrderItem {
    OrderItem {
        id: demo_id(n),
        order_id: demo_id(order),
        product_id: Some(v.product_id.clone()),
        variant_id: Some(v.id.clone()),
        product_name: product_name.to_string(),
        variant_name: Some(v.name.clone()),
        unit: v.unit.clone(),
        unit_price_cents: v.price_cents,
        quantity,
        line_total_cents: v.price_cents * quantity,
    }
}

fn stock_item(n: u32, name: &str, unit: &str, location: &str, min: i64, at: DateTime<Utc>) -> InventoryItem {
    InventoryItem {
        id: demo_id(n),
        product_id: None,
        variant_id: None,
        name: name.to_string(),
        unit: unit.to_string(),
        location: Some(location.to_string()),
        min_quantity: Quantity::from_units(min),
        created_at: at,
    }
}

fn movement(n: u32, item: u32, kind: MovementKind, units: i64, at: DateTime<Utc>) -> InventoryMovement {
    InventoryMovement {
        id: demo_id(n),
        inventory_item_id: demo_id(item),
        kind,
        quantity: Quantity::from_units(units),
        transfer_id: None,
        note: None,
        created_at: at,
    }
}

/// Builds the seeded backend.
pub fn demo_backend() -> BackendResult<MemoryBackend> {
    let backend = MemoryBackend::new();
    let now = Utc::now();
    let days_ago = |d: i64| now - Duration::days(d);

    backend.seed_rows(
        CLIENTS,
        &[
            client(1, "Bakery Co", "orders@bakery.example", days_ago(30)),
            client(2, "Corner Café", "hello@corner.example", days_ago(20)),
            client(3, "Hilltop Deli", "deli@hilltop.example", days_ago(10)),
        ],
    )?;

    backend.seed_rows(
        PRODUCTS,
        &[
            product(101, "Flour", "Baking", days_ago(30)),
            product(102, "Olive Oil", "Pantry", days_ago(30)),
        ],
    )?;

    let bag = variant(201, 101, "1 kg bag", "bag", 350, Some(280), days_ago(30));
    let sack = variant(202, 101, "25 kg sack", "sack", 6_500, Some(5_200), days_ago(30));
    let bottle = variant(203, 102, "500 ml", "bottle", 899, Some(700), days_ago(30));
    let can = variant(204, 102, "5 l", "can", 6_999, None, days_ago(30));

    backend.seed_rows(
        ORDERS,
        &[
            order(301, 1, OrderStatus::Confirmed, 13_000, days_ago(6)),
            order(302, 2, OrderStatus::Pending, 2_697, days_ago(2)),
            order(303, 3, OrderStatus::Delivered, 6_999, days_ago(9)),
        ],
    )?;
    backend.seed_rows(
        ORDER_ITEMS,
        &[
            line(401, 301, &sack, "Flour", 2),
            line(402, 302, &bottle, "Olive Oil", 3),
            line(403, 303, &can, "Olive Oil", 1),
        ],
    )?;
    backend.seed_rows(VARIANTS, &[bag, sack, bottle, can])?;

    backend.seed_rows(
        INVENTORY_ITEMS,
        &[
            stock_item(501, "Flour", "sack", "warehouse", 5, days_ago(30)),
            stock_item(502, "Flour", "kg", "store", 20, days_ago(30)),
            stock_item(503, "Olive Oil", "bottle", "store", 12, days_ago(30)),
        ],
    )?;
    backend.seed_rows(
        INVENTORY_MOVEMENTS,
        &[
            movement(601, 501, MovementKind::In, 10, days_ago(28)),
            movement(602, 502, MovementKind::In, 15, days_ago(28)),
            movement(603, 503, MovementKind::In, 24, days_ago(28)),
            movement(604, 503, MovementKind::Out, 3, days_ago(2)),
        ],
    )?;

    backend.add_user(DEMO_EMAIL, DEMO_PASSWORD);
    backend.set_rpc(CAN_DELETE_RECORDS, json!(true));
    backend.set_rpc(CAN_VIEW_WHOLESALE_PRICES, json!(true));
    Ok(backend)
}

/// Signs the demo user in unless a session was restored.
pub async fn ensure_signed_in(app: &App) -> Result<(), ApiError> {
    if app.session.session().is_none() {
        pages::auth::sign_in(app, DEMO_EMAIL, DEMO_PASSWORD).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockroom_backend::{Backend, Query};
    use stockroom_core::stock::stock_levels;

    #[tokio::test]
    async fn test_demo_data_is_consistent() {
        let backend = demo_backend().unwrap();

        let items: Vec<InventoryItem> =
            serde_json::from_value(json!(backend.rows(INVENTORY_ITEMS))).unwrap();
        let movements: Vec<InventoryMovement> =
            serde_json::from_value(json!(backend.rows(INVENTORY_MOVEMENTS))).unwrap();
        let levels = stock_levels(&items, &movements);
        assert_eq!(levels[2].on_hand, Quantity::from_units(21));
        assert!(levels[1].low);

        let orders: Vec<Order> = serde_json::from_value(json!(backend.rows(ORDERS))).unwrap();
        let items: Vec<OrderItem> = serde_json::from_value(json!(backend.rows(ORDER_ITEMS))).unwrap();
        for order in &orders {
            let total: i64 = items
                .iter()
                .filter(|i| i.order_id == order.id)
                .map(|i| i.line_total_cents)
                .sum();
            assert_eq!(total, order.total_cents, "order {}", order.id);
        }

        let rows = backend
            .select(&Query::table(CLIENTS).eq("id", demo_id(2)))
            .await
            .unwrap();
        assert_eq!(rows[0]["name"], "Corner Café");
    }
}
