//! # Dashboard Summary
//!
//! The landing page: a handful of counters, the low-stock list and the most
//! recent orders, all reduced from lists the page already loaded.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::stock::StockLevel;
use crate::types::{Client, Order, OrderStatus, Product};
use crate::RECENT_ORDERS;

/// Everything the dashboard renders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DashboardSummary {
    pub client_count: usize,
    pub product_count: usize,
    pub order_count: usize,
    pub pending_orders: usize,
    /// Sum of totals of every order that is not cancelled.
    pub revenue: Money,
    pub low_stock: Vec<StockLevel>,
    /// Newest first.
    pub recent_orders: Vec<Order>,
}

impl DashboardSummary {
    pub fn compute(
        clients: &[Client],
        products: &[Product],
        orders: &[Order],
        levels: &[StockLevel],
    ) -> Self {
        let revenue = orders
            .iter()
            .filter(|o| o.status.is_billable())
            .map(Order::total)
            .sum();

        let mut recent_orders = orders.to_vec();
        recent_orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        recent_orders.truncate(RECENT_ORDERS);

        DashboardSummary {
            client_count: clients.len(),
            product_count: products.iter().filter(|p| p.is_active).count(),
            order_count: orders.len(),
            pending_orders: orders
                .iter()
                .filter(|o| o.status == OrderStatus::Pending)
                .count(),
            revenue,
            low_stock: levels.iter().filter(|l| l.low).cloned().collect(),
            recent_orders,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn order(status: OrderStatus, total_cents: i64, age_minutes: i64) -> Order {
        let at = Utc::now() - Duration::minutes(age_minutes);
        Order {
            id: crate::types::new_id(),
            client_id: None,
            status,
            notes: None,
            total_cents,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn test_summary_counts_and_revenue() {
        let orders = vec![
            order(OrderStatus::Pending, 1_000, 30),
            order(OrderStatus::Delivered, 2_500, 20),
            order(OrderStatus::Cancelled, 9_999, 10),
        ];
        let summary = DashboardSummary::compute(&[], &[], &orders, &[]);

        assert_eq!(summary.order_count, 3);
        assert_eq!(summary.pending_orders, 1);
        assert_eq!(summary.revenue.cents(), 3_500);
        assert_eq!(summary.recent_orders[0].total_cents, 9_999);
    }

    #[test]
    fn test_recent_orders_truncated() {
        let orders: Vec<Order> = (0..8)
            .map(|i| order(OrderStatus::Pending, i, i))
            .collect();
        let summary = DashboardSummary::compute(&[], &[], &orders, &[]);

        assert_eq!(summary.recent_orders.len(), RECENT_ORDERS);
        // youngest (age 0) first
        assert_eq!(summary.recent_orders[0].total_cents, 0);
        assert_eq!(summary.recent_orders[4].total_cents, 4);
    }
}
