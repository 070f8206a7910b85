//! # Stats Repository
//!
//! Aggregates for the admin dashboard. Every figure is computed on request;
//! nothing is cached or materialized.
//!
//! Revenue counts orders that are `confirmed`, `shipped` or `completed`.
//! Pending orders are unpaid and cancelled ones never happened.

use serde::Serialize;
use sqlx::SqlitePool;
use tracing::debug;
use ts_rs::TS;

use crate::error::DbResult;
use crate::repository::product::PRODUCT_COLUMNS;
use warren_core::{ItemKind, OrderStatus, Product};

/// Statuses counted as revenue, as an SQL list.
const REVENUE_STATUSES: &str = "('confirmed', 'shipped', 'completed')";

/// How many best sellers the dashboard shows.
const TOP_SELLER_LIMIT: i64 = 5;

/// How many months of revenue history the dashboard shows.
const MONTHS_OF_HISTORY: i64 = 12;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS, sqlx::FromRow)]
#[ts(export)]
pub struct StatusCount {
    pub status: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS, sqlx::FromRow)]
#[ts(export)]
pub struct TopSeller {
    pub item_kind: ItemKind,
    pub item_id: i64,
    pub name: String,
    pub quantity: i64,
    pub revenue_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS, sqlx::FromRow)]
#[ts(export)]
pub struct MonthlyRevenue {
    /// `YYYY-MM`
    pub month: String,
    pub order_count: i64,
    pub revenue_cents: i64,
}

/// Payload of `GET /api/admin/stats`.
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct DashboardStats {
    pub revenue_cents: i64,
    pub order_count: i64,
    /// Every order status, zero counts included.
    pub orders_by_status: Vec<StatusCount>,
    pub rabbits_by_status: Vec<StatusCount>,
    pub low_stock: Vec<Product>,
    pub active_loans: i64,
    pub pending_loan_requests: i64,
    pub top_sellers: Vec<TopSeller>,
    /// Oldest month first.
    pub monthly_revenue: Vec<MonthlyRevenue>,
}

/// Repository for dashboard aggregates.
#[derive(Debug, Clone)]
pub struct StatsRepository {
    pool: SqlitePool,
}

impl StatsRepository {
    pub fn new(pool: SqlitePool) -> Self {
        StatsRepository { pool }
    }

    /// Builds the full dashboard.
    ///
    /// ## Arguments
    /// * `low_stock_threshold` - active products with `stock <= threshold`
    ///   are listed as low stock
    pub async fn dashboard(&self, low_stock_threshold: i64) -> DbResult<DashboardStats> {
        debug!(low_stock_threshold, "Computing dashboard stats");

        let revenue_cents = self.revenue_cents().await?;
        let orders_by_status = self.orders_by_status().await?;
        let order_count = orders_by_status.iter().map(|c| c.count).sum();

        let rabbits_by_status = sqlx::query_as::<_, StatusCount>(
            "SELECT status, COUNT(*) AS count FROM rabbits GROUP BY status ORDER BY status",
        )
        .fetch_all(&self.pool)
        .await?;

        let low_stock = self.low_stock(low_stock_threshold).await?;

        let active_loans: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM breeding_loans WHERE status = 'active'")
                .fetch_one(&self.pool)
                .await?;
        let pending_loan_requests: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM breeding_loans WHERE status = 'requested'")
                .fetch_one(&self.pool)
                .await?;

        let top_sellers = self.top_sellers(TOP_SELLER_LIMIT).await?;
        let monthly_revenue = self.monthly_revenue(MONTHS_OF_HISTORY).await?;

        Ok(DashboardStats {
            revenue_cents,
            order_count,
            orders_by_status,
            rabbits_by_status,
            low_stock,
            active_loans,
            pending_loan_requests,
            top_sellers,
            monthly_revenue,
        })
    }

    pub async fn revenue_cents(&self) -> DbResult<i64> {
        let sql = format!(
            "SELECT COALESCE(SUM(total_cents), 0) FROM orders WHERE status IN {REVENUE_STATUSES}"
        );
        let total: i64 = sqlx::query_scalar(&sql).fetch_one(&self.pool).await?;
        Ok(total)
    }

    /// Order counts for every status, in lifecycle order.
    pub async fn orders_by_status(&self) -> DbResult<Vec<StatusCount>> {
        let rows = sqlx::query_as::<_, StatusCount>(
            "SELECT status, COUNT(*) AS count FROM orders GROUP BY status",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(OrderStatus::ALL
            .iter()
            .map(|status| StatusCount {
                status: status.as_str().to_string(),
                count: rows
                    .iter()
                    .find(|r| r.status == status.as_str())
                    .map_or(0, |r| r.count),
            })
            .collect())
    }

    /// Active products at or below the threshold, emptiest first.
    pub async fn low_stock(&self, threshold: i64) -> DbResult<Vec<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products
             WHERE is_active = 1 AND stock <= ?1
             ORDER BY stock, name COLLATE NOCASE"
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(threshold)
            .fetch_all(&self.pool)
            .await?;
        Ok(products)
    }

    /// Best-selling items by quantity across revenue orders.
    pub async fn top_sellers(&self, limit: i64) -> DbResult<Vec<TopSeller>> {
        let sql = format!(
            "SELECT oi.item_kind AS item_kind, oi.item_id AS item_id,
                    MAX(oi.name_snapshot) AS name,
                    SUM(oi.quantity) AS quantity,
                    SUM(oi.line_total_cents) AS revenue_cents
             FROM order_items oi
             JOIN orders o ON o.id = oi.order_id
             WHERE o.status IN {REVENUE_STATUSES}
             GROUP BY oi.item_kind, oi.item_id
             ORDER BY quantity DESC, revenue_cents DESC
             LIMIT ?1"
        );
        let sellers = sqlx::query_as::<_, TopSeller>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(sellers)
    }

    /// Revenue per calendar month (UTC) for the most recent `months` months
    /// that had any revenue.
    pub async fn monthly_revenue(&self, months: i64) -> DbResult<Vec<MonthlyRevenue>> {
        let sql = format!(
            "SELECT month, order_count, revenue_cents FROM (
                SELECT substr(created_at, 1, 7) AS month,
                       COUNT(*) AS order_count,
                       SUM(total_cents) AS revenue_cents
                FROM orders
                WHERE status IN {REVENUE_STATUSES}
                GROUP BY month
                ORDER BY month DESC
                LIMIT ?1
             ) ORDER BY month"
        );
        let rows = sqlx::query_as::<_, MonthlyRevenue>(&sql)
            .bind(months)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{order_request, product_input, rabbit_input, test_db};
    use chrono::Utc;
    use warren_core::{ItemKey, Money, PaymentMethod, ShippingMethod};

    #[tokio::test]
    async fn test_empty_dashboard() {
        let db = test_db().await;
        let stats = db.stats().dashboard(3).await.unwrap();

        assert_eq!(stats.revenue_cents, 0);
        assert_eq!(stats.order_count, 0);
        assert_eq!(stats.orders_by_status.len(), OrderStatus::ALL.len());
        assert!(stats.orders_by_status.iter().all(|c| c.count == 0));
        assert!(stats.top_sellers.is_empty());
        assert!(stats.monthly_revenue.is_empty());
    }

    #[tokio::test]
    async fn test_revenue_ignores_pending_and_cancelled() {
        let db = test_db().await;
        let hay = db.products().insert(&product_input("Hay", 20)).await.unwrap();
        let pellets = db.products().insert(&product_input("Pellets", 2)).await.unwrap();
        let rabbit = db.rabbits().insert(&rabbit_input("Mochi", false)).await.unwrap();

        let cod = |lines: &[(ItemKey, i64)]| {
            let mut req = order_request(ShippingMethod::Pickup, lines);
            req.customer.payment_method = PaymentMethod::CashOnDelivery;
            req
        };

        let confirmed = db
            .orders()
            .place(&cod(&[(ItemKey::product(hay.id), 3)]), Money::zero(), None)
            .await
            .unwrap();
        db.orders()
            .change_status(confirmed.order.id, OrderStatus::Confirmed)
            .await
            .unwrap();

        let completed = db
            .orders()
            .place(
                &cod(&[(ItemKey::product(hay.id), 1), (ItemKey::rabbit(rabbit.id), 1)]),
                Money::zero(),
                None,
            )
            .await
            .unwrap();
        db.orders()
            .change_status(completed.order.id, OrderStatus::Confirmed)
            .await
            .unwrap();
        db.orders()
            .change_status(completed.order.id, OrderStatus::Completed)
            .await
            .unwrap();

        // Pending: not revenue.
        db.orders()
            .place(&cod(&[(ItemKey::product(hay.id), 5)]), Money::zero(), None)
            .await
            .unwrap();

        // Cancelled: not revenue, stock restored.
        let cancelled = db
            .orders()
            .place(&cod(&[(ItemKey::product(pellets.id), 1)]), Money::zero(), None)
            .await
            .unwrap();
        db.orders()
            .change_status(cancelled.order.id, OrderStatus::Cancelled)
            .await
            .unwrap();

        let stats = db.stats().dashboard(2).await.unwrap();

        let expected = confirmed.order.total_cents + completed.order.total_cents;
        assert_eq!(stats.revenue_cents, expected);
        assert_eq!(stats.order_count, 4);

        let count_of = |s: &str| {
            stats
                .orders_by_status
                .iter()
                .find(|c| c.status == s)
                .map(|c| c.count)
        };
        assert_eq!(count_of("pending"), Some(1));
        assert_eq!(count_of("completed"), Some(1));
        assert_eq!(count_of("cancelled"), Some(1));

        // Hay sold 3 + 1 in revenue orders.
        assert_eq!(stats.top_sellers[0].item_id, hay.id);
        assert_eq!(stats.top_sellers[0].quantity, 4);
        assert_eq!(stats.top_sellers[0].item_kind, ItemKind::Product);
        assert_eq!(stats.top_sellers.len(), 2);

        // Pellets back at 2 after the cancel.
        assert_eq!(stats.low_stock.len(), 1);
        assert_eq!(stats.low_stock[0].id, pellets.id);

        let this_month = Utc::now().format("%Y-%m").to_string();
        assert_eq!(stats.monthly_revenue.len(), 1);
        assert_eq!(stats.monthly_revenue[0].month, this_month);
        assert_eq!(stats.monthly_revenue[0].order_count, 2);
        assert_eq!(stats.monthly_revenue[0].revenue_cents, expected);

        let sold = stats
            .rabbits_by_status
            .iter()
            .find(|c| c.status == "sold")
            .map(|c| c.count);
        assert_eq!(sold, Some(1));
    }
}
