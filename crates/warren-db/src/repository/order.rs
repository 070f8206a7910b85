//! # Order Repository
//!
//! Order placement and lifecycle.
//!
//! ## Placement Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  place(request, delivery_fee, slip)            BEGIN                    │
//! │                                                                         │
//! │  for each requested line:                                               │
//! │    rabbit-N  → must exist and be available, quantity 1                  │
//! │                UPDATE rabbits SET status = 'reserved'                   │
//! │    product-N → must exist, be active and have stock ≥ quantity          │
//! │                UPDATE products SET stock = stock - quantity             │
//! │    snapshot name + current catalog price                                │
//! │                                                                         │
//! │  price_order(lines, shipping, fee) → subtotal / shipping / total        │
//! │  INSERT orders, INSERT order_items                                      │
//! │                                                 COMMIT                  │
//! │                                                                         │
//! │  Any refusal returns early; dropping the transaction rolls back every   │
//! │  stock decrement and reservation made so far.                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use serde::Deserialize;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::product::PRODUCT_COLUMNS;
use crate::repository::rabbit::RABBIT_COLUMNS;
use warren_core::order::{format_order_number, price_order, PricedLine};
use warren_core::{
    CoreError, ItemKind, Money, Order, OrderDetail, OrderItem, OrderRequest, OrderStatus,
    PaymentMethod, Product, Rabbit, RabbitStatus, ValidationError,
};

const ORDER_COLUMNS: &str = "id, order_number, user_id, customer_name, phone, address, \
     shipping_method, payment_method, status, subtotal_cents, shipping_cents, total_cents, \
     slip_path, notes, created_at, updated_at";

const ORDER_ITEM_COLUMNS: &str =
    "id, order_id, item_kind, item_id, name_snapshot, unit_price_cents, quantity, line_total_cents";

/// Filters for order listings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub user_id: Option<i64>,
}

/// Repository for order database operations.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Places an order in one transaction.
    ///
    /// ## Arguments
    /// * `request` - already validated checkout request
    /// * `delivery_fee` - charged when shipping is `delivery`
    /// * `slip_path` - payment slip stored before placement, if any
    ///
    /// ## Returns
    /// * `Ok(OrderDetail)` - order with frozen lines
    /// * `Err(DbError::Domain(..))` - unavailable rabbit, insufficient stock,
    ///   item not for sale, totals too large to store
    /// * `Err(DbError::NotFound)` - `user_id` does not exist
    pub async fn place(
        &self,
        request: &OrderRequest,
        delivery_fee: Money,
        slip_path: Option<&str>,
    ) -> DbResult<OrderDetail> {
        let customer = &request.customer;
        debug!(
            lines = request.items.len(),
            shipping = ?customer.shipping_method,
            payment = ?customer.payment_method,
            "Placing order"
        );

        let mut tx = self.pool.begin().await?;

        if let Some(user_id) = customer.user_id {
            let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM users WHERE id = ?1")
                .bind(user_id)
                .fetch_optional(&mut *tx)
                .await?;
            if exists.is_none() {
                return Err(DbError::not_found("User", user_id));
            }
        }

        let mut priced = Vec::with_capacity(request.items.len());
        for line in &request.items {
            let priced_line = match line.item.kind {
                ItemKind::Rabbit => reserve_rabbit(&mut tx, line.item.id, line.quantity).await?,
                ItemKind::Product => take_product_stock(&mut tx, line.item.id, line.quantity).await?,
            };
            priced.push(priced_line);
        }

        let totals = price_order(&priced, customer.shipping_method, delivery_fee)?;
        let now = Utc::now();
        let token = Uuid::new_v4().simple().to_string();
        let order_number = format_order_number(now, &token[..8]);

        let sql = format!(
            "INSERT INTO orders (
                order_number, user_id, customer_name, phone, address,
                shipping_method, payment_method, status,
                subtotal_cents, shipping_cents, total_cents,
                slip_path, notes, created_at, updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?14)
             RETURNING {ORDER_COLUMNS}"
        );
        let order = sqlx::query_as::<_, Order>(&sql)
            .bind(&order_number)
            .bind(customer.user_id)
            .bind(customer.customer_name.trim())
            .bind(customer.phone.trim())
            .bind(customer.address.as_deref().map(str::trim))
            .bind(customer.shipping_method)
            .bind(customer.payment_method)
            .bind(OrderStatus::Pending)
            .bind(totals.subtotal_cents)
            .bind(totals.shipping_cents)
            .bind(totals.total_cents)
            .bind(slip_path)
            .bind(customer.notes.as_deref())
            .bind(now)
            .fetch_one(&mut *tx)
            .await?;

        let item_sql = format!(
            "INSERT INTO order_items (
                order_id, item_kind, item_id, name_snapshot,
                unit_price_cents, quantity, line_total_cents
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             RETURNING {ORDER_ITEM_COLUMNS}"
        );
        let mut items = Vec::with_capacity(priced.len());
        for line in &priced {
            let item = sqlx::query_as::<_, OrderItem>(&item_sql)
                .bind(order.id)
                .bind(line.key.kind)
                .bind(line.key.id)
                .bind(&line.name)
                .bind(line.unit_price.cents())
                .bind(line.quantity)
                .bind(line.line_total().cents())
                .fetch_one(&mut *tx)
                .await?;
            items.push(item);
        }

        tx.commit().await?;

        info!(
            order_number = %order.order_number,
            total_cents = order.total_cents,
            "Order placed"
        );

        Ok(OrderDetail { order, items })
    }

    /// Gets an order header by ID.
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Order>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1");
        let order = sqlx::query_as::<_, Order>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(order)
    }

    /// Gets an order with its lines.
    pub async fn get_detail(&self, id: i64) -> DbResult<Option<OrderDetail>> {
        let Some(order) = self.get_by_id(id).await? else {
            return Ok(None);
        };
        let items = self.items(id).await?;
        Ok(Some(OrderDetail { order, items }))
    }

    /// Lines of one order, in insertion order.
    pub async fn items(&self, order_id: i64) -> DbResult<Vec<OrderItem>> {
        let sql = format!("SELECT {ORDER_ITEM_COLUMNS} FROM order_items WHERE order_id = ?1 ORDER BY id");
        let items = sqlx::query_as::<_, OrderItem>(&sql)
            .bind(order_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(items)
    }

    /// Lists order headers, newest first.
    pub async fn list(&self, filter: &OrderFilter) -> DbResult<Vec<Order>> {
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {ORDER_COLUMNS} FROM orders WHERE 1 = 1"));
        if let Some(status) = filter.status {
            qb.push(" AND status = ").push_bind(status);
        }
        if let Some(user_id) = filter.user_id {
            qb.push(" AND user_id = ").push_bind(user_id);
        }
        qb.push(" ORDER BY id DESC");

        let orders = qb.build_query_as::<Order>().fetch_all(&self.pool).await?;
        Ok(orders)
    }

    /// Attaches (or replaces) the bank-transfer slip of a pending order.
    ///
    /// ## Returns
    /// The updated order and the previous slip path (for cleanup).
    pub async fn attach_slip(&self, id: i64, slip_path: &str) -> DbResult<(Order, Option<String>)> {
        let order = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Order", id))?;

        if order.payment_method != PaymentMethod::BankTransfer {
            return Err(CoreError::from(ValidationError::InvalidFormat {
                field: "slip".to_string(),
                reason: "order is not paid by bank transfer".to_string(),
            })
            .into());
        }
        if order.status != OrderStatus::Pending {
            return Err(CoreError::InvalidTransition {
                entity: "order",
                from: order.status.to_string(),
                action: "attach a slip to".to_string(),
            }
            .into());
        }

        debug!(id, slip = %slip_path, "Attaching payment slip");

        let sql = format!(
            "UPDATE orders SET slip_path = ?1, updated_at = ?2 WHERE id = ?3 RETURNING {ORDER_COLUMNS}"
        );
        let updated = sqlx::query_as::<_, Order>(&sql)
            .bind(slip_path)
            .bind(Utc::now())
            .bind(id)
            .fetch_one(&self.pool)
            .await?;

        Ok((updated, order.slip_path))
    }

    /// Moves an order to `next`, applying inventory side effects.
    ///
    /// ## Side Effects
    /// - `Cancelled`: product stock is restored, reserved rabbits return
    ///   to `available`
    /// - `Completed`: reserved rabbits become `sold`
    pub async fn change_status(&self, id: i64, next: OrderStatus) -> DbResult<OrderDetail> {
        let mut tx = self.pool.begin().await?;

        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1");
        let order = sqlx::query_as::<_, Order>(&sql)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| DbError::not_found("Order", id))?;

        order.check_transition(next)?;

        let item_sql = format!("SELECT {ORDER_ITEM_COLUMNS} FROM order_items WHERE order_id = ?1 ORDER BY id");
        let items = sqlx::query_as::<_, OrderItem>(&item_sql)
            .bind(id)
            .fetch_all(&mut *tx)
            .await?;

        let now = Utc::now();
        match next {
            OrderStatus::Cancelled => {
                for item in &items {
                    match item.item_kind {
                        ItemKind::Product => {
                            sqlx::query(
                                "UPDATE products SET stock = stock + ?1, updated_at = ?2 WHERE id = ?3",
                            )
                            .bind(item.quantity)
                            .bind(now)
                            .bind(item.item_id)
                            .execute(&mut *tx)
                            .await?;
                        }
                        ItemKind::Rabbit => {
                            move_reserved_rabbit(&mut tx, item.item_id, RabbitStatus::Available)
                                .await?;
                        }
                    }
                }
            }
            OrderStatus::Completed => {
                for item in items.iter().filter(|i| i.item_kind == ItemKind::Rabbit) {
                    move_reserved_rabbit(&mut tx, item.item_id, RabbitStatus::Sold).await?;
                }
            }
            _ => {}
        }

        let sql = format!(
            "UPDATE orders SET status = ?1, updated_at = ?2 WHERE id = ?3 RETURNING {ORDER_COLUMNS}"
        );
        let order = sqlx::query_as::<_, Order>(&sql)
            .bind(next)
            .bind(now)
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(order_number = %order.order_number, status = %next, "Order status changed");

        Ok(OrderDetail { order, items })
    }
}

// =============================================================================
// Transaction Helpers
// =============================================================================

async fn reserve_rabbit(
    conn: &mut SqliteConnection,
    id: i64,
    quantity: i64,
) -> DbResult<PricedLine> {
    let key = warren_core::ItemKey::rabbit(id);

    let sql = format!("SELECT {RABBIT_COLUMNS} FROM rabbits WHERE id = ?1");
    let rabbit = sqlx::query_as::<_, Rabbit>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| CoreError::ItemNotForSale(key.to_string()))?;

    if quantity != 1 {
        return Err(CoreError::InsufficientStock {
            item: key.to_string(),
            available: rabbit.stock(),
            requested: quantity,
        }
        .into());
    }

    // The guarded update decides; the row read above only names the status.
    let reserved =
        sqlx::query("UPDATE rabbits SET status = ?1, updated_at = ?2 WHERE id = ?3 AND status = ?4")
            .bind(RabbitStatus::Reserved)
            .bind(Utc::now())
            .bind(id)
            .bind(RabbitStatus::Available)
            .execute(&mut *conn)
            .await?;

    if reserved.rows_affected() != 1 {
        return Err(CoreError::RabbitUnavailable {
            rabbit_id: id,
            status: rabbit.status.to_string(),
        }
        .into());
    }

    Ok(PricedLine {
        key,
        name: rabbit.name,
        unit_price: Money::from_cents(rabbit.price_cents),
        quantity: 1,
    })
}

async fn take_product_stock(
    conn: &mut SqliteConnection,
    id: i64,
    quantity: i64,
) -> DbResult<PricedLine> {
    let key = warren_core::ItemKey::product(id);

    let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1");
    let product = sqlx::query_as::<_, Product>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .filter(|p| p.is_active)
        .ok_or_else(|| CoreError::ItemNotForSale(key.to_string()))?;

    let taken = sqlx::query(
        "UPDATE products SET stock = stock - ?1, updated_at = ?2
         WHERE id = ?3 AND is_active = 1 AND stock >= ?1",
    )
    .bind(quantity)
    .bind(Utc::now())
    .bind(id)
    .execute(&mut *conn)
    .await?;

    if taken.rows_affected() != 1 {
        return Err(CoreError::InsufficientStock {
            item: key.to_string(),
            available: product.stock,
            requested: quantity,
        }
        .into());
    }

    Ok(PricedLine {
        key,
        name: product.name,
        unit_price: Money::from_cents(product.price_cents),
        quantity,
    })
}

/// Moves a rabbit out of `reserved`. A rabbit an admin already moved
/// elsewhere is left alone.
async fn move_reserved_rabbit(
    conn: &mut SqliteConnection,
    id: i64,
    to: RabbitStatus,
) -> DbResult<()> {
    sqlx::query("UPDATE rabbits SET status = ?1, updated_at = ?2 WHERE id = ?3 AND status = ?4")
        .bind(to)
        .bind(Utc::now())
        .bind(id)
        .bind(RabbitStatus::Reserved)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
