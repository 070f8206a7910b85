//! # Orders
//!
//! Order types, checkout pricing and the order status state machine.
//!
//! ## Order Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   place ──► Pending ──confirm──► Confirmed ──ship──► Shipped            │
//! │                │                    │                   │               │
//! │                │ cancel             │ cancel            │ complete      │
//! │                ▼                    ▼                   ▼               │
//! │            Cancelled ◄──────────────┘               Completed           │
//! │            (restock products,                       (reserved rabbits   │
//! │             release rabbits)                         become sold)       │
//! │                                                                         │
//! │   Pickup orders may complete straight from Confirmed.                   │
//! │   Bank-transfer orders need a payment slip before Confirmed.            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::cart::{ItemKey, ItemKind};
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;

// =============================================================================
// Enums
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Shipped,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Shipped,
        OrderStatus::Completed,
        OrderStatus::Cancelled,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// Statuses whose totals count as revenue.
    pub const fn counts_as_revenue(&self) -> bool {
        matches!(
            self,
            OrderStatus::Confirmed | OrderStatus::Shipped | OrderStatus::Completed
        )
    }

    pub const fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Manual bank transfer; the customer uploads a slip image.
    BankTransfer,
    CashOnDelivery,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ShippingMethod {
    Delivery,
    Pickup,
}

// =============================================================================
// Stored Order
// =============================================================================

/// An order header row.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Order {
    pub id: i64,
    /// Human-facing reference, e.g. `WR-20240518-3F9A2C1B`.
    pub order_number: String,
    /// `None` for guest checkout.
    pub user_id: Option<i64>,
    pub customer_name: String,
    pub phone: String,
    pub address: Option<String>,
    pub shipping_method: ShippingMethod,
    pub payment_method: PaymentMethod,
    pub status: OrderStatus,
    pub subtotal_cents: i64,
    pub shipping_cents: i64,
    pub total_cents: i64,
    /// Uploaded payment slip, relative to `/uploads`.
    pub slip_path: Option<String>,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Order {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    /// Validates a status change against the lifecycle and payment rules.
    ///
    /// ## Returns
    /// * `Ok(())` - the change may be applied
    /// * `Err(CoreError::InvalidTransition)` - not reachable from here
    /// * `Err(CoreError::MissingSlip)` - bank transfer confirmed without slip
    pub fn check_transition(&self, next: OrderStatus) -> CoreResult<()> {
        if !can_transition(self.status, next, self.shipping_method) {
            return Err(CoreError::InvalidTransition {
                entity: "order",
                from: self.status.to_string(),
                action: format!("move to {}", next),
            });
        }

        if next == OrderStatus::Confirmed
            && self.payment_method == PaymentMethod::BankTransfer
            && self.slip_path.is_none()
        {
            return Err(CoreError::MissingSlip(self.order_number.clone()));
        }

        Ok(())
    }
}

/// Returns whether an order may move from `from` to `to`.
pub fn can_transition(from: OrderStatus, to: OrderStatus, shipping: ShippingMethod) -> bool {
    use OrderStatus::*;
    match (from, to) {
        (Pending, Confirmed) => true,
        (Confirmed, Shipped) => shipping == ShippingMethod::Delivery,
        (Confirmed, Completed) => shipping == ShippingMethod::Pickup,
        (Shipped, Completed) => true,
        (Pending, Cancelled) | (Confirmed, Cancelled) => true,
        _ => false,
    }
}

/// A frozen order line.
///
/// Snapshot pattern: name and price are copied from the catalog at the
/// moment the order is placed.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub item_kind: ItemKind,
    pub item_id: i64,
    pub name_snapshot: String,
    pub unit_price_cents: i64,
    pub quantity: i64,
    pub line_total_cents: i64,
}

impl OrderItem {
    #[inline]
    pub fn key(&self) -> ItemKey {
        ItemKey::new(self.item_kind, self.item_id)
    }
}

/// An order with its lines, as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

// =============================================================================
// Checkout Request
// =============================================================================

/// Customer-facing part of a checkout: who, where, how to pay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CustomerDetails {
    #[serde(default)]
    pub user_id: Option<i64>,
    pub customer_name: String,
    pub phone: String,
    #[serde(default)]
    pub address: Option<String>,
    pub shipping_method: ShippingMethod,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub notes: Option<String>,
}

/// One requested line; prices are never taken from the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderLineRequest {
    #[ts(type = "string")]
    pub item: ItemKey,
    pub quantity: i64,
}

/// Body of `POST /api/orders` (or its `order` multipart field).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderRequest {
    #[serde(flatten)]
    pub customer: CustomerDetails,
    pub items: Vec<OrderLineRequest>,
}

// =============================================================================
// Pricing
// =============================================================================

/// A line priced from the catalog, ready to be frozen into `order_items`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedLine {
    pub key: ItemKey,
    pub name: String,
    pub unit_price: Money,
    pub quantity: i64,
}

impl PricedLine {
    #[inline]
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply_quantity(self.quantity)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderTotals {
    pub subtotal_cents: i64,
    pub shipping_cents: i64,
    pub total_cents: i64,
}

/// Computes order totals.
///
/// ## Rules
/// - Subtotal is the sum of frozen line totals.
/// - Delivery charges `delivery_fee`; pickup is free.
///
/// ## Errors
/// `CoreError::Validation` if any line total or the grand total does not
/// fit in an `i64`. Nothing is stored in that case.
///
/// ## Example
/// ```rust
/// use warren_core::cart::ItemKey;
/// use warren_core::money::Money;
/// use warren_core::order::{price_order, PricedLine, ShippingMethod};
///
/// let lines = vec![PricedLine {
///     key: ItemKey::product(1),
///     name: "Hay".into(),
///     unit_price: Money::from_cents(45_900),
///     quantity: 2,
/// }];
/// let totals =
///     price_order(&lines, ShippingMethod::Delivery, Money::from_cents(5_000)).unwrap();
/// assert_eq!(totals.total_cents, 96_800);
/// ```
pub fn price_order(
    lines: &[PricedLine],
    shipping: ShippingMethod,
    delivery_fee: Money,
) -> CoreResult<OrderTotals> {
    let overflow = || {
        CoreError::Validation(ValidationError::OutOfRange {
            field: "order total".to_string(),
            min: 0,
            max: i64::MAX,
        })
    };

    let subtotal = lines.iter().try_fold(Money::zero(), |acc, line| {
        line.unit_price
            .checked_mul(line.quantity)
            .and_then(|total| acc.checked_add(total))
    });
    let subtotal = subtotal.ok_or_else(overflow)?;

    let shipping_fee = match shipping {
        ShippingMethod::Delivery => delivery_fee,
        ShippingMethod::Pickup => Money::zero(),
    };
    let total = subtotal.checked_add(shipping_fee).ok_or_else(overflow)?;

    Ok(OrderTotals {
        subtotal_cents: subtotal.cents(),
        shipping_cents: shipping_fee.cents(),
        total_cents: total.cents(),
    })
}

/// Formats an order number from the placement date and a random token.
///
/// ## Example
/// ```rust
/// use chrono::{TimeZone, Utc};
/// use warren_core::order::format_order_number;
///
/// let at = Utc.with_ymd_and_hms(2024, 5, 18, 9, 30, 0).unwrap();
/// assert_eq!(format_order_number(at, "3f9a2c1b"), "WR-20240518-3F9A2C1B");
/// ```
pub fn format_order_number(placed_at: DateTime<Utc>, token: &str) -> String {
    format!(
        "WR-{}-{}",
        placed_at.format("%Y%m%d"),
        token.to_ascii_uppercase()
    )
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn order(status: OrderStatus, shipping: ShippingMethod, payment: PaymentMethod) -> Order {
        Order {
            id: 1,
            order_number: "WR-20240518-AAAA0000".to_string(),
            user_id: None,
            customer_name: "Ploy".to_string(),
            phone: "0812345678".to_string(),
            address: Some("12 Sukhumvit Rd".to_string()),
            shipping_method: shipping,
            payment_method: payment,
            status,
            subtotal_cents: 0,
            shipping_cents: 0,
            total_cents: 0,
            slip_path: None,
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_forward_transitions() {
        use OrderStatus::*;
        let d = ShippingMethod::Delivery;
        assert!(can_transition(Pending, Confirmed, d));
        assert!(can_transition(Confirmed, Shipped, d));
        assert!(can_transition(Shipped, Completed, d));
        assert!(!can_transition(Pending, Shipped, d));
        assert!(!can_transition(Confirmed, Completed, d));
    }

    #[test]
    fn test_pickup_skips_shipping() {
        use OrderStatus::*;
        let p = ShippingMethod::Pickup;
        assert!(can_transition(Confirmed, Completed, p));
        assert!(!can_transition(Confirmed, Shipped, p));
    }

    #[test]
    fn test_cancel_only_before_shipping() {
        use OrderStatus::*;
        let d = ShippingMethod::Delivery;
        assert!(can_transition(Pending, Cancelled, d));
        assert!(can_transition(Confirmed, Cancelled, d));
        assert!(!can_transition(Shipped, Cancelled, d));
        assert!(!can_transition(Completed, Cancelled, d));
        assert!(!can_transition(Cancelled, Pending, d));
    }

    #[test]
    fn test_bank_transfer_needs_slip_to_confirm() {
        let mut o = order(
            OrderStatus::Pending,
            ShippingMethod::Delivery,
            PaymentMethod::BankTransfer,
        );
        assert!(matches!(
            o.check_transition(OrderStatus::Confirmed),
            Err(CoreError::MissingSlip(_))
        ));

        o.slip_path = Some("slips/abc.png".to_string());
        assert!(o.check_transition(OrderStatus::Confirmed).is_ok());
    }

    #[test]
    fn test_cash_on_delivery_confirms_without_slip() {
        let o = order(
            OrderStatus::Pending,
            ShippingMethod::Delivery,
            PaymentMethod::CashOnDelivery,
        );
        assert!(o.check_transition(OrderStatus::Confirmed).is_ok());
        assert!(matches!(
            o.check_transition(OrderStatus::Completed),
            Err(CoreError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_price_order_pickup_is_free() {
        let lines = vec![
            PricedLine {
                key: ItemKey::rabbit(1),
                name: "Mochi".to_string(),
                unit_price: Money::from_cents(250_000),
                quantity: 1,
            },
            PricedLine {
                key: ItemKey::product(2),
                name: "Hay".to_string(),
                unit_price: Money::from_cents(45_900),
                quantity: 3,
            },
        ];

        let pickup =
            price_order(&lines, ShippingMethod::Pickup, Money::from_cents(5_000)).unwrap();
        assert_eq!(pickup.subtotal_cents, 387_700);
        assert_eq!(pickup.shipping_cents, 0);
        assert_eq!(pickup.total_cents, 387_700);

        let delivery =
            price_order(&lines, ShippingMethod::Delivery, Money::from_cents(5_000)).unwrap();
        assert_eq!(delivery.total_cents, 392_700);
    }

    #[test]
    fn test_price_order_rejects_overflowing_totals() {
        let line = |unit: i64, quantity: i64| PricedLine {
            key: ItemKey::product(2),
            name: "Hay".to_string(),
            unit_price: Money::from_cents(unit),
            quantity,
        };
        let fee = Money::from_cents(5_000);

        let huge_line = price_order(
            &[line(100_000_000_000_000_000, 999)],
            ShippingMethod::Pickup,
            fee,
        );
        assert!(matches!(huge_line, Err(CoreError::Validation(_))));

        let huge_sum = price_order(
            &[line(i64::MAX / 2, 1), line(i64::MAX / 2, 1), line(10, 1)],
            ShippingMethod::Pickup,
            fee,
        );
        assert!(matches!(huge_sum, Err(CoreError::Validation(_))));

        let huge_fee = price_order(&[line(i64::MAX - 1, 1)], ShippingMethod::Delivery, fee);
        assert!(matches!(huge_fee, Err(CoreError::Validation(_))));

        // Largest order the API accepts still prices fine
        let lines: Vec<PricedLine> = (0..crate::MAX_ORDER_LINES)
            .map(|_| line(crate::MAX_PRICE_CENTS, crate::MAX_ORDER_LINE_QUANTITY))
            .collect();
        let max = price_order(&lines, ShippingMethod::Delivery, fee).unwrap();
        assert_eq!(max.total_cents, 100 * 999 * 1_000_000_000 + 5_000);
    }

    #[test]
    fn test_order_request_json() {
        let json = r#"{
            "customer_name": "Ploy",
            "phone": "0812345678",
            "address": "12 Sukhumvit Rd",
            "shipping_method": "delivery",
            "payment_method": "cash_on_delivery",
            "items": [{"item": "rabbit-1", "quantity": 1}]
        }"#;
        let req: OrderRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.customer.user_id, None);
        assert_eq!(req.items[0].item, ItemKey::rabbit(1));
        assert_eq!(req.customer.payment_method, PaymentMethod::CashOnDelivery);
    }

    #[test]
    fn test_revenue_statuses() {
        assert!(!OrderStatus::Pending.counts_as_revenue());
        assert!(OrderStatus::Shipped.counts_as_revenue());
        assert!(!OrderStatus::Cancelled.counts_as_revenue());
    }
}
