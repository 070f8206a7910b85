//! # Cart Domain
//!
//! Pure cart logic shared by the storefront's local cart layer
//! (`warren-cart`) and the order API.
//!
//! ## Cart Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Cart Lifecycle                                  │
//! │                                                                         │
//! │  First visit           Browse & add             Login                   │
//! │  ┌──────────┐  add    ┌──────────────┐  merge  ┌──────────────────┐    │
//! │  │cart:guest│ ──────► │ guest bucket │ ──────► │ cart:user:<id>   │    │
//! │  │ (empty)  │         │ clamped qty  │         │ guest deleted    │    │
//! │  └──────────┘         └──────────────┘         └────────┬─────────┘    │
//! │                                                         │ checkout ok  │
//! │                                                         ▼              │
//! │                                                  ┌──────────────┐      │
//! │                                                  │ cleared      │      │
//! │                                                  └──────────────┘      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quantity Rules
//! - Quantity is never negative.
//! - When a stock figure is cached on the line, quantity never exceeds it.
//! - A line whose quantity reaches zero is removed, never kept.
//! - No stock figure means no ceiling.

mod bucket;
mod merge;

pub use bucket::{CartBucket, CartOwner, CartTotals, CART_SCHEMA_VERSION};
pub use merge::merge_items;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;

// =============================================================================
// Item Key
// =============================================================================

/// The two kinds of thing the shop sells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Rabbit,
    Product,
}

impl ItemKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Rabbit => "rabbit",
            ItemKind::Product => "product",
        }
    }
}

/// Composite key of a catalog item: `(kind, id)`.
///
/// Serialized as a single string such as `"rabbit-1"` or `"product-7"`, the
/// same form the storefront uses for its line keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct ItemKey {
    pub kind: ItemKind,
    pub id: i64,
}

impl ItemKey {
    pub const fn new(kind: ItemKind, id: i64) -> Self {
        ItemKey { kind, id }
    }

    pub const fn rabbit(id: i64) -> Self {
        ItemKey::new(ItemKind::Rabbit, id)
    }

    pub const fn product(id: i64) -> Self {
        ItemKey::new(ItemKind::Product, id)
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.kind.as_str(), self.id)
    }
}

impl FromStr for ItemKey {
    type Err = ValidationError;

    /// Parses `"rabbit-1"` / `"product-7"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| ValidationError::InvalidFormat {
            field: "item key".to_string(),
            reason: reason.to_string(),
        };

        let (kind, id) = s
            .trim()
            .split_once('-')
            .ok_or_else(|| invalid("expected <kind>-<id>"))?;

        let kind = match kind {
            "rabbit" => ItemKind::Rabbit,
            "product" => ItemKind::Product,
            _ => return Err(invalid("kind must be rabbit or product")),
        };

        let id: i64 = id.parse().map_err(|_| invalid("id must be a number"))?;
        if id <= 0 {
            return Err(invalid("id must be positive"));
        }

        Ok(ItemKey { kind, id })
    }
}

impl From<ItemKey> for String {
    fn from(key: ItemKey) -> Self {
        key.to_string()
    }
}

impl TryFrom<String> for ItemKey {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

// =============================================================================
// Line Item
// =============================================================================

/// One line of a cart bucket.
///
/// `name`, `unit_price_cents`, `stock` and `image` are a cached copy taken
/// when the item was added (or last refreshed). The server re-reads the
/// catalog at checkout; the cache only drives display and clamping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    #[ts(type = "string")]
    pub key: ItemKey,
    pub name: String,
    pub unit_price_cents: i64,
    /// Last known stock; `None` means unbounded.
    #[serde(default)]
    pub stock: Option<i64>,
    #[serde(default)]
    pub image: Option<String>,
    pub quantity: i64,
}

impl LineItem {
    pub fn new(
        key: ItemKey,
        name: impl Into<String>,
        unit_price_cents: i64,
        stock: Option<i64>,
        quantity: i64,
    ) -> Self {
        LineItem {
            key,
            name: name.into(),
            unit_price_cents,
            stock,
            image: None,
            quantity,
        }
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    /// The quantity ceiling, if a stock figure is known.
    #[inline]
    pub fn ceiling(&self) -> Option<i64> {
        self.stock.map(|s| s.max(0))
    }

    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.unit_price_cents).multiply_quantity(self.quantity)
    }

    /// Re-clamps this line against its own cached stock.
    pub(crate) fn reclamp(&mut self) {
        self.quantity = clamp_quantity(self.quantity, self.ceiling());
    }
}

/// Clamps a quantity into `[0, ceiling]`; no ceiling means unbounded above.
///
/// ## Example
/// ```rust
/// use warren_core::cart::clamp_quantity;
///
/// assert_eq!(clamp_quantity(5, Some(3)), 3);
/// assert_eq!(clamp_quantity(-2, Some(3)), 0);
/// assert_eq!(clamp_quantity(42, None), 42);
/// ```
pub fn clamp_quantity(quantity: i64, ceiling: Option<i64>) -> i64 {
    let floored = quantity.max(0);
    match ceiling {
        Some(max) => floored.min(max.max(0)),
        None => floored,
    }
}

/// The lower of two optional ceilings; `None` only when both are unknown.
pub(crate) fn min_ceiling(a: Option<i64>, b: Option<i64>) -> Option<i64> {
    match (a, b) {
        (Some(x), Some(y)) => Some(x.min(y)),
        (Some(x), None) | (None, Some(x)) => Some(x),
        (None, None) => None,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_key_display_and_parse() {
        assert_eq!(ItemKey::rabbit(1).to_string(), "rabbit-1");
        assert_eq!(ItemKey::product(7).to_string(), "product-7");

        assert_eq!("rabbit-1".parse::<ItemKey>().unwrap(), ItemKey::rabbit(1));
        assert_eq!("product-7".parse::<ItemKey>().unwrap(), ItemKey::product(7));
    }

    #[test]
    fn test_item_key_rejects_garbage() {
        assert!("rabbit".parse::<ItemKey>().is_err());
        assert!("hamster-1".parse::<ItemKey>().is_err());
        assert!("rabbit-abc".parse::<ItemKey>().is_err());
        assert!("rabbit-0".parse::<ItemKey>().is_err());
        assert!("rabbit--3".parse::<ItemKey>().is_err());
    }

    #[test]
    fn test_item_key_serde_as_string() {
        let json = serde_json::to_string(&ItemKey::product(7)).unwrap();
        assert_eq!(json, "\"product-7\"");

        let key: ItemKey = serde_json::from_str("\"rabbit-12\"").unwrap();
        assert_eq!(key, ItemKey::rabbit(12));

        assert!(serde_json::from_str::<ItemKey>("\"bogus\"").is_err());
    }

    #[test]
    fn test_line_item_json_shape() {
        let item = LineItem::new(ItemKey::product(3), "Hay", 45_900, Some(10), 2);
        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value["key"], "product-3");
        assert_eq!(value["unitPriceCents"], 45_900);
        assert_eq!(value["stock"], 10);
        assert_eq!(value["quantity"], 2);
    }

    #[test]
    fn test_clamp_quantity() {
        assert_eq!(clamp_quantity(3, Some(5)), 3);
        assert_eq!(clamp_quantity(9, Some(5)), 5);
        assert_eq!(clamp_quantity(-1, None), 0);
        assert_eq!(clamp_quantity(7, Some(-4)), 0);
        assert_eq!(clamp_quantity(1_000_000, None), 1_000_000);
    }

    #[test]
    fn test_min_ceiling() {
        assert_eq!(min_ceiling(Some(3), Some(5)), Some(3));
        assert_eq!(min_ceiling(None, Some(5)), Some(5));
        assert_eq!(min_ceiling(Some(2), None), Some(2));
        assert_eq!(min_ceiling(None, None), None);
    }
}
