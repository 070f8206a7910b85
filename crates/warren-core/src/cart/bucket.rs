//! # Cart Bucket
//!
//! One persisted cart: a guest's or a signed-in user's.
//!
//! ## Bucket Operations
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Storefront Action        Bucket Method           Effect                │
//! │  ─────────────────        ─────────────           ──────                │
//! │  "Add to cart" ─────────► add() ────────────────► merge line, clamp     │
//! │  [+] button ────────────► increment() ──────────► no-op at ceiling      │
//! │  [-] button ────────────► decrement() ──────────► removes at zero       │
//! │  Typed quantity ────────► set_quantity() ───────► clamp [0, ceiling]    │
//! │  Trash icon ────────────► remove()                                      │
//! │  Catalog refetch ───────► refresh_stock() ──────► new ceiling, clamp    │
//! │  Cart page mount ───────► reconcile() ──────────► re-clamp, drop zeros  │
//! │  Checkout success ──────► clear()                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every mutating method leaves the bucket with no zero-quantity line and
//! bumps `updated_at`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use super::{clamp_quantity, ItemKey, LineItem};
use crate::error::ValidationError;
use crate::money::Money;

/// Current on-disk bucket format. Buckets with any other version are
/// discarded on read.
pub const CART_SCHEMA_VERSION: u32 = 1;

// =============================================================================
// Cart Owner
// =============================================================================

/// Who a bucket belongs to.
///
/// Serialized as `"guest"` or `"user:<id>"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum CartOwner {
    Guest,
    User(i64),
}

impl CartOwner {
    /// Storage key of this owner's bucket: `cart:guest` or `cart:user:<id>`.
    pub fn storage_key(&self) -> String {
        format!("cart:{}", self)
    }
}

impl fmt::Display for CartOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CartOwner::Guest => f.write_str("guest"),
            CartOwner::User(id) => write!(f, "user:{}", id),
        }
    }
}

impl From<CartOwner> for String {
    fn from(owner: CartOwner) -> Self {
        owner.to_string()
    }
}

impl TryFrom<String> for CartOwner {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value == "guest" {
            return Ok(CartOwner::Guest);
        }
        value
            .strip_prefix("user:")
            .and_then(|id| id.parse().ok())
            .map(CartOwner::User)
            .ok_or_else(|| ValidationError::InvalidFormat {
                field: "owner".to_string(),
                reason: "expected guest or user:<id>".to_string(),
            })
    }
}

// =============================================================================
// Cart Bucket
// =============================================================================

/// A persisted cart record: `{version, owner, items[], updatedAt}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CartBucket {
    pub version: u32,
    #[ts(type = "string")]
    pub owner: CartOwner,
    pub items: Vec<LineItem>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl CartBucket {
    /// Creates an empty bucket for the given owner.
    pub fn empty(owner: CartOwner) -> Self {
        CartBucket {
            version: CART_SCHEMA_VERSION,
            owner,
            items: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    /// Creates a bucket from already-clamped lines (e.g. a merge result).
    pub fn with_items(owner: CartOwner, items: Vec<LineItem>) -> Self {
        let mut bucket = CartBucket::empty(owner);
        bucket.items = items;
        bucket.reconcile();
        bucket
    }

    #[inline]
    pub fn is_supported_version(&self) -> bool {
        self.version == CART_SCHEMA_VERSION
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, key: &ItemKey) -> Option<&LineItem> {
        self.items.iter().find(|i| &i.key == key)
    }

    /// Quantity of a line, zero if absent.
    pub fn quantity_of(&self, key: &ItemKey) -> i64 {
        self.get(key).map(|i| i.quantity).unwrap_or(0)
    }

    fn position(&self, key: &ItemKey) -> Option<usize> {
        self.items.iter().position(|i| &i.key == key)
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Adds an item, or merges it into the existing line with the same key.
    ///
    /// ## Behavior
    /// - Existing line: quantities are summed and the cached name, price,
    ///   stock and image are replaced by the incoming (fresher) copy.
    /// - The result is clamped to the incoming stock figure.
    /// - A result of zero removes (or never inserts) the line.
    ///
    /// ## Returns
    /// The line's quantity after the add.
    pub fn add(&mut self, item: LineItem) -> i64 {
        let quantity = match self.position(&item.key) {
            Some(idx) => {
                let existing = self.items[idx].quantity;
                let mut line = item;
                line.quantity =
                    clamp_quantity(existing.saturating_add(line.quantity), line.ceiling());
                let qty = line.quantity;
                if qty == 0 {
                    self.items.remove(idx);
                } else {
                    self.items[idx] = line;
                }
                qty
            }
            None => {
                let mut line = item;
                line.reclamp();
                let qty = line.quantity;
                if qty > 0 {
                    self.items.push(line);
                }
                qty
            }
        };
        self.touch();
        quantity
    }

    /// Increments a line by one unless it already sits at its ceiling.
    ///
    /// ## Returns
    /// `true` if the quantity changed.
    pub fn increment(&mut self, key: &ItemKey) -> bool {
        let Some(idx) = self.position(key) else {
            return false;
        };
        let line = &mut self.items[idx];
        let max = line.ceiling().unwrap_or(i64::MAX);
        if line.quantity >= max {
            return false;
        }
        line.quantity += 1;
        self.touch();
        true
    }

    /// Decrements a line by one; the line is removed when it reaches zero.
    ///
    /// ## Returns
    /// `true` if the bucket changed.
    pub fn decrement(&mut self, key: &ItemKey) -> bool {
        let Some(idx) = self.position(key) else {
            return false;
        };
        let line = &mut self.items[idx];
        line.quantity = line.quantity.saturating_sub(1).max(0);
        if line.quantity == 0 {
            self.items.remove(idx);
        }
        self.touch();
        true
    }

    /// Sets a line's quantity from direct entry, clamped into `[0, ceiling]`.
    ///
    /// ## Returns
    /// The stored quantity (zero means the line was removed), or `None` if
    /// the key is not in the bucket.
    pub fn set_quantity(&mut self, key: &ItemKey, quantity: i64) -> Option<i64> {
        let idx = self.position(key)?;
        let line = &mut self.items[idx];
        line.quantity = clamp_quantity(quantity, line.ceiling());
        let stored = line.quantity;
        if stored == 0 {
            self.items.remove(idx);
        }
        self.touch();
        Some(stored)
    }

    /// Removes a line outright.
    pub fn remove(&mut self, key: &ItemKey) -> bool {
        let before = self.items.len();
        self.items.retain(|i| &i.key != key);
        let removed = self.items.len() != before;
        if removed {
            self.touch();
        }
        removed
    }

    /// Records a freshly fetched stock figure for a line and re-clamps it.
    ///
    /// ## Returns
    /// `true` if the line exists (it may have been dropped by the clamp).
    pub fn refresh_stock(&mut self, key: &ItemKey, stock: Option<i64>) -> bool {
        let Some(idx) = self.position(key) else {
            return false;
        };
        let line = &mut self.items[idx];
        line.stock = stock;
        line.reclamp();
        if line.quantity == 0 {
            self.items.remove(idx);
        }
        self.touch();
        true
    }

    /// Re-clamps every line against its cached stock and drops zero lines.
    ///
    /// Run once each time the cart view mounts.
    ///
    /// ## Returns
    /// Number of lines dropped.
    pub fn reconcile(&mut self) -> usize {
        let before = self.items.len();
        for line in &mut self.items {
            line.reclamp();
        }
        self.items.retain(|i| i.quantity > 0);
        self.touch();
        before - self.items.len()
    }

    /// Empties the bucket (checkout succeeded).
    pub fn clear(&mut self) {
        self.items.clear();
        self.touch();
    }

    pub fn totals(&self) -> CartTotals {
        CartTotals::from(self)
    }
}

// =============================================================================
// Totals
// =============================================================================

/// Cart summary for the header badge and the cart page footer.
///
/// Quantity and subtotal saturate at `i64::MAX` instead of overflowing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CartTotals {
    pub line_count: usize,
    pub total_quantity: i64,
    pub subtotal_cents: i64,
}

impl From<&CartBucket> for CartTotals {
    fn from(bucket: &CartBucket) -> Self {
        let subtotal: Money = bucket.items.iter().map(LineItem::line_total).sum();
        CartTotals {
            line_count: bucket.items.len(),
            total_quantity: bucket
                .items
                .iter()
                .fold(0i64, |acc, i| acc.saturating_add(i.quantity)),
            subtotal_cents: subtotal.cents(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn hay(stock: Option<i64>, quantity: i64) -> LineItem {
        LineItem::new(ItemKey::product(3), "Timothy Hay", 45_900, stock, quantity)
    }

    #[test]
    fn test_owner_storage_keys() {
        assert_eq!(CartOwner::Guest.storage_key(), "cart:guest");
        assert_eq!(CartOwner::User(42).storage_key(), "cart:user:42");
    }

    #[test]
    fn test_owner_serde() {
        let json = serde_json::to_string(&CartOwner::User(5)).unwrap();
        assert_eq!(json, "\"user:5\"");
        let owner: CartOwner = serde_json::from_str("\"guest\"").unwrap();
        assert_eq!(owner, CartOwner::Guest);
        assert!(serde_json::from_str::<CartOwner>("\"admin\"").is_err());
    }

    #[test]
    fn test_bucket_json_shape() {
        let bucket = CartBucket::empty(CartOwner::Guest);
        let value = serde_json::to_value(&bucket).unwrap();
        assert_eq!(value["version"], CART_SCHEMA_VERSION);
        assert_eq!(value["owner"], "guest");
        assert!(value["items"].as_array().unwrap().is_empty());
        assert!(value.get("updatedAt").is_some());
    }

    #[test]
    fn test_add_merges_and_clamps() {
        let mut bucket = CartBucket::empty(CartOwner::Guest);
        assert_eq!(bucket.add(hay(Some(5), 3)), 3);
        assert_eq!(bucket.add(hay(Some(5), 4)), 5);
        assert_eq!(bucket.items.len(), 1);
        assert_eq!(bucket.quantity_of(&ItemKey::product(3)), 5);
    }

    #[test]
    fn test_add_refreshes_cached_copy() {
        let mut bucket = CartBucket::empty(CartOwner::Guest);
        bucket.add(hay(Some(5), 2));

        let mut fresher = hay(Some(1), 1);
        fresher.unit_price_cents = 39_900;
        bucket.add(fresher);

        let line = bucket.get(&ItemKey::product(3)).unwrap();
        assert_eq!(line.unit_price_cents, 39_900);
        assert_eq!(line.stock, Some(1));
        assert_eq!(line.quantity, 1);
    }

    #[test]
    fn test_add_out_of_stock_is_not_inserted() {
        let mut bucket = CartBucket::empty(CartOwner::Guest);
        assert_eq!(bucket.add(hay(Some(0), 2)), 0);
        assert!(bucket.is_empty());
    }

    #[test]
    fn test_increment_at_ceiling_is_noop() {
        let mut bucket = CartBucket::empty(CartOwner::Guest);
        bucket.add(hay(Some(2), 2));
        assert!(!bucket.increment(&ItemKey::product(3)));
        assert_eq!(bucket.quantity_of(&ItemKey::product(3)), 2);
    }

    #[test]
    fn test_increment_without_stock_is_unbounded() {
        let mut bucket = CartBucket::empty(CartOwner::Guest);
        bucket.add(hay(None, 1));
        for _ in 0..5 {
            assert!(bucket.increment(&ItemKey::product(3)));
        }
        assert_eq!(bucket.quantity_of(&ItemKey::product(3)), 6);
    }

    #[test]
    fn test_decrement_removes_at_zero() {
        let key = ItemKey::product(3);
        let mut bucket = CartBucket::empty(CartOwner::Guest);
        bucket.add(hay(Some(5), 2));

        assert!(bucket.decrement(&key));
        assert_eq!(bucket.quantity_of(&key), 1);
        assert!(bucket.decrement(&key));
        assert!(bucket.get(&key).is_none());
        assert!(!bucket.decrement(&key));
    }

    #[test]
    fn test_set_quantity_clamps() {
        let key = ItemKey::product(3);
        let mut bucket = CartBucket::empty(CartOwner::Guest);
        bucket.add(hay(Some(4), 1));

        assert_eq!(bucket.set_quantity(&key, 10), Some(4));
        assert_eq!(bucket.set_quantity(&key, 2), Some(2));
        assert_eq!(bucket.set_quantity(&key, -3), Some(0));
        assert!(bucket.get(&key).is_none());
        assert_eq!(bucket.set_quantity(&key, 1), None);
    }

    #[test]
    fn test_refresh_stock_drops_sold_out_line() {
        let key = ItemKey::rabbit(1);
        let mut bucket = CartBucket::empty(CartOwner::Guest);
        bucket.add(LineItem::new(key, "Mochi", 250_000, Some(1), 1));
        bucket.add(hay(Some(9), 4));

        assert!(bucket.refresh_stock(&ItemKey::product(3), Some(2)));
        assert_eq!(bucket.quantity_of(&ItemKey::product(3)), 2);

        assert!(bucket.refresh_stock(&key, Some(0)));
        assert!(bucket.get(&key).is_none());
        assert!(!bucket.refresh_stock(&key, Some(1)));
    }

    #[test]
    fn test_reconcile_reclamps_and_drops() {
        let mut bucket = CartBucket::empty(CartOwner::Guest);
        // Lines edited behind the bucket's back, e.g. by another tab.
        bucket.items.push(hay(Some(2), 7));
        bucket.items.push(LineItem::new(ItemKey::rabbit(4), "Pudding", 180_000, Some(0), 1));
        bucket.items.push(LineItem::new(ItemKey::product(9), "Water bottle", 12_000, None, 3));

        assert_eq!(bucket.reconcile(), 1);
        assert_eq!(bucket.quantity_of(&ItemKey::product(3)), 2);
        assert_eq!(bucket.quantity_of(&ItemKey::product(9)), 3);
        assert!(bucket.get(&ItemKey::rabbit(4)).is_none());
    }

    #[test]
    fn test_totals() {
        let mut bucket = CartBucket::empty(CartOwner::User(1));
        bucket.add(hay(None, 2));
        bucket.add(LineItem::new(ItemKey::rabbit(1), "Mochi", 250_000, Some(1), 1));

        let totals = bucket.totals();
        assert_eq!(totals.line_count, 2);
        assert_eq!(totals.total_quantity, 3);
        assert_eq!(totals.subtotal_cents, 2 * 45_900 + 250_000);

        bucket.clear();
        assert_eq!(bucket.totals().subtotal_cents, 0);
    }

    #[test]
    fn test_huge_unbounded_quantity_saturates_totals() {
        let key = ItemKey::product(3);
        let mut bucket = CartBucket::empty(CartOwner::Guest);
        bucket.add(hay(None, 1));
        bucket.add(LineItem::new(ItemKey::product(8), "Pellets", 29_000, None, 2));

        let huge = 1_000_000_000_000_000;
        assert_eq!(bucket.set_quantity(&key, huge), Some(huge));
        let totals = bucket.totals();
        assert_eq!(totals.subtotal_cents, i64::MAX);
        assert_eq!(totals.total_quantity, 1_000_000_000_000_002);

        bucket.set_quantity(&key, i64::MAX);
        assert_eq!(bucket.totals().total_quantity, i64::MAX);
    }

    #[test]
    fn test_add_and_increment_saturate_at_max_quantity() {
        let key = ItemKey::product(3);
        let mut bucket = CartBucket::empty(CartOwner::Guest);
        bucket.add(hay(None, i64::MAX - 1));

        assert_eq!(bucket.add(hay(None, 5)), i64::MAX);
        assert!(!bucket.increment(&key));
        assert_eq!(bucket.quantity_of(&key), i64::MAX);

        assert!(bucket.decrement(&key));
        assert_eq!(bucket.quantity_of(&key), i64::MAX - 1);
    }
}
