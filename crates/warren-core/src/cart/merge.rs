//! # Merge-on-Login
//!
//! Combines the guest bucket with the user's saved bucket when a shopper
//! signs in.
//!
//! ```text
//!   guest: [rabbit-1 ×2 (stock 3), product-4 ×1]
//!   user:  [rabbit-1 ×2 (stock 3), product-9 ×5]
//!                         │
//!                         ▼  merge_items(guest, user)
//!   merged: [rabbit-1 ×3, product-9 ×5, product-4 ×1]
//!            └ min(3, 2+2)  └ user order first, then guest-only lines
//! ```

use std::collections::HashMap;

use tracing::debug;

use super::{clamp_quantity, min_ceiling, ItemKey, LineItem};

/// Merges guest and user lines into one collection.
///
/// ## Rules
/// - Lines sharing a key: quantities are summed, then clamped to the lower
///   of the stock figures known on either copy. Unbounded if neither copy
///   has one. The guest copy's cached name, price and image win since it
///   was added in the current session.
/// - Lines unique to one side pass through, clamped to their own stock.
/// - Zero-quantity results are dropped.
/// - Order: the user's lines keep their order, guest-only lines follow in
///   guest order.
///
/// Duplicate keys within one side are folded together first.
pub fn merge_items(guest: &[LineItem], user: &[LineItem]) -> Vec<LineItem> {
    let guest = fold_duplicates(guest);
    let user = fold_duplicates(user);

    let guest_by_key: HashMap<ItemKey, &LineItem> = guest.iter().map(|i| (i.key, i)).collect();

    let mut merged: Vec<LineItem> = Vec::with_capacity(guest.len() + user.len());

    for user_line in &user {
        let line = match guest_by_key.get(&user_line.key) {
            Some(guest_line) => {
                let ceiling = min_ceiling(guest_line.ceiling(), user_line.ceiling());
                let quantity = clamp_quantity(
                    guest_line.quantity.saturating_add(user_line.quantity),
                    ceiling,
                );
                debug!(
                    key = %user_line.key,
                    guest_qty = guest_line.quantity,
                    user_qty = user_line.quantity,
                    merged_qty = quantity,
                    "Merging shared cart line"
                );
                LineItem {
                    key: user_line.key,
                    name: guest_line.name.clone(),
                    unit_price_cents: guest_line.unit_price_cents,
                    stock: ceiling,
                    image: guest_line.image.clone().or_else(|| user_line.image.clone()),
                    quantity,
                }
            }
            None => {
                let mut line = user_line.clone();
                line.reclamp();
                line
            }
        };
        merged.push(line);
    }

    for guest_line in &guest {
        if user.iter().any(|u| u.key == guest_line.key) {
            continue;
        }
        let mut line = guest_line.clone();
        line.reclamp();
        merged.push(line);
    }

    merged.retain(|i| i.quantity > 0);
    merged
}

/// Folds repeated keys on one side into a single line, keeping the first
/// line's position and the last line's cached copy.
fn fold_duplicates(lines: &[LineItem]) -> Vec<LineItem> {
    let mut out: Vec<LineItem> = Vec::with_capacity(lines.len());
    for line in lines {
        match out.iter_mut().find(|o| o.key == line.key) {
            Some(existing) => {
                let quantity = existing.quantity.max(0).saturating_add(line.quantity.max(0));
                let ceiling = min_ceiling(existing.ceiling(), line.ceiling());
                *existing = line.clone();
                existing.stock = ceiling;
                existing.quantity = quantity;
            }
            None => out.push(line.clone()),
        }
    }
    out
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn line(key: ItemKey, stock: Option<i64>, quantity: i64) -> LineItem {
        LineItem::new(key, key.to_string(), 10_000, stock, quantity)
    }

    #[test]
    fn test_shared_key_is_summed_and_clamped() {
        let guest = vec![line(ItemKey::rabbit(1), Some(3), 2)];
        let user = vec![line(ItemKey::rabbit(1), Some(3), 2)];

        let merged = merge_items(&guest, &user);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].key, ItemKey::rabbit(1));
        assert_eq!(merged[0].quantity, 3);
    }

    #[test]
    fn test_shared_key_uses_lower_stock() {
        let guest = vec![line(ItemKey::product(2), Some(10), 4)];
        let user = vec![line(ItemKey::product(2), Some(5), 4)];

        let merged = merge_items(&guest, &user);
        assert_eq!(merged[0].quantity, 5);
        assert_eq!(merged[0].stock, Some(5));
    }

    #[test]
    fn test_stock_known_on_one_side_only() {
        let guest = vec![line(ItemKey::product(2), None, 4)];
        let user = vec![line(ItemKey::product(2), Some(6), 4)];

        let merged = merge_items(&guest, &user);
        assert_eq!(merged[0].quantity, 6);
    }

    #[test]
    fn test_no_stock_anywhere_is_unbounded() {
        let guest = vec![line(ItemKey::product(2), None, 40)];
        let user = vec![line(ItemKey::product(2), None, 60)];

        let merged = merge_items(&guest, &user);
        assert_eq!(merged[0].quantity, 100);
        assert_eq!(merged[0].stock, None);
    }

    #[test]
    fn test_unique_lines_pass_through_clamped() {
        let guest = vec![line(ItemKey::product(4), Some(1), 3)];
        let user = vec![line(ItemKey::product(9), None, 5)];

        let merged = merge_items(&guest, &user);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].key, ItemKey::product(9));
        assert_eq!(merged[0].quantity, 5);
        assert_eq!(merged[1].key, ItemKey::product(4));
        assert_eq!(merged[1].quantity, 1);
    }

    #[test]
    fn test_order_is_user_first_then_guest_only() {
        let guest = vec![
            line(ItemKey::product(4), None, 1),
            line(ItemKey::rabbit(1), Some(1), 1),
        ];
        let user = vec![
            line(ItemKey::rabbit(1), Some(1), 1),
            line(ItemKey::product(9), None, 5),
        ];

        let keys: Vec<String> = merge_items(&guest, &user)
            .iter()
            .map(|i| i.key.to_string())
            .collect();
        assert_eq!(keys, vec!["rabbit-1", "product-9", "product-4"]);
    }

    #[test]
    fn test_guest_copy_metadata_wins() {
        let mut guest_line = line(ItemKey::product(2), None, 1);
        guest_line.unit_price_cents = 8_000;
        guest_line.name = "Pellets (new bag)".to_string();
        let user = vec![line(ItemKey::product(2), None, 1)];

        let merged = merge_items(&[guest_line], &user);
        assert_eq!(merged[0].unit_price_cents, 8_000);
        assert_eq!(merged[0].name, "Pellets (new bag)");
    }

    #[test]
    fn test_sold_out_lines_are_dropped() {
        let guest = vec![line(ItemKey::rabbit(3), Some(0), 1)];
        let user = vec![line(ItemKey::product(5), Some(0), 2)];

        assert!(merge_items(&guest, &user).is_empty());
    }

    #[test]
    fn test_empty_sides() {
        let user = vec![line(ItemKey::product(5), None, 2)];
        assert_eq!(merge_items(&[], &user), user);
        assert_eq!(merge_items(&user, &[]), user);
        assert!(merge_items(&[], &[]).is_empty());
    }

    #[test]
    fn test_duplicates_within_one_side_are_folded() {
        let guest = vec![
            line(ItemKey::product(2), Some(10), 2),
            line(ItemKey::product(2), Some(10), 3),
        ];

        let merged = merge_items(&guest, &[]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].quantity, 5);
    }

    #[test]
    fn test_merging_result_into_empty_guest_is_stable() {
        let guest = vec![line(ItemKey::rabbit(1), Some(3), 2)];
        let user = vec![line(ItemKey::rabbit(1), Some(3), 2)];

        let once = merge_items(&guest, &user);
        // After login the guest bucket is gone; a repeat merge sees nothing.
        let twice = merge_items(&[], &once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_huge_quantities_saturate() {
        let guest = vec![line(ItemKey::product(2), None, i64::MAX)];
        let user = vec![line(ItemKey::product(2), None, 1)];

        let merged = merge_items(&guest, &user);
        assert_eq!(merged[0].quantity, i64::MAX);

        let folded = merge_items(
            &[
                line(ItemKey::product(2), Some(7), i64::MAX),
                line(ItemKey::product(2), Some(7), i64::MAX),
            ],
            &[],
        );
        assert_eq!(folded[0].quantity, 7);
    }
}
