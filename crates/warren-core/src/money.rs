//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In JavaScript/floating point:                                          │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  OUR SOLUTION: Integer satang (1/100 baht)                              │
//! │    Every price, fee and total is an i64 count of the minor unit.        │
//! │    The storefront formats for display; nothing else ever divides.       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Overflow
//! The operators (`+`, `-`, `*`, `sum()`) and `multiply_quantity` saturate
//! at the `i64` bounds, so a cart holding an absurd quantity still renders.
//! Anything that gets persisted goes through `checked_add` / `checked_mul`
//! instead and reports the overflow.
//!
//! ## Usage
//! ```rust
//! use warren_core::money::Money;
//!
//! let price = Money::from_cents(35_000); // ฿350.00
//! let line = price.multiply_quantity(2);
//! assert_eq!(line.cents(), 70_000);
//! assert_eq!(line.to_string(), "฿700.00");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub};
use ts_rs::TS;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit.
///
/// ## Where Money is Used
/// ```text
/// Rabbit.price_cents ─┬──► LineItem.unit_price ──► line total ──► subtotal
/// Product.price_cents ┘                                              │
///                                                                    ▼
///                                     shipping fee ──► Order.total_cents
/// Rabbit.loan_fee_cents ──► BreedingLoan.fee_cents
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from the smallest currency unit.
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from whole baht.
    ///
    /// ## Example
    /// ```rust
    /// use warren_core::money::Money;
    ///
    /// assert_eq!(Money::from_baht(1_500).cents(), 150_000);
    /// ```
    #[inline]
    pub const fn from_baht(baht: i64) -> Self {
        Money(baht.saturating_mul(100))
    }

    /// Returns the value in the smallest currency unit.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the whole-baht portion.
    #[inline]
    pub const fn baht(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the satang portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiplies money by a quantity, saturating on overflow.
    ///
    /// ## Example
    /// ```rust
    /// use warren_core::money::Money;
    ///
    /// let bag = Money::from_cents(45_900); // ฿459.00 hay
    /// assert_eq!(bag.multiply_quantity(3).cents(), 137_700);
    /// assert_eq!(bag.multiply_quantity(i64::MAX).cents(), i64::MAX);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0.saturating_mul(qty))
    }

    /// ## Returns
    /// `None` if the sum does not fit in an `i64`.
    #[inline]
    pub const fn checked_add(&self, other: Money) -> Option<Money> {
        match self.0.checked_add(other.0) {
            Some(v) => Some(Money(v)),
            None => None,
        }
    }

    /// ## Returns
    /// `None` if the product does not fit in an `i64`.
    #[inline]
    pub const fn checked_mul(&self, qty: i64) -> Option<Money> {
        match self.0.checked_mul(qty) {
            Some(v) => Some(Money(v)),
            None => None,
        }
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Human-readable amount, e.g. `฿1,250.00` is rendered without grouping as
/// `฿1250.00`. The storefront does localized formatting.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}฿{}.{:02}", sign, self.baht().abs(), self.cents_part())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0.saturating_add(other.0))
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_add(other.0);
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0.saturating_sub(other.0))
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0.saturating_mul(qty))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents() {
        let money = Money::from_cents(1099);
        assert_eq!(money.cents(), 1099);
        assert_eq!(money.baht(), 10);
        assert_eq!(money.cents_part(), 99);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_cents(1099).to_string(), "฿10.99");
        assert_eq!(Money::from_baht(5).to_string(), "฿5.00");
        assert_eq!(Money::from_cents(-550).to_string(), "-฿5.50");
        assert_eq!(Money::zero().to_string(), "฿0.00");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!((a * 3).cents(), 3000);

        let mut c = a;
        c += b;
        assert_eq!(c.cents(), 1500);
    }

    #[test]
    fn test_sum() {
        let total: Money = [100, 250, 650]
            .into_iter()
            .map(Money::from_cents)
            .sum();
        assert_eq!(total.cents(), 1000);

        let empty: Money = std::iter::empty().sum();
        assert!(empty.is_zero());
    }

    #[test]
    fn test_operators_saturate() {
        let big = Money::from_cents(i64::MAX - 10);
        assert_eq!((big + Money::from_cents(100)).cents(), i64::MAX);
        assert_eq!((big * 2).cents(), i64::MAX);
        assert_eq!(
            Money::from_cents(45_900)
                .multiply_quantity(1_000_000_000_000_000)
                .cents(),
            i64::MAX
        );
        assert_eq!((Money::from_cents(i64::MIN) - Money::from_cents(1)).cents(), i64::MIN);

        let total: Money = [big, big, big].into_iter().sum();
        assert_eq!(total.cents(), i64::MAX);
    }

    #[test]
    fn test_checked_arithmetic() {
        let a = Money::from_cents(1_000);
        assert_eq!(
            a.checked_add(Money::from_cents(500)),
            Some(Money::from_cents(1_500))
        );
        assert_eq!(a.checked_mul(3), Some(Money::from_cents(3_000)));

        let big = Money::from_cents(i64::MAX - 10);
        assert_eq!(big.checked_add(Money::from_cents(100)), None);
        assert_eq!(big.checked_mul(2), None);
    }
}
