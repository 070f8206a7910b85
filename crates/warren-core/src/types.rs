//! # Domain Types
//!
//! Catalog and customer types used throughout Warren.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │     Rabbit      │   │     Product     │   │      User       │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id             │   │  id             │   │  id             │       │
//! │  │  breed, gender  │   │  category       │   │  email (unique) │       │
//! │  │  price_cents    │   │  price_cents    │   │  role           │       │
//! │  │  status         │   │  stock          │   │                 │       │
//! │  │  is_breeder     │   │  is_active      │   │                 │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  RabbitStatus   │   │ ProductCategory │   │    UserRole     │       │
//! │  │  Available      │   │  Food           │   │  Customer       │       │
//! │  │  Reserved       │   │  Equipment      │   │  Admin          │       │
//! │  │  Sold, OnLoan   │   │                 │   │                 │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Rabbits vs Products
//! A rabbit is a single animal: it is either available or it is not, so its
//! effective stock is 1 or 0. Products carry a real stock counter.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// User
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    #[default]
    Customer,
    Admin,
}

/// A storefront customer or shop administrator.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub role: UserRole,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// Payload for registering a customer record.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

// =============================================================================
// Rabbit
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
}

/// Where a rabbit is in its life at the shop.
///
/// ```text
///              order placed             order completed
///  Available ──────────────► Reserved ─────────────────► Sold
///     ▲  │                      │
///     │  │ loan started         │ order cancelled
///     │  ▼                      │
///   OnLoan ◄── (loan returned ──┘ back to Available)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum RabbitStatus {
    #[default]
    Available,
    Reserved,
    Sold,
    OnLoan,
}

impl RabbitStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            RabbitStatus::Available => "available",
            RabbitStatus::Reserved => "reserved",
            RabbitStatus::Sold => "sold",
            RabbitStatus::OnLoan => "on_loan",
        }
    }
}

impl fmt::Display for RabbitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A rabbit listed in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Rabbit {
    pub id: i64,
    pub name: String,
    pub breed: String,
    pub gender: Gender,
    #[ts(as = "Option<String>")]
    pub birth_date: Option<NaiveDate>,
    /// Sale price in the smallest currency unit.
    pub price_cents: i64,
    pub status: RabbitStatus,
    /// Breeders can be borrowed through a breeding loan.
    pub is_breeder: bool,
    /// Fee charged per breeding loan; only meaningful for breeders.
    pub loan_fee_cents: Option<i64>,
    pub description: Option<String>,
    /// Path relative to `/uploads`, e.g. `rabbits/2c4e….webp`.
    pub image_path: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Rabbit {
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    #[inline]
    pub fn is_available(&self) -> bool {
        self.status == RabbitStatus::Available
    }

    /// Effective stock figure for the cart: one animal, or none.
    #[inline]
    pub fn stock(&self) -> i64 {
        if self.is_available() {
            1
        } else {
            0
        }
    }
}

/// Payload for creating or fully replacing a rabbit listing.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RabbitInput {
    pub name: String,
    pub breed: String,
    pub gender: Gender,
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub birth_date: Option<NaiveDate>,
    pub price_cents: i64,
    #[serde(default)]
    pub is_breeder: bool,
    #[serde(default)]
    pub loan_fee_cents: Option<i64>,
    #[serde(default)]
    pub description: Option<String>,
}

// =============================================================================
// Product
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ProductCategory {
    Food,
    Equipment,
}

/// Food or equipment sold by count.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub category: ProductCategory,
    pub price_cents: i64,
    pub stock: i64,
    pub description: Option<String>,
    pub image_path: Option<String>,
    /// Soft delete flag; inactive products are hidden from the catalog.
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }
}

/// Payload for creating or fully replacing a product.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductInput {
    pub name: String,
    pub category: ProductCategory,
    pub price_cents: i64,
    pub stock: i64,
    #[serde(default)]
    pub description: Option<String>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn rabbit(status: RabbitStatus) -> Rabbit {
        Rabbit {
            id: 1,
            name: "Mochi".to_string(),
            breed: "Holland Lop".to_string(),
            gender: Gender::Female,
            birth_date: None,
            price_cents: 250_000,
            status,
            is_breeder: false,
            loan_fee_cents: None,
            description: None,
            image_path: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_rabbit_stock_follows_status() {
        assert_eq!(rabbit(RabbitStatus::Available).stock(), 1);
        assert_eq!(rabbit(RabbitStatus::Reserved).stock(), 0);
        assert_eq!(rabbit(RabbitStatus::OnLoan).stock(), 0);
    }

    #[test]
    fn test_rabbit_status_serializes_snake_case() {
        let json = serde_json::to_string(&RabbitStatus::OnLoan).unwrap();
        assert_eq!(json, "\"on_loan\"");
        assert_eq!(RabbitStatus::OnLoan.to_string(), "on_loan");
    }

    #[test]
    fn test_default_role_is_customer() {
        assert_eq!(UserRole::default(), UserRole::Customer);
    }
}
