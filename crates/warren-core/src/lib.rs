//! # warren-core: Pure Business Logic for Warren
//!
//! This crate is the **heart** of the Warren pet shop. It contains all
//! business rules as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Warren Architecture                              │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  Storefront SPA (React)                         │   │
//! │  │    Catalog ──► Cart ──► Checkout ──► Orders / Loans            │   │
//! │  └──────────────┬──────────────────────────────┬───────────────────┘   │
//! │                 │ warren-cart (local buckets)  │ JSON over HTTP        │
//! │  ┌──────────────▼──────────────────────────────▼───────────────────┐   │
//! │  │               ★ warren-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │   cart    │  │ validation│  │   │
//! │  │   │  Rabbit   │  │   Money   │  │  merge    │  │   rules   │  │   │
//! │  │   │  Product  │  │           │  │  clamp    │  │           │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │   ┌───────────┐  ┌───────────┐                                 │   │
//! │  │   │   order   │  │   loan    │                                 │   │
//! │  │   │  states   │  │  states   │                                 │   │
//! │  │   └───────────┘  └───────────┘                                 │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    warren-db (Database Layer)                   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Catalog and customer types (Rabbit, Product, User)
//! - [`order`] - Orders, checkout pricing, order status transitions
//! - [`loan`] - Breeding loans and their lifecycle
//! - [`cart`] - Cart buckets, stock clamping and merge-on-login
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//!
//! ## Example Usage
//!
//! ```rust
//! use warren_core::cart::{merge_items, ItemKey, LineItem};
//!
//! let guest = vec![LineItem::new(ItemKey::rabbit(1), "Mochi", 250_000, Some(3), 2)];
//! let user = vec![LineItem::new(ItemKey::rabbit(1), "Mochi", 250_000, Some(3), 2)];
//!
//! let merged = merge_items(&guest, &user);
//! assert_eq!(merged.len(), 1);
//! assert_eq!(merged[0].quantity, 3); // clamped to stock, not 4
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod error;
pub mod loan;
pub mod money;
pub mod order;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use cart::{CartBucket, CartOwner, ItemKey, ItemKind, LineItem};
pub use error::{CoreError, CoreResult, ValidationError};
pub use loan::{BreedingLoan, LoanAction, LoanRequest, LoanStatus};
pub use money::Money;
pub use order::{
    CustomerDetails, Order, OrderDetail, OrderItem, OrderLineRequest, OrderRequest, OrderStatus,
    OrderTotals, PaymentMethod, ShippingMethod,
};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum quantity of a single line accepted by the order API.
///
/// The cart itself is unbounded when no stock is known; the server refuses
/// anything above this when an order is placed.
pub const MAX_ORDER_LINE_QUANTITY: i64 = 999;

/// Maximum number of distinct lines in one order.
pub const MAX_ORDER_LINES: usize = 100;

/// Highest price, loan fee or delivery fee accepted, in satang (฿10,000,000).
///
/// Even a full order at this price stays far inside `i64`.
pub const MAX_PRICE_CENTS: i64 = 1_000_000_000;
