//! # warren-cart: Client Cart Data Layer
//!
//! Locally persisted carts, one bucket per owner, with merge-on-login.
//!
//! ## Layering
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Storefront event (add, +/-, login, cart page mount, checkout)          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  CartSession (session.rs)                                               │
//! │  ├── current owner: guest | user:<id>                                   │
//! │  ├── users already merged this session                                  │
//! │  └── load → apply bucket op (warren-core) → save                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  CartStore (store.rs)                                                   │
//! │  ├── MemoryCartStore                                                    │
//! │  └── FileCartStore  (<data dir>/carts/cart_user_42.json)                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Bucket rules (clamping, merge, reconcile) live in
//! [`warren_core::cart`]; this crate only decides which bucket is current
//! and moves buckets in and out of storage.
//!
//! ## Usage
//! ```rust
//! use warren_cart::{CartSession, MemoryCartStore};
//! use warren_core::{ItemKey, LineItem};
//!
//! let mut cart = CartSession::new(MemoryCartStore::new());
//! cart.add(LineItem::new(ItemKey::product(4), "Timothy Hay 1kg", 29_000, Some(10), 2));
//! let bucket = cart.login(42);
//! assert_eq!(bucket.quantity_of(&ItemKey::product(4)), 2);
//! ```

pub mod error;
pub mod session;
pub mod store;

pub use error::{CartStoreError, CartStoreResult};
pub use session::CartSession;
pub use store::{CartStore, FileCartStore, MemoryCartStore};
