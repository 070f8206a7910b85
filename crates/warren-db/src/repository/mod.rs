//! # Repository Module
//!
//! Database repository implementations for Warren.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  HTTP handler                                                          │
//! │       │                                                                 │
//! │       │  db.orders().place(&request, fee)                              │
//! │       ▼                                                                 │
//! │  OrderRepository                                                       │
//! │  ├── place(&self, request, delivery_fee)   (one transaction)           │
//! │  ├── get_detail(&self, id)                                             │
//! │  ├── list(&self, filter)                                               │
//! │  └── change_status(&self, id, status)      (restock / sell)            │
//! │       │                                                                 │
//! │       │  SQL                                                            │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`UserRepository`] - Customer records and roles
//! - [`RabbitRepository`] - Rabbit catalog and status
//! - [`ProductRepository`] - Food/equipment catalog and stock
//! - [`OrderRepository`] - Order placement and lifecycle
//! - [`LoanRepository`] - Breeding loans
//! - [`StatsRepository`] - Admin dashboard aggregates

pub mod loan;
pub mod order;
pub mod product;
pub mod rabbit;
pub mod stats;
pub mod user;

pub use loan::{LoanFilter, LoanRepository};
pub use order::{OrderFilter, OrderRepository};
pub use product::{ProductFilter, ProductRepository};
pub use rabbit::{RabbitFilter, RabbitRepository};
pub use stats::{DashboardStats, StatsRepository};
pub use user::UserRepository;
