//! # warren-db: Database Layer for Warren
//!
//! SQLite persistence for the storefront, via sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Warren Data Flow                                 │
//! │                                                                         │
//! │  HTTP handler (POST /api/orders)                                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     warren-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ UserRepo      │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ RabbitRepo    │    │ 001_initial  │  │   │
//! │  │   │ Connection    │    │ ProductRepo   │    │ _schema.sql  │  │   │
//! │  │   │ Management    │    │ OrderRepo     │    │              │  │   │
//! │  │   │               │    │ LoanRepo      │    │              │  │   │
//! │  │   │               │    │ StatsRepo     │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (warren.db)                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - One repository per table, plus dashboard stats
//!
//! ## Usage
//!
//! ```rust,ignore
//! use warren_db::{Database, DbConfig, RabbitFilter};
//!
//! let db = Database::new(DbConfig::new("warren.db")).await?;
//! let available = db.rabbits().list(&RabbitFilter::default()).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::{
    DashboardStats, LoanFilter, LoanRepository, OrderFilter, OrderRepository, ProductFilter,
    ProductRepository, RabbitFilter, RabbitRepository, StatsRepository, UserRepository,
};

// =============================================================================
// Test Fixtures
// =============================================================================

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::NaiveDate;
    use warren_core::{
        CustomerDetails, Gender, ItemKey, NewUser, OrderLineRequest, OrderRequest, PaymentMethod,
        ProductCategory, ProductInput, RabbitInput, ShippingMethod, User,
    };

    use crate::{Database, DbConfig};

    pub async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    pub fn rabbit_input(name: &str, breeder: bool) -> RabbitInput {
        RabbitInput {
            name: name.to_string(),
            breed: "Holland Lop".to_string(),
            gender: Gender::Female,
            birth_date: NaiveDate::from_ymd_opt(2024, 1, 15),
            price_cents: 250_000,
            is_breeder: breeder,
            loan_fee_cents: breeder.then_some(50_000),
            description: None,
        }
    }

    pub fn product_input(name: &str, stock: i64) -> ProductInput {
        ProductInput {
            name: name.to_string(),
            category: ProductCategory::Food,
            price_cents: 45_900,
            stock,
            description: None,
        }
    }

    pub async fn customer(db: &Database, email: &str) -> User {
        db.users()
            .create(&NewUser {
                name: "Ploy".to_string(),
                email: email.to_string(),
                phone: Some("0812345678".to_string()),
                address: None,
            })
            .await
            .unwrap()
    }

    /// Guest bank-transfer order for the given lines.
    pub fn order_request(shipping: ShippingMethod, lines: &[(ItemKey, i64)]) -> OrderRequest {
        OrderRequest {
            customer: CustomerDetails {
                user_id: None,
                customer_name: "Ploy".to_string(),
                phone: "0812345678".to_string(),
                address: Some("12 Sukhumvit Rd, Bangkok".to_string()),
                shipping_method: shipping,
                payment_method: PaymentMethod::BankTransfer,
                notes: None,
            },
            items: lines
                .iter()
                .map(|&(item, quantity)| OrderLineRequest { item, quantity })
                .collect(),
        }
    }
}
