//! # Error Types
//!
//! Domain-specific error types for warren-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  warren-core errors (this file)                                        │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  warren-db errors (separate crate)                                     │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  warren-cart errors (separate crate)                                   │
//! │  └── CartStoreError   - Local cart storage failures                    │
//! │                                                                         │
//! │  HTTP errors (apps/api)                                                │
//! │  └── ApiError         - What the storefront sees ({code, message})     │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → Storefront   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These represent business rule violations. The API layer maps every
/// variant except `Validation` to `409 Conflict`.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Not enough product stock to place an order.
    ///
    /// ## User Workflow
    /// ```text
    /// Checkout (qty: 5)
    ///      │
    ///      ▼
    /// Re-read stock inside the order transaction: available=3
    ///      │
    ///      ▼
    /// InsufficientStock { item: "product-7", available: 3, requested: 5 }
    ///      │
    ///      ▼
    /// Storefront shows the message, cart keeps its lines
    /// ```
    #[error("Insufficient stock for {item}: available {available}, requested {requested}")]
    InsufficientStock {
        item: String,
        available: i64,
        requested: i64,
    },

    /// A rabbit is not in a state that allows it to be ordered or loaned.
    #[error("Rabbit {rabbit_id} is {status}, not available")]
    RabbitUnavailable { rabbit_id: i64, status: String },

    /// Loan requested for a rabbit that is not marked as a breeder.
    #[error("Rabbit {0} is not a breeder")]
    NotABreeder(i64),

    /// Catalog item referenced by an order line is missing or inactive.
    #[error("Item {0} is not for sale")]
    ItemNotForSale(String),

    /// A state machine refused the requested move.
    ///
    /// ## When This Occurs
    /// - Shipping an order that is still pending
    /// - Cancelling a completed order
    /// - Starting a loan that was never approved
    #[error("Cannot {action} {entity} in status {from}")]
    InvalidTransition {
        entity: &'static str,
        from: String,
        action: String,
    },

    /// Order has more lines than allowed.
    #[error("Order cannot have more than {max} lines")]
    TooManyLines { max: usize },

    /// Bank transfer orders need a payment slip before they can be confirmed.
    #[error("Order {0} has no payment slip")]
    MissingSlip(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before business logic runs; the API layer maps them to
/// `400 Bad Request`.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too short.
    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., malformed item key, bad email).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
