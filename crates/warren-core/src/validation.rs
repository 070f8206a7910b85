//! # Validation Module
//!
//! Input validation for API payloads.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Storefront (TypeScript)                                      │
//! │  └── Blocking alert before submission                                  │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: API handler (Rust)                                           │
//! │  ├── Type validation (serde deserialization)                           │
//! │  └── THIS MODULE: field and business rule validation → 400             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / CHECK constraints                                      │
//! │  ├── UNIQUE constraints (email, order number)                          │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashSet;

use crate::error::ValidationError;
use crate::loan::LoanRequest;
use crate::order::{OrderRequest, ShippingMethod};
use crate::types::{NewUser, ProductInput, RabbitInput};
use crate::{MAX_ORDER_LINES, MAX_ORDER_LINE_QUANTITY, MAX_PRICE_CENTS};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a required free-text field with a maximum length.
///
/// ## Example
/// ```rust
/// use warren_core::validation::validate_required;
///
/// assert!(validate_required("name", "Mochi", 100).is_ok());
/// assert!(validate_required("name", "   ", 100).is_err());
/// ```
pub fn validate_required(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

fn validate_optional(field: &str, value: Option<&str>, max: usize) -> ValidationResult<()> {
    match value {
        Some(v) if v.chars().count() > max => Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        }),
        _ => Ok(()),
    }
}

/// Validates a phone number.
///
/// ## Rules
/// - Digits, spaces, `+`, `-` and parentheses only
/// - 9 to 15 digits
pub fn validate_phone(phone: &str) -> ValidationResult<()> {
    let phone = phone.trim();

    if phone.is_empty() {
        return Err(ValidationError::Required {
            field: "phone".to_string(),
        });
    }

    if !phone
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '+' | '-' | '(' | ')'))
    {
        return Err(ValidationError::InvalidFormat {
            field: "phone".to_string(),
            reason: "must contain only digits, spaces, +, - and parentheses".to_string(),
        });
    }

    let digits = phone.chars().filter(|c| c.is_ascii_digit()).count();
    if !(9..=15).contains(&digits) {
        return Err(ValidationError::InvalidFormat {
            field: "phone".to_string(),
            reason: "must have 9 to 15 digits".to_string(),
        });
    }

    Ok(())
}

/// Validates an email address (shape only).
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let email = email.trim();

    if email.is_empty() {
        return Err(ValidationError::Required {
            field: "email".to_string(),
        });
    }

    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    };

    if !valid {
        return Err(ValidationError::InvalidFormat {
            field: "email".to_string(),
            reason: "must look like name@example.com".to_string(),
        });
    }

    if email.len() > 254 {
        return Err(ValidationError::TooLong {
            field: "email".to_string(),
            max: 254,
        });
    }

    Ok(())
}

/// Validates a catalog search query.
///
/// ## Returns
/// The trimmed query string.
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.len() > 100 {
        return Err(ValidationError::TooLong {
            field: "query".to_string(),
            max: 100,
        });
    }

    Ok(query.to_string())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates an order line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed `MAX_ORDER_LINE_QUANTITY` (999)
///
/// The local cart has no such cap; this applies to placed orders only.
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ORDER_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ORDER_LINE_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a price in the smallest currency unit.
///
/// ## Rules
/// - Zero is allowed
/// - Must not exceed `MAX_PRICE_CENTS` (฿10,000,000)
pub fn validate_price_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if !(0..=MAX_PRICE_CENTS).contains(&cents) {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_PRICE_CENTS,
        });
    }

    Ok(())
}

// =============================================================================
// Payload Validators
// =============================================================================

/// Validates a customer registration.
pub fn validate_new_user(user: &NewUser) -> ValidationResult<()> {
    validate_required("name", &user.name, 100)?;
    validate_email(&user.email)?;
    if let Some(phone) = user.phone.as_deref().filter(|p| !p.trim().is_empty()) {
        validate_phone(phone)?;
    }
    validate_optional("address", user.address.as_deref(), 500)
}

/// Validates a rabbit listing.
///
/// ## Rules
/// - Name and breed required
/// - Non-negative price and loan fee
/// - Only breeders carry a loan fee
pub fn validate_rabbit_input(input: &RabbitInput) -> ValidationResult<()> {
    validate_required("name", &input.name, 100)?;
    validate_required("breed", &input.breed, 100)?;
    validate_price_cents("price", input.price_cents)?;
    validate_optional("description", input.description.as_deref(), 2000)?;

    if let Some(fee) = input.loan_fee_cents {
        if !input.is_breeder {
            return Err(ValidationError::InvalidFormat {
                field: "loan_fee".to_string(),
                reason: "only breeders have a loan fee".to_string(),
            });
        }
        validate_price_cents("loan_fee", fee)?;
    }

    Ok(())
}

/// Validates a product listing.
pub fn validate_product_input(input: &ProductInput) -> ValidationResult<()> {
    validate_required("name", &input.name, 200)?;
    validate_price_cents("price", input.price_cents)?;
    if input.stock < 0 {
        return Err(ValidationError::OutOfRange {
            field: "stock".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }
    validate_optional("description", input.description.as_deref(), 2000)
}

/// Validates a checkout request.
///
/// ## Rules
/// - Name and phone required; address required for delivery
/// - 1 to `MAX_ORDER_LINES` lines, each quantity 1..=999
/// - No repeated item keys
pub fn validate_order_request(req: &OrderRequest) -> ValidationResult<()> {
    let c = &req.customer;
    validate_required("customer_name", &c.customer_name, 100)?;
    validate_phone(&c.phone)?;

    if c.shipping_method == ShippingMethod::Delivery {
        validate_required("address", c.address.as_deref().unwrap_or(""), 500)?;
    } else {
        validate_optional("address", c.address.as_deref(), 500)?;
    }
    validate_optional("notes", c.notes.as_deref(), 500)?;

    if req.items.is_empty() {
        return Err(ValidationError::Required {
            field: "items".to_string(),
        });
    }

    if req.items.len() > MAX_ORDER_LINES {
        return Err(ValidationError::OutOfRange {
            field: "items".to_string(),
            min: 1,
            max: MAX_ORDER_LINES as i64,
        });
    }

    let mut seen = HashSet::with_capacity(req.items.len());
    for line in &req.items {
        validate_quantity(line.quantity)?;
        if !seen.insert(line.item) {
            return Err(ValidationError::InvalidFormat {
                field: "items".to_string(),
                reason: format!("{} appears more than once", line.item),
            });
        }
    }

    Ok(())
}

/// Validates a breeding loan request.
pub fn validate_loan_request(req: &LoanRequest) -> ValidationResult<()> {
    if let (Some(start), Some(due)) = (req.start_date, req.due_date) {
        if due < start {
            return Err(ValidationError::InvalidFormat {
                field: "due_date".to_string(),
                reason: "must not be before start_date".to_string(),
            });
        }
    }
    validate_optional("notes", req.notes.as_deref(), 500)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::ItemKey;
    use crate::order::{CustomerDetails, OrderLineRequest, PaymentMethod};
    use crate::types::Gender;
    use chrono::NaiveDate;

    fn order_request(shipping: ShippingMethod, address: Option<&str>) -> OrderRequest {
        OrderRequest {
            customer: CustomerDetails {
                user_id: None,
                customer_name: "Ploy".to_string(),
                phone: "081-234-5678".to_string(),
                address: address.map(str::to_string),
                shipping_method: shipping,
                payment_method: PaymentMethod::BankTransfer,
                notes: None,
            },
            items: vec![OrderLineRequest {
                item: ItemKey::product(1),
                quantity: 2,
            }],
        }
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(999).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(1000).is_err());
    }

    #[test]
    fn test_validate_phone() {
        assert!(validate_phone("0812345678").is_ok());
        assert!(validate_phone("+66 81 234 5678").is_ok());
        assert!(validate_phone("").is_err());
        assert!(validate_phone("12345").is_err());
        assert!(validate_phone("call me maybe").is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("ploy@example.com").is_ok());
        assert!(validate_email("").is_err());
        assert!(validate_email("ploy").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("ploy@example").is_err());
    }

    #[test]
    fn test_delivery_requires_address() {
        assert!(validate_order_request(&order_request(ShippingMethod::Delivery, None)).is_err());
        assert!(validate_order_request(&order_request(ShippingMethod::Delivery, Some("  "))).is_err());
        assert!(
            validate_order_request(&order_request(ShippingMethod::Delivery, Some("12 Rama IV")))
                .is_ok()
        );
        assert!(validate_order_request(&order_request(ShippingMethod::Pickup, None)).is_ok());
    }

    #[test]
    fn test_order_request_lines() {
        let mut req = order_request(ShippingMethod::Pickup, None);
        req.items.clear();
        assert!(matches!(
            validate_order_request(&req),
            Err(ValidationError::Required { .. })
        ));

        let mut req = order_request(ShippingMethod::Pickup, None);
        req.items.push(req.items[0]);
        assert!(matches!(
            validate_order_request(&req),
            Err(ValidationError::InvalidFormat { .. })
        ));

        let mut req = order_request(ShippingMethod::Pickup, None);
        req.items[0].quantity = 0;
        assert!(validate_order_request(&req).is_err());
    }

    #[test]
    fn test_validate_rabbit_input() {
        let mut input = RabbitInput {
            name: "Mochi".to_string(),
            breed: "Holland Lop".to_string(),
            gender: Gender::Female,
            birth_date: None,
            price_cents: 250_000,
            is_breeder: false,
            loan_fee_cents: None,
            description: None,
        };
        assert!(validate_rabbit_input(&input).is_ok());

        input.loan_fee_cents = Some(50_000);
        assert!(validate_rabbit_input(&input).is_err());

        input.is_breeder = true;
        assert!(validate_rabbit_input(&input).is_ok());

        input.price_cents = -1;
        assert!(validate_rabbit_input(&input).is_err());
    }

    #[test]
    fn test_validate_price_upper_bound() {
        assert!(validate_price_cents("price", 0).is_ok());
        assert!(validate_price_cents("price", MAX_PRICE_CENTS).is_ok());

        let err = validate_price_cents("price", MAX_PRICE_CENTS + 1).unwrap_err();
        assert_eq!(err.to_string(), "price must be between 0 and 1000000000");
        assert!(validate_price_cents("price", 100_000_000_000_000_000).is_err());
    }

    #[test]
    fn test_validate_product_input() {
        let input = ProductInput {
            name: "Timothy Hay 1kg".to_string(),
            category: crate::types::ProductCategory::Food,
            price_cents: 45_900,
            stock: 0,
            description: None,
        };
        assert!(validate_product_input(&input).is_ok());
        assert!(validate_product_input(&ProductInput { stock: -2, ..input.clone() }).is_err());
        assert!(validate_product_input(&ProductInput { name: String::new(), ..input }).is_err());
    }

    #[test]
    fn test_validate_loan_dates() {
        let d = |day| NaiveDate::from_ymd_opt(2024, 6, day).unwrap();
        let mut req = LoanRequest {
            rabbit_id: 1,
            user_id: 1,
            start_date: Some(d(10)),
            due_date: Some(d(20)),
            notes: None,
        };
        assert!(validate_loan_request(&req).is_ok());

        req.due_date = Some(d(5));
        assert!(validate_loan_request(&req).is_err());
    }

    #[test]
    fn test_validate_search_query() {
        assert_eq!(validate_search_query("  hay ").unwrap(), "hay");
        assert!(validate_search_query(&"x".repeat(101)).is_err());
    }
}
