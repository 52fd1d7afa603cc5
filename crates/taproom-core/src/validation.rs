//! # Validation Module
//!
//! Input validation utilities for Taproom POS.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Till command (Rust)                                          │
//! │  ├── Argument parsing (ids, amounts like "1.500")                      │
//! │  └── Immediate feedback as ApiError                                    │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Repository (Rust)                                            │
//! │  └── THIS MODULE: checked before any statement runs                    │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK constraints on qty and prices                               │
//! │  ├── UNIQUE barcode                                                    │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use taproom_core::validation::{validate_price, validate_quantity};
//!
//! validate_quantity(5).unwrap();
//! validate_price("sale_price", 2500).unwrap();
//! assert!(validate_quantity(0).is_err());
//! ```

use crate::error::ValidationError;
use crate::{COMMON_PRODUCT_NAME, MAX_ITEM_QUANTITY, MAX_PRICE};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest product name accepted.
pub const MAX_NAME_LEN: usize = 200;

/// Longest barcode accepted.
pub const MAX_BARCODE_LEN: usize = 64;

/// Highest markup accepted for a common product, in percent.
pub const MAX_GAIN_PERCENT: u32 = 1000;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a product name and returns it trimmed.
///
/// ## Rules
/// - Must not be empty after trimming
/// - At most 200 characters
///
/// ```rust
/// use taproom_core::validation::validate_product_name;
///
/// assert_eq!(validate_product_name("  IPA Lata 473ml ").unwrap(), "IPA Lata 473ml");
/// assert!(validate_product_name("   ").is_err());
/// ```
pub fn validate_product_name(name: &str) -> ValidationResult<String> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::required("name"));
    }

    if name.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: MAX_NAME_LEN,
        });
    }

    Ok(name.to_string())
}

/// Normalizes an optional barcode.
///
/// Blank input means "no barcode" and maps to `None`, so that many products
/// can go without one while the column stays UNIQUE.
pub fn validate_barcode(barcode: Option<&str>) -> ValidationResult<Option<String>> {
    let Some(barcode) = barcode.map(str::trim).filter(|b| !b.is_empty()) else {
        return Ok(None);
    };

    if barcode.chars().count() > MAX_BARCODE_LEN {
        return Err(ValidationError::TooLong {
            field: "barcode".to_string(),
            max: MAX_BARCODE_LEN,
        });
    }

    if barcode.chars().any(char::is_whitespace) {
        return Err(ValidationError::InvalidFormat {
            field: "barcode".to_string(),
            reason: "must not contain spaces".to_string(),
        });
    }

    Ok(Some(barcode.to_string()))
}

/// Validates a search query.
///
/// ## Rules
/// - Can be empty (returns all results)
/// - Maximum 100 characters
///
/// ## Returns
/// The trimmed query string.
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.chars().count() > 100 {
        return Err(ValidationError::TooLong {
            field: "query".to_string(),
            max: 100,
        });
    }

    Ok(query.to_string())
}

/// Display name for an ad-hoc line. Blank falls back to "Producto común".
pub fn validate_display_name(name: Option<&str>) -> ValidationResult<String> {
    match name.map(str::trim).filter(|n| !n.is_empty()) {
        None => Ok(COMMON_PRODUCT_NAME.to_string()),
        Some(n) if n.chars().count() > MAX_NAME_LEN => Err(ValidationError::TooLong {
            field: "display_name".to_string(),
            max: MAX_NAME_LEN,
        }),
        Some(n) => Ok(n.to_string()),
    }
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a quantity being added to a ticket.
///
/// ## User Workflow
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Ticket: Add Item                                                       │
/// │                                                                         │
/// │  Cashier enters quantity: 5                                            │
/// │       │                                                                 │
/// │       ▼                                                                 │
/// │  validate_quantity(5) ← THIS FUNCTION                                  │
/// │       │                                                                 │
/// │       ├── qty <= 0? → Error: "quantity must be positive"               │
/// │       ├── qty > MAX_ITEM_QUANTITY? → Error: out of range               │
/// │       │                                                                 │
/// │       └── OK → Proceed with add_item                                   │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
///
/// Setting an existing line to zero is not validated here; that path
/// deletes the line instead.
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a price. Zero is allowed, anything above [`MAX_PRICE`] is not.
///
/// ```rust
/// use taproom_core::validation::validate_price;
///
/// assert!(validate_price("sale_price", 0).is_ok());
/// assert!(validate_price("purchase_price", -1).is_err());
/// assert!(validate_price("sale_price", i64::MAX).is_err());
/// ```
pub fn validate_price(field: &str, value: i64) -> ValidationResult<()> {
    if value < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }

    if value > MAX_PRICE {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_PRICE,
        });
    }

    Ok(())
}

/// Validates a markup percentage for a common product.
pub fn validate_gain_percent(percent: u32) -> ValidationResult<()> {
    if percent > MAX_GAIN_PERCENT {
        return Err(ValidationError::OutOfRange {
            field: "gain_percent".to_string(),
            min: 0,
            max: MAX_GAIN_PERCENT as i64,
        });
    }

    Ok(())
}

/// Parses an amount the way cashiers type it: `1500`, `1.500`, `1,500` or
/// `$1.500`. Separators are dropped; amounts are whole units.
///
/// ```rust
/// use taproom_core::validation::parse_amount;
///
/// assert_eq!(parse_amount("$1.500").unwrap(), 1500);
/// assert_eq!(parse_amount("2,200").unwrap(), 2200);
/// assert!(parse_amount("12a").is_err());
/// ```
pub fn parse_amount(text: &str) -> ValidationResult<i64> {
    let cleaned: String = text
        .trim()
        .trim_start_matches('$')
        .chars()
        .filter(|c| !matches!(c, '.' | ',' | ' '))
        .collect();

    if cleaned.is_empty() {
        return Err(ValidationError::required("amount"));
    }

    cleaned
        .parse::<i64>()
        .map_err(|_| ValidationError::InvalidFormat {
            field: "amount".to_string(),
            reason: format!("'{}' is not a whole number", text.trim()),
        })
}

// =============================================================================
// Unit Tests
// =============================================================================
