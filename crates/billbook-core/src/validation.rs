//! # Validation Module
//!
//! Input validation utilities for Billbook.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Request parsing (CLI / collaborator)                          │
//! │  ├── Type validation (deserialization)                                  │
//! │  └── Enum parsing (payment method, discount kind, gst type)            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE: Business rule validation                        │
//! │  └── Runs before any transaction is opened                             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK (stock >= 0), CHECK (delta <> 0)                            │
//! │  ├── UNIQUE (owner_id, sku)                                            │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use billbook_core::validation::{validate_sku, validate_quantity};
//!
//! validate_sku("PRD-0001").unwrap();
//! validate_quantity(5).unwrap();
//! ```

use rust_decimal::Decimal;

use crate::error::ValidationError;
use crate::types::{NewProduct, OwnerProfile, ProductUpdate, TaxRate};
use crate::{MAX_CART_LINES, MAX_ITEM_QUANTITY};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a SKU (Stock Keeping Unit).
///
/// ## Rules
/// - Must not be empty
/// - At most 50 characters
/// - Only alphanumeric characters, hyphens, underscores
///
/// ## Example
/// ```rust
/// use billbook_core::validation::validate_sku;
///
/// assert!(validate_sku("PRD-0001").is_ok());
/// assert!(validate_sku("").is_err());
/// assert!(validate_sku("A".repeat(100).as_str()).is_err());
/// ```
pub fn validate_sku(sku: &str) -> ValidationResult<()> {
    let sku = sku.trim();

    if sku.is_empty() {
        return Err(ValidationError::required("sku"));
    }

    if sku.len() > 50 {
        return Err(ValidationError::TooLong {
            field: "sku".to_string(),
            max: 50,
        });
    }

    if !sku
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::invalid_format(
            "sku",
            "must contain only letters, numbers, hyphens, and underscores",
        ));
    }

    Ok(())
}

/// Validates a product name: non-empty, at most 200 characters.
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    validate_text("name", name, 200)
}

/// Validates a business name: non-empty, at most 200 characters.
pub fn validate_business_name(name: &str) -> ValidationResult<()> {
    validate_text("business_name", name, 200)
}

/// Validates an externally issued identifier (owner, actor, product id).
pub fn validate_id(field: &str, id: &str) -> ValidationResult<()> {
    validate_text(field, id, 64)
}

fn validate_text(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::required(field));
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

/// Validates a search query.
///
/// ## Returns
/// The trimmed query string. Empty means "no filter".
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

/// Trims an optional text field; blank becomes `None`.
///
/// ## Example
/// ```rust
/// use billbook_core::validation::normalize_optional;
///
/// assert_eq!(normalize_optional(Some("  ".to_string())), None);
/// assert_eq!(normalize_optional(Some(" a ".to_string())), Some("a".to_string()));
/// ```
pub fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Validates a customer mobile number: optional leading `+`, then 7-15 digits.
pub fn validate_mobile(mobile: &str) -> ValidationResult<()> {
    let digits = mobile.strip_prefix('+').unwrap_or(mobile);

    if !(7..=15).contains(&digits.len()) || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::invalid_format(
            "customer_mobile",
            "must be 7 to 15 digits",
        ));
    }

    Ok(())
}

/// Validates a GSTIN: exactly 15 ASCII letters or digits.
///
/// Only the shape is checked, not the state code or checksum.
pub fn validate_gstin(field: &str, gstin: &str) -> ValidationResult<()> {
    if gstin.len() != 15 || !gstin.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ValidationError::invalid_format(
            field,
            "must be 15 letters or digits",
        ));
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a quantity that must be sold or received (> 0).
///
/// ## Rules
/// - Must be positive
/// - Must not exceed MAX_ITEM_QUANTITY
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty < 0 {
        return Err(ValidationError::negative("quantity"));
    }

    if qty == 0 {
        return Err(ValidationError::Zero {
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

/// Validates a cart quantity. Zero is allowed and means "remove".
///
/// ## User Workflow
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Cart: set quantity                                                     │
/// │                                                                         │
/// │  validate_cart_quantity(q) ← THIS FUNCTION                             │
/// │       │                                                                 │
/// │       ├── q < 0?      → Error: "quantity must not be negative"         │
/// │       ├── q > 9999?   → Error: out of range                            │
/// │       ├── q == 0      → line removed                                   │
/// │       └── otherwise   → line created / updated                         │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub fn validate_cart_quantity(qty: i64) -> ValidationResult<()> {
    if qty < 0 {
        return Err(ValidationError::negative("quantity"));
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 0,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates the number of distinct lines in a cart.
pub fn validate_cart_size(lines: usize) -> ValidationResult<()> {
    if lines > MAX_CART_LINES {
        return Err(ValidationError::OutOfRange {
            field: "cart_lines".to_string(),
            min: 0,
            max: MAX_CART_LINES as i64,
        });
    }
    Ok(())
}

/// Validates a stock ledger delta: any sign, never zero.
///
/// ## Example
/// ```rust
/// use billbook_core::validation::validate_ledger_delta;
///
/// assert!(validate_ledger_delta(-3).is_ok());
/// assert!(validate_ledger_delta(0).is_err());
/// ```
pub fn validate_ledger_delta(delta: i64) -> ValidationResult<()> {
    if delta == 0 {
        return Err(ValidationError::Zero {
            field: "delta".to_string(),
        });
    }
    Ok(())
}

/// Validates a price in paise. Zero is allowed (free or imported items).
pub fn validate_price_cents(price: i64) -> ValidationResult<()> {
    if price < 0 {
        return Err(ValidationError::negative("price"));
    }
    Ok(())
}

/// Validates a tax rate in basis points (0..=10000).
pub fn validate_tax_rate_bps(bps: u32) -> ValidationResult<()> {
    if bps > TaxRate::MAX_BPS {
        return Err(ValidationError::OutOfRange {
            field: "tax_rate".to_string(),
            min: 0,
            max: i64::from(TaxRate::MAX_BPS),
        });
    }
    Ok(())
}

/// Validates a low-stock threshold (>= 0).
pub fn validate_low_stock_threshold(threshold: i64) -> ValidationResult<()> {
    if threshold < 0 {
        return Err(ValidationError::negative("low_stock_threshold"));
    }
    Ok(())
}

/// Converts a percentage (0..=100, at most 2 decimals) to basis points.
///
/// ## Example
/// ```rust
/// use billbook_core::validation::percent_to_bps;
/// use rust_decimal::Decimal;
///
/// assert_eq!(percent_to_bps("gst_percent", Decimal::new(1250, 2)).unwrap(), 1250);
/// assert!(percent_to_bps("gst_percent", Decimal::new(1, 3)).is_err());
/// ```
pub fn percent_to_bps(field: &str, percent: Decimal) -> ValidationResult<u32> {
    if percent.is_sign_negative() && !percent.is_zero() {
        return Err(ValidationError::negative(field));
    }

    if percent > Decimal::ONE_HUNDRED {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: 100,
        });
    }

    let normalized = percent.normalize();
    if normalized.scale() > 2 {
        return Err(ValidationError::invalid_format(
            field,
            "must have at most 2 decimal places",
        ));
    }

    // 0..=100 with <= 2 decimals is an exact integer in 0..=10000
    let mut bps = normalized * Decimal::ONE_HUNDRED;
    bps.rescale(0);
    u32::try_from(bps.mantissa())
        .map_err(|_| ValidationError::invalid_format(field, "out of range"))
}

// =============================================================================
// Composite Validators
// =============================================================================

/// Validates everything about a product before it is inserted.
pub fn validate_new_product(product: &NewProduct) -> ValidationResult<()> {
    validate_sku(&product.sku)?;
    validate_product_name(&product.name)?;
    validate_price_cents(product.price_cents)?;
    validate_tax_rate_bps(product.tax_rate_bps)?;
    validate_low_stock_threshold(product.low_stock_threshold)?;
    if product.opening_stock < 0 {
        return Err(ValidationError::negative("opening_stock"));
    }
    Ok(())
}

/// Validates the supplied fields of a product update.
pub fn validate_product_update(update: &ProductUpdate) -> ValidationResult<()> {
    if let Some(name) = &update.name {
        validate_product_name(name)?;
    }
    if let Some(price) = update.price_cents {
        validate_price_cents(price)?;
    }
    if let Some(bps) = update.tax_rate_bps {
        validate_tax_rate_bps(bps)?;
    }
    if let Some(threshold) = update.low_stock_threshold {
        validate_low_stock_threshold(threshold)?;
    }
    Ok(())
}

/// Validates an owner profile.
pub fn validate_owner_profile(profile: &OwnerProfile) -> ValidationResult<()> {
    validate_business_name(&profile.business_name)?;
    if let Some(gstin) = profile.gstin.as_deref().map(str::trim).filter(|g| !g.is_empty()) {
        validate_gstin("gstin", gstin)?;
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Money;

    #[test]
    fn test_validate_sku() {
        assert!(validate_sku("PRD-0001").is_ok());
        assert!(validate_sku("ABC_123").is_ok());
        assert!(validate_sku("").is_err());
        assert!(validate_sku("   ").is_err());
        assert!(validate_sku("has space").is_err());
        assert!(validate_sku(&"A".repeat(51)).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(MAX_ITEM_QUANTITY).is_ok());
        assert!(matches!(validate_quantity(0), Err(ValidationError::Zero { .. })));
        assert!(matches!(validate_quantity(-1), Err(ValidationError::Negative { .. })));
        assert!(validate_quantity(MAX_ITEM_QUANTITY + 1).is_err());
    }

    #[test]
    fn test_validate_cart_quantity_allows_zero() {
        assert!(validate_cart_quantity(0).is_ok());
        assert!(validate_cart_quantity(-1).is_err());
    }

    #[test]
    fn test_validate_ledger_delta() {
        assert!(validate_ledger_delta(5).is_ok());
        assert!(validate_ledger_delta(-5).is_ok());
        assert_eq!(
            validate_ledger_delta(0),
            Err(ValidationError::Zero {
                field: "delta".to_string()
            })
        );
    }

    #[test]
    fn test_percent_to_bps() {
        assert_eq!(percent_to_bps("p", Decimal::new(18, 0)).unwrap(), 1800);
        assert_eq!(percent_to_bps("p", Decimal::new(100, 0)).unwrap(), 10_000);
        assert_eq!(percent_to_bps("p", Decimal::new(5, 1)).unwrap(), 50);
        assert_eq!(percent_to_bps("p", Decimal::new(1800, 2)).unwrap(), 1800);
        assert!(percent_to_bps("p", Decimal::new(-1, 0)).is_err());
        assert!(percent_to_bps("p", Decimal::new(10_001, 2)).is_err());
    }

    #[test]
    fn test_validate_mobile_and_gstin() {
        assert!(validate_mobile("9876543210").is_ok());
        assert!(validate_mobile("+919876543210").is_ok());
        assert!(validate_mobile("98765-43210").is_err());
        assert!(validate_gstin("gstin", "22AAAAA0000A1Z5").is_ok());
        assert!(validate_gstin("gstin", "22AAAAA0000A1Z").is_err());
    }

    #[test]
    fn test_validate_new_product() {
        let ok = NewProduct::new("PRD-0001", "Rice", Money::from_cents(10_000));
        assert!(validate_new_product(&ok).is_ok());

        let negative_stock = ok.clone().with_opening_stock(-1);
        assert!(validate_new_product(&negative_stock).is_err());

        let mut bad_rate = ok;
        bad_rate.tax_rate_bps = 10_001;
        assert!(validate_new_product(&bad_rate).is_err());
    }

    #[test]
    fn test_validate_owner_profile() {
        let mut profile = OwnerProfile {
            business_name: "Sharma Stores".to_string(),
            ..Default::default()
        };
        assert!(validate_owner_profile(&profile).is_ok());

        profile.gstin = Some("  ".to_string());
        assert!(validate_owner_profile(&profile).is_ok());

        profile.gstin = Some("BAD".to_string());
        assert!(validate_owner_profile(&profile).is_err());
    }
}
