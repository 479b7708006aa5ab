//! # Error Types
//!
//! Domain-specific error types for billbook-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  billbook-core errors (this file)                                      │
//! │  ├── CoreError        - Domain rule violations                         │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  billbook-db errors (separate crate)                                   │
//! │  └── DbError          - Storage failures, wraps CoreError              │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → CLI                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every variant carries the context a caller needs to act on it (which
//! product, requested vs. available) so one error identifies the cause.

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Invoice creation was attempted with no cart lines.
    #[error("Cart is empty")]
    EmptyCart,

    /// Product cannot be found for this owner.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Owner (tenant) has not been registered.
    #[error("Owner not found: {0}")]
    OwnerNotFound(String),

    /// Insufficient stock to complete the operation.
    ///
    /// ## User Workflow
    /// ```text
    /// Cart (qty: 5) ──► create invoice
    ///      │
    ///      ▼
    /// Check stock: available=3
    ///      │
    ///      ▼
    /// InsufficientStock { sku: "PRD-0001", available: 3, requested: 5 }
    ///      │
    ///      ▼
    /// Cart and stock untouched; caller edits the cart and retries
    /// ```
    #[error("Insufficient stock for {name} ({sku}): available {available}, requested {requested}")]
    InsufficientStock {
        product_id: String,
        sku: String,
        name: String,
        available: i64,
        requested: i64,
    },

    /// Product has stock history or invoice lines and cannot be deleted.
    #[error("Product {sku} is referenced by {ledger_entries} ledger entries and {invoice_lines} invoice lines")]
    ProductInUse {
        product_id: String,
        sku: String,
        ledger_entries: i64,
        invoice_lines: i64,
    },

    /// Lock contention while adjusting stock.
    ///
    /// Nothing was committed, so the whole request can be retried.
    #[error("Concurrent update conflict on {resource}; retry the request")]
    ConcurrencyConflict { resource: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Whether retrying the identical request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CoreError::ConcurrencyConflict { .. })
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any state is touched, so a validation failure is never
/// partially applied.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    Negative { field: String },

    /// Value must not be zero.
    #[error("{field} must not be zero")]
    Zero { field: String },

    /// Invalid format (e.g., invalid UUID, too many decimal places).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

impl ValidationError {
    pub(crate) fn required(field: &str) -> Self {
        ValidationError::Required {
            field: field.to_string(),
        }
    }

    pub(crate) fn negative(field: &str) -> Self {
        ValidationError::Negative {
            field: field.to_string(),
        }
    }

    pub(crate) fn invalid_format(field: &str, reason: impl Into<String>) -> Self {
        ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn not_allowed(field: &str, allowed: &[&str]) -> Self {
        ValidationError::NotAllowed {
            field: field.to_string(),
            allowed: allowed.iter().map(|s| s.to_string()).collect(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
