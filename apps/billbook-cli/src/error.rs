//! # API Error Type
//!
//! Unified error type for CLI commands.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Billbook                               │
//! │                                                                         │
//! │  billbook invoice create                                                │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  Command Function                                                │  │
//! │  │  Result<Value, ApiError>                                         │  │
//! │  │         │                                                        │  │
//! │  │  Role guard? ───────── ApiError::forbidden ────────┐            │  │
//! │  │         │                                          │            │  │
//! │  │  Database Error? ───── DbError::Timeout ───────────┤            │  │
//! │  │         │                                          ▼            │  │
//! │  │  Business Error? ───── CoreError::EmptyCart ───── ApiError ────►│  │
//! │  │         │                                          (stderr)     │  │
//! │  │  Success ─────────────────────────────────────────────────────►│  │
//! │  │                                                    (stdout)     │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use billbook_core::{CoreError, ValidationError};
use billbook_db::DbError;
use serde::Serialize;

use crate::auth::Role;
use crate::config::ConfigError;

/// Error printed to stderr when a command fails.
///
/// ```json
/// {
///   "code": "INSUFFICIENT_STOCK",
///   "message": "Insufficient stock for Toor Dal 1kg (PRD-0004): available 3, requested 5"
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for command failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Resource not found
    NotFound,

    /// Input validation failed
    ValidationError,

    /// Role may not run this command
    Forbidden,

    /// Invoice requested for an empty cart
    EmptyCart,

    /// Insufficient stock
    InsufficientStock,

    /// Product has stock history or invoice lines
    ProductInUse,

    /// Lost a race for a lock; the request can be retried
    Conflict,

    /// Invoice transaction exceeded its time limit
    Timeout,

    /// Database operation failed
    DatabaseError,

    /// Bad configuration
    ConfigError,

    /// Internal error
    Internal,
}

impl ErrorCode {
    /// Process exit status for this code.
    pub fn exit_code(&self) -> i32 {
        match self {
            ErrorCode::ValidationError | ErrorCode::ConfigError => 2,
            ErrorCode::NotFound => 3,
            ErrorCode::Forbidden => 4,
            ErrorCode::EmptyCart | ErrorCode::InsufficientStock | ErrorCode::ProductInUse => 5,
            ErrorCode::Conflict | ErrorCode::Timeout => 6,
            ErrorCode::DatabaseError | ErrorCode::Internal => 1,
        }
    }
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    pub fn forbidden(role: Role) -> Self {
        ApiError::new(ErrorCode::Forbidden, format!("Role {} may not perform this action", role))
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }
}

/// Converts database errors to API errors.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            DbError::UniqueViolation { field, value } => ApiError::new(
                ErrorCode::ValidationError,
                format!("{} '{}' already exists", field, value),
            ),
            DbError::CheckViolation { message } => {
                tracing::error!("Check constraint violated: {}", message);
                ApiError::new(ErrorCode::DatabaseError, "Stored data failed an integrity check")
            }
            DbError::ForeignKeyViolation { message } => {
                tracing::error!("Foreign key violation: {}", message);
                ApiError::new(ErrorCode::ValidationError, "Invalid reference")
            }
            DbError::Busy(e) => {
                tracing::warn!("Database busy: {}", e);
                ApiError::new(ErrorCode::Conflict, "Database is busy; retry the request")
            }
            DbError::Timeout { after_ms } => ApiError::new(
                ErrorCode::Timeout,
                format!("Invoice creation timed out after {} ms; nothing was saved", after_ms),
            ),
            DbError::ConnectionFailed(e) => {
                tracing::error!("Database connection failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database connection failed")
            }
            DbError::MigrationFailed(e) => {
                tracing::error!("Migration failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database migration failed")
            }
            DbError::QueryFailed(e) => {
                // Log the actual error but return a generic message
                tracing::error!("Database query failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
            DbError::PoolExhausted => ApiError::new(ErrorCode::DatabaseError, "Database pool exhausted"),
            DbError::Core(e) => ApiError::from(e),
            DbError::Internal(e) => {
                tracing::error!("Internal database error: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

/// Converts core errors to API errors.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::EmptyCart => ApiError::new(ErrorCode::EmptyCart, "Cart is empty"),
            CoreError::ProductNotFound(id) => ApiError::not_found("Product", &id),
            CoreError::OwnerNotFound(id) => ApiError::not_found("Owner", &id),
            e @ CoreError::InsufficientStock { .. } => {
                ApiError::new(ErrorCode::InsufficientStock, e.to_string())
            }
            e @ CoreError::ProductInUse { .. } => ApiError::new(ErrorCode::ProductInUse, e.to_string()),
            e @ CoreError::ConcurrencyConflict { .. } => ApiError::new(ErrorCode::Conflict, e.to_string()),
            CoreError::Validation(e) => ApiError::validation(e.to_string()),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::validation(err.to_string())
    }
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        ApiError::new(ErrorCode::ConfigError, err.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::validation(format!("Malformed JSON: {}", err))
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        ApiError::validation(format!("Cannot read input: {}", err))
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_business_errors_keep_their_code() {
        let err: ApiError = DbError::Core(CoreError::EmptyCart).into();
        assert_eq!(err.code, ErrorCode::EmptyCart);

        let err: ApiError = CoreError::InsufficientStock {
            product_id: "p1".to_string(),
            sku: "PRD-0001".to_string(),
            name: "Toor Dal".to_string(),
            available: 3,
            requested: 5,
        }
        .into();
        assert_eq!(err.code, ErrorCode::InsufficientStock);
        assert!(err.message.contains("available 3, requested 5"));
    }

    #[test]
    fn test_product_in_use_is_a_business_error() {
        let err: ApiError = DbError::Core(CoreError::ProductInUse {
            product_id: "p1".to_string(),
            sku: "PRD-0001".to_string(),
            ledger_entries: 1,
            invoice_lines: 0,
        })
        .into();
        assert_eq!(err.code, ErrorCode::ProductInUse);
        assert_eq!(err.code.exit_code(), 5);
        assert_eq!(serde_json::to_value(err.code).unwrap(), "PRODUCT_IN_USE");
    }

    #[test]
    fn test_internal_details_are_hidden() {
        let err: ApiError = DbError::QueryFailed("no such column: secret".to_string()).into();
        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert!(!err.message.contains("secret"));
    }

    #[test]
    fn test_serialized_shape() {
        let err: ApiError = CoreError::Validation(ValidationError::Required {
            field: "reason".to_string(),
        })
        .into();
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], "VALIDATION_ERROR");
        assert_eq!(json["message"], "reason is required");
        assert_eq!(ErrorCode::Timeout.exit_code(), 6);
    }
}
