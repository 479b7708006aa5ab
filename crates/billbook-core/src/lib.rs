//! # billbook-core: Pure Business Logic for Billbook
//!
//! This crate contains the billing rules as pure functions with zero I/O
//! dependencies. Storage, locking and transactions live in `billbook-db`.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Billbook Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    billbook-cli                                 │   │
//! │  │    cart set ──► invoice create ──► invoice show                 │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ billbook-core (THIS CRATE) ★                    │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │    tax    │  │ validation│  │   │
//! │  │   │  Product  │  │   Money   │  │  TaxCalc  │  │   rules   │  │   │
//! │  │   │  Invoice  │  │  TaxRate  │  │  GST split│  │  checks   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 billbook-db (Database Layer)                    │   │
//! │  │     SQLite, repositories, stock ledger, invoice transaction     │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, CartLine, Invoice, ledger entries)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`tax`] - Tax calculator: discounts, taxable amount, GST components
//! - [`request`] - Invoice request body and its defaults
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Example Usage
//!
//! ```rust
//! use billbook_core::tax::{calculate, TaxLineInput};
//! use billbook_core::{Discount, Money, TaxRate, TaxRegime};
//!
//! let lines = [TaxLineInput::new(Money::from_cents(10_000), 3, Discount::none())];
//! let summary = calculate(&lines, TaxRate::from_bps(1800), TaxRegime::CgstSgst, Money::zero())
//!     .unwrap();
//!
//! assert_eq!(summary.taxable.cents(), 30_000);
//! assert_eq!(summary.tax.cgst.cents(), 2_700);
//! assert_eq!(summary.grand_total.cents(), 35_400);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod request;
pub mod tax;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use request::{CreateInvoiceRequest, InvoiceOptions};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// GST rate applied when an invoice request does not name one (18%).
pub const DEFAULT_GST_BPS: u32 = 1800;

/// GST slabs in practical use, in basis points.
pub const STANDARD_GST_SLABS_BPS: [u32; 5] = [0, 500, 1200, 1800, 2800];

/// Customer name recorded when the invoice request leaves it blank.
pub const WALK_IN_CUSTOMER: &str = "Walk-in Customer";

/// Default low-stock threshold for new products.
pub const DEFAULT_LOW_STOCK_THRESHOLD: i64 = 5;

/// Maximum distinct lines allowed in a single cart.
pub const MAX_CART_LINES: usize = 200;

/// Maximum quantity of a single product in a cart.
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g., typing 10000 instead of 100)
pub const MAX_ITEM_QUANTITY: i64 = 9_999;

/// Largest round-off, either sign, accepted on an invoice (₹100.00).
///
/// Round-off only nudges a total to a cash-friendly figure.
pub const MAX_ROUND_OFF_CENTS: i64 = 10_000;
