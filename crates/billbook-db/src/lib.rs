//! # billbook-db: Storage and Invoice Transaction for Billbook
//!
//! SQLite storage for the billing system, using sqlx for async access, plus
//! the invoice checkout that ties the repositories together.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Billbook Data Flow                               │
//! │                                                                         │
//! │  CLI command (invoice create)                                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    billbook-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐   ┌────────────────┐   ┌───────────────┐   │   │
//! │  │   │   Database    │   │ InvoiceCheckout│   │  Migrations   │   │   │
//! │  │   │   (pool.rs)   │   │ (checkout.rs)  │   │  (embedded)   │   │   │
//! │  │   │               │   │       │        │   │               │   │   │
//! │  │   │ SqlitePool    │   │       ▼        │   │ 001_initial_  │   │   │
//! │  │   │ BEGIN         │◄──│ Repositories   │   │ schema.sql    │   │   │
//! │  │   │ IMMEDIATE     │   │ owner, product │   │               │   │   │
//! │  │   │               │   │ cart, ledger,  │   │               │   │   │
//! │  │   │               │   │ inventory,     │   │               │   │   │
//! │  │   │               │   │ invoice        │   │               │   │   │
//! │  │   └───────────────┘   └────────────────┘   └───────────────┘   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (WAL)                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//! - [`checkout`] - The invoice transaction orchestrator
//!
//! ## Usage
//!
//! ```rust,ignore
//! use billbook_db::{Database, DbConfig};
//! use billbook_core::{CartLineUpdate, CreateInvoiceRequest};
//!
//! let db = Database::new(DbConfig::new("path/to/billbook.db")).await?;
//!
//! db.cart().upsert_line("owner-1", &product_id, CartLineUpdate::quantity(3)).await?;
//! let invoice = db
//!     .checkout()
//!     .create_invoice("owner-1", "cashier-7", CreateInvoiceRequest::default())
//!     .await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod checkout;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use checkout::{CheckoutConfig, CheckoutState, InvoiceCheckout};
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::cart::CartRepository;
pub use repository::inventory::InventoryStore;
pub use repository::invoice::InvoiceRepository;
pub use repository::ledger::StockLedger;
pub use repository::owner::OwnerRepository;
pub use repository::product::ProductRepository;
