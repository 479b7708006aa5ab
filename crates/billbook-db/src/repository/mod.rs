//! # Repository Module
//!
//! Database repository implementations for Billbook.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  CLI command / checkout                                                │
//! │       │                                                                 │
//! │       │  db.cart().upsert_line(owner, product, update)                 │
//! │       ▼                                                                 │
//! │  Repository (holds a SqlitePool clone)                                 │
//! │  ├── &self methods      open their own connection / transaction        │
//! │  └── *_in(conn, ..)     run inside the caller's transaction            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database (every query filtered by owner_id)                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The `*_in` associated functions never begin or commit; they exist so the
//! invoice checkout can compose several repositories inside one transaction.
//!
//! ## Available Repositories
//!
//! - [`OwnerRepository`](owner::OwnerRepository) - Tenant profile, invoice numbering
//! - [`ProductRepository`](product::ProductRepository) - Catalogue CRUD and search
//! - [`CartRepository`](cart::CartRepository) - Durable per-owner cart
//! - [`StockLedger`](ledger::StockLedger) - Append-only stock movements
//! - [`InventoryStore`](inventory::InventoryStore) - The only writer of `products.stock`
//! - [`InvoiceRepository`](invoice::InvoiceRepository) - Invoice persistence and reads

pub mod cart;
pub mod inventory;
pub mod invoice;
pub mod ledger;
pub mod owner;
pub mod product;
