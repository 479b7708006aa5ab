//! # Inventory Store
//!
//! The only code that changes `products.stock`.
//!
//! ## One Path For Every Writer
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  purchase ─────────┐                                                    │
//! │  adjust ───────────┤                                                    │
//! │  import_stock ─────┼──► apply_delta_in(conn, owner, NewLedgerEntry)     │
//! │  opening stock ────┤        │                                           │
//! │  invoice sale ─────┘        │  (reserve_and_decrement_in)               │
//! │                             ▼                                           │
//! │              1. re-read product row (owner-scoped)                      │
//! │              2. stock + delta < 0 ? ──► InsufficientStock               │
//! │              3. UPDATE products SET stock = stock + delta               │
//! │                 WHERE ... AND stock + delta >= 0 RETURNING stock        │
//! │              4. StockLedger::append_in(.., balance_after)               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Concurrency
//! Callers hold a `BEGIN IMMEDIATE` transaction, so only one writer runs at a
//! time and step 1 always sees committed state. The conditional UPDATE in
//! step 3 is a second guard: if it matches no row the stock moved under us,
//! which is reported as `ConcurrencyConflict` rather than overselling. The
//! `CHECK (stock >= 0)` column constraint is the last line.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::pool::begin_write;
use crate::repository::ledger::StockLedger;
use crate::repository::owner::OwnerRepository;
use crate::repository::product::ProductRepository;
use billbook_core::validation::{validate_ledger_delta, validate_quantity, validate_sku};
use billbook_core::{
    CoreError, ImportSummary, Money, NewLedgerEntry, NewProduct, StockImportRow, StockLedgerEntry,
    StockMovementType, ValidationError,
};

/// Category given to products created by a bulk import.
pub const IMPORTED_CATEGORY: &str = "Imported";

/// Store for stock mutations. Every method writes a ledger entry.
#[derive(Debug, Clone)]
pub struct InventoryStore {
    pool: SqlitePool,
}

impl InventoryStore {
    /// Creates a new InventoryStore.
    pub fn new(pool: SqlitePool) -> Self {
        InventoryStore { pool }
    }

    // =========================================================================
    // Transaction-scoped operations
    // =========================================================================

    /// Applies a signed stock change and its ledger entry in the caller's
    /// transaction.
    ///
    /// ## Errors
    /// * `ValidationError::Zero` - zero delta
    /// * `CoreError::ProductNotFound` - no such product for this owner
    /// * `CoreError::InsufficientStock` - stock would go below zero
    /// * `CoreError::ConcurrencyConflict` - the row changed between read and write
    pub async fn apply_delta_in(
        conn: &mut SqliteConnection,
        owner_id: &str,
        entry: NewLedgerEntry,
    ) -> DbResult<StockLedgerEntry> {
        validate_ledger_delta(entry.delta)?;

        let product = ProductRepository::require_in(&mut *conn, owner_id, &entry.product_id).await?;

        let projected = product
            .stock
            .checked_add(entry.delta)
            .ok_or_else(|| ValidationError::OutOfRange {
                field: "delta".to_string(),
                min: -product.stock,
                max: i64::MAX - product.stock,
            })?;

        if projected < 0 {
            return Err(CoreError::InsufficientStock {
                product_id: product.id,
                sku: product.sku,
                name: product.name,
                available: product.stock,
                requested: -entry.delta,
            }
            .into());
        }

        let balance_after: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE products
            SET stock = stock + ?3, updated_at = ?4
            WHERE id = ?1 AND owner_id = ?2 AND stock + ?3 >= 0
            RETURNING stock
            "#,
        )
        .bind(&entry.product_id)
        .bind(owner_id)
        .bind(entry.delta)
        .bind(Utc::now())
        .fetch_optional(&mut *conn)
        .await?;

        let balance_after = balance_after.ok_or_else(|| CoreError::ConcurrencyConflict {
            resource: format!("product {}", entry.product_id),
        })?;

        debug!(
            owner_id = %owner_id,
            product_id = %entry.product_id,
            delta = entry.delta,
            stock = balance_after,
            "Stock updated"
        );

        StockLedger::append_in(conn, owner_id, &entry, balance_after).await
    }

    /// Re-validates and decrements stock for one invoice line, writing an
    /// `invoice_sale` ledger entry, in the caller's transaction.
    ///
    /// This is the authoritative stock check for invoicing. Any earlier
    /// check (cart add, checkout pre-flight) is advisory.
    pub async fn reserve_and_decrement_in(
        conn: &mut SqliteConnection,
        owner_id: &str,
        product_id: &str,
        quantity: i64,
        actor_id: &str,
        invoice_id: &str,
        invoice_number: &str,
    ) -> DbResult<StockLedgerEntry> {
        validate_quantity(quantity)?;

        Self::apply_delta_in(
            conn,
            owner_id,
            NewLedgerEntry {
                product_id: product_id.to_string(),
                delta: -quantity,
                movement_type: StockMovementType::InvoiceSale,
                reason: format!("Sale: {invoice_number}"),
                actor_id: actor_id.to_string(),
                reference_id: Some(invoice_id.to_string()),
            },
        )
        .await
    }

    // =========================================================================
    // Self-contained writers (own transaction)
    // =========================================================================

    /// Receives goods from a supplier.
    pub async fn purchase(
        &self,
        owner_id: &str,
        product_id: &str,
        quantity: i64,
        supplier: &str,
        actor_id: &str,
    ) -> DbResult<StockLedgerEntry> {
        validate_quantity(quantity)?;
        let supplier = supplier.trim();
        if supplier.is_empty() {
            return Err(ValidationError::Required {
                field: "supplier".to_string(),
            }
            .into());
        }

        info!(owner_id = %owner_id, product_id = %product_id, quantity, supplier = %supplier, "Recording purchase");

        self.apply_one(
            owner_id,
            NewLedgerEntry {
                product_id: product_id.to_string(),
                delta: quantity,
                movement_type: StockMovementType::Purchase,
                reason: format!("Supplier: {supplier}"),
                actor_id: actor_id.to_string(),
                reference_id: None,
            },
        )
        .await
    }

    /// Applies a signed manual correction. A reason is required.
    pub async fn adjust(
        &self,
        owner_id: &str,
        product_id: &str,
        delta: i64,
        reason: &str,
        actor_id: &str,
    ) -> DbResult<StockLedgerEntry> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(ValidationError::Required {
                field: "reason".to_string(),
            }
            .into());
        }

        info!(owner_id = %owner_id, product_id = %product_id, delta, "Manual stock adjustment");

        self.apply_one(
            owner_id,
            NewLedgerEntry {
                product_id: product_id.to_string(),
                delta,
                movement_type: StockMovementType::ManualAdjustment,
                reason: reason.to_string(),
                actor_id: actor_id.to_string(),
                reference_id: None,
            },
        )
        .await
    }

    /// Imports stock rows from the bulk import collaborator.
    ///
    /// ## Rules
    /// - Rows with a blank SKU or zero quantity are skipped
    /// - Unknown SKUs create a product (price 0, category `Imported`,
    ///   name from the row or the SKU)
    /// - Each remaining row is one `import` ledger entry
    ///
    /// The whole import is one transaction: if any row fails (e.g. would
    /// drive stock negative) nothing is imported.
    pub async fn import_stock(
        &self,
        owner_id: &str,
        rows: &[StockImportRow],
        actor_id: &str,
    ) -> DbResult<ImportSummary> {
        info!(owner_id = %owner_id, rows = rows.len(), "Importing stock");

        let mut summary = ImportSummary::default();
        let mut tx = begin_write(&self.pool).await.map_err(conflict_on_busy)?;
        OwnerRepository::ensure_exists_in(&mut tx, owner_id).await?;

        for row in rows {
            let sku = row.sku.trim();
            if sku.is_empty() || row.quantity == 0 {
                summary.skipped += 1;
                continue;
            }
            validate_sku(sku)?;

            let product_id = match ProductRepository::get_by_sku_in(&mut tx, owner_id, sku).await? {
                Some(existing) => {
                    summary.updated += 1;
                    existing.id
                }
                None => {
                    let name = row
                        .name
                        .as_deref()
                        .map(str::trim)
                        .filter(|n| !n.is_empty())
                        .unwrap_or(sku);
                    let new_product =
                        NewProduct::new(sku, name, Money::zero()).with_category(IMPORTED_CATEGORY);
                    summary.created += 1;
                    ProductRepository::insert_in(&mut tx, owner_id, &new_product, Utc::now()).await?
                }
            };

            Self::apply_delta_in(
                &mut tx,
                owner_id,
                NewLedgerEntry {
                    product_id,
                    delta: row.quantity,
                    movement_type: StockMovementType::Import,
                    reason: "Bulk stock import".to_string(),
                    actor_id: actor_id.to_string(),
                    reference_id: None,
                },
            )
            .await?;
        }

        tx.commit().await?;

        info!(
            owner_id = %owner_id,
            created = summary.created,
            updated = summary.updated,
            skipped = summary.skipped,
            "Stock import committed"
        );
        Ok(summary)
    }

    async fn apply_one(&self, owner_id: &str, entry: NewLedgerEntry) -> DbResult<StockLedgerEntry> {
        let mut tx = begin_write(&self.pool).await.map_err(conflict_on_busy)?;
        let written = Self::apply_delta_in(&mut tx, owner_id, entry).await?;
        tx.commit().await?;
        Ok(written)
    }
}

/// Maps lock contention to the retryable domain error.
pub(crate) fn conflict_on_busy(err: DbError) -> DbError {
    match err {
        DbError::Busy(msg) => CoreError::ConcurrencyConflict { resource: msg }.into(),
        other => other,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use billbook_core::{LedgerFilter, OwnerProfile};

    async fn setup(stock: i64) -> (Database, String) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.owners()
            .register(
                "owner-a",
                OwnerProfile {
                    business_name: "A".to_string(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let product = db
            .products()
            .create(
                "owner-a",
                "admin",
                NewProduct::new("PRD-0001", "Rice", Money::from_cents(100)).with_opening_stock(stock),
            )
            .await
            .unwrap();
        (db, product.id)
    }

    #[tokio::test]
    async fn test_purchase_and_adjust_keep_ledger_in_step() {
        let (db, id) = setup(3).await;
        let inv = db.inventory();

        inv.purchase("owner-a", &id, 10, "Metro", "admin").await.unwrap();
        inv.adjust("owner-a", &id, -4, "Damaged in transit", "admin").await.unwrap();

        let product = db.products().require("owner-a", &id).await.unwrap();
        assert_eq!(product.stock, 9);
        assert_eq!(db.ledger().balance_for("owner-a", &id).await.unwrap(), 9);
        assert!(db.ledger().verify_all("owner-a").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_adjust_below_zero_is_insufficient_stock() {
        let (db, id) = setup(3).await;
        let err = db.inventory().adjust("owner-a", &id, -4, "count", "admin").await.unwrap_err();

        match err {
            DbError::Core(CoreError::InsufficientStock { available, requested, .. }) => {
                assert_eq!(available, 3);
                assert_eq!(requested, 4);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(db.products().require("owner-a", &id).await.unwrap().stock, 3);
        assert_eq!(db.ledger().balance_for("owner-a", &id).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_writers_validate_input() {
        let (db, id) = setup(3).await;
        let inv = db.inventory();

        assert!(inv.purchase("owner-a", &id, 0, "Metro", "admin").await.is_err());
        assert!(inv.purchase("owner-a", &id, 5, "  ", "admin").await.is_err());
        assert!(inv.adjust("owner-a", &id, 0, "why", "admin").await.is_err());
        assert!(inv.adjust("owner-a", &id, 2, "", "admin").await.is_err());

        let err = inv.purchase("owner-b", &id, 5, "Metro", "admin").await.unwrap_err();
        assert!(matches!(err.as_core(), Some(CoreError::ProductNotFound(_))));
    }

    #[tokio::test]
    async fn test_reserve_and_decrement() {
        let (db, id) = setup(5).await;

        let mut tx = db.begin_write().await.unwrap();
        let entry = InventoryStore::reserve_and_decrement_in(
            &mut tx, "owner-a", &id, 5, "cashier", "inv-1", "INV-000001",
        )
        .await
        .unwrap();
        assert_eq!(entry.balance_after, 0);
        assert_eq!(entry.movement_type, StockMovementType::InvoiceSale);
        assert_eq!(entry.reference_id.as_deref(), Some("inv-1"));

        let err = InventoryStore::reserve_and_decrement_in(
            &mut tx, "owner-a", &id, 1, "cashier", "inv-1", "INV-000001",
        )
        .await
        .unwrap_err();
        assert!(matches!(err.as_core(), Some(CoreError::InsufficientStock { .. })));
        tx.rollback().await.unwrap();

        assert_eq!(db.products().require("owner-a", &id).await.unwrap().stock, 5);
    }

    #[tokio::test]
    async fn test_import_creates_updates_and_skips() {
        let (db, id) = setup(2).await;
        let rows = vec![
            StockImportRow { sku: "PRD-0001".to_string(), name: None, quantity: 8 },
            StockImportRow { sku: "NEW-1".to_string(), name: Some("Jaggery 1kg".to_string()), quantity: 20 },
            StockImportRow { sku: "NEW-2".to_string(), name: None, quantity: 3 },
            StockImportRow { sku: "  ".to_string(), name: None, quantity: 4 },
            StockImportRow { sku: "NEW-3".to_string(), name: None, quantity: 0 },
        ];

        let summary = db.inventory().import_stock("owner-a", &rows, "admin").await.unwrap();
        assert_eq!(summary, ImportSummary { created: 2, updated: 1, skipped: 2 });

        assert_eq!(db.products().require("owner-a", &id).await.unwrap().stock, 10);

        let jaggery = db.products().get_by_sku("owner-a", "NEW-1").await.unwrap().unwrap();
        assert_eq!(jaggery.name, "Jaggery 1kg");
        assert_eq!(jaggery.price_cents, 0);
        assert_eq!(jaggery.category.as_deref(), Some(IMPORTED_CATEGORY));
        assert_eq!(jaggery.stock, 20);

        let unnamed = db.products().get_by_sku("owner-a", "NEW-2").await.unwrap().unwrap();
        assert_eq!(unnamed.name, "NEW-2");

        let imports = db
            .ledger()
            .history(
                "owner-a",
                &LedgerFilter {
                    movement_type: Some(StockMovementType::Import),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(imports.len(), 3);
        assert!(db.ledger().verify_all("owner-a").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_import_changes_nothing() {
        let (db, id) = setup(2).await;
        let rows = vec![
            StockImportRow { sku: "NEW-1".to_string(), name: None, quantity: 5 },
            StockImportRow { sku: "PRD-0001".to_string(), name: None, quantity: -3 },
        ];

        let err = db.inventory().import_stock("owner-a", &rows, "admin").await.unwrap_err();
        assert!(matches!(err.as_core(), Some(CoreError::InsufficientStock { .. })));

        assert!(db.products().get_by_sku("owner-a", "NEW-1").await.unwrap().is_none());
        assert_eq!(db.products().require("owner-a", &id).await.unwrap().stock, 2);
    }

    #[tokio::test]
    async fn test_import_under_lock_contention_is_a_conflict() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(
            DbConfig::new(dir.path().join("billbook.db"))
                .max_connections(2)
                .busy_timeout(std::time::Duration::from_millis(50)),
        )
        .await
        .unwrap();
        db.owners()
            .register("owner-a", OwnerProfile { business_name: "A".to_string(), ..Default::default() })
            .await
            .unwrap();
        let rows = vec![StockImportRow { sku: "NEW-1".to_string(), name: None, quantity: 5 }];

        let held = db.begin_write().await.unwrap();
        let err = db.inventory().import_stock("owner-a", &rows, "admin").await.unwrap_err();
        assert!(matches!(err.as_core(), Some(CoreError::ConcurrencyConflict { .. })), "{err:?}");
        held.rollback().await.unwrap();

        let summary = db.inventory().import_stock("owner-a", &rows, "admin").await.unwrap();
        assert_eq!(summary.created, 1);
    }
}
