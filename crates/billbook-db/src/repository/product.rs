//! # Product Repository
//!
//! Catalogue operations for products.
//!
//! ## Key Operations
//! - Create (opening stock goes through the inventory store)
//! - Lookup by id / SKU, search, low-stock listing
//! - Detail updates
//! - Delete, only while nothing references the product
//!
//! ## Stock Is Not Edited Here
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ProductRepository::update_details   name, price, tax, threshold...    │
//! │                                       ✗ never touches `stock`          │
//! │                                                                         │
//! │  InventoryStore (purchase / adjust / import / invoice sale)            │
//! │       └── UPDATE products SET stock ... + INSERT INTO stock_ledger     │
//! │           in the same transaction                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::pool::begin_write;
use crate::repository::inventory::{conflict_on_busy, InventoryStore};
use crate::repository::owner::OwnerRepository;
use billbook_core::validation::{
    normalize_optional, validate_new_product, validate_product_update, validate_search_query,
};
use billbook_core::{CoreError, NewLedgerEntry, NewProduct, Product, ProductUpdate, StockMovementType};

pub(crate) const PRODUCT_COLUMNS: &str = "id, owner_id, sku, name, category, hsn_code, price_cents, \
                                         tax_rate_bps, stock, low_stock_threshold, created_at, updated_at";

/// Prefix for suggested SKUs.
pub const SKU_PREFIX: &str = "PRD-";

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
///
/// let product = repo.create(owner, actor, NewProduct::new("PRD-0001", "Rice 5kg", price)).await?;
/// let results = repo.search(owner, "rice", 20).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Creates a product.
    ///
    /// The row starts at stock 0; a non-zero `opening_stock` is then written
    /// through the inventory store as a `manual_adjustment` ledger entry, in
    /// the same transaction, so stock and ledger agree from the first moment.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - SKU already exists for this owner
    pub async fn create(&self, owner_id: &str, actor_id: &str, product: NewProduct) -> DbResult<Product> {
        let product = normalize_new_product(product);
        validate_new_product(&product)?;

        debug!(owner_id = %owner_id, sku = %product.sku, "Creating product");

        let mut tx = begin_write(&self.pool).await.map_err(conflict_on_busy)?;
        OwnerRepository::ensure_exists_in(&mut tx, owner_id).await?;

        let id = Self::insert_in(&mut tx, owner_id, &product, Utc::now()).await?;

        if product.opening_stock > 0 {
            InventoryStore::apply_delta_in(
                &mut tx,
                owner_id,
                NewLedgerEntry {
                    product_id: id.clone(),
                    delta: product.opening_stock,
                    movement_type: StockMovementType::ManualAdjustment,
                    reason: "Opening stock".to_string(),
                    actor_id: actor_id.to_string(),
                    reference_id: None,
                },
            )
            .await?;
        }

        let created = Self::require_in(&mut tx, owner_id, &id).await?;
        tx.commit().await?;
        Ok(created)
    }

    /// Inserts a product row at stock 0 inside the caller's transaction.
    pub(crate) async fn insert_in(
        conn: &mut SqliteConnection,
        owner_id: &str,
        product: &NewProduct,
        now: DateTime<Utc>,
    ) -> DbResult<String> {
        let id = Uuid::new_v4().to_string();

        sqlx::query(
            r#"
            INSERT INTO products (
                id, owner_id, sku, name, category, hsn_code,
                price_cents, tax_rate_bps, stock, low_stock_threshold,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0, ?9, ?10, ?10)
            "#,
        )
        .bind(&id)
        .bind(owner_id)
        .bind(&product.sku)
        .bind(&product.name)
        .bind(&product.category)
        .bind(&product.hsn_code)
        .bind(product.price_cents)
        .bind(product.tax_rate_bps)
        .bind(product.low_stock_threshold)
        .bind(now)
        .execute(&mut *conn)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("sku", &product.sku),
            other => other,
        })?;

        Ok(id)
    }

    /// Gets a product by its ID (owner-scoped).
    pub async fn get_by_id(&self, owner_id: &str, id: &str) -> DbResult<Option<Product>> {
        let mut conn = self.pool.acquire().await?;
        Self::get_in(&mut conn, owner_id, id).await
    }

    /// Gets a product by its ID, failing with `ProductNotFound`.
    pub async fn require(&self, owner_id: &str, id: &str) -> DbResult<Product> {
        self.get_by_id(owner_id, id)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(id.to_string()).into())
    }

    /// Gets a product by its SKU (owner-scoped).
    pub async fn get_by_sku(&self, owner_id: &str, sku: &str) -> DbResult<Option<Product>> {
        let mut conn = self.pool.acquire().await?;
        Self::get_by_sku_in(&mut conn, owner_id, sku).await
    }

    pub(crate) async fn get_in(
        conn: &mut SqliteConnection,
        owner_id: &str,
        id: &str,
    ) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1 AND owner_id = ?2");
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .bind(owner_id)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(product)
    }

    pub(crate) async fn require_in(
        conn: &mut SqliteConnection,
        owner_id: &str,
        id: &str,
    ) -> DbResult<Product> {
        Self::get_in(conn, owner_id, id)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(id.to_string()).into())
    }

    pub(crate) async fn get_by_sku_in(
        conn: &mut SqliteConnection,
        owner_id: &str,
        sku: &str,
    ) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE sku = ?1 AND owner_id = ?2");
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(sku.trim())
            .bind(owner_id)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(product)
    }

    /// Searches products by name, SKU or category.
    ///
    /// An empty query lists products by name.
    pub async fn search(&self, owner_id: &str, query: &str, limit: u32) -> DbResult<Vec<Product>> {
        let query = validate_search_query(query)?;

        debug!(owner_id = %owner_id, query = %query, limit = %limit, "Searching products");

        let pattern = format!("%{}%", escape_like(&query));
        let sql = format!(
            r#"
            SELECT {PRODUCT_COLUMNS} FROM products
            WHERE owner_id = ?1
              AND (?2 = '' OR name LIKE ?3 ESCAPE '\' OR sku LIKE ?3 ESCAPE '\'
                   OR category LIKE ?3 ESCAPE '\')
            ORDER BY name, sku
            LIMIT ?4
            "#
        );

        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(owner_id)
            .bind(&query)
            .bind(&pattern)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = products.len(), "Search returned products");
        Ok(products)
    }

    /// Lists products at or below their low-stock threshold, emptiest first.
    pub async fn low_stock(&self, owner_id: &str) -> DbResult<Vec<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE owner_id = ?1 AND stock <= low_stock_threshold \
             ORDER BY stock, name"
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(products)
    }

    /// Suggests the next free `PRD-NNNN` SKU for an owner.
    ///
    /// Looks at the numeric suffix of existing `PRD-` SKUs and returns one
    /// past the highest.
    pub async fn next_sku(&self, owner_id: &str) -> DbResult<String> {
        let skus: Vec<String> =
            sqlx::query_scalar("SELECT sku FROM products WHERE owner_id = ?1 AND sku LIKE 'PRD-%'")
                .bind(owner_id)
                .fetch_all(&self.pool)
                .await?;

        let highest = skus
            .iter()
            .filter_map(|sku| sku.strip_prefix(SKU_PREFIX))
            .filter_map(|suffix| suffix.parse::<u64>().ok())
            .max()
            .unwrap_or(0);

        Ok(format!("{SKU_PREFIX}{:04}", highest + 1))
    }

    /// Updates product details. Omitted fields are left as they are.
    ///
    /// Price changes do not reach lines already in a cart: those carry the
    /// price they were added at.
    pub async fn update_details(
        &self,
        owner_id: &str,
        id: &str,
        update: ProductUpdate,
    ) -> DbResult<Product> {
        validate_product_update(&update)?;

        debug!(owner_id = %owner_id, id = %id, "Updating product details");

        let result = sqlx::query(
            r#"
            UPDATE products SET
                name = COALESCE(?3, name),
                category = COALESCE(?4, category),
                hsn_code = COALESCE(?5, hsn_code),
                price_cents = COALESCE(?6, price_cents),
                tax_rate_bps = COALESCE(?7, tax_rate_bps),
                low_stock_threshold = COALESCE(?8, low_stock_threshold),
                updated_at = ?9
            WHERE id = ?1 AND owner_id = ?2
            "#,
        )
        .bind(id)
        .bind(owner_id)
        .bind(update.name.map(|n| n.trim().to_string()))
        .bind(normalize_optional(update.category))
        .bind(normalize_optional(update.hsn_code))
        .bind(update.price_cents)
        .bind(update.tax_rate_bps)
        .bind(update.low_stock_threshold)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::ProductNotFound(id.to_string()).into());
        }

        self.require(owner_id, id).await
    }

    /// Deletes a product that has never moved stock or been invoiced.
    ///
    /// Any cart line for the product goes with it. A product with ledger
    /// entries or invoice lines stays, so history keeps pointing at a row.
    ///
    /// ## Errors
    /// * `CoreError::ProductNotFound` - product does not belong to this owner
    /// * `CoreError::ProductInUse` - ledger entries or invoice lines reference it
    pub async fn delete(&self, owner_id: &str, id: &str) -> DbResult<()> {
        debug!(owner_id = %owner_id, id = %id, "Deleting product");

        let mut tx = begin_write(&self.pool).await.map_err(conflict_on_busy)?;
        let product = Self::require_in(&mut tx, owner_id, id).await?;

        let ledger_entries: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM stock_ledger WHERE owner_id = ?1 AND product_id = ?2")
                .bind(owner_id)
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;
        let invoice_lines: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM invoice_lines WHERE owner_id = ?1 AND product_id = ?2")
                .bind(owner_id)
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;

        if ledger_entries > 0 || invoice_lines > 0 {
            return Err(CoreError::ProductInUse {
                product_id: product.id,
                sku: product.sku,
                ledger_entries,
                invoice_lines,
            }
            .into());
        }

        let cart_lines = sqlx::query("DELETE FROM cart_lines WHERE owner_id = ?1 AND product_id = ?2")
            .bind(owner_id)
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        sqlx::query("DELETE FROM products WHERE id = ?1 AND owner_id = ?2")
            .bind(id)
            .bind(owner_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(owner_id = %owner_id, sku = %product.sku, cart_lines, "Product deleted");
        Ok(())
    }

    /// Counts products for an owner.
    pub async fn count(&self, owner_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE owner_id = ?1")
            .bind(owner_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

fn normalize_new_product(product: NewProduct) -> NewProduct {
    NewProduct {
        sku: product.sku.trim().to_string(),
        name: product.name.trim().to_string(),
        category: normalize_optional(product.category),
        hsn_code: normalize_optional(product.hsn_code),
        ..product
    }
}

fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use billbook_core::{Money, OwnerProfile};

    async fn setup() -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        for owner in ["owner-a", "owner-b"] {
            db.owners()
                .register(
                    owner,
                    OwnerProfile {
                        business_name: format!("{owner} traders"),
                        ..Default::default()
                    },
                )
                .await
                .unwrap();
        }
        db
    }

    #[tokio::test]
    async fn test_create_with_opening_stock_writes_ledger() {
        let db = setup().await;
        let product = db
            .products()
            .create(
                "owner-a",
                "admin",
                NewProduct::new("PRD-0001", "Basmati Rice 5kg", Money::from_cents(45_000))
                    .with_opening_stock(12),
            )
            .await
            .unwrap();

        assert_eq!(product.stock, 12);
        assert_eq!(db.ledger().balance_for("owner-a", &product.id).await.unwrap(), 12);
    }

    #[tokio::test]
    async fn test_duplicate_sku_per_owner_only() {
        let db = setup().await;
        let repo = db.products();
        let p = || NewProduct::new("PRD-0001", "Rice", Money::from_cents(100));

        repo.create("owner-a", "admin", p()).await.unwrap();
        let err = repo.create("owner-a", "admin", p()).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));

        // Same SKU under a different owner is fine
        repo.create("owner-b", "admin", p()).await.unwrap();
    }

    #[tokio::test]
    async fn test_reads_are_owner_scoped() {
        let db = setup().await;
        let product = db
            .products()
            .create("owner-a", "admin", NewProduct::new("PRD-0001", "Rice", Money::from_cents(100)))
            .await
            .unwrap();

        assert!(db.products().get_by_id("owner-b", &product.id).await.unwrap().is_none());
        assert!(db.products().get_by_sku("owner-b", "PRD-0001").await.unwrap().is_none());
        assert!(db.products().search("owner-b", "Rice", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_and_low_stock() {
        let db = setup().await;
        let repo = db.products();
        repo.create(
            "owner-a",
            "admin",
            NewProduct::new("PRD-0001", "Toor Dal 1kg", Money::from_cents(16_000))
                .with_category("Pulses")
                .with_opening_stock(50),
        )
        .await
        .unwrap();
        repo.create(
            "owner-a",
            "admin",
            NewProduct::new("PRD-0002", "Moong Dal 1kg", Money::from_cents(14_000))
                .with_opening_stock(2),
        )
        .await
        .unwrap();

        assert_eq!(repo.search("owner-a", "dal", 10).await.unwrap().len(), 2);
        assert_eq!(repo.search("owner-a", "pulses", 10).await.unwrap().len(), 1);
        assert_eq!(repo.search("owner-a", "", 10).await.unwrap().len(), 2);
        // LIKE wildcards in the query are literal
        assert!(repo.search("owner-a", "%", 10).await.unwrap().is_empty());

        let low = repo.low_stock("owner-a").await.unwrap();
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].sku, "PRD-0002");
    }

    #[tokio::test]
    async fn test_next_sku() {
        let db = setup().await;
        let repo = db.products();
        assert_eq!(repo.next_sku("owner-a").await.unwrap(), "PRD-0001");

        repo.create("owner-a", "admin", NewProduct::new("PRD-0009", "A", Money::zero()))
            .await
            .unwrap();
        repo.create("owner-a", "admin", NewProduct::new("CUSTOM-77", "B", Money::zero()))
            .await
            .unwrap();

        assert_eq!(repo.next_sku("owner-a").await.unwrap(), "PRD-0010");
        assert_eq!(repo.next_sku("owner-b").await.unwrap(), "PRD-0001");
    }

    #[tokio::test]
    async fn test_update_details_never_touches_stock() {
        let db = setup().await;
        let repo = db.products();
        let product = repo
            .create(
                "owner-a",
                "admin",
                NewProduct::new("PRD-0001", "Rice", Money::from_cents(100)).with_opening_stock(7),
            )
            .await
            .unwrap();

        let updated = repo
            .update_details(
                "owner-a",
                &product.id,
                ProductUpdate {
                    price_cents: Some(150),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.price_cents, 150);
        assert_eq!(updated.name, "Rice");
        assert_eq!(updated.stock, 7);

        let err = repo
            .update_details("owner-b", &product.id, ProductUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(err.as_core(), Some(CoreError::ProductNotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_unreferenced_product_drops_cart_line() {
        let db = setup().await;
        let repo = db.products();
        let product = repo
            .create("owner-a", "admin", NewProduct::new("PRD-0001", "Rice", Money::from_cents(100)))
            .await
            .unwrap();

        // No stock means the cart API refuses the line, so stage it directly
        sqlx::query(
            "INSERT INTO cart_lines (id, owner_id, product_id, quantity, unit_price_cents, tax_rate_bps, \
             created_at, updated_at) VALUES ('line-1', 'owner-a', ?1, 2, 100, 1800, 'now', 'now')",
        )
        .bind(&product.id)
        .execute(db.pool())
        .await
        .unwrap();

        let err = repo.delete("owner-b", &product.id).await.unwrap_err();
        assert!(matches!(err.as_core(), Some(CoreError::ProductNotFound(_))));

        repo.delete("owner-a", &product.id).await.unwrap();
        assert!(repo.get_by_id("owner-a", &product.id).await.unwrap().is_none());
        assert!(db.cart().list_lines("owner-a").await.unwrap().is_empty());

        let err = repo.delete("owner-a", &product.id).await.unwrap_err();
        assert!(matches!(err.as_core(), Some(CoreError::ProductNotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_refuses_product_with_history() {
        let db = setup().await;
        let repo = db.products();
        let product = repo
            .create(
                "owner-a",
                "admin",
                NewProduct::new("PRD-0001", "Rice", Money::from_cents(100)).with_opening_stock(5),
            )
            .await
            .unwrap();
        db.inventory().adjust("owner-a", &product.id, -5, "Written off", "admin").await.unwrap();

        // Stock is back to zero but the ledger still remembers it
        let err = repo.delete("owner-a", &product.id).await.unwrap_err();
        match err.as_core() {
            Some(CoreError::ProductInUse { sku, ledger_entries, invoice_lines, .. }) => {
                assert_eq!(sku, "PRD-0001");
                assert_eq!(*ledger_entries, 2);
                assert_eq!(*invoice_lines, 0);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(repo.get_by_id("owner-a", &product.id).await.unwrap().is_some());
        assert_eq!(db.ledger().balance_for("owner-a", &product.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_writes_report_lock_contention_as_conflict() {
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
        let product = db
            .products()
            .create("owner-a", "admin", NewProduct::new("PRD-0001", "Rice", Money::zero()))
            .await
            .unwrap();

        let held = db.begin_write().await.unwrap();

        let err = db
            .products()
            .create("owner-a", "admin", NewProduct::new("PRD-0002", "Dal", Money::zero()))
            .await
            .unwrap_err();
        assert!(matches!(err.as_core(), Some(CoreError::ConcurrencyConflict { .. })), "{err:?}");

        let err = db.products().delete("owner-a", &product.id).await.unwrap_err();
        assert!(matches!(err.as_core(), Some(CoreError::ConcurrencyConflict { .. })), "{err:?}");

        held.rollback().await.unwrap();
        db.products().delete("owner-a", &product.id).await.unwrap();
    }

    #[tokio::test]
    async fn test_create_for_unknown_owner() {
        let db = setup().await;
        let err = db
            .products()
            .create("ghost", "admin", NewProduct::new("PRD-0001", "Rice", Money::zero()))
            .await
            .unwrap_err();
        assert!(matches!(err.as_core(), Some(CoreError::OwnerNotFound(_))));
    }
}
