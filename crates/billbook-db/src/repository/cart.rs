//! # Cart Repository
//!
//! The durable per-owner cart: at most one line per product.
//!
//! ## Upsert Semantics
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  upsert_line(owner, product, { quantity?, discount? })                  │
//! │                                                                         │
//! │  line exists?                                                           │
//! │  ├── yes ── quantity == 0       ──► delete            ──► Removed       │
//! │  │      └── otherwise           ──► set supplied fields ──► Updated     │
//! │  └── no  ── quantity == 0       ──► nothing            ──► Unchanged    │
//! │         ├── quantity missing    ──► ValidationError::Required           │
//! │         └── quantity > 0        ──► insert with price/tax snapshot      │
//! │                                                        ──► Created      │
//! │                                                                         │
//! │  Any positive quantity is soft-checked against current stock.          │
//! │  The authoritative check happens again at invoice time.                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Unit price and tax rate are copied from the product when the line is
//! first created. Later catalogue edits do not reprice the cart.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use crate::pool::begin_write;
use crate::repository::inventory::conflict_on_busy;
use crate::repository::owner::OwnerRepository;
use crate::repository::product::ProductRepository;
use billbook_core::validation::{validate_cart_quantity, validate_cart_size};
use billbook_core::{
    CartLine, CartLineUpdate, CartUpsertOutcome, CoreError, Discount, Product, ValidationError,
};

const CART_LINE_SELECT: &str = r#"
    SELECT c.id, c.owner_id, c.product_id, c.quantity, c.unit_price_cents,
           c.discount_kind, c.discount_value, c.tax_rate_bps,
           p.sku, p.name, p.hsn_code, p.stock AS current_stock,
           c.created_at, c.updated_at
    FROM cart_lines c
    JOIN products p ON p.id = c.product_id AND p.owner_id = c.owner_id
"#;

/// Repository for cart operations.
#[derive(Debug, Clone)]
pub struct CartRepository {
    pool: SqlitePool,
}

impl CartRepository {
    /// Creates a new CartRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CartRepository { pool }
    }

    /// Adds, updates or removes the cart line for a product.
    ///
    /// Repeating the same update leaves the cart as it was after the first.
    ///
    /// ## Errors
    /// * `CoreError::ProductNotFound` - product does not belong to this owner
    /// * `CoreError::InsufficientStock` - requested quantity above current stock
    /// * `ValidationError` - negative quantity, missing quantity for a new
    ///   line, invalid discount, cart full
    pub async fn upsert_line(
        &self,
        owner_id: &str,
        product_id: &str,
        update: CartLineUpdate,
    ) -> DbResult<CartUpsertOutcome> {
        if let Some(qty) = update.quantity {
            validate_cart_quantity(qty)?;
        }
        if let Some(discount) = update.discount {
            Discount::new(discount.kind, discount.value)?;
        }

        let mut tx = begin_write(&self.pool).await.map_err(conflict_on_busy)?;
        OwnerRepository::ensure_exists_in(&mut tx, owner_id).await?;
        let product = ProductRepository::require_in(&mut tx, owner_id, product_id).await?;

        let existing: Option<String> =
            sqlx::query_scalar("SELECT id FROM cart_lines WHERE owner_id = ?1 AND product_id = ?2")
                .bind(owner_id)
                .bind(product_id)
                .fetch_optional(&mut *tx)
                .await?;

        let outcome = match (existing, update.quantity) {
            (Some(_), Some(0)) => {
                sqlx::query("DELETE FROM cart_lines WHERE owner_id = ?1 AND product_id = ?2")
                    .bind(owner_id)
                    .bind(product_id)
                    .execute(&mut *tx)
                    .await?;
                CartUpsertOutcome::Removed
            }
            (Some(line_id), quantity) => {
                if let Some(qty) = quantity {
                    soft_check_stock(&product, qty)?;
                }
                let discount = update.discount;
                sqlx::query(
                    r#"
                    UPDATE cart_lines SET
                        quantity = COALESCE(?2, quantity),
                        discount_kind = COALESCE(?3, discount_kind),
                        discount_value = COALESCE(?4, discount_value),
                        updated_at = ?5
                    WHERE id = ?1
                    "#,
                )
                .bind(&line_id)
                .bind(quantity)
                .bind(discount.map(|d| d.kind))
                .bind(discount.map(|d| d.value))
                .bind(Utc::now())
                .execute(&mut *tx)
                .await?;
                CartUpsertOutcome::Updated { line_id }
            }
            (None, Some(0)) => CartUpsertOutcome::Unchanged,
            (None, None) => {
                return Err(ValidationError::Required {
                    field: "quantity".to_string(),
                }
                .into())
            }
            (None, Some(qty)) => {
                soft_check_stock(&product, qty)?;

                let lines: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM cart_lines WHERE owner_id = ?1")
                    .bind(owner_id)
                    .fetch_one(&mut *tx)
                    .await?;
                validate_cart_size(lines as usize + 1)?;

                let line_id = Uuid::new_v4().to_string();
                let discount = update.discount.unwrap_or_default();
                let now = Utc::now();
                sqlx::query(
                    r#"
                    INSERT INTO cart_lines (
                        id, owner_id, product_id, quantity, unit_price_cents,
                        tax_rate_bps, discount_kind, discount_value, created_at, updated_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
                    "#,
                )
                .bind(&line_id)
                .bind(owner_id)
                .bind(product_id)
                .bind(qty)
                .bind(product.price_cents)
                .bind(product.tax_rate_bps)
                .bind(discount.kind)
                .bind(discount.value)
                .bind(now)
                .execute(&mut *tx)
                .await?;
                CartUpsertOutcome::Created { line_id }
            }
        };

        tx.commit().await?;

        debug!(owner_id = %owner_id, product_id = %product_id, outcome = ?outcome, "Cart line upserted");
        Ok(outcome)
    }

    /// Lists the owner's cart lines in ascending product id order.
    pub async fn list_lines(&self, owner_id: &str) -> DbResult<Vec<CartLine>> {
        let mut conn = self.pool.acquire().await?;
        Self::list_lines_in(&mut conn, owner_id).await
    }

    /// Lists cart lines inside the caller's transaction.
    ///
    /// The order is the lock/decrement order used by invoice creation.
    pub(crate) async fn list_lines_in(conn: &mut SqliteConnection, owner_id: &str) -> DbResult<Vec<CartLine>> {
        let sql = format!("{CART_LINE_SELECT} WHERE c.owner_id = ?1 ORDER BY c.product_id");
        let lines = sqlx::query_as::<_, CartLine>(&sql)
            .bind(owner_id)
            .fetch_all(&mut *conn)
            .await?;
        Ok(lines)
    }

    /// Gets the cart line for one product.
    pub async fn get_line(&self, owner_id: &str, product_id: &str) -> DbResult<Option<CartLine>> {
        let sql = format!("{CART_LINE_SELECT} WHERE c.owner_id = ?1 AND c.product_id = ?2");
        let line = sqlx::query_as::<_, CartLine>(&sql)
            .bind(owner_id)
            .bind(product_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(line)
    }

    /// Empties the owner's cart. Returns the number of lines removed.
    pub async fn clear(&self, owner_id: &str) -> DbResult<u64> {
        let mut tx = begin_write(&self.pool).await.map_err(conflict_on_busy)?;
        let removed = Self::clear_in(&mut tx, owner_id).await?;
        tx.commit().await?;
        Ok(removed)
    }

    pub(crate) async fn clear_in(conn: &mut SqliteConnection, owner_id: &str) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM cart_lines WHERE owner_id = ?1")
            .bind(owner_id)
            .execute(&mut *conn)
            .await?;
        debug!(owner_id = %owner_id, removed = result.rows_affected(), "Cart cleared");
        Ok(result.rows_affected())
    }
}

/// Advisory stock check for cart edits.
fn soft_check_stock(product: &Product, quantity: i64) -> Result<(), CoreError> {
    if product.can_fulfil(quantity) {
        return Ok(());
    }
    Err(CoreError::InsufficientStock {
        product_id: product.id.clone(),
        sku: product.sku.clone(),
        name: product.name.clone(),
        available: product.stock,
        requested: quantity,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
