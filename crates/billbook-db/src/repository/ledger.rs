//! # Stock Ledger
//!
//! Append-only log of every stock movement.
//!
//! ## Invariant
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  for every product P at every quiescent point:                          │
//! │                                                                         │
//! │      P.stock  ==  Σ stock_ledger.delta  WHERE product_id = P.id         │
//! │                                                                         │
//! │  Maintained by writing both in the same transaction                     │
//! │  (InventoryStore::apply_delta_in). Checked by balance_for / verify_all. │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `append_in` never begins or commits. It is always part of the caller's
//! transaction, and the schema rejects UPDATE/DELETE on ledger rows.

use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::DbResult;
use billbook_core::validation::{validate_id, validate_ledger_delta};
use billbook_core::{LedgerFilter, LedgerMismatch, NewLedgerEntry, StockLedgerEntry};

const LEDGER_COLUMNS: &str = "id, owner_id, product_id, delta, movement_type, reason, actor_id, \
                              reference_id, balance_after, created_at";

/// Default and maximum page size for history listings.
const DEFAULT_HISTORY_LIMIT: i64 = 200;
const MAX_HISTORY_LIMIT: i64 = 5_000;

/// Read side of the stock ledger plus the transactional append.
#[derive(Debug, Clone)]
pub struct StockLedger {
    pool: SqlitePool,
}

impl StockLedger {
    /// Creates a new StockLedger.
    pub fn new(pool: SqlitePool) -> Self {
        StockLedger { pool }
    }

    /// Appends one entry inside the caller's transaction.
    ///
    /// `balance_after` is the product stock after this movement, as just
    /// written by the caller.
    ///
    /// ## Errors
    /// * `ValidationError::Zero` - `delta` is zero (nothing is written)
    pub async fn append_in(
        conn: &mut SqliteConnection,
        owner_id: &str,
        entry: &NewLedgerEntry,
        balance_after: i64,
    ) -> DbResult<StockLedgerEntry> {
        validate_ledger_delta(entry.delta)?;
        validate_id("actor_id", &entry.actor_id)?;

        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO stock_ledger (
                id, owner_id, product_id, delta, movement_type, reason,
                actor_id, reference_id, balance_after, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&id)
        .bind(owner_id)
        .bind(&entry.product_id)
        .bind(entry.delta)
        .bind(entry.movement_type)
        .bind(&entry.reason)
        .bind(&entry.actor_id)
        .bind(&entry.reference_id)
        .bind(balance_after)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        debug!(
            owner_id = %owner_id,
            product_id = %entry.product_id,
            delta = entry.delta,
            movement = entry.movement_type.as_str(),
            balance_after,
            "Ledger entry appended"
        );

        Ok(StockLedgerEntry {
            id,
            owner_id: owner_id.to_string(),
            product_id: entry.product_id.clone(),
            delta: entry.delta,
            movement_type: entry.movement_type,
            reason: entry.reason.clone(),
            actor_id: entry.actor_id.clone(),
            reference_id: entry.reference_id.clone(),
            balance_after,
            created_at: now,
        })
    }

    /// Reconstructs a product's stock from its ledger.
    ///
    /// For integrity checks and tests; hot paths read `products.stock`.
    pub async fn balance_for(&self, owner_id: &str, product_id: &str) -> DbResult<i64> {
        let balance: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(delta), 0) FROM stock_ledger WHERE owner_id = ?1 AND product_id = ?2",
        )
        .bind(owner_id)
        .bind(product_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(balance)
    }

    /// Lists ledger entries, newest first.
    pub async fn history(&self, owner_id: &str, filter: &LedgerFilter) -> DbResult<Vec<StockLedgerEntry>> {
        let limit = filter
            .limit
            .unwrap_or(DEFAULT_HISTORY_LIMIT)
            .clamp(1, MAX_HISTORY_LIMIT);

        let mut qb: QueryBuilder<'_, Sqlite> = QueryBuilder::new(format!(
            "SELECT {LEDGER_COLUMNS} FROM stock_ledger WHERE owner_id = "
        ));
        qb.push_bind(owner_id);

        if let Some(product_id) = &filter.product_id {
            qb.push(" AND product_id = ").push_bind(product_id);
        }
        if let Some(movement_type) = filter.movement_type {
            qb.push(" AND movement_type = ").push_bind(movement_type);
        }
        if let Some(from) = filter.from {
            qb.push(" AND created_at >= ").push_bind(from);
        }
        if let Some(to) = filter.to {
            qb.push(" AND created_at <= ").push_bind(to);
        }

        qb.push(" ORDER BY created_at DESC, rowid DESC LIMIT ").push_bind(limit);

        let entries = qb
            .build_query_as::<StockLedgerEntry>()
            .fetch_all(&self.pool)
            .await?;

        debug!(owner_id = %owner_id, count = entries.len(), "Ledger history loaded");
        Ok(entries)
    }

    /// Compares every product's stored stock with its ledger sum.
    ///
    /// ## Returns
    /// The products that disagree. Empty means the ledger is consistent.
    pub async fn verify_all(&self, owner_id: &str) -> DbResult<Vec<LedgerMismatch>> {
        let mismatches = sqlx::query_as::<_, LedgerMismatch>(
            r#"
            SELECT p.id AS product_id, p.sku, p.stock,
                   COALESCE(SUM(l.delta), 0) AS ledger_sum
            FROM products p
            LEFT JOIN stock_ledger l ON l.product_id = p.id AND l.owner_id = p.owner_id
            WHERE p.owner_id = ?1
            GROUP BY p.id, p.sku, p.stock
            HAVING p.stock <> COALESCE(SUM(l.delta), 0)
            ORDER BY p.sku
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        for m in &mismatches {
            warn!(
                owner_id = %owner_id,
                product_id = %m.product_id,
                stock = m.stock,
                ledger_sum = m.ledger_sum,
                "Stock does not match ledger"
            );
        }

        Ok(mismatches)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
