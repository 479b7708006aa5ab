//! # Invoice Repository
//!
//! Writes invoice rows inside the checkout transaction and reads them back.
//!
//! Invoices and their lines are immutable once committed. The schema
//! rejects UPDATE and DELETE on both tables, so this repository has no
//! mutators beyond the two inserts.
//!
//! `summary` rolls one UTC day of invoices up with the owner's catalogue
//! counts for the dashboard.

use chrono::{Duration, NaiveDate, NaiveTime};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use billbook_core::{Invoice, InvoiceLine, InvoiceWithLines, OwnerSummary};

const INVOICE_COLUMNS: &str = "id, owner_id, invoice_number, customer_name, customer_mobile, \
                               customer_gstin, company_name, company_gstin, company_address, \
                               company_state, company_state_code, tax_regime, tax_rate_bps, \
                               gross_cents, total_discount_cents, taxable_cents, cgst_cents, \
                               sgst_cents, igst_cents, round_off_cents, grand_total_cents, \
                               payment_method, created_by, created_at";

const LINE_COLUMNS: &str = "id, invoice_id, owner_id, product_id, line_no, sku_snapshot, \
                            name_snapshot, hsn_code, quantity, unit_price_cents, discount_kind, \
                            discount_value, discount_cents, tax_rate_bps, taxable_cents, \
                            tax_cents, line_total_cents";

const DEFAULT_LIST_LIMIT: u32 = 50;
const MAX_LIST_LIMIT: u32 = 500;

/// Invoices shown in the summary's recent list.
pub const RECENT_INVOICES: u32 = 5;

/// Repository for invoice persistence and reads.
#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    pool: SqlitePool,
}

impl InvoiceRepository {
    /// Creates a new InvoiceRepository.
    pub fn new(pool: SqlitePool) -> Self {
        InvoiceRepository { pool }
    }

    // =========================================================================
    // Transaction-scoped writes
    // =========================================================================

    /// Inserts the invoice header.
    pub(crate) async fn insert_header_in(conn: &mut SqliteConnection, invoice: &Invoice) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO invoices (
                id, owner_id, invoice_number,
                customer_name, customer_mobile, customer_gstin,
                company_name, company_gstin, company_address, company_state, company_state_code,
                tax_regime, tax_rate_bps, gross_cents, total_discount_cents, taxable_cents,
                cgst_cents, sgst_cents, igst_cents, round_off_cents, grand_total_cents,
                payment_method, created_by, created_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12,
                ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24
            )
            "#,
        )
        .bind(&invoice.id)
        .bind(&invoice.owner_id)
        .bind(&invoice.invoice_number)
        .bind(&invoice.customer_name)
        .bind(&invoice.customer_mobile)
        .bind(&invoice.customer_gstin)
        .bind(&invoice.company_name)
        .bind(&invoice.company_gstin)
        .bind(&invoice.company_address)
        .bind(&invoice.company_state)
        .bind(&invoice.company_state_code)
        .bind(invoice.tax_regime)
        .bind(invoice.tax_rate_bps)
        .bind(invoice.gross_cents)
        .bind(invoice.total_discount_cents)
        .bind(invoice.taxable_cents)
        .bind(invoice.cgst_cents)
        .bind(invoice.sgst_cents)
        .bind(invoice.igst_cents)
        .bind(invoice.round_off_cents)
        .bind(invoice.grand_total_cents)
        .bind(invoice.payment_method)
        .bind(&invoice.created_by)
        .bind(invoice.created_at)
        .execute(&mut *conn)
        .await?;

        debug!(invoice_id = %invoice.id, number = %invoice.invoice_number, "Invoice header inserted");
        Ok(())
    }

    /// Inserts one invoice line.
    pub(crate) async fn insert_line_in(conn: &mut SqliteConnection, line: &InvoiceLine) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO invoice_lines (
                id, invoice_id, owner_id, product_id, line_no,
                sku_snapshot, name_snapshot, hsn_code, quantity, unit_price_cents,
                discount_kind, discount_value, discount_cents, tax_rate_bps,
                taxable_cents, tax_cents, line_total_cents
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)
            "#,
        )
        .bind(&line.id)
        .bind(&line.invoice_id)
        .bind(&line.owner_id)
        .bind(&line.product_id)
        .bind(line.line_no)
        .bind(&line.sku_snapshot)
        .bind(&line.name_snapshot)
        .bind(&line.hsn_code)
        .bind(line.quantity)
        .bind(line.unit_price_cents)
        .bind(line.discount_kind)
        .bind(line.discount_value)
        .bind(line.discount_cents)
        .bind(line.tax_rate_bps)
        .bind(line.taxable_cents)
        .bind(line.tax_cents)
        .bind(line.line_total_cents)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Gets an invoice with its lines (owner-scoped).
    pub async fn get(&self, owner_id: &str, id: &str) -> DbResult<Option<InvoiceWithLines>> {
        let sql = format!("SELECT {INVOICE_COLUMNS} FROM invoices WHERE id = ?1 AND owner_id = ?2");
        let invoice = sqlx::query_as::<_, Invoice>(&sql)
            .bind(id)
            .bind(owner_id)
            .fetch_optional(&self.pool)
            .await?;

        match invoice {
            Some(invoice) => Ok(Some(self.with_lines(invoice).await?)),
            None => Ok(None),
        }
    }

    /// Gets an invoice by its human-readable number, e.g. `INV-000042`.
    pub async fn get_by_number(&self, owner_id: &str, invoice_number: &str) -> DbResult<Option<InvoiceWithLines>> {
        let sql = format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE invoice_number = ?1 AND owner_id = ?2"
        );
        let invoice = sqlx::query_as::<_, Invoice>(&sql)
            .bind(invoice_number.trim())
            .bind(owner_id)
            .fetch_optional(&self.pool)
            .await?;

        match invoice {
            Some(invoice) => Ok(Some(self.with_lines(invoice).await?)),
            None => Ok(None),
        }
    }

    /// Lists invoice headers, newest first.
    pub async fn list(&self, owner_id: &str, limit: Option<u32>) -> DbResult<Vec<Invoice>> {
        let mut conn = self.pool.acquire().await?;
        let invoices = Self::list_in(&mut conn, owner_id, limit).await?;

        debug!(owner_id = %owner_id, count = invoices.len(), "Invoices listed");
        Ok(invoices)
    }

    async fn list_in(conn: &mut SqliteConnection, owner_id: &str, limit: Option<u32>) -> DbResult<Vec<Invoice>> {
        let limit = limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT);
        let sql = format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE owner_id = ?1 \
             ORDER BY created_at DESC, invoice_number DESC LIMIT ?2"
        );
        let invoices = sqlx::query_as::<_, Invoice>(&sql)
            .bind(owner_id)
            .bind(limit)
            .fetch_all(&mut *conn)
            .await?;
        Ok(invoices)
    }

    /// Sales for one UTC day plus current catalogue counts.
    ///
    /// All figures are read in one transaction so they describe the same
    /// moment. An owner with no invoices or products gets zeros.
    pub async fn summary(&self, owner_id: &str, day: NaiveDate) -> DbResult<OwnerSummary> {
        let start = day.and_time(NaiveTime::MIN).and_utc();
        let end = start + Duration::days(1);

        let mut tx = self.pool.begin().await?;

        let (sales_total_cents, invoice_count): (i64, i64) = sqlx::query_as(
            "SELECT COALESCE(SUM(grand_total_cents), 0), COUNT(*) FROM invoices \
             WHERE owner_id = ?1 AND created_at >= ?2 AND created_at < ?3",
        )
        .bind(owner_id)
        .bind(start)
        .bind(end)
        .fetch_one(&mut *tx)
        .await?;

        let (product_count, low_stock_count): (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), COALESCE(SUM(stock <= low_stock_threshold), 0) FROM products \
             WHERE owner_id = ?1",
        )
        .bind(owner_id)
        .fetch_one(&mut *tx)
        .await?;

        let recent = Self::list_in(&mut tx, owner_id, Some(RECENT_INVOICES)).await?;
        tx.commit().await?;

        debug!(
            owner_id = %owner_id,
            day = %day,
            invoice_count,
            sales_total_cents,
            "Summary computed"
        );

        Ok(OwnerSummary {
            day,
            sales_total_cents,
            invoice_count,
            product_count,
            low_stock_count,
            recent,
        })
    }

    /// Counts invoices for an owner.
    pub async fn count(&self, owner_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM invoices WHERE owner_id = ?1")
            .bind(owner_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn with_lines(&self, invoice: Invoice) -> DbResult<InvoiceWithLines> {
        let mut conn = self.pool.acquire().await?;
        Self::with_lines_in(&mut conn, invoice).await
    }

    /// Loads the lines for a header, in line order.
    pub(crate) async fn with_lines_in(conn: &mut SqliteConnection, invoice: Invoice) -> DbResult<InvoiceWithLines> {
        let sql = format!(
            "SELECT {LINE_COLUMNS} FROM invoice_lines WHERE invoice_id = ?1 AND owner_id = ?2 ORDER BY line_no"
        );
        let lines = sqlx::query_as::<_, InvoiceLine>(&sql)
            .bind(&invoice.id)
            .bind(&invoice.owner_id)
            .fetch_all(&mut *conn)
            .await?;
        Ok(InvoiceWithLines { invoice, lines })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
