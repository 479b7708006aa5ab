//! # Invoice Checkout
//!
//! Turns an owner's cart into an immutable invoice in one transaction.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Started ──► StockValidated ──► Computed ──► Persisted                  │
//! │     │              │               │             │                      │
//! │     │              │               │             ▼                      │
//! │     │              │               │        StockAdjusted ──► CartCleared
//! │     │              │               │             │                 │    │
//! │     ▼              ▼               ▼             ▼                 ▼    │
//! │  ───────────────────────── Aborted ◄──────────────────────  Committed   │
//! │                                                                         │
//! │  Started         BEGIN IMMEDIATE, load cart lines (EmptyCart)           │
//! │  StockValidated  every line.quantity <= product.stock (pre-flight)      │
//! │  Computed        tax::calculate over the cart snapshot                  │
//! │  Persisted       invoice number + company snapshot, header row          │
//! │  StockAdjusted   per line, ascending product id:                        │
//! │                    insert line, reserve_and_decrement_in                │
//! │  CartCleared     DELETE cart lines                                      │
//! │  Committed       COMMIT                                                 │
//! │                                                                         │
//! │  Any error, or the timeout firing, drops the transaction: SQLite rolls │
//! │  back every row written since BEGIN, including the invoice counter.    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Concurrency
//! The write lock is taken at `BEGIN IMMEDIATE`, before the cart is read.
//! Two checkouts touching the same product therefore run one after the
//! other, and the second sees the first's committed stock. The per-line
//! decrement re-checks stock regardless, so a pre-flight pass never leads to
//! an oversell.

use std::time::Duration;

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::pool::begin_write;
use crate::repository::cart::CartRepository;
use crate::repository::inventory::{conflict_on_busy, InventoryStore};
use crate::repository::invoice::InvoiceRepository;
use crate::repository::owner::OwnerRepository;
use billbook_core::tax::{self, TaxLineInput};
use billbook_core::validation::validate_id;
use billbook_core::{
    CartLine, CoreError, CreateInvoiceRequest, Invoice, InvoiceLine, InvoiceOptions, InvoiceWithLines,
};

/// Default upper bound on one invoice transaction.
pub const DEFAULT_CHECKOUT_TIMEOUT: Duration = Duration::from_secs(30);

// =============================================================================
// Configuration
// =============================================================================

/// Settings for invoice creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckoutConfig {
    /// Wall-clock limit for the whole transaction, lock wait included.
    pub timeout: Duration,
}

impl CheckoutConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the transaction timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        CheckoutConfig {
            timeout: DEFAULT_CHECKOUT_TIMEOUT,
        }
    }
}

// =============================================================================
// States
// =============================================================================

/// Progress of one invoice transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutState {
    Started,
    StockValidated,
    Computed,
    Persisted,
    StockAdjusted,
    CartCleared,
    Committed,
    Aborted,
}

impl CheckoutState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckoutState::Started => "started",
            CheckoutState::StockValidated => "stock_validated",
            CheckoutState::Computed => "computed",
            CheckoutState::Persisted => "persisted",
            CheckoutState::StockAdjusted => "stock_adjusted",
            CheckoutState::CartCleared => "cart_cleared",
            CheckoutState::Committed => "committed",
            CheckoutState::Aborted => "aborted",
        }
    }

    /// The state that follows this one on the success path.
    pub fn next(&self) -> Option<CheckoutState> {
        match self {
            CheckoutState::Started => Some(CheckoutState::StockValidated),
            CheckoutState::StockValidated => Some(CheckoutState::Computed),
            CheckoutState::Computed => Some(CheckoutState::Persisted),
            CheckoutState::Persisted => Some(CheckoutState::StockAdjusted),
            CheckoutState::StockAdjusted => Some(CheckoutState::CartCleared),
            CheckoutState::CartCleared => Some(CheckoutState::Committed),
            CheckoutState::Committed | CheckoutState::Aborted => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, CheckoutState::Committed | CheckoutState::Aborted)
    }
}

/// Tracks the current state of one run and logs each transition.
#[derive(Debug)]
struct Progress<'a> {
    owner_id: &'a str,
    state: CheckoutState,
}

impl<'a> Progress<'a> {
    fn start(owner_id: &'a str) -> Self {
        debug!(owner_id = %owner_id, state = CheckoutState::Started.as_str(), "Checkout state");
        Progress {
            owner_id,
            state: CheckoutState::Started,
        }
    }

    fn advance(&mut self, to: CheckoutState) {
        debug_assert_eq!(self.state.next(), Some(to));
        debug!(
            owner_id = %self.owner_id,
            from = self.state.as_str(),
            state = to.as_str(),
            "Checkout state"
        );
        self.state = to;
    }
}

// =============================================================================
// Orchestrator
// =============================================================================

/// The invoice transaction orchestrator.
///
/// ## Usage
/// ```rust,ignore
/// let invoice = db
///     .checkout()
///     .create_invoice("owner-1", "cashier-7", CreateInvoiceRequest::default())
///     .await?;
/// println!("{} {}", invoice.invoice.invoice_number, invoice.invoice.grand_total());
/// ```
#[derive(Debug, Clone)]
pub struct InvoiceCheckout {
    pool: SqlitePool,
    config: CheckoutConfig,
}

impl InvoiceCheckout {
    pub fn new(pool: SqlitePool, config: CheckoutConfig) -> Self {
        InvoiceCheckout { pool, config }
    }

    pub fn config(&self) -> &CheckoutConfig {
        &self.config
    }

    /// Creates an invoice from the owner's cart.
    ///
    /// On success the invoice and its lines are committed, stock is
    /// decremented with one `invoice_sale` ledger entry per line, and the
    /// cart is empty. On any error nothing has changed.
    ///
    /// ## Errors
    /// * `CoreError::EmptyCart` - no cart lines
    /// * `CoreError::InsufficientStock` - a line asks for more than is in stock
    /// * `CoreError::ConcurrencyConflict` - lock contention; safe to retry
    /// * `CoreError::Validation` - malformed request
    /// * `DbError::Timeout` - transaction exceeded the configured timeout
    pub async fn create_invoice(
        &self,
        owner_id: &str,
        actor_id: &str,
        request: CreateInvoiceRequest,
    ) -> DbResult<InvoiceWithLines> {
        validate_id("owner_id", owner_id)?;
        validate_id("actor_id", actor_id)?;
        let options = request.resolve()?;

        info!(
            owner_id = %owner_id,
            actor_id = %actor_id,
            regime = options.regime.as_str(),
            rate = %options.tax_rate,
            "Creating invoice"
        );

        let run = self.run(owner_id, actor_id, &options);
        let result = match tokio::time::timeout(self.config.timeout, run).await {
            Ok(result) => result.map_err(conflict_on_busy),
            Err(_) => Err(DbError::Timeout {
                after_ms: self.config.timeout.as_millis() as u64,
            }),
        };

        match &result {
            Ok(created) => info!(
                owner_id = %owner_id,
                invoice_id = %created.invoice.id,
                number = %created.invoice.invoice_number,
                total = %created.invoice.grand_total(),
                lines = created.lines.len(),
                "Invoice committed"
            ),
            Err(err) => warn!(
                owner_id = %owner_id,
                state = CheckoutState::Aborted.as_str(),
                error = %err,
                "Invoice creation aborted"
            ),
        }

        result
    }

    async fn run(&self, owner_id: &str, actor_id: &str, options: &InvoiceOptions) -> DbResult<InvoiceWithLines> {
        let mut progress = Progress::start(owner_id);

        let mut tx = begin_write(&self.pool).await?;
        OwnerRepository::ensure_exists_in(&mut tx, owner_id).await?;

        let cart = CartRepository::list_lines_in(&mut tx, owner_id).await?;
        if cart.is_empty() {
            return Err(CoreError::EmptyCart.into());
        }

        preflight_stock(&cart)?;
        progress.advance(CheckoutState::StockValidated);

        let inputs: Vec<TaxLineInput> = cart
            .iter()
            .map(|line| TaxLineInput::new(line.unit_price(), line.quantity, line.discount()))
            .collect();
        let summary = tax::calculate(&inputs, options.tax_rate, options.regime, options.round_off)?;
        progress.advance(CheckoutState::Computed);

        let (invoice_number, company) = OwnerRepository::allocate_invoice_number_in(&mut tx, owner_id).await?;
        let invoice = Invoice {
            id: Uuid::new_v4().to_string(),
            owner_id: owner_id.to_string(),
            invoice_number,
            customer_name: options.customer.name.clone(),
            customer_mobile: options.customer.mobile.clone(),
            customer_gstin: options.customer.gstin.clone(),
            company_name: company.company_name,
            company_gstin: company.company_gstin,
            company_address: company.company_address,
            company_state: company.company_state,
            company_state_code: company.company_state_code,
            tax_regime: summary.tax.regime,
            tax_rate_bps: summary.rate.bps(),
            gross_cents: summary.gross.cents(),
            total_discount_cents: summary.total_discount.cents(),
            taxable_cents: summary.taxable.cents(),
            cgst_cents: summary.tax.cgst.cents(),
            sgst_cents: summary.tax.sgst.cents(),
            igst_cents: summary.tax.igst.cents(),
            round_off_cents: summary.round_off.cents(),
            grand_total_cents: summary.grand_total.cents(),
            payment_method: options.payment_method,
            created_by: actor_id.to_string(),
            created_at: Utc::now(),
        };
        InvoiceRepository::insert_header_in(&mut tx, &invoice).await?;
        progress.advance(CheckoutState::Persisted);

        let mut lines = Vec::with_capacity(cart.len());
        for (idx, (cart_line, amounts)) in cart.iter().zip(summary.lines.iter()).enumerate() {
            let line = InvoiceLine {
                id: Uuid::new_v4().to_string(),
                invoice_id: invoice.id.clone(),
                owner_id: owner_id.to_string(),
                product_id: cart_line.product_id.clone(),
                line_no: idx as i64 + 1,
                sku_snapshot: cart_line.sku.clone(),
                name_snapshot: cart_line.name.clone(),
                hsn_code: cart_line.hsn_code.clone(),
                quantity: cart_line.quantity,
                unit_price_cents: cart_line.unit_price_cents,
                discount_kind: cart_line.discount_kind,
                discount_value: cart_line.discount_value,
                discount_cents: amounts.discount.cents(),
                tax_rate_bps: summary.rate.bps(),
                taxable_cents: amounts.taxable.cents(),
                tax_cents: amounts.tax.cents(),
                line_total_cents: amounts.total.cents(),
            };
            InvoiceRepository::insert_line_in(&mut tx, &line).await?;
            decrement(&mut tx, owner_id, actor_id, &invoice, cart_line).await?;
            lines.push(line);
        }
        progress.advance(CheckoutState::StockAdjusted);

        CartRepository::clear_in(&mut tx, owner_id).await?;
        progress.advance(CheckoutState::CartCleared);

        tx.commit().await?;
        progress.advance(CheckoutState::Committed);

        Ok(InvoiceWithLines { invoice, lines })
    }
}

/// Advisory pass over the cart snapshot. Reports the first short line in
/// product id order.
fn preflight_stock(cart: &[CartLine]) -> Result<(), CoreError> {
    match cart.iter().find(|line| line.quantity > line.current_stock) {
        Some(line) => Err(CoreError::InsufficientStock {
            product_id: line.product_id.clone(),
            sku: line.sku.clone(),
            name: line.name.clone(),
            available: line.current_stock,
            requested: line.quantity,
        }),
        None => Ok(()),
    }
}

async fn decrement(
    conn: &mut SqliteConnection,
    owner_id: &str,
    actor_id: &str,
    invoice: &Invoice,
    line: &CartLine,
) -> DbResult<()> {
    let entry = InventoryStore::reserve_and_decrement_in(
        conn,
        owner_id,
        &line.product_id,
        line.quantity,
        actor_id,
        &invoice.id,
        &invoice.invoice_number,
    )
    .await?;

    debug!(
        invoice_id = %invoice.id,
        product_id = %line.product_id,
        quantity = line.quantity,
        stock = entry.balance_after,
        "Line stock decremented"
    );
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use billbook_core::{CartLineUpdate, Discount, Money, NewProduct, OwnerProfile, TaxRegime};
    use rust_decimal::Decimal;

    async fn setup() -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.owners()
            .register(
                "owner-a",
                OwnerProfile {
                    business_name: "Sharma Stores".to_string(),
                    state: Some("Karnataka".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        db
    }

    async fn product(db: &Database, sku: &str, price_cents: i64, stock: i64) -> String {
        db.products()
            .create(
                "owner-a",
                "admin",
                NewProduct::new(sku, sku, Money::from_cents(price_cents)).with_opening_stock(stock),
            )
            .await
            .unwrap()
            .id
    }

    #[test]
    fn test_state_order() {
        let mut state = CheckoutState::Started;
        let mut seen = vec![state];
        while let Some(next) = state.next() {
            seen.push(next);
            state = next;
        }
        assert_eq!(
            seen,
            [
                CheckoutState::Started,
                CheckoutState::StockValidated,
                CheckoutState::Computed,
                CheckoutState::Persisted,
                CheckoutState::StockAdjusted,
                CheckoutState::CartCleared,
                CheckoutState::Committed,
            ]
        );
        assert!(CheckoutState::Aborted.is_terminal());
        assert!(!CheckoutState::Persisted.is_terminal());
    }

    #[test]
    fn test_config_default() {
        assert_eq!(CheckoutConfig::default().timeout, Duration::from_secs(30));
        let config = CheckoutConfig::new().timeout(Duration::from_millis(5));
        assert_eq!(config.timeout, Duration::from_millis(5));
    }

    #[tokio::test]
    async fn test_lines_follow_product_id_order() {
        let db = setup().await;
        let a = product(&db, "PRD-0001", 5_000, 10).await;
        let b = product(&db, "PRD-0002", 2_500, 10).await;

        db.cart().upsert_line("owner-a", &a, CartLineUpdate::quantity(1)).await.unwrap();
        db.cart().upsert_line("owner-a", &b, CartLineUpdate::quantity(2)).await.unwrap();

        let created = db
            .checkout()
            .create_invoice("owner-a", "cashier", CreateInvoiceRequest::default())
            .await
            .unwrap();

        let mut expected = vec![a.clone(), b.clone()];
        expected.sort();
        let got: Vec<_> = created.lines.iter().map(|l| l.product_id.clone()).collect();
        assert_eq!(got, expected);
        assert_eq!(created.lines[0].line_no, 1);
        assert_eq!(created.lines[1].line_no, 2);
    }

    #[tokio::test]
    async fn test_discounts_and_igst() {
        let db = setup().await;
        let id = product(&db, "PRD-0001", 10_000, 10).await;
        db.cart()
            .upsert_line(
                "owner-a",
                &id,
                CartLineUpdate {
                    quantity: Some(2),
                    discount: Some(Discount::percent_bps(1_000).unwrap()),
                },
            )
            .await
            .unwrap();

        let created = db
            .checkout()
            .create_invoice(
                "owner-a",
                "cashier",
                CreateInvoiceRequest {
                    gst_percent: Some(Decimal::new(12, 0)),
                    gst_type: Some("igst".to_string()),
                    round_off: Some(Decimal::new(-40, 2)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let inv = &created.invoice;
        assert_eq!(inv.tax_regime, TaxRegime::Igst);
        assert_eq!(inv.gross_cents, 20_000);
        assert_eq!(inv.total_discount_cents, 2_000);
        assert_eq!(inv.taxable_cents, 18_000);
        assert_eq!(inv.igst_cents, 2_160);
        assert_eq!(inv.cgst_cents + inv.sgst_cents, 0);
        assert_eq!(inv.round_off_cents, -40);
        assert_eq!(inv.grand_total_cents, 20_120);
        assert_eq!(created.lines[0].discount_cents, 2_000);
        assert_eq!(created.lines[0].tax_rate_bps, 1_200);
    }

    #[tokio::test]
    async fn test_invalid_request_touches_nothing() {
        let db = setup().await;
        let id = product(&db, "PRD-0001", 10_000, 10).await;
        db.cart().upsert_line("owner-a", &id, CartLineUpdate::quantity(1)).await.unwrap();

        let err = db
            .checkout()
            .create_invoice(
                "owner-a",
                "cashier",
                CreateInvoiceRequest {
                    payment_method: Some("CHEQUE".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err.as_core(), Some(CoreError::Validation(_))));
        assert_eq!(db.cart().list_lines("owner-a").await.unwrap().len(), 1);
        assert_eq!(db.invoices().count("owner-a").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unknown_owner() {
        let db = setup().await;
        let err = db
            .checkout()
            .create_invoice("ghost", "cashier", CreateInvoiceRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err.as_core(), Some(CoreError::OwnerNotFound(_))));
    }
}
