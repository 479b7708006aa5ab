//! # Domain Types
//!
//! Core domain types used throughout Billbook.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │    CartLine     │   │    Invoice      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  product_id     │   │  id (UUID)      │       │
//! │  │  sku (business) │   │  quantity       │   │  invoice_number │       │
//! │  │  price_cents    │   │  price snapshot │   │  company snap   │       │
//! │  │  stock (>= 0)   │   │  discount       │   │  totals         │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    TaxRate      │   │    Discount     │   │ StockLedgerEntry│       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  bps (u32)      │   │  Flat (paise)   │   │  delta (≠ 0)    │       │
//! │  │  1800 = 18%     │   │  Percent (bps)  │   │  movement_type  │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Owner Scoping
//! Every persisted entity carries `owner_id`. Nothing in this module enforces
//! it; the repositories in `billbook-db` filter every query on it.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000
/// 1800 bps = 18% GST
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Highest accepted rate: 100%.
    pub const MAX_BPS: u32 = 10_000;

    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Creates a tax rate from a percentage such as `18` or `2.5`.
    ///
    /// The percentage must lie in 0..=100 and have at most two decimals.
    ///
    /// ## Example
    /// ```rust
    /// use billbook_core::TaxRate;
    /// use rust_decimal::Decimal;
    ///
    /// assert_eq!(TaxRate::from_percent(Decimal::new(18, 0)).unwrap().bps(), 1800);
    /// assert_eq!(TaxRate::from_percent(Decimal::new(25, 1)).unwrap().bps(), 250);
    /// assert!(TaxRate::from_percent(Decimal::new(101, 0)).is_err());
    /// ```
    pub fn from_percent(percent: Decimal) -> Result<Self, ValidationError> {
        let bps = crate::validation::percent_to_bps("gst_percent", percent)?;
        Ok(TaxRate(bps))
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as an exact percentage (1800 → 18.00).
    #[inline]
    pub fn percent(&self) -> Decimal {
        Decimal::new(i64::from(self.0), 2)
    }

    /// Returns the rate as an exact fraction (1800 → 0.18).
    #[inline]
    pub fn fraction(&self) -> Decimal {
        Decimal::new(i64::from(self.0), 4)
    }

    /// Zero tax rate.
    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }

    /// Checks if tax rate is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate(crate::DEFAULT_GST_BPS)
    }
}

impl fmt::Display for TaxRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.percent().normalize())
    }
}

// =============================================================================
// Tax Regime
// =============================================================================

/// How the invoice tax is split into components.
///
/// ```text
/// CgstSgst (intra-state):  18% ──► CGST 9%  + SGST 9%
/// Igst     (inter-state):  18% ──► IGST 18%
/// ```
///
/// The regime is selected by the caller per invoice. `CgstSgst` is the
/// default when the request does not name one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaxRegime {
    /// Two equal components (central + state), each half the rate.
    CgstSgst,
    /// One integrated component at the full rate.
    Igst,
}

impl TaxRegime {
    pub const ALLOWED: [&'static str; 2] = ["CGST_SGST", "IGST"];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaxRegime::CgstSgst => "CGST_SGST",
            TaxRegime::Igst => "IGST",
        }
    }
}

impl Default for TaxRegime {
    fn default() -> Self {
        TaxRegime::CgstSgst
    }
}

impl FromStr for TaxRegime {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CGST_SGST" => Ok(TaxRegime::CgstSgst),
            "IGST" => Ok(TaxRegime::Igst),
            _ => Err(ValidationError::not_allowed("gst_type", &Self::ALLOWED)),
        }
    }
}

// =============================================================================
// Discount
// =============================================================================

/// Kind of per-line discount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscountKind {
    /// Fixed amount off the line, `value` in paise.
    Flat,
    /// Percentage of price × quantity, `value` in basis points.
    Percent,
}

impl DiscountKind {
    pub const ALLOWED: [&'static str; 2] = ["FLAT", "PERCENT"];

    pub fn as_str(&self) -> &'static str {
        match self {
            DiscountKind::Flat => "FLAT",
            DiscountKind::Percent => "PERCENT",
        }
    }
}

impl FromStr for DiscountKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "FLAT" => Ok(DiscountKind::Flat),
            "PERCENT" => Ok(DiscountKind::Percent),
            _ => Err(ValidationError::not_allowed("discount_type", &Self::ALLOWED)),
        }
    }
}

/// A per-line discount.
///
/// The unit of `value` depends on `kind`: paise for `Flat`, basis points for
/// `Percent`. Both are integers so a discount round-trips through storage
/// without loss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Discount {
    pub kind: DiscountKind,
    pub value: i64,
}

impl Discount {
    /// No discount (flat zero).
    pub const fn none() -> Self {
        Discount {
            kind: DiscountKind::Flat,
            value: 0,
        }
    }

    /// A fixed amount off the line.
    pub fn flat(amount: Money) -> Result<Self, ValidationError> {
        Discount::new(DiscountKind::Flat, amount.cents())
    }

    /// A percentage of the line, in basis points (1000 = 10%).
    pub fn percent_bps(bps: u32) -> Result<Self, ValidationError> {
        Discount::new(DiscountKind::Percent, i64::from(bps))
    }

    /// Builds a discount from stored parts, validating the value range.
    pub fn new(kind: DiscountKind, value: i64) -> Result<Self, ValidationError> {
        if value < 0 {
            return Err(ValidationError::negative("discount"));
        }
        if kind == DiscountKind::Percent && value > i64::from(TaxRate::MAX_BPS) {
            return Err(ValidationError::OutOfRange {
                field: "discount".to_string(),
                min: 0,
                max: 100,
            });
        }
        Ok(Discount { kind, value })
    }

    /// Parses a caller-facing discount: kind string plus a decimal value in
    /// rupees (`FLAT`) or percent (`PERCENT`).
    ///
    /// ## Example
    /// ```rust
    /// use billbook_core::{Discount, DiscountKind};
    /// use rust_decimal::Decimal;
    ///
    /// let d = Discount::parse("percent", Decimal::new(125, 1)).unwrap();
    /// assert_eq!(d.kind, DiscountKind::Percent);
    /// assert_eq!(d.value, 1250);
    ///
    /// assert!(Discount::parse("BOGO", Decimal::ONE).is_err());
    /// ```
    pub fn parse(kind: &str, value: Decimal) -> Result<Self, ValidationError> {
        let kind: DiscountKind = kind.parse()?;
        match kind {
            DiscountKind::Flat => {
                let amount = Money::from_decimal_exact("discount", value)?;
                Discount::new(kind, amount.cents())
            }
            DiscountKind::Percent => {
                let bps = crate::validation::percent_to_bps("discount", value)?;
                Discount::new(kind, i64::from(bps))
            }
        }
    }

    /// Checks whether the discount takes nothing off.
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.value == 0
    }
}

impl Default for Discount {
    fn default() -> Self {
        Discount::none()
    }
}

// =============================================================================
// Payment Method
// =============================================================================

#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    /// Physical cash payment.
    Cash,
    /// Card payment on external terminal.
    Card,
    /// UPI transfer.
    Upi,
    /// NEFT/IMPS/RTGS.
    BankTransfer,
}

impl PaymentMethod {
    pub const ALLOWED: [&'static str; 4] = ["CASH", "CARD", "UPI", "BANK_TRANSFER"];

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "CASH",
            PaymentMethod::Card => "CARD",
            PaymentMethod::Upi => "UPI",
            PaymentMethod::BankTransfer => "BANK_TRANSFER",
        }
    }
}

impl Default for PaymentMethod {
    fn default() -> Self {
        PaymentMethod::Cash
    }
}

impl FromStr for PaymentMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CASH" => Ok(PaymentMethod::Cash),
            "CARD" => Ok(PaymentMethod::Card),
            "UPI" => Ok(PaymentMethod::Upi),
            "BANK_TRANSFER" => Ok(PaymentMethod::BankTransfer),
            _ => Err(ValidationError::not_allowed("payment_method", &Self::ALLOWED)),
        }
    }
}

// =============================================================================
// Stock Movement Type
// =============================================================================

/// Why a stock ledger entry was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum StockMovementType {
    /// Opening stock or a signed correction by staff.
    ManualAdjustment,
    /// Goods received from a supplier.
    Purchase,
    /// Decrement written by invoice creation.
    InvoiceSale,
    /// Bulk import.
    Import,
}

impl StockMovementType {
    pub const ALLOWED: [&'static str; 4] = ["manual_adjustment", "purchase", "invoice_sale", "import"];

    pub fn as_str(&self) -> &'static str {
        match self {
            StockMovementType::ManualAdjustment => "manual_adjustment",
            StockMovementType::Purchase => "purchase",
            StockMovementType::InvoiceSale => "invoice_sale",
            StockMovementType::Import => "import",
        }
    }
}

impl FromStr for StockMovementType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "manual_adjustment" | "manual" => Ok(StockMovementType::ManualAdjustment),
            "purchase" => Ok(StockMovementType::Purchase),
            "invoice_sale" | "sale" => Ok(StockMovementType::InvoiceSale),
            "import" => Ok(StockMovementType::Import),
            _ => Err(ValidationError::not_allowed("movement_type", &Self::ALLOWED)),
        }
    }
}

// =============================================================================
// Owner
// =============================================================================

/// A tenant: one business and its billing profile.
///
/// `last_invoice_seq` is the per-owner invoice counter. It is advanced inside
/// the invoice transaction, so a rolled-back attempt never consumes a number.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Owner {
    pub id: String,
    pub business_name: String,
    pub gstin: Option<String>,
    pub address: Option<String>,
    pub state: Option<String>,
    pub state_code: Option<String>,
    pub last_invoice_seq: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// Editable business profile fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct OwnerProfile {
    pub business_name: String,
    pub gstin: Option<String>,
    pub address: Option<String>,
    pub state: Option<String>,
    pub state_code: Option<String>,
}

/// Company details frozen onto an invoice at creation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CompanySnapshot {
    pub company_name: String,
    pub company_gstin: Option<String>,
    pub company_address: Option<String>,
    pub company_state: Option<String>,
    pub company_state_code: Option<String>,
}

// =============================================================================
// Product
// =============================================================================

/// A product in an owner's catalogue.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Tenant this product belongs to.
    pub owner_id: String,

    /// Stock Keeping Unit, unique per owner.
    pub sku: String,

    /// Display name shown on the invoice.
    pub name: String,

    pub category: Option<String>,

    /// HSN/SAC classification code.
    pub hsn_code: Option<String>,

    /// Price in paise (smallest currency unit).
    pub price_cents: i64,

    /// Tax rate in basis points (1800 = 18%).
    pub tax_rate_bps: u32,

    /// Current stock. Only ever changed together with a ledger entry.
    pub stock: i64,

    pub low_stock_threshold: i64,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Returns the tax rate.
    #[inline]
    pub fn tax_rate(&self) -> TaxRate {
        TaxRate::from_bps(self.tax_rate_bps)
    }

    /// Checks if current stock covers the requested quantity.
    #[inline]
    pub fn can_fulfil(&self, quantity: i64) -> bool {
        self.stock >= quantity
    }

    #[inline]
    pub fn is_low_stock(&self) -> bool {
        self.stock <= self.low_stock_threshold
    }
}

/// Input for creating a product.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub sku: String,
    pub name: String,
    pub category: Option<String>,
    pub hsn_code: Option<String>,
    pub price_cents: i64,
    pub tax_rate_bps: u32,
    /// Written through the ledger as a manual adjustment when non-zero.
    pub opening_stock: i64,
    pub low_stock_threshold: i64,
}

impl NewProduct {
    /// A product with default tax rate, no opening stock and the default
    /// low-stock threshold.
    pub fn new(sku: impl Into<String>, name: impl Into<String>, price: Money) -> Self {
        NewProduct {
            sku: sku.into(),
            name: name.into(),
            category: None,
            hsn_code: None,
            price_cents: price.cents(),
            tax_rate_bps: crate::DEFAULT_GST_BPS,
            opening_stock: 0,
            low_stock_threshold: crate::DEFAULT_LOW_STOCK_THRESHOLD,
        }
    }

    pub fn with_opening_stock(mut self, stock: i64) -> Self {
        self.opening_stock = stock;
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_tax_rate(mut self, rate: TaxRate) -> Self {
        self.tax_rate_bps = rate.bps();
        self
    }
}

/// Partial update of product details. Stock is deliberately absent: it only
/// moves through the inventory store.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub category: Option<String>,
    pub hsn_code: Option<String>,
    pub price_cents: Option<i64>,
    pub tax_rate_bps: Option<u32>,
    pub low_stock_threshold: Option<i64>,
}

// =============================================================================
// Cart
// =============================================================================

/// A staged product quantity for an owner, joined with the live product.
///
/// `unit_price_cents` and `tax_rate_bps` are snapshots taken when the line
/// was first added; `current_stock` is the live product value.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CartLine {
    pub id: String,
    pub owner_id: String,
    pub product_id: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub discount_kind: DiscountKind,
    pub discount_value: i64,
    pub tax_rate_bps: u32,

    // Joined from products
    pub sku: String,
    pub name: String,
    pub hsn_code: Option<String>,
    pub current_stock: i64,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl CartLine {
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    #[inline]
    pub fn discount(&self) -> Discount {
        Discount {
            kind: self.discount_kind,
            value: self.discount_value,
        }
    }
}

/// Partial cart upsert. Omitted fields are left untouched.
///
/// `quantity: Some(0)` removes the line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartLineUpdate {
    pub quantity: Option<i64>,
    pub discount: Option<Discount>,
}

impl CartLineUpdate {
    pub fn quantity(quantity: i64) -> Self {
        CartLineUpdate {
            quantity: Some(quantity),
            discount: None,
        }
    }

    pub fn discount(discount: Discount) -> Self {
        CartLineUpdate {
            quantity: None,
            discount: Some(discount),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.quantity.is_none() && self.discount.is_none()
    }
}

/// What an upsert did to the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum CartUpsertOutcome {
    Created { line_id: String },
    Updated { line_id: String },
    Removed,
    /// Quantity 0 for a product that was not in the cart.
    Unchanged,
}

// =============================================================================
// Invoice
// =============================================================================

/// An immutable, tax-computed record of a completed sale.
///
/// Every amount is stored once, at creation, from the same computation used
/// for display. Nothing is re-derived on read.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Invoice {
    pub id: String,
    pub owner_id: String,
    /// Human-readable per-owner number, e.g. `INV-000042`.
    pub invoice_number: String,

    pub customer_name: String,
    pub customer_mobile: Option<String>,
    pub customer_gstin: Option<String>,

    // Company snapshot, frozen at creation
    pub company_name: String,
    pub company_gstin: Option<String>,
    pub company_address: Option<String>,
    pub company_state: Option<String>,
    pub company_state_code: Option<String>,

    pub tax_regime: TaxRegime,
    pub tax_rate_bps: u32,
    pub gross_cents: i64,
    pub total_discount_cents: i64,
    pub taxable_cents: i64,
    pub cgst_cents: i64,
    pub sgst_cents: i64,
    pub igst_cents: i64,
    pub round_off_cents: i64,
    pub grand_total_cents: i64,

    pub payment_method: PaymentMethod,
    /// Actor who created the invoice.
    pub created_by: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Invoice {
    #[inline]
    pub fn taxable(&self) -> Money {
        Money::from_cents(self.taxable_cents)
    }

    /// Sum of all tax components.
    #[inline]
    pub fn tax_total(&self) -> Money {
        Money::from_cents(self.cgst_cents + self.sgst_cents + self.igst_cents)
    }

    #[inline]
    pub fn grand_total(&self) -> Money {
        Money::from_cents(self.grand_total_cents)
    }
}

/// A line item in an invoice.
/// Uses snapshot pattern to freeze product data at time of sale.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct InvoiceLine {
    pub id: String,
    pub invoice_id: String,
    pub owner_id: String,
    pub product_id: String,
    /// 1-based position, in ascending product id order.
    pub line_no: i64,
    /// SKU at time of sale (frozen).
    pub sku_snapshot: String,
    /// Product name at time of sale (frozen).
    pub name_snapshot: String,
    pub hsn_code: Option<String>,
    pub quantity: i64,
    /// Unit price in paise, from the cart snapshot.
    pub unit_price_cents: i64,
    pub discount_kind: DiscountKind,
    pub discount_value: i64,
    /// Discount amount actually taken off this line.
    pub discount_cents: i64,
    /// Rate applied to this line (the invoice rate).
    pub tax_rate_bps: u32,
    pub taxable_cents: i64,
    pub tax_cents: i64,
    /// taxable + tax.
    pub line_total_cents: i64,
}

impl InvoiceLine {
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.line_total_cents)
    }
}

/// Invoice header plus its lines, as handed to renderers.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InvoiceWithLines {
    #[serde(flatten)]
    pub invoice: Invoice,
    pub lines: Vec<InvoiceLine>,
}

/// Dashboard figures for one owner on one UTC day.
///
/// Product counts are current, not as of `day`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OwnerSummary {
    #[ts(as = "String")]
    pub day: NaiveDate,
    /// Sum of grand totals invoiced on `day`.
    pub sales_total_cents: i64,
    pub invoice_count: i64,
    pub product_count: i64,
    /// Products at or below their low-stock threshold.
    pub low_stock_count: i64,
    /// Newest invoices overall, newest first.
    pub recent: Vec<Invoice>,
}

impl OwnerSummary {
    pub fn sales_total(&self) -> Money {
        Money::from_cents(self.sales_total_cents)
    }
}

// =============================================================================
// Stock Ledger
// =============================================================================

/// One append-only inventory movement.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StockLedgerEntry {
    pub id: String,
    pub owner_id: String,
    pub product_id: String,
    /// Signed quantity change, never zero.
    pub delta: i64,
    pub movement_type: StockMovementType,
    pub reason: String,
    /// Who performed the change.
    pub actor_id: String,
    /// Invoice id for sales, otherwise unset.
    pub reference_id: Option<String>,
    /// Product stock immediately after this entry.
    pub balance_after: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// A ledger entry to append.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLedgerEntry {
    pub product_id: String,
    pub delta: i64,
    pub movement_type: StockMovementType,
    pub reason: String,
    pub actor_id: String,
    pub reference_id: Option<String>,
}

/// Filters for stock history listings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LedgerFilter {
    pub product_id: Option<String>,
    pub movement_type: Option<StockMovementType>,
    #[ts(as = "Option<String>")]
    pub from: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub to: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
}

/// A product whose stored stock disagrees with its ledger sum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct LedgerMismatch {
    pub product_id: String,
    pub sku: String,
    pub stock: i64,
    pub ledger_sum: i64,
}

// =============================================================================
// Bulk Import
// =============================================================================

/// One row handed over by the bulk import collaborator.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockImportRow {
    pub sku: String,
    pub name: Option<String>,
    pub quantity: i64,
}

/// Counts reported back after an import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ImportSummary {
    pub created: u32,
    pub updated: u32,
    pub skipped: u32,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tax_rate_from_bps() {
        let rate = TaxRate::from_bps(1800);
        assert_eq!(rate.bps(), 1800);
        assert_eq!(rate.percent(), Decimal::new(18, 0));
        assert_eq!(rate.fraction(), Decimal::new(18, 2));
        assert_eq!(rate.to_string(), "18%");
    }

    #[test]
    fn test_tax_rate_from_percent() {
        assert_eq!(TaxRate::from_percent(Decimal::new(28, 0)).unwrap().bps(), 2800);
        assert_eq!(TaxRate::from_percent(Decimal::ZERO).unwrap().bps(), 0);
        assert!(TaxRate::from_percent(Decimal::new(-5, 0)).is_err());
        assert!(TaxRate::from_percent(Decimal::new(18_005, 3)).is_err());
    }

    #[test]
    fn test_default_rate_is_eighteen_percent() {
        assert_eq!(TaxRate::default().bps(), 1800);
        assert_eq!(TaxRegime::default(), TaxRegime::CgstSgst);
        assert_eq!(PaymentMethod::default(), PaymentMethod::Cash);
    }

    #[test]
    fn test_enum_parsing_is_case_insensitive() {
        assert_eq!("igst".parse::<TaxRegime>().unwrap(), TaxRegime::Igst);
        assert_eq!(" upi ".parse::<PaymentMethod>().unwrap(), PaymentMethod::Upi);
        assert_eq!(
            "bank_transfer".parse::<PaymentMethod>().unwrap(),
            PaymentMethod::BankTransfer
        );
        assert_eq!(
            "invoice-sale".parse::<StockMovementType>().unwrap(),
            StockMovementType::InvoiceSale
        );
    }

    #[test]
    fn test_unknown_enum_values_are_rejected() {
        assert!(matches!(
            "CHEQUE".parse::<PaymentMethod>(),
            Err(ValidationError::NotAllowed { .. })
        ));
        assert!("VAT".parse::<TaxRegime>().is_err());
        assert!("BOGO".parse::<DiscountKind>().is_err());
    }

    #[test]
    fn test_discount_parse() {
        let flat = Discount::parse("FLAT", Decimal::new(2550, 2)).unwrap();
        assert_eq!(flat, Discount { kind: DiscountKind::Flat, value: 2550 });

        let pct = Discount::parse("PERCENT", Decimal::new(10, 0)).unwrap();
        assert_eq!(pct, Discount { kind: DiscountKind::Percent, value: 1000 });

        assert!(Discount::parse("PERCENT", Decimal::new(150, 0)).is_err());
        assert!(Discount::parse("FLAT", Decimal::new(-1, 0)).is_err());
    }

    #[test]
    fn test_discount_new_validates_range() {
        assert!(Discount::new(DiscountKind::Flat, -1).is_err());
        assert!(Discount::new(DiscountKind::Percent, 10_001).is_err());
        assert!(Discount::new(DiscountKind::Percent, 10_000).is_ok());
        assert!(Discount::none().is_zero());
    }

    #[test]
    fn test_movement_type_serde_names() {
        let json = serde_json::to_string(&StockMovementType::ManualAdjustment).unwrap();
        assert_eq!(json, "\"manual_adjustment\"");
        let json = serde_json::to_string(&TaxRegime::CgstSgst).unwrap();
        assert_eq!(json, "\"CGST_SGST\"");
    }

    #[test]
    fn test_cart_update_helpers() {
        assert!(CartLineUpdate::default().is_empty());
        assert_eq!(CartLineUpdate::quantity(3).quantity, Some(3));
        assert!(CartLineUpdate::quantity(3).discount.is_none());
        assert!(CartLineUpdate::discount(Discount::none()).quantity.is_none());
    }
}
