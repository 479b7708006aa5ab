//! # Tax Calculator
//!
//! Pure arithmetic from cart lines to invoice totals. No I/O, no state.
//!
//! ## Calculation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  per line:                                                              │
//! │    gross    = unit_price × qty                       (exact, paise)    │
//! │    discount = FLAT:    min(value, gross)                               │
//! │               PERCENT: gross × bps / 10000           (rounded ½↑)      │
//! │    taxable  = gross − discount                       (never negative)  │
//! │                                                                         │
//! │  cart:                                                                  │
//! │    T = Σ taxable                                                        │
//! │    CGST_SGST: cgst = sgst = T × R / 2                (rounded ½↑ each) │
//! │    IGST:      igst        = T × R                    (rounded ½↑)      │
//! │    grand_total = T + cgst + sgst + igst + round_off                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Intermediate values are `rust_decimal::Decimal`; rounding happens once
//! per stored amount, half-up, to whole paise. Because the grand total is the
//! sum of the already-rounded stored parts, the stored invoice always adds up.
//!
//! Per-line tax is computed on each line's taxable amount for display on the
//! invoice line. It may differ from the invoice-level components by at most
//! one paisa per line; the invoice-level figures are authoritative.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{Discount, DiscountKind, TaxRate, TaxRegime};
use crate::validation::{validate_quantity, validate_tax_rate_bps};

// =============================================================================
// Inputs
// =============================================================================

/// One line handed to the calculator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaxLineInput {
    pub unit_price: Money,
    pub quantity: i64,
    pub discount: Discount,
}

impl TaxLineInput {
    pub fn new(unit_price: Money, quantity: i64, discount: Discount) -> Self {
        TaxLineInput {
            unit_price,
            quantity,
            discount,
        }
    }
}

// =============================================================================
// Outputs
// =============================================================================

/// Computed amounts for one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LineAmounts {
    pub gross: Money,
    pub discount: Money,
    pub taxable: Money,
    pub tax: Money,
    pub total: Money,
}

/// Tax components for the whole invoice. Unused components are zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxBreakdown {
    pub regime: TaxRegime,
    pub cgst: Money,
    pub sgst: Money,
    pub igst: Money,
}

impl TaxBreakdown {
    /// Sum of all components.
    pub fn total(&self) -> Money {
        self.cgst + self.sgst + self.igst
    }
}

/// The full result of a calculation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxSummary {
    pub rate: TaxRate,
    pub gross: Money,
    pub total_discount: Money,
    pub taxable: Money,
    pub tax: TaxBreakdown,
    pub round_off: Money,
    pub grand_total: Money,
    /// Same order as the input lines.
    pub lines: Vec<LineAmounts>,
}

// =============================================================================
// Calculation
// =============================================================================

/// Computes invoice totals for a set of lines.
///
/// `round_off` is added verbatim and may be negative.
///
/// ## Errors
/// - quantity not in 1..=MAX_ITEM_QUANTITY
/// - negative unit price or discount, percent discount above 100%
/// - rate above 100%
/// - amounts that overflow i64 paise, per line or summed
pub fn calculate(
    lines: &[TaxLineInput],
    rate: TaxRate,
    regime: TaxRegime,
    round_off: Money,
) -> Result<TaxSummary, ValidationError> {
    validate_tax_rate_bps(rate.bps())?;

    let mut computed = Vec::with_capacity(lines.len());
    for line in lines {
        computed.push(line_amounts(line, rate)?);
    }

    let gross = checked_total(computed.iter().map(|l| l.gross))?;
    let total_discount = checked_total(computed.iter().map(|l| l.discount))?;
    let taxable = checked_total(computed.iter().map(|l| l.taxable))?;

    let tax = split_tax(taxable, rate, regime)?;
    let grand_total = checked_total([taxable, tax.cgst, tax.sgst, tax.igst, round_off])?;

    Ok(TaxSummary {
        rate,
        gross,
        total_discount,
        taxable,
        tax,
        round_off,
        grand_total,
        lines: computed,
    })
}

/// Tax on a taxable amount at `rate` under `regime`.
///
/// ## Example
/// ```rust
/// use billbook_core::tax::split_tax;
/// use billbook_core::{Money, TaxRate, TaxRegime};
///
/// let tax = split_tax(Money::from_cents(30_000), TaxRate::from_bps(1800), TaxRegime::Igst).unwrap();
/// assert_eq!(tax.igst.cents(), 5_400);
/// assert!(tax.cgst.is_zero());
/// ```
pub fn split_tax(
    taxable: Money,
    rate: TaxRate,
    regime: TaxRegime,
) -> Result<TaxBreakdown, ValidationError> {
    let base = taxable.to_decimal();
    match regime {
        TaxRegime::CgstSgst => {
            let half = round(base * rate.fraction() / Decimal::TWO)?;
            Ok(TaxBreakdown {
                regime,
                cgst: half,
                sgst: half,
                igst: Money::zero(),
            })
        }
        TaxRegime::Igst => Ok(TaxBreakdown {
            regime,
            cgst: Money::zero(),
            sgst: Money::zero(),
            igst: round(base * rate.fraction())?,
        }),
    }
}

fn line_amounts(line: &TaxLineInput, rate: TaxRate) -> Result<LineAmounts, ValidationError> {
    validate_quantity(line.quantity)?;
    if line.unit_price.is_negative() {
        return Err(ValidationError::negative("unit_price"));
    }
    // Re-validate in case the discount was built from raw parts
    let discount = Discount::new(line.discount.kind, line.discount.value)?;

    let gross = line
        .unit_price
        .cents()
        .checked_mul(line.quantity)
        .map(Money::from_cents)
        .ok_or_else(|| ValidationError::invalid_format("line_amount", "amount is too large"))?;

    let discount_amount = match discount.kind {
        // A flat discount larger than the line is clamped to the line
        DiscountKind::Flat => Money::from_cents(discount.value.min(gross.cents())),
        DiscountKind::Percent => {
            round(gross.to_decimal() * Decimal::new(discount.value, 4))?.min(gross)
        }
    };

    let taxable = gross - discount_amount;
    let tax = round(taxable.to_decimal() * rate.fraction())?;

    Ok(LineAmounts {
        gross,
        discount: discount_amount,
        taxable,
        tax,
        total: checked_total([taxable, tax])?,
    })
}

fn round(amount: Decimal) -> Result<Money, ValidationError> {
    Money::from_decimal_rounded(amount).ok_or_else(too_large)
}

fn checked_total<I: IntoIterator<Item = Money>>(amounts: I) -> Result<Money, ValidationError> {
    Money::checked_sum(amounts).ok_or_else(too_large)
}

fn too_large() -> ValidationError {
    ValidationError::invalid_format("amount", "amount is too large")
}

// =============================================================================
// Unit Tests
// =============================================================================
