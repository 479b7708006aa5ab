//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In JavaScript/floating point:                                          │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  OUR SOLUTION: Integer minor units (paise)                              │
//! │    Stored and summed as i64, never as f64                               │
//! │                                                                         │
//! │  Intermediate tax/discount math that produces fractions of a paisa     │
//! │  runs on rust_decimal::Decimal and is rounded ONCE, half-up, when it    │
//! │  crosses back into Money (the storage/display boundary).               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use billbook_core::money::Money;
//!
//! // Create from minor units (preferred)
//! let price = Money::from_cents(1099); // ₹10.99
//!
//! // Arithmetic operations
//! let doubled = price * 2;                    // ₹21.98
//! let total = price + Money::from_cents(500); // ₹15.99
//! assert_eq!(total.cents(), 1599);
//! ```

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};
use ts_rs::TS;

use crate::error::ValidationError;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (paise for INR).
///
/// ## Design Decisions
/// - **i64 (signed)**: round-off adjustments may be negative
/// - **Single field tuple struct**: Zero-cost abstraction over i64
///
/// ## Where Money is Used
/// ```text
/// Product.price_cents ──► CartLine.unit_price_cents (snapshot)
///                                   │
///                                   ▼
///            Tax Calculator ──► taxable, CGST/SGST/IGST, grand total
///                                   │
///                                   ▼
///                  Invoice columns (stored once, never re-derived)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from minor units.
    ///
    /// ## Example
    /// ```rust
    /// use billbook_core::money::Money;
    ///
    /// let price = Money::from_cents(1099); // ₹10.99
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from major and minor units.
    ///
    /// For negative amounts only the major unit should be negative:
    /// `from_major_minor(-5, 50)` is -₹5.50.
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Parses a caller-supplied decimal amount (e.g. `12.50`) without rounding.
    ///
    /// Inputs with more than two decimal places are rejected rather than
    /// silently rounded.
    ///
    /// ## Example
    /// ```rust
    /// use billbook_core::money::Money;
    /// use rust_decimal::Decimal;
    ///
    /// let round_off = Money::from_decimal_exact("round_off", Decimal::new(-45, 2)).unwrap();
    /// assert_eq!(round_off.cents(), -45);
    ///
    /// assert!(Money::from_decimal_exact("round_off", Decimal::new(1234, 3)).is_err());
    /// ```
    pub fn from_decimal_exact(field: &str, amount: Decimal) -> Result<Self, ValidationError> {
        let normalized = amount.normalize();
        if normalized.scale() > 2 {
            return Err(ValidationError::invalid_format(
                field,
                "must have at most 2 decimal places",
            ));
        }
        Money::from_decimal_rounded(normalized)
            .ok_or_else(|| ValidationError::invalid_format(field, "amount is too large"))
    }

    /// Rounds an exact decimal amount (in major units) to 2 decimal places
    /// using round-half-up, and converts it to Money.
    ///
    /// Returns `None` if the value does not fit in i64 minor units.
    ///
    /// ## Example
    /// ```rust
    /// use billbook_core::money::Money;
    /// use rust_decimal::Decimal;
    ///
    /// // 0.125 → 0.13 (half rounds up, not to even)
    /// let m = Money::from_decimal_rounded(Decimal::new(125, 3)).unwrap();
    /// assert_eq!(m.cents(), 13);
    /// ```
    pub fn from_decimal_rounded(amount: Decimal) -> Option<Self> {
        let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        (rounded * Decimal::ONE_HUNDRED).to_i64().map(Money)
    }

    /// Returns the exact value in major units as a Decimal.
    #[inline]
    pub fn to_decimal(&self) -> Decimal {
        Decimal::new(self.0, 2)
    }

    /// Returns the value in minor units.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit (rupees) portion.
    #[inline]
    pub const fn rupees(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit (paise) portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiplies money by a quantity.
    ///
    /// ## Example
    /// ```rust
    /// use billbook_core::money::Money;
    ///
    /// let unit_price = Money::from_cents(299);
    /// assert_eq!(unit_price.multiply_quantity(3).cents(), 897);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Adds two amounts, `None` on overflow.
    #[inline]
    pub const fn checked_add(&self, other: Money) -> Option<Money> {
        match self.0.checked_add(other.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Sums amounts, `None` if any partial sum overflows.
    ///
    /// ## Example
    /// ```rust
    /// use billbook_core::money::Money;
    ///
    /// let parts = [Money::from_cents(i64::MAX), Money::from_cents(1)];
    /// assert!(Money::checked_sum(parts).is_none());
    /// assert_eq!(Money::checked_sum([Money::from_cents(5), Money::from_cents(7)]).unwrap().cents(), 12);
    /// ```
    pub fn checked_sum<I>(amounts: I) -> Option<Money>
    where
        I: IntoIterator<Item = Money>,
    {
        amounts
            .into_iter()
            .try_fold(Money::zero(), |acc, amount| acc.checked_add(amount))
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display shows the amount with two decimals, for logs and CLI output.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}₹{}.{:02}", sign, self.rupees().abs(), self.cents_part())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
