//! # Invoice Request
//!
//! The invoice-creation request body and its resolution into typed options.
//!
//! Every field of the request is optional. Defaults are applied in exactly
//! one place, [`CreateInvoiceRequest::resolve`]:
//!
//! | field          | default              |
//! |----------------|----------------------|
//! | customerName   | `"Walk-in Customer"` |
//! | gstPercent     | 18                   |
//! | gstType        | `CGST_SGST`          |
//! | paymentMethod  | `CASH`               |
//! | roundOff       | 0                    |
//!
//! `roundOff` must stay within ±₹100.00 (`MAX_ROUND_OFF_CENTS`).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{PaymentMethod, TaxRate, TaxRegime};
use crate::validation::{normalize_optional, validate_gstin, validate_mobile};
use crate::{MAX_ROUND_OFF_CENTS, WALK_IN_CUSTOMER};

/// Raw request as supplied by the caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvoiceRequest {
    pub customer_name: Option<String>,
    pub customer_mobile: Option<String>,
    pub customer_gstin: Option<String>,
    #[ts(as = "Option<String>")]
    pub gst_percent: Option<Decimal>,
    pub gst_type: Option<String>,
    pub payment_method: Option<String>,
    #[ts(as = "Option<String>")]
    pub round_off: Option<Decimal>,
}

/// Customer details recorded on the invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Customer {
    pub name: String,
    pub mobile: Option<String>,
    pub gstin: Option<String>,
}

/// Fully resolved invoice options: no optional knobs left.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InvoiceOptions {
    pub customer: Customer,
    pub tax_rate: TaxRate,
    pub regime: TaxRegime,
    pub payment_method: PaymentMethod,
    pub round_off: Money,
}

impl Default for InvoiceOptions {
    fn default() -> Self {
        InvoiceOptions {
            customer: Customer {
                name: WALK_IN_CUSTOMER.to_string(),
                mobile: None,
                gstin: None,
            },
            tax_rate: TaxRate::default(),
            regime: TaxRegime::default(),
            payment_method: PaymentMethod::default(),
            round_off: Money::zero(),
        }
    }
}

impl CreateInvoiceRequest {
    /// Applies defaults and validates every supplied field.
    ///
    /// Blank strings count as absent.
    ///
    /// ## Example
    /// ```rust
    /// use billbook_core::request::CreateInvoiceRequest;
    /// use billbook_core::{PaymentMethod, TaxRegime};
    ///
    /// let opts = CreateInvoiceRequest::default().resolve().unwrap();
    /// assert_eq!(opts.customer.name, "Walk-in Customer");
    /// assert_eq!(opts.tax_rate.bps(), 1800);
    /// assert_eq!(opts.regime, TaxRegime::CgstSgst);
    /// assert_eq!(opts.payment_method, PaymentMethod::Cash);
    /// assert!(opts.round_off.is_zero());
    /// ```
    pub fn resolve(self) -> Result<InvoiceOptions, ValidationError> {
        let defaults = InvoiceOptions::default();

        let name = normalize_optional(self.customer_name).unwrap_or(defaults.customer.name);
        if name.chars().count() > 200 {
            return Err(ValidationError::TooLong {
                field: "customer_name".to_string(),
                max: 200,
            });
        }

        let mobile = normalize_optional(self.customer_mobile);
        if let Some(m) = &mobile {
            validate_mobile(m)?;
        }

        let gstin = normalize_optional(self.customer_gstin).map(|g| g.to_ascii_uppercase());
        if let Some(g) = &gstin {
            validate_gstin("customer_gstin", g)?;
        }

        let tax_rate = match self.gst_percent {
            Some(pct) => TaxRate::from_percent(pct)?,
            None => defaults.tax_rate,
        };

        let regime = match normalize_optional(self.gst_type) {
            Some(s) => s.parse()?,
            None => defaults.regime,
        };

        let payment_method = match normalize_optional(self.payment_method) {
            Some(s) => s.parse()?,
            None => defaults.payment_method,
        };

        let round_off = match self.round_off {
            Some(amount) => Money::from_decimal_exact("round_off", amount)?,
            None => defaults.round_off,
        };
        if !(-MAX_ROUND_OFF_CENTS..=MAX_ROUND_OFF_CENTS).contains(&round_off.cents()) {
            return Err(ValidationError::OutOfRange {
                field: "round_off".to_string(),
                min: -MAX_ROUND_OFF_CENTS,
                max: MAX_ROUND_OFF_CENTS,
            });
        }

        Ok(InvoiceOptions {
            customer: Customer {
                name,
                mobile,
                gstin,
            },
            tax_rate,
            regime,
            payment_method,
            round_off,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_body_uses_camel_case() {
        let req: CreateInvoiceRequest = serde_json::from_str(
            r#"{"customerName":"Asha","gstPercent":"12","paymentMethod":"upi","roundOff":"-0.40","gstType":"IGST"}"#,
        )
        .unwrap();
        let opts = req.resolve().unwrap();

        assert_eq!(opts.customer.name, "Asha");
        assert_eq!(opts.tax_rate.bps(), 1200);
        assert_eq!(opts.payment_method, PaymentMethod::Upi);
        assert_eq!(opts.round_off.cents(), -40);
        assert_eq!(opts.regime, TaxRegime::Igst);
    }

    #[test]
    fn test_blank_fields_fall_back_to_defaults() {
        let req = CreateInvoiceRequest {
            customer_name: Some("   ".to_string()),
            payment_method: Some(String::new()),
            ..Default::default()
        };
        let opts = req.resolve().unwrap();
        assert_eq!(opts, InvoiceOptions::default());
    }

    #[test]
    fn test_round_off_is_capped() {
        let at_cap = CreateInvoiceRequest {
            round_off: Some(Decimal::new(-10_000, 2)),
            ..Default::default()
        };
        assert_eq!(at_cap.resolve().unwrap().round_off.cents(), -10_000);

        let huge = CreateInvoiceRequest {
            round_off: Some(Decimal::new(i64::MAX, 2)),
            ..Default::default()
        };
        assert!(matches!(
            huge.resolve(),
            Err(ValidationError::OutOfRange { ref field, .. }) if field == "round_off"
        ));

        let just_over = CreateInvoiceRequest {
            round_off: Some(Decimal::new(10_001, 2)),
            ..Default::default()
        };
        assert!(just_over.resolve().is_err());
    }

    #[test]
    fn test_invalid_fields_are_rejected() {
        let bad_method = CreateInvoiceRequest {
            payment_method: Some("CHEQUE".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            bad_method.resolve(),
            Err(ValidationError::NotAllowed { .. })
        ));

        let bad_rate = CreateInvoiceRequest {
            gst_percent: Some(Decimal::new(120, 0)),
            ..Default::default()
        };
        assert!(bad_rate.resolve().is_err());

        let bad_round_off = CreateInvoiceRequest {
            round_off: Some(Decimal::new(1, 3)),
            ..Default::default()
        };
        assert!(bad_round_off.resolve().is_err());

        let bad_mobile = CreateInvoiceRequest {
            customer_mobile: Some("12ab".to_string()),
            ..Default::default()
        };
        assert!(bad_mobile.resolve().is_err());
    }

    #[test]
    fn test_gstin_is_uppercased() {
        let req = CreateInvoiceRequest {
            customer_gstin: Some("22aaaaa0000a1z5".to_string()),
            ..Default::default()
        };
        let opts = req.resolve().unwrap();
        assert_eq!(opts.customer.gstin.as_deref(), Some("22AAAAA0000A1Z5"));
    }
}
