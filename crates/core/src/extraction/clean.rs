//! Cleaning of raw extractor values.
//!
//! Danish invoices print amounts like `1,50` or `10,50 kr`. The extractor
//! is told to normalize but does not always comply, so every numeric field
//! goes through here before it reaches the database. Unparseable values
//! become `None` with a warning; negatives are coerced to their absolute
//! value because the schema constrains amounts to be non-negative.

use rust_decimal::Decimal;
use tracing::warn;

use crate::invoice::NewInvoiceLine;

use super::types::{RawLine, RawValue};

/// Parse a raw numeric value into a `Decimal`.
///
/// Strings are stripped of currency symbols and spaces, with the decimal
/// comma replaced by a dot. A string that still does not parse yields
/// `None`.
#[must_use]
pub fn clean_amount(field: &str, value: &RawValue) -> Option<Decimal> {
    match value {
        RawValue::Number(n) => Decimal::try_from(*n).ok(),
        RawValue::Text(s) => {
            let normalized = s
                .replace(',', ".")
                .replace(' ', "")
                .replace('€', "")
                .replace('$', "")
                .replace("kr", "")
                .replace("DKK", "")
                .replace("EUR", "");
            match normalized.parse::<Decimal>() {
                Ok(d) => Some(d),
                Err(_) => {
                    warn!(field, value = %s, "Could not parse numeric field, dropping");
                    None
                }
            }
        }
    }
}

/// Parse a raw percentage, stripping a trailing `%`.
#[must_use]
pub fn clean_percent(field: &str, value: &RawValue) -> Option<Decimal> {
    match value {
        RawValue::Number(n) => Decimal::try_from(*n).ok(),
        RawValue::Text(s) => {
            let stripped = s.replace('%', "");
            clean_amount(field, &RawValue::Text(stripped.trim().to_string()))
        }
    }
}

/// Coerce a negative amount to its absolute value, warning when it happens.
#[must_use]
pub fn non_negative(field: &str, value: Option<Decimal>) -> Option<Decimal> {
    value.map(|d| {
        if d.is_sign_negative() {
            warn!(field, value = %d, "Negative amount coerced to positive");
            d.abs()
        } else {
            d
        }
    })
}

/// Clean one raw line into an insertable invoice line.
///
/// `position` is the 0-based index in the extractor output, used when the
/// extractor failed to number the line itself.
#[must_use]
pub fn clean_line(position: usize, raw: &RawLine) -> NewInvoiceLine {
    let line_no = raw
        .line_no
        .and_then(|n| i32::try_from(n).ok())
        .unwrap_or_else(|| i32::try_from(position).unwrap_or(i32::MAX).saturating_add(1));

    NewInvoiceLine {
        line_no,
        sku: raw.sku.clone(),
        product_name: raw.product_name.clone(),
        description: raw.description.clone(),
        quantity: non_negative(
            "quantity",
            raw.quantity.as_ref().and_then(|v| clean_amount("quantity", v)),
        ),
        unit: raw.unit.clone(),
        unit_price: non_negative(
            "unit_price",
            raw.unit_price
                .as_ref()
                .and_then(|v| clean_amount("unit_price", v)),
        ),
        discount_percent: raw
            .discount
            .as_ref()
            .and_then(|v| clean_amount("discount", v)),
        discount_total: raw
            .discount_total
            .as_ref()
            .and_then(|v| clean_amount("discount_total", v)),
        net_amount: non_negative(
            "net_amount",
            raw.net_amount
                .as_ref()
                .and_then(|v| clean_amount("net_amount", v)),
        ),
        line_total: non_negative(
            "line_total",
            raw.line_total
                .as_ref()
                .and_then(|v| clean_amount("line_total", v)),
        ),
        vat_rate: raw
            .vat_percentage
            .as_ref()
            .and_then(|v| clean_percent("vat_percentage", v)),
    }
}
