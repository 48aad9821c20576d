//! Invoice domain types.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    /// Ingested from mail; PDF stored, nothing extracted yet.
    Received,
    /// Header and at least one line extracted.
    Parsed,
    /// Every line matched its reference price.
    Validated,
    /// Extraction or validation needs a human.
    NeedsReview,
    /// A human rejected the invoice.
    Disputed,
}

impl InvoiceStatus {
    /// Convert to database string value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Parsed => "parsed",
            Self::Validated => "validated",
            Self::NeedsReview => "needs_review",
            Self::Disputed => "disputed",
        }
    }

    /// Parse from database string value.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "received" => Some(Self::Received),
            "parsed" => Some(Self::Parsed),
            "validated" => Some(Self::Validated),
            "needs_review" => Some(Self::NeedsReview),
            "disputed" => Some(Self::Disputed),
            _ => None,
        }
    }
}

/// Per-line outcome of a validation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineStatus {
    /// Price agrees with the active reference price.
    Match,
    /// Price deviates from the active reference price.
    Mismatch,
    /// No reference existed; a provisional one was learned.
    CreatedPriceRecord,
    /// Line carries no usable price or identity.
    Unknown,
    /// Set when the invoice is disputed.
    NoMatch,
}

impl LineStatus {
    /// Convert to database string value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Match => "match",
            Self::Mismatch => "mismatch",
            Self::CreatedPriceRecord => "created_price_record",
            Self::Unknown => "unknown",
            Self::NoMatch => "no_match",
        }
    }

    /// Parse from database string value.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "match" => Some(Self::Match),
            "mismatch" => Some(Self::Mismatch),
            "created_price_record" => Some(Self::CreatedPriceRecord),
            "unknown" => Some(Self::Unknown),
            "no_match" => Some(Self::NoMatch),
            _ => None,
        }
    }
}

/// Invoice header.
#[derive(Debug, Clone, Serialize)]
pub struct Invoice {
    /// Unique identifier.
    pub id: Uuid,
    /// Mail message the invoice arrived in, if mail-ingested.
    pub source_message_id: Option<String>,
    /// Sender address of that mail.
    pub sender: Option<String>,
    /// Storage key of the stored PDF.
    pub pdf_object_key: Option<String>,
    /// Original attachment filename.
    pub pdf_filename: Option<String>,
    /// Supplier name as printed on the invoice.
    pub supplier_name: Option<String>,
    /// Invoice number as printed.
    pub invoice_number: Option<String>,
    /// Invoice date as printed.
    pub invoice_date: Option<NaiveDate>,
    /// ISO currency code.
    pub currency: Option<String>,
    /// Net amount before VAT.
    pub net_amount: Option<Decimal>,
    /// VAT amount.
    pub vat_amount: Option<Decimal>,
    /// Freight amount.
    pub freight_amount: Option<Decimal>,
    /// Gross total.
    pub total_amount: Option<Decimal>,
    /// Lifecycle status.
    pub status: InvoiceStatus,
    /// When the invoice last passed validation, if it did.
    pub validated_at: Option<DateTime<Utc>>,
    /// Row creation time.
    pub created_at: DateTime<Utc>,
    /// Row update time.
    pub updated_at: DateTime<Utc>,
}

/// Input for registering a freshly ingested invoice.
#[derive(Debug, Clone)]
pub struct NewInvoice {
    /// Mail message the invoice arrived in.
    pub source_message_id: Option<String>,
    /// Sender address of that mail.
    pub sender: Option<String>,
    /// Storage key of the stored PDF.
    pub pdf_object_key: Option<String>,
    /// Original attachment filename.
    pub pdf_filename: Option<String>,
}

/// Header fields written back after extraction.
///
/// All fields optional; `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default)]
pub struct InvoiceHeaderPatch {
    /// Supplier name.
    pub supplier_name: Option<String>,
    /// Invoice number.
    pub invoice_number: Option<String>,
    /// Invoice date.
    pub invoice_date: Option<NaiveDate>,
    /// ISO currency code.
    pub currency: Option<String>,
    /// Net amount.
    pub net_amount: Option<Decimal>,
    /// VAT amount.
    pub vat_amount: Option<Decimal>,
    /// Freight amount.
    pub freight_amount: Option<Decimal>,
    /// Gross total.
    pub total_amount: Option<Decimal>,
}

/// One invoice line.
#[derive(Debug, Clone, Serialize)]
pub struct InvoiceLine {
    /// Unique identifier.
    pub id: Uuid,
    /// Owning invoice.
    pub invoice_id: Uuid,
    /// 1-based position on the invoice.
    pub line_no: i32,
    /// Supplier SKU, if printed.
    pub sku: Option<String>,
    /// Product name.
    pub product_name: Option<String>,
    /// Free-text description.
    pub description: Option<String>,
    /// Quantity.
    pub quantity: Option<Decimal>,
    /// Unit of measure.
    pub unit: Option<String>,
    /// Price per unit.
    pub unit_price: Option<Decimal>,
    /// Line discount percent.
    pub discount_percent: Option<Decimal>,
    /// Total discount amount for the line.
    pub discount_total: Option<Decimal>,
    /// Net amount after discount.
    pub net_amount: Option<Decimal>,
    /// Extended line total.
    pub line_total: Option<Decimal>,
    /// VAT rate percent.
    pub vat_rate: Option<Decimal>,
    /// Match status from the last validation pass.
    pub match_status: Option<LineStatus>,
    /// Reference price the line was compared against.
    pub matched_price: Option<Decimal>,
    /// `unit_price - matched_price` when both are known.
    pub price_delta: Option<Decimal>,
    /// Row creation time.
    pub created_at: DateTime<Utc>,
}

/// Input for inserting one extracted line.
#[derive(Debug, Clone)]
pub struct NewInvoiceLine {
    /// 1-based position on the invoice.
    pub line_no: i32,
    /// Supplier SKU.
    pub sku: Option<String>,
    /// Product name.
    pub product_name: Option<String>,
    /// Free-text description.
    pub description: Option<String>,
    /// Quantity.
    pub quantity: Option<Decimal>,
    /// Unit of measure.
    pub unit: Option<String>,
    /// Price per unit.
    pub unit_price: Option<Decimal>,
    /// Line discount percent.
    pub discount_percent: Option<Decimal>,
    /// Total discount amount for the line.
    pub discount_total: Option<Decimal>,
    /// Net amount after discount.
    pub net_amount: Option<Decimal>,
    /// Extended line total.
    pub line_total: Option<Decimal>,
    /// VAT rate percent.
    pub vat_rate: Option<Decimal>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invoice_status_roundtrip() {
        for status in [
            InvoiceStatus::Received,
            InvoiceStatus::Parsed,
            InvoiceStatus::Validated,
            InvoiceStatus::NeedsReview,
            InvoiceStatus::Disputed,
        ] {
            assert_eq!(InvoiceStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(InvoiceStatus::parse("archived"), None);
    }

    #[test]
    fn test_line_status_roundtrip() {
        for status in [
            LineStatus::Match,
            LineStatus::Mismatch,
            LineStatus::CreatedPriceRecord,
            LineStatus::Unknown,
            LineStatus::NoMatch,
        ] {
            assert_eq!(LineStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(LineStatus::parse(""), None);
    }
}
