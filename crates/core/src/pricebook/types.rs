//! Price book domain types.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Review status of a reference price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceStatus {
    /// Usable for matching.
    Active,
    /// Learned from an invoice; awaiting human confirmation.
    NeedReview,
}

impl PriceStatus {
    /// Convert to database string value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::NeedReview => "need_review",
        }
    }

    /// Parse from database string value.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Self::Active),
            "need_review" => Some(Self::NeedReview),
            _ => None,
        }
    }
}

/// Provenance of a reference price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceSource {
    /// Entered by hand.
    Manual,
    /// Learned automatically from an invoice line with no prior reference.
    LearnedFromInvoice,
}

impl PriceSource {
    /// Convert to database string value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::LearnedFromInvoice => "learned_from_invoice",
        }
    }

    /// Parse from database string value.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "manual" => Some(Self::Manual),
            "learned_from_invoice" => Some(Self::LearnedFromInvoice),
            _ => None,
        }
    }
}

/// One reference price record.
#[derive(Debug, Clone, Serialize)]
pub struct PriceRecord {
    /// Unique identifier.
    pub id: Uuid,
    /// Supplier the price belongs to.
    pub supplier_name: String,
    /// Supplier SKU, if known.
    pub sku: Option<String>,
    /// Product description, if known.
    pub product_name: Option<String>,
    /// Reference unit price.
    pub unit_price: Decimal,
    /// ISO currency code.
    pub currency: Option<String>,
    /// First day the price applies.
    pub valid_from: Option<NaiveDate>,
    /// Last day the price applies; `None` means open-ended.
    pub valid_to: Option<NaiveDate>,
    /// Review status.
    pub status: PriceStatus,
    /// Provenance.
    pub source: PriceSource,
    /// Row creation time.
    pub created_at: DateTime<Utc>,
}

/// Input for inserting a reference price record.
#[derive(Debug, Clone)]
pub struct NewPriceRecord {
    /// Supplier the price belongs to.
    pub supplier_name: String,
    /// Supplier SKU.
    pub sku: Option<String>,
    /// Product description.
    pub product_name: Option<String>,
    /// Reference unit price.
    pub unit_price: Decimal,
    /// ISO currency code.
    pub currency: Option<String>,
    /// First day the price applies.
    pub valid_from: Option<NaiveDate>,
    /// Last day the price applies.
    pub valid_to: Option<NaiveDate>,
    /// Review status.
    pub status: PriceStatus,
    /// Provenance.
    pub source: PriceSource,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_roundtrip() {
        for status in [PriceStatus::Active, PriceStatus::NeedReview] {
            assert_eq!(PriceStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(PriceStatus::parse("open"), None);
    }

    #[test]
    fn test_source_roundtrip() {
        for source in [
            PriceSource::Manual,
            PriceSource::LearnedFromInvoice,
        ] {
            assert_eq!(PriceSource::parse(source.as_str()), Some(source));
        }
    }
}
