//! Raw extractor output, exactly as it comes off the wire.
//!
//! The AI extractor returns loosely-typed JSON: numbers may arrive as
//! strings with currency symbols and comma decimals, dates as free text.
//! Nothing here is trusted until `clean` and `dates` have run over it.

use serde::Deserialize;

use super::error::ExtractionError;

/// A JSON value that should be a number but may be a string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    /// Came back as a JSON number.
    Number(f64),
    /// Came back as a string, possibly with currency symbols.
    Text(String),
}

/// Invoice header and lines as returned by the extractor.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawExtraction {
    /// Supplier name.
    #[serde(default)]
    pub supplier_name: Option<String>,
    /// Invoice number.
    #[serde(default)]
    pub invoice_number: Option<String>,
    /// Invoice date as printed, any format.
    #[serde(default)]
    pub invoice_date: Option<String>,
    /// ISO currency code.
    #[serde(default)]
    pub currency: Option<String>,
    /// Net amount before VAT.
    #[serde(default)]
    pub subtotal_amount: Option<RawValue>,
    /// VAT amount.
    #[serde(default)]
    pub tax_amount: Option<RawValue>,
    /// Freight amount. The wire field keeps its historical misspelling.
    #[serde(default, rename = "frieght_amount")]
    pub freight_amount: Option<RawValue>,
    /// Gross total.
    #[serde(default)]
    pub total_amount: Option<RawValue>,
    /// Line items.
    #[serde(default)]
    pub lines: Vec<RawLine>,
    /// Warnings the extractor emitted about its own output.
    #[serde(default)]
    pub warnings: Vec<String>,
}

/// One extracted line item.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawLine {
    /// 1-based line number.
    #[serde(default)]
    pub line_no: Option<i64>,
    /// Supplier SKU.
    #[serde(default)]
    pub sku: Option<String>,
    /// Product name.
    #[serde(default)]
    pub product_name: Option<String>,
    /// Free-text description.
    #[serde(default)]
    pub description: Option<String>,
    /// Quantity.
    #[serde(default)]
    pub quantity: Option<RawValue>,
    /// Unit of measure ("PCS", "STK", ...).
    #[serde(default)]
    pub unit: Option<String>,
    /// Price per unit.
    #[serde(default)]
    pub unit_price: Option<RawValue>,
    /// Discount percent or amount, as printed.
    #[serde(default)]
    pub discount: Option<RawValue>,
    /// Total discount amount for the line.
    #[serde(default)]
    pub discount_total: Option<RawValue>,
    /// Net amount after discount.
    #[serde(default)]
    pub net_amount: Option<RawValue>,
    /// VAT percent, possibly with a `%` suffix.
    #[serde(default)]
    pub vat_percentage: Option<RawValue>,
    /// Extended line total.
    #[serde(default)]
    pub line_total: Option<RawValue>,
}

/// AI extractor collaborator.
///
/// Implemented by [`super::OpenAiExtractor`] in production and by canned
/// responders in service tests.
pub trait InvoiceExtractor: Send + Sync {
    /// Extract structured invoice data from raw PDF text and an optional
    /// logo image (PNG bytes).
    fn extract_invoice(
        &self,
        text: &str,
        logo_png: Option<&[u8]>,
    ) -> impl std::future::Future<Output = Result<RawExtraction, ExtractionError>> + Send;

    /// Model name, for audit details.
    fn model(&self) -> &str;
}
