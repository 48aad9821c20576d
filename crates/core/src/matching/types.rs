//! Validation engine types.

use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::invoice::InvoiceStatus;

/// Absolute epsilon used by [`Tolerance::Absolute`].
const PRICE_EPSILON: Decimal = Decimal::from_parts(1, 0, 0, false, 4);

/// Price comparison tolerance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tolerance {
    /// Prices match when `|invoice - reference| < 0.0001`. The default,
    /// and the only mode the system has ever run in.
    Absolute,
    /// Prices match when the deviation stays within the given percentage
    /// of the reference price. Explicit operator opt-in.
    Percent(Decimal),
}

impl Default for Tolerance {
    fn default() -> Self {
        Self::Absolute
    }
}

impl Tolerance {
    /// Whether an invoice price agrees with a reference price.
    #[must_use]
    pub fn matches(self, invoice_price: Decimal, reference_price: Decimal) -> bool {
        let diff = (invoice_price - reference_price).abs();
        match self {
            Self::Absolute => diff < PRICE_EPSILON,
            Self::Percent(pct) => {
                diff * Decimal::ONE_HUNDRED <= reference_price.abs() * pct
            }
        }
    }
}

/// Per-line counts from one validation pass.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationSummary {
    /// Invoice that was validated.
    pub invoice_id: Uuid,
    /// Status the invoice ended in.
    pub status: InvoiceStatus,
    /// Total lines examined.
    pub line_count: usize,
    /// Lines that matched their reference price.
    pub matched_count: usize,
    /// Lines that deviated from their reference price.
    pub mismatch_count: usize,
    /// Lines for which a provisional price was learned.
    pub created_count: usize,
    /// Lines with no usable price or identity.
    pub unknown_count: usize,
}

impl ValidationSummary {
    /// True when every line matched and there was at least one line.
    #[must_use]
    pub fn fully_matched(&self) -> bool {
        self.line_count > 0
            && self.mismatch_count == 0
            && self.created_count == 0
            && self.unknown_count == 0
    }
}

/// Read-only view of stored match statuses, without re-validating.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationStatus {
    /// Invoice examined.
    pub invoice_id: Uuid,
    /// Current lifecycle status.
    pub status: InvoiceStatus,
    /// Total lines.
    pub line_count: usize,
    /// Lines whose stored status is `match`.
    pub matched_count: usize,
    /// Lines whose stored status is `mismatch`.
    pub mismatch_count: usize,
    /// Lines whose stored status is `created_price_record`.
    pub created_count: usize,
    /// Lines whose stored status is `unknown` or `no_match`.
    pub unknown_count: usize,
    /// Lines not yet validated at all.
    pub unvalidated_count: usize,
}
