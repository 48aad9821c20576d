//! Price validation engine.
//!
//! Validates every line of a parsed invoice against the price book:
//! resolve a reference price (SKU first, product name fallback), compare
//! within tolerance, learn a provisional price when no reference exists.
//! The invoice is `validated` only when every line matched.

mod service;
mod types;

pub use service::MatchingService;
pub use types::{Tolerance, ValidationStatus, ValidationSummary};

use uuid::Uuid;

use crate::invoice::InvoiceError;
use crate::pricebook::PriceBookError;

/// Errors from the validation engine.
#[derive(Debug, thiserror::Error)]
pub enum MatchingError {
    /// Invoice not found.
    #[error("invoice not found: {0}")]
    InvoiceNotFound(Uuid),

    /// Repository operation failed.
    #[error("repository error: {0}")]
    Repository(String),
}

impl From<InvoiceError> for MatchingError {
    fn from(e: InvoiceError) -> Self {
        match e {
            InvoiceError::NotFound(id) => Self::InvoiceNotFound(id),
            InvoiceError::Repository(msg) => Self::Repository(msg),
        }
    }
}

impl From<PriceBookError> for MatchingError {
    fn from(e: PriceBookError) -> Self {
        match e {
            PriceBookError::Repository(msg) => Self::Repository(msg),
        }
    }
}
