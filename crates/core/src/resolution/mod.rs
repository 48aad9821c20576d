//! Human resolution of price mismatches.
//!
//! Two verbs: accept a new price for a mismatched line (supersede the
//! open price record and re-validate), or dispute the whole invoice.

mod service;

pub use service::{AcceptOutcome, DisputeOutcome, ResolutionService};

use uuid::Uuid;

use crate::invoice::InvoiceError;
use crate::matching::MatchingError;
use crate::pricebook::PriceBookError;

/// Errors from mismatch resolution.
#[derive(Debug, thiserror::Error)]
pub enum ResolutionError {
    /// Invoice not found.
    #[error("invoice not found: {0}")]
    InvoiceNotFound(Uuid),

    /// Invoice line not found.
    #[error("invoice line not found: {0}")]
    LineNotFound(Uuid),

    /// No reference price exists for the supplier and product.
    #[error("{0}")]
    ReferenceNotFound(String),

    /// The request cannot be applied to this line or invoice.
    #[error("{0}")]
    Validation(String),

    /// Repository operation failed.
    #[error("repository error: {0}")]
    Repository(String),
}

impl ResolutionError {
    /// Create a validation error.
    #[must_use]
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

impl From<InvoiceError> for ResolutionError {
    fn from(e: InvoiceError) -> Self {
        match e {
            InvoiceError::NotFound(id) => Self::InvoiceNotFound(id),
            InvoiceError::Repository(msg) => Self::Repository(msg),
        }
    }
}

impl From<PriceBookError> for ResolutionError {
    fn from(e: PriceBookError) -> Self {
        match e {
            PriceBookError::Repository(msg) => Self::Repository(msg),
        }
    }
}

impl From<MatchingError> for ResolutionError {
    fn from(e: MatchingError) -> Self {
        match e {
            MatchingError::InvoiceNotFound(id) => Self::InvoiceNotFound(id),
            MatchingError::Repository(msg) => Self::Repository(msg),
        }
    }
}
