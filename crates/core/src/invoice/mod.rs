//! Invoice and invoice-line domain types.
//!
//! An invoice moves through `received -> parsed -> validated` in the happy
//! path, detouring to `needs_review` on extraction failure or price
//! mismatch, and to `disputed` on human rejection. Lines carry their own
//! match status written by the validation engine.

mod repository;
mod types;

pub use repository::InvoiceRepository;
pub use types::{
    Invoice, InvoiceHeaderPatch, InvoiceLine, InvoiceStatus, LineStatus, NewInvoice,
    NewInvoiceLine,
};

/// Invoice persistence error.
#[derive(Debug, thiserror::Error)]
pub enum InvoiceError {
    /// Invoice not found.
    #[error("invoice not found: {0}")]
    NotFound(uuid::Uuid),

    /// Repository operation failed.
    #[error("repository error: {0}")]
    Repository(String),
}

impl InvoiceError {
    /// Create a repository error.
    #[must_use]
    pub fn repository(msg: impl Into<String>) -> Self {
        Self::Repository(msg.into())
    }
}
