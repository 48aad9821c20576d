//! Extraction error types.

use uuid::Uuid;

use crate::invoice::InvoiceError;
use crate::storage::StorageError;

/// Errors from the extraction pipeline.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    /// Invoice not found.
    #[error("invoice not found: {0}")]
    InvoiceNotFound(Uuid),

    /// Invoice has no stored PDF to extract from.
    #[error("invoice {0} has no stored pdf")]
    MissingPdf(Uuid),

    /// PDF could not be fetched from object storage.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// PDF could not be opened or read.
    #[error("document error: {0}")]
    Document(String),

    /// AI extractor call failed.
    #[error("extractor error: {0}")]
    Collaborator(String),

    /// AI extractor returned something that is not the expected JSON.
    #[error("invalid extractor response: {0}")]
    InvalidResponse(String),

    /// Repository operation failed.
    #[error("repository error: {0}")]
    Repository(String),
}

impl From<InvoiceError> for ExtractionError {
    fn from(e: InvoiceError) -> Self {
        match e {
            InvoiceError::NotFound(id) => Self::InvoiceNotFound(id),
            InvoiceError::Repository(msg) => Self::Repository(msg),
        }
    }
}
