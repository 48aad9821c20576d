//! Mailbox polling and PDF ingestion.
//!
//! Pulls unread mail with attachments, stores the first PDF of each
//! message, and registers a `received` invoice for it. Message-level
//! failures are isolated; a bad message never stops the batch.

mod graph;
mod service;
mod types;

pub use graph::GraphMailProvider;
pub use service::{IngestLimits, IngestReport, MailIngestor, ProcessedMessages};
pub use types::{MailAttachment, MailMessage, MailProvider};

use crate::invoice::InvoiceError;
use crate::storage::StorageError;

/// Errors from mail ingestion.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// Mail provider call failed.
    #[error("mail provider error: {0}")]
    Collaborator(String),

    /// Authentication against the mail provider failed.
    #[error("mail auth error: {0}")]
    Auth(String),

    /// PDF could not be stored.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Repository operation failed.
    #[error("repository error: {0}")]
    Repository(String),
}

impl From<InvoiceError> for IngestError {
    fn from(e: InvoiceError) -> Self {
        match e {
            InvoiceError::NotFound(id) => Self::Repository(format!("invoice not found: {id}")),
            InvoiceError::Repository(msg) => Self::Repository(msg),
        }
    }
}
