//! Lifecycle orchestrator.
//!
//! Drives invoices through ingestion, extraction, and validation in an
//! endless cycle: drain `received`, drain `parsed`, sleep. Per-invoice
//! failures never stop a cycle; cycle-level failures back off and retry.

mod service;

pub use service::{
    run_mail_poller, CycleReport, Orchestrator, OrchestratorSettings, Phase,
};

use crate::ingest::IngestError;
use crate::invoice::InvoiceError;

/// Errors that abort a whole cycle.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Mailbox could not be polled.
    #[error(transparent)]
    Ingest(#[from] IngestError),

    /// Repository operation failed.
    #[error("repository error: {0}")]
    Repository(String),
}

impl From<InvoiceError> for PipelineError {
    fn from(e: InvoiceError) -> Self {
        match e {
            InvoiceError::NotFound(id) => Self::Repository(format!("invoice not found: {id}")),
            InvoiceError::Repository(msg) => Self::Repository(msg),
        }
    }
}
