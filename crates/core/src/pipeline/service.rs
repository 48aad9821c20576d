//! Orchestrator implementation.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::audit::AuditLog;
use crate::extraction::{DocumentExtractor, ExtractionService, InvoiceExtractor};
use crate::ingest::{MailIngestor, MailProvider};
use crate::invoice::{InvoiceRepository, InvoiceStatus};
use crate::matching::MatchingService;
use crate::pricebook::PriceBookRepository;
use crate::storage::DocumentStore;

use super::PipelineError;

/// Where the orchestrator currently is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Not started or between cycles.
    Idle,
    /// Extracting `received` invoices.
    DrainReceived,
    /// Validating `parsed` invoices.
    DrainParsed,
    /// Waiting for the next cycle.
    Sleeping,
}

impl Phase {
    /// Convert to log string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::DrainReceived => "drain_received",
            Self::DrainParsed => "drain_parsed",
            Self::Sleeping => "sleeping",
        }
    }
}

/// Orchestrator timing and batching knobs.
#[derive(Debug, Clone, Copy)]
pub struct OrchestratorSettings {
    /// Invoices fetched per drain batch.
    pub batch_size: u64,
    /// Sleep between cycles.
    pub cycle_interval: Duration,
    /// Sleep after a cycle-level error.
    pub error_backoff: Duration,
    /// Pause between drain batches.
    pub batch_pause: Duration,
    /// Poll the mailbox inside the cycle. Disabled when a dedicated
    /// polling task runs instead.
    pub ingest_inline: bool,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            batch_size: 5,
            cycle_interval: Duration::from_secs(90 * 60),
            error_backoff: Duration::from_secs(30),
            batch_pause: Duration::from_secs(1),
            ingest_inline: true,
        }
    }
}

/// Counts from one orchestrator cycle.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct CycleReport {
    /// Invoices ingested from mail.
    pub ingested: usize,
    /// Invoices that moved out of `received`.
    pub parsed: usize,
    /// Invoices that got a validation verdict.
    pub validated: usize,
}

/// Drives the invoice lifecycle end to end.
pub struct Orchestrator<M, R, P, A, S, D, X> {
    invoices: Arc<R>,
    ingestor: MailIngestor<M, R, A, S>,
    extraction: ExtractionService<R, A, S, D, X>,
    matching: MatchingService<R, P, A>,
    settings: OrchestratorSettings,
    phase: Mutex<Phase>,
}

impl<M, R, P, A, S, D, X> Orchestrator<M, R, P, A, S, D, X>
where
    M: MailProvider,
    R: InvoiceRepository,
    P: PriceBookRepository,
    A: AuditLog,
    S: DocumentStore,
    D: DocumentExtractor,
    X: InvoiceExtractor,
{
    /// Create an orchestrator.
    pub fn new(
        invoices: Arc<R>,
        ingestor: MailIngestor<M, R, A, S>,
        extraction: ExtractionService<R, A, S, D, X>,
        matching: MatchingService<R, P, A>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            invoices,
            ingestor,
            extraction,
            matching,
            settings,
            phase: Mutex::new(Phase::Idle),
        }
    }

    /// Current phase, for observability.
    pub fn phase(&self) -> Phase {
        *self.phase.lock().expect("phase lock poisoned")
    }

    fn set_phase(&self, phase: Phase) {
        *self.phase.lock().expect("phase lock poisoned") = phase;
        info!(phase = phase.as_str(), "Orchestrator phase");
    }

    /// Run until cancelled. Cycle errors back off and retry; the loop
    /// itself only ends through the token.
    pub async fn run(&self, cancel: CancellationToken) {
        info!(
            batch_size = self.settings.batch_size,
            interval_secs = self.settings.cycle_interval.as_secs(),
            ingest_inline = self.settings.ingest_inline,
            "Orchestrator starting"
        );

        loop {
            if cancel.is_cancelled() {
                break;
            }

            let pause = match self.run_cycle(&cancel).await {
                Ok(report) => {
                    info!(
                        ingested = report.ingested,
                        parsed = report.parsed,
                        validated = report.validated,
                        "Cycle finished"
                    );
                    self.settings.cycle_interval
                }
                Err(e) => {
                    error!(error = %e, "Cycle failed, backing off");
                    self.settings.error_backoff
                }
            };

            self.set_phase(Phase::Sleeping);
            tokio::select! {
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(pause) => {}
            }
        }

        self.set_phase(Phase::Idle);
        info!("Orchestrator stopped");
    }

    /// Run one full cycle: optional mail poll, drain `received`, drain
    /// `parsed`.
    ///
    /// # Errors
    ///
    /// Returns an error when the mailbox poll or a batch listing fails;
    /// per-invoice failures are only logged.
    pub async fn run_cycle(&self, cancel: &CancellationToken) -> Result<CycleReport, PipelineError> {
        let mut report = CycleReport::default();

        if self.settings.ingest_inline {
            report.ingested = self.ingestor.poll_once().await?.ingested;
        }

        if cancel.is_cancelled() {
            return Ok(report);
        }
        self.set_phase(Phase::DrainReceived);
        report.parsed = self.drain_received(cancel).await?;

        if cancel.is_cancelled() {
            return Ok(report);
        }
        self.set_phase(Phase::DrainParsed);
        report.validated = self.drain_parsed(cancel).await?;

        Ok(report)
    }

    /// Extract `received` invoices batch by batch until none remain or a
    /// batch makes no progress. The progress guard keeps an invoice whose
    /// extraction yields zero lines (it stays `received`) from spinning
    /// the loop forever.
    async fn drain_received(&self, cancel: &CancellationToken) -> Result<usize, PipelineError> {
        let mut total = 0usize;
        loop {
            if cancel.is_cancelled() {
                return Ok(total);
            }
            let batch = self
                .invoices
                .list_by_status(InvoiceStatus::Received, self.settings.batch_size)
                .await?;
            if batch.is_empty() {
                return Ok(total);
            }

            let mut progressed = 0usize;
            for invoice in batch {
                if cancel.is_cancelled() {
                    return Ok(total);
                }
                match self.extraction.parse_invoice(invoice.id).await {
                    Ok(outcome) if outcome.lines_parsed > 0 => progressed += 1,
                    Ok(_) => {
                        warn!(invoice_id = %invoice.id, "Extraction produced no lines");
                    }
                    Err(e) => {
                        error!(invoice_id = %invoice.id, error = %e, "Extraction failed");
                    }
                }
            }

            total += progressed;
            if progressed == 0 {
                warn!("Batch made no extraction progress, leaving remainder for next cycle");
                return Ok(total);
            }
            tokio::time::sleep(self.settings.batch_pause).await;
        }
    }

    /// Validate `parsed` invoices batch by batch. Validation always moves
    /// an invoice out of `parsed`, so progress is any successful call.
    async fn drain_parsed(&self, cancel: &CancellationToken) -> Result<usize, PipelineError> {
        let mut total = 0usize;
        loop {
            if cancel.is_cancelled() {
                return Ok(total);
            }
            let batch = self
                .invoices
                .list_by_status(InvoiceStatus::Parsed, self.settings.batch_size)
                .await?;
            if batch.is_empty() {
                return Ok(total);
            }

            let mut progressed = 0usize;
            for invoice in batch {
                if cancel.is_cancelled() {
                    return Ok(total);
                }
                match self.matching.validate(invoice.id).await {
                    Ok(_) => progressed += 1,
                    Err(e) => {
                        error!(invoice_id = %invoice.id, error = %e, "Validation failed");
                    }
                }
            }

            total += progressed;
            if progressed == 0 {
                warn!("Batch made no validation progress, leaving remainder for next cycle");
                return Ok(total);
            }
            tokio::time::sleep(self.settings.batch_pause).await;
        }
    }
}

/// Poll the mailbox on a fixed interval until cancelled. Runs as its own
/// task when inline ingestion is disabled.
pub async fn run_mail_poller<M, R, A, S>(
    ingestor: Arc<MailIngestor<M, R, A, S>>,
    interval: Duration,
    cancel: CancellationToken,
) where
    M: MailProvider,
    R: InvoiceRepository,
    A: AuditLog,
    S: DocumentStore,
{
    info!(interval_secs = interval.as_secs(), "Mail poller starting");
    loop {
        if let Err(e) = ingestor.poll_once().await {
            error!(error = %e, "Mail poll failed");
        }
        tokio::select! {
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(interval) => {}
        }
    }
    info!("Mail poller stopped");
}
