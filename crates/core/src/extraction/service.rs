//! Extraction coordinator.

use std::sync::Arc;

use serde::Serialize;
use serde_json::json;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::audit::{record_best_effort, AuditAction, AuditLog, EntityKind, NewAuditEntry};
use crate::invoice::{InvoiceHeaderPatch, InvoiceRepository, InvoiceStatus};
use crate::storage::DocumentStore;

use super::clean::{clean_amount, clean_line, non_negative};
use super::dates::parse_invoice_date;
use super::error::ExtractionError;
use super::pdf::DocumentExtractor;
use super::types::{InvoiceExtractor, RawExtraction};

/// Result of one extraction run.
#[derive(Debug, Clone, Serialize)]
pub struct ParseOutcome {
    /// Invoice that was parsed.
    pub invoice_id: Uuid,
    /// Lines that landed in the database.
    pub lines_parsed: usize,
    /// Model that produced the extraction.
    pub model: String,
    /// Warnings the extractor emitted.
    pub warnings: Vec<String>,
}

/// Coordinates download, AI extraction, cleaning, and write-back for one
/// invoice.
pub struct ExtractionService<R, A, S, D, X> {
    invoices: Arc<R>,
    audit: Arc<A>,
    documents: Arc<S>,
    pdf: Arc<D>,
    extractor: Arc<X>,
}

impl<R, A, S, D, X> ExtractionService<R, A, S, D, X>
where
    R: InvoiceRepository,
    A: AuditLog,
    S: DocumentStore,
    D: DocumentExtractor,
    X: InvoiceExtractor,
{
    /// Create a new extraction service.
    pub fn new(
        invoices: Arc<R>,
        audit: Arc<A>,
        documents: Arc<S>,
        pdf: Arc<D>,
        extractor: Arc<X>,
    ) -> Self {
        Self {
            invoices,
            audit,
            documents,
            pdf,
            extractor,
        }
    }

    /// Extract header and lines for one invoice.
    ///
    /// On success with at least one line the invoice moves to `parsed`;
    /// with zero lines it stays `received` so extraction can be retried.
    /// A header write failure is tolerated, line replacement proceeds
    /// anyway. Any error before write-back leaves the invoice untouched.
    ///
    /// # Errors
    ///
    /// Returns an error when the invoice is missing, has no stored PDF,
    /// or a download/extraction/persistence step fails.
    pub async fn parse_invoice(&self, invoice_id: Uuid) -> Result<ParseOutcome, ExtractionError> {
        let invoice = self
            .invoices
            .find_by_id(invoice_id)
            .await?
            .ok_or(ExtractionError::InvoiceNotFound(invoice_id))?;

        if invoice.status != InvoiceStatus::Received {
            warn!(
                %invoice_id,
                status = invoice.status.as_str(),
                "Parsing invoice that is not in received status"
            );
        }

        let key = invoice
            .pdf_object_key
            .ok_or(ExtractionError::MissingPdf(invoice_id))?;

        let pdf_bytes = self.documents.fetch(&key).await?;
        let content = self.pdf.extract(pdf_bytes).await?;
        let raw = self
            .extractor
            .extract_invoice(&content.combined_text(), content.logo_png.as_deref())
            .await?;

        // Header failure must not block line replacement.
        if let Err(e) = self
            .invoices
            .update_header(invoice_id, header_patch(&raw))
            .await
        {
            error!(%invoice_id, error = %e, "Header update failed, continuing with lines");
        }

        self.invoices.delete_lines(invoice_id).await?;

        let mut inserted = 0usize;
        for (position, raw_line) in raw.lines.iter().enumerate() {
            let line = clean_line(position, raw_line);
            let line_no = line.line_no;
            match self.invoices.insert_line(invoice_id, line).await {
                Ok(_) => inserted += 1,
                Err(e) => {
                    error!(%invoice_id, line_no, error = %e, "Failed to insert invoice line");
                }
            }
        }

        if inserted > 0 {
            self.invoices
                .set_status(invoice_id, InvoiceStatus::Parsed, None)
                .await?;
        } else {
            warn!(%invoice_id, "No invoice lines extracted, keeping status received");
        }

        let warnings = raw.warnings;
        record_best_effort(
            self.audit.as_ref(),
            NewAuditEntry::system(
                EntityKind::Invoice,
                invoice_id,
                AuditAction::InvoiceParsed,
                json!({
                    "line_count": inserted,
                    "model": self.extractor.model(),
                    "warnings": warnings,
                }),
            ),
        )
        .await;

        info!(%invoice_id, lines = inserted, "Extraction finished");

        Ok(ParseOutcome {
            invoice_id,
            lines_parsed: inserted,
            model: self.extractor.model().to_string(),
            warnings,
        })
    }
}

/// Build the header patch from raw extractor output.
fn header_patch(raw: &RawExtraction) -> InvoiceHeaderPatch {
    InvoiceHeaderPatch {
        supplier_name: raw.supplier_name.clone(),
        invoice_number: raw.invoice_number.clone(),
        invoice_date: raw.invoice_date.as_deref().and_then(parse_invoice_date),
        currency: raw.currency.clone(),
        net_amount: non_negative(
            "subtotal_amount",
            raw.subtotal_amount
                .as_ref()
                .and_then(|v| clean_amount("subtotal_amount", v)),
        ),
        vat_amount: non_negative(
            "tax_amount",
            raw.tax_amount
                .as_ref()
                .and_then(|v| clean_amount("tax_amount", v)),
        ),
        freight_amount: non_negative(
            "frieght_amount",
            raw.freight_amount
                .as_ref()
                .and_then(|v| clean_amount("frieght_amount", v)),
        ),
        total_amount: non_negative(
            "total_amount",
            raw.total_amount
                .as_ref()
                .and_then(|v| clean_amount("total_amount", v)),
        ),
    }
}
