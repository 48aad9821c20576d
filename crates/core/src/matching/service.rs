//! Validation engine implementation.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::audit::{record_best_effort, AuditAction, AuditLog, EntityKind, NewAuditEntry};
use crate::invoice::{Invoice, InvoiceLine, InvoiceRepository, InvoiceStatus, LineStatus};
use crate::pricebook::{
    active_on, NewPriceRecord, PriceBookRepository, PriceSource, PriceStatus,
};

use super::types::{Tolerance, ValidationStatus, ValidationSummary};
use super::MatchingError;

/// Outcome of validating a single line.
enum LineOutcome {
    Matched,
    Mismatched,
    Created,
    Unknown,
}

/// Validates parsed invoices against the price book.
pub struct MatchingService<R, P, A> {
    invoices: Arc<R>,
    prices: Arc<P>,
    audit: Arc<A>,
    tolerance: Tolerance,
}

impl<R, P, A> MatchingService<R, P, A>
where
    R: InvoiceRepository,
    P: PriceBookRepository,
    A: AuditLog,
{
    /// Create a validation engine with the given tolerance.
    pub fn new(invoices: Arc<R>, prices: Arc<P>, audit: Arc<A>, tolerance: Tolerance) -> Self {
        Self {
            invoices,
            prices,
            audit,
            tolerance,
        }
    }

    /// Validate every line of an invoice and settle its status.
    ///
    /// Re-running is safe: line statuses are overwritten, learned prices
    /// are deduplicated against existing `need_review` records, and the
    /// invoice status is recomputed from scratch.
    ///
    /// # Errors
    ///
    /// Returns an error when the invoice is missing or a repository
    /// operation fails.
    pub async fn validate(&self, invoice_id: Uuid) -> Result<ValidationSummary, MatchingError> {
        let invoice = self
            .invoices
            .find_by_id(invoice_id)
            .await?
            .ok_or(MatchingError::InvoiceNotFound(invoice_id))?;

        let lines = self.invoices.list_lines(invoice_id).await?;

        if lines.is_empty() {
            warn!(%invoice_id, "No invoice lines found, marking for review");
            self.invoices
                .set_status(invoice_id, InvoiceStatus::NeedsReview, None)
                .await?;
            record_best_effort(
                self.audit.as_ref(),
                NewAuditEntry::system(
                    EntityKind::Invoice,
                    invoice_id,
                    AuditAction::MarkedNeedReview,
                    json!({ "reason": "no invoice lines found" }),
                ),
            )
            .await;
            return Ok(ValidationSummary {
                invoice_id,
                status: InvoiceStatus::NeedsReview,
                line_count: 0,
                matched_count: 0,
                mismatch_count: 0,
                created_count: 0,
                unknown_count: 0,
            });
        }

        let mut summary = ValidationSummary {
            invoice_id,
            status: InvoiceStatus::NeedsReview,
            line_count: lines.len(),
            matched_count: 0,
            mismatch_count: 0,
            created_count: 0,
            unknown_count: 0,
        };

        for line in &lines {
            match self.validate_line(&invoice, line).await? {
                LineOutcome::Matched => summary.matched_count += 1,
                LineOutcome::Mismatched => summary.mismatch_count += 1,
                LineOutcome::Created => summary.created_count += 1,
                LineOutcome::Unknown => summary.unknown_count += 1,
            }
        }

        if summary.fully_matched() {
            summary.status = InvoiceStatus::Validated;
            self.invoices
                .set_status(invoice_id, InvoiceStatus::Validated, Some(Utc::now()))
                .await?;
            record_best_effort(
                self.audit.as_ref(),
                NewAuditEntry::system(
                    EntityKind::Invoice,
                    invoice_id,
                    AuditAction::InvoiceValidated,
                    json!({ "line_count": summary.line_count }),
                ),
            )
            .await;
        } else {
            self.invoices
                .set_status(invoice_id, InvoiceStatus::NeedsReview, None)
                .await?;
            record_best_effort(
                self.audit.as_ref(),
                NewAuditEntry::system(
                    EntityKind::Invoice,
                    invoice_id,
                    AuditAction::MarkedNeedReview,
                    json!({
                        "matched": summary.matched_count,
                        "mismatched": summary.mismatch_count,
                        "created": summary.created_count,
                        "unknown": summary.unknown_count,
                    }),
                ),
            )
            .await;
        }

        info!(
            %invoice_id,
            status = summary.status.as_str(),
            matched = summary.matched_count,
            mismatched = summary.mismatch_count,
            created = summary.created_count,
            unknown = summary.unknown_count,
            "Validation finished"
        );

        Ok(summary)
    }

    /// Read back the stored match statuses without re-validating.
    ///
    /// # Errors
    ///
    /// Returns an error when the invoice is missing or a repository
    /// operation fails.
    pub async fn status(&self, invoice_id: Uuid) -> Result<ValidationStatus, MatchingError> {
        let invoice = self
            .invoices
            .find_by_id(invoice_id)
            .await?
            .ok_or(MatchingError::InvoiceNotFound(invoice_id))?;
        let lines = self.invoices.list_lines(invoice_id).await?;

        let mut status = ValidationStatus {
            invoice_id,
            status: invoice.status,
            line_count: lines.len(),
            matched_count: 0,
            mismatch_count: 0,
            created_count: 0,
            unknown_count: 0,
            unvalidated_count: 0,
        };
        for line in &lines {
            match line.match_status {
                Some(LineStatus::Match) => status.matched_count += 1,
                Some(LineStatus::Mismatch) => status.mismatch_count += 1,
                Some(LineStatus::CreatedPriceRecord) => status.created_count += 1,
                Some(LineStatus::Unknown | LineStatus::NoMatch) => status.unknown_count += 1,
                None => status.unvalidated_count += 1,
            }
        }
        Ok(status)
    }

    async fn validate_line(
        &self,
        invoice: &Invoice,
        line: &InvoiceLine,
    ) -> Result<LineOutcome, MatchingError> {
        let Some(price) = line.unit_price else {
            return self.mark_unknown(invoice, line, "missing unit_price").await;
        };
        let Some(supplier) = invoice.supplier_name.as_deref().filter(|s| !s.is_empty()) else {
            return self.mark_unknown(invoice, line, "missing supplier name").await;
        };

        let sku = line.sku.as_deref().filter(|s| !s.trim().is_empty());
        let product_name = line
            .product_name
            .as_deref()
            .filter(|s| !s.trim().is_empty());

        // The key is chosen by presence: a line that prints a SKU is
        // matched on SKU only, even when no SKU record exists; the
        // product name is consulted only for lines without one. Records
        // still in need_review never serve as references.
        let candidates = match (sku, product_name) {
            (Some(sku), _) => active_only(self.prices.list_by_sku(supplier, sku).await?),
            (None, Some(name)) => {
                active_only(self.prices.list_by_product_name(supplier, name).await?)
            }
            (None, None) => {
                return self
                    .mark_unknown(invoice, line, "missing sku/product_name")
                    .await;
            }
        };

        if let Some(reference) = active_on(&candidates, invoice.invoice_date) {
            let delta = price - reference.unit_price;
            if self.tolerance.matches(price, reference.unit_price) {
                self.invoices
                    .set_line_match(
                        line.id,
                        LineStatus::Match,
                        Some(reference.unit_price),
                        Some(delta),
                    )
                    .await?;
                return Ok(LineOutcome::Matched);
            }

            self.invoices
                .set_line_match(
                    line.id,
                    LineStatus::Mismatch,
                    Some(reference.unit_price),
                    Some(delta),
                )
                .await?;
            record_best_effort(
                self.audit.as_ref(),
                NewAuditEntry::system(
                    EntityKind::InvoiceLine,
                    line.id,
                    AuditAction::PriceMismatch,
                    json!({
                        "invoice_id": invoice.id,
                        "sku": line.sku,
                        "product_name": line.product_name,
                        "invoice_price": price,
                        "reference_price": reference.unit_price,
                        "delta": delta,
                    }),
                ),
            )
            .await;
            return Ok(LineOutcome::Mismatched);
        }

        // A learned record needs a currency; without one the line cannot
        // seed the price book and goes to a human instead.
        let Some(currency) = invoice.currency.as_deref().filter(|c| !c.is_empty()) else {
            return self.mark_unknown(invoice, line, "missing currency").await;
        };

        self.learn_price(invoice, line, supplier, sku, currency)
            .await?;
        self.invoices
            .set_line_match(line.id, LineStatus::CreatedPriceRecord, None, None)
            .await?;
        Ok(LineOutcome::Created)
    }

    /// Mark a line `unknown` and audit why.
    async fn mark_unknown(
        &self,
        invoice: &Invoice,
        line: &InvoiceLine,
        reason: &str,
    ) -> Result<LineOutcome, MatchingError> {
        self.invoices
            .set_line_match(line.id, LineStatus::Unknown, None, None)
            .await?;
        record_best_effort(
            self.audit.as_ref(),
            NewAuditEntry::system(
                EntityKind::Invoice,
                invoice.id,
                AuditAction::MarkedNeedReview,
                json!({ "reason": reason, "line_id": line.id }),
            ),
        )
        .await;
        Ok(LineOutcome::Unknown)
    }

    /// Learn a provisional reference price from a line with no active
    /// record. Deduplicated: an existing `need_review` record for the
    /// same supplier and SKU suppresses the insert.
    async fn learn_price(
        &self,
        invoice: &Invoice,
        line: &InvoiceLine,
        supplier: &str,
        sku: Option<&str>,
        currency: &str,
    ) -> Result<(), MatchingError> {
        if let Some(sku) = sku {
            if self
                .prices
                .exists_in_status(supplier, sku, PriceStatus::NeedReview)
                .await?
            {
                return Ok(());
            }
        }

        let Some(unit_price) = line.unit_price else {
            return Ok(());
        };

        let record = self
            .prices
            .insert(NewPriceRecord {
                supplier_name: supplier.to_string(),
                sku: sku.map(ToString::to_string),
                product_name: line.product_name.clone(),
                unit_price,
                currency: Some(currency.to_string()),
                valid_from: invoice.invoice_date,
                valid_to: None,
                status: PriceStatus::NeedReview,
                source: PriceSource::LearnedFromInvoice,
            })
            .await?;

        record_best_effort(
            self.audit.as_ref(),
            NewAuditEntry::system(
                EntityKind::PriceRecord,
                record.id,
                AuditAction::PriceRecordCreated,
                json!({
                    "invoice_id": invoice.id,
                    "line_id": line.id,
                    "supplier_name": supplier,
                    "sku": sku,
                    "unit_price": unit_price,
                    "currency": currency,
                }),
            ),
        )
        .await;
        Ok(())
    }
}

fn active_only(records: Vec<crate::pricebook::PriceRecord>) -> Vec<crate::pricebook::PriceRecord> {
    records
        .into_iter()
        .filter(|r| r.status == PriceStatus::Active)
        .collect()
}
