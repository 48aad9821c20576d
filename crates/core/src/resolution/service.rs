//! Mismatch resolution implementation.

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::audit::{record_best_effort, AuditAction, AuditLog, EntityKind, NewAuditEntry};
use crate::invoice::{InvoiceRepository, InvoiceStatus, LineStatus};
use crate::matching::{MatchingService, Tolerance, ValidationSummary};
use crate::pricebook::{NewPriceRecord, PriceBookRepository, PriceSource, PriceStatus};

use super::ResolutionError;

/// Result of accepting a price.
#[derive(Debug, Clone, Serialize)]
pub struct AcceptOutcome {
    /// The new reference price record.
    pub record_id: Uuid,
    /// The accepted unit price.
    pub new_price: Decimal,
    /// First day the new price is effective.
    pub valid_from: NaiveDate,
    /// Open records that were closed in its favor.
    pub closed_count: usize,
    /// Re-validation of the owning invoice.
    pub revalidation: ValidationSummary,
}

/// Result of disputing an invoice.
#[derive(Debug, Clone, Serialize)]
pub struct DisputeOutcome {
    /// Disputed invoice.
    pub invoice_id: Uuid,
    /// Lines marked `no_match`.
    pub lines_marked: usize,
}

/// Applies human decisions to mismatched invoices.
pub struct ResolutionService<R, P, A> {
    invoices: Arc<R>,
    prices: Arc<P>,
    audit: Arc<A>,
    matching: MatchingService<R, P, A>,
}

impl<R, P, A> ResolutionService<R, P, A>
where
    R: InvoiceRepository,
    P: PriceBookRepository,
    A: AuditLog,
{
    /// Create a resolution service. Re-validation after acceptance uses
    /// the given tolerance.
    pub fn new(invoices: Arc<R>, prices: Arc<P>, audit: Arc<A>, tolerance: Tolerance) -> Self {
        let matching = MatchingService::new(
            Arc::clone(&invoices),
            Arc::clone(&prices),
            Arc::clone(&audit),
            tolerance,
        );
        Self {
            invoices,
            prices,
            audit,
            matching,
        }
    }

    /// Accept a new reference price for a mismatched line.
    ///
    /// Every open record for the supplier and SKU is closed at
    /// `valid_from`, a manual open-ended record is inserted at
    /// `new_price`, and the owning invoice is re-validated so the new
    /// price resolves prior mismatches. Running twice is safe: the
    /// second run closes the first accepted record and inserts an
    /// identical one.
    ///
    /// # Errors
    ///
    /// Returns an error when the line or invoice is missing, the price
    /// is not positive, the line has no SKU, the invoice has no
    /// supplier, or no price record exists for the product at all.
    pub async fn accept_price(
        &self,
        line_id: Uuid,
        new_price: Decimal,
        reason: &str,
        valid_from: NaiveDate,
        performed_by: Option<Uuid>,
    ) -> Result<AcceptOutcome, ResolutionError> {
        if new_price <= Decimal::ZERO {
            return Err(ResolutionError::validation("price must be positive"));
        }

        let line = self
            .invoices
            .find_line(line_id)
            .await?
            .ok_or(ResolutionError::LineNotFound(line_id))?;
        let invoice = self
            .invoices
            .find_by_id(line.invoice_id)
            .await?
            .ok_or(ResolutionError::InvoiceNotFound(line.invoice_id))?;

        let supplier = invoice
            .supplier_name
            .clone()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                ResolutionError::ReferenceNotFound("invoice has no supplier name".into())
            })?;
        let sku = line
            .sku
            .clone()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| ResolutionError::validation("invoice line has no sku"))?;

        let existing = self.prices.list_by_sku(&supplier, &sku).await?;
        if existing.is_empty() {
            return Err(ResolutionError::ReferenceNotFound(format!(
                "no price records exist for supplier '{supplier}' and sku '{sku}'"
            )));
        }

        let currency = existing
            .iter()
            .find_map(|r| r.currency.clone())
            .or_else(|| invoice.currency.clone());

        let mut closed_count = 0usize;
        for record in existing.iter().filter(|r| r.valid_to.is_none()) {
            self.prices.close_record(record.id, valid_from).await?;
            closed_count += 1;
        }

        let record = self
            .prices
            .insert(NewPriceRecord {
                supplier_name: supplier.clone(),
                sku: Some(sku.clone()),
                product_name: line.product_name.clone(),
                unit_price: new_price,
                currency,
                valid_from: Some(valid_from),
                valid_to: None,
                status: PriceStatus::Active,
                source: PriceSource::Manual,
            })
            .await?;

        record_best_effort(
            self.audit.as_ref(),
            NewAuditEntry {
                entity_type: EntityKind::PriceRecord,
                entity_id: record.id,
                action: AuditAction::PriceAccepted,
                details: json!({
                    "invoice_id": invoice.id,
                    "line_id": line.id,
                    "supplier_name": supplier,
                    "sku": sku,
                    "new_price": new_price,
                    "valid_from": valid_from,
                    "reason": reason,
                    "closed_records": closed_count,
                }),
                performed_by,
            },
        )
        .await;

        let revalidation = self.matching.validate(invoice.id).await?;

        info!(
            %line_id,
            record_id = %record.id,
            %new_price,
            closed_count,
            status = revalidation.status.as_str(),
            "Accepted new price"
        );

        Ok(AcceptOutcome {
            record_id: record.id,
            new_price,
            valid_from,
            closed_count,
            revalidation,
        })
    }

    /// Dispute an invoice.
    ///
    /// The invoice moves to `disputed`. When `line_ids` names specific
    /// lines, those are marked `no_match`; with no line ids, line
    /// statuses are left untouched. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns an error when the invoice is missing or a repository
    /// operation fails.
    pub async fn dispute_invoice(
        &self,
        invoice_id: Uuid,
        reason: &str,
        line_ids: &[Uuid],
        performed_by: Option<Uuid>,
    ) -> Result<DisputeOutcome, ResolutionError> {
        let invoice = self
            .invoices
            .find_by_id(invoice_id)
            .await?
            .ok_or(ResolutionError::InvoiceNotFound(invoice_id))?;

        let lines = self.invoices.list_lines(invoice_id).await?;
        let targeted: Vec<_> = lines
            .iter()
            .filter(|l| line_ids.contains(&l.id))
            .collect();

        let mut marked = 0usize;
        let mut disputed_lines = Vec::new();
        for line in &targeted {
            self.invoices
                .set_line_match(line.id, LineStatus::NoMatch, None, None)
                .await?;
            marked += 1;
            disputed_lines.push(format!(
                "line {} ({})",
                line.line_no,
                line.sku
                    .as_deref()
                    .or(line.product_name.as_deref())
                    .unwrap_or("unidentified")
            ));
        }

        self.invoices
            .set_status(invoice_id, InvoiceStatus::Disputed, None)
            .await?;

        record_best_effort(
            self.audit.as_ref(),
            NewAuditEntry {
                entity_type: EntityKind::Invoice,
                entity_id: invoice_id,
                action: AuditAction::InvoiceDisputed,
                details: json!({
                    "reason": reason,
                    "summary": if disputed_lines.is_empty() {
                        format!("disputed invoice with {} lines", lines.len())
                    } else {
                        format!(
                            "disputed {} of {} lines: {}",
                            marked,
                            lines.len(),
                            disputed_lines.join(", ")
                        )
                    },
                }),
                performed_by,
            },
        )
        .await;

        info!(%invoice_id, marked, previous = invoice.status.as_str(), "Invoice disputed");

        Ok(DisputeOutcome {
            invoice_id,
            lines_marked: marked,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal_macros::dec;

    use crate::pricebook::PriceRecord;
    use crate::testing::{
        invoice_fixture, line_fixture, MockAuditLog, MockInvoiceRepository, MockPriceBook,
    };

    use super::*;

    fn service(
        repo: Arc<MockInvoiceRepository>,
        prices: Arc<MockPriceBook>,
        audit: Arc<MockAuditLog>,
    ) -> ResolutionService<MockInvoiceRepository, MockPriceBook, MockAuditLog> {
        ResolutionService::new(repo, prices, audit, Tolerance::Absolute)
    }

    fn open_record(supplier: &str, sku: &str, unit_price: rust_decimal::Decimal) -> PriceRecord {
        PriceRecord {
            id: Uuid::new_v4(),
            supplier_name: supplier.into(),
            sku: Some(sku.into()),
            product_name: Some("Gasket".into()),
            unit_price,
            currency: Some("DKK".into()),
            valid_from: NaiveDate::from_ymd_opt(2025, 1, 1),
            valid_to: None,
            status: PriceStatus::Active,
            source: PriceSource::Manual,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_accept_supersedes_and_revalidates() {
        let invoice = invoice_fixture(InvoiceStatus::NeedsReview);
        let id = invoice.id;
        let repo = Arc::new(MockInvoiceRepository::with_invoice(invoice));
        let line = line_fixture(id, 1, Some("NP-100"), Some("Gasket"), Some(dec!(12)));
        let line_id = line.id;
        repo.add_line(line);

        let prices = Arc::new(MockPriceBook::default());
        prices.add(open_record("Nordic Parts A/S", "NP-100", dec!(10)));
        let audit = Arc::new(MockAuditLog::default());

        let valid_from = NaiveDate::from_ymd_opt(2026, 1, 9).unwrap();
        let outcome = service(repo.clone(), prices.clone(), audit.clone())
            .accept_price(
                line_id,
                dec!(12),
                "supplier raised the price",
                valid_from,
                Some(Uuid::new_v4()),
            )
            .await
            .unwrap();

        assert_eq!(outcome.closed_count, 1);
        assert_eq!(outcome.new_price, dec!(12));
        assert_eq!(outcome.valid_from, valid_from);
        assert_eq!(outcome.revalidation.status, InvoiceStatus::Validated);
        assert_eq!(repo.status_of(id), InvoiceStatus::Validated);

        let records = prices.records.lock().unwrap().clone();
        assert_eq!(records.len(), 2);
        // Old record closed at the new record's valid_from.
        let old = records.iter().find(|r| r.unit_price == dec!(10)).unwrap();
        assert_eq!(old.valid_to, NaiveDate::from_ymd_opt(2026, 1, 9));
        // New record open-ended, manual, at the accepted price.
        let new = records.iter().find(|r| r.id == outcome.record_id).unwrap();
        assert_eq!(new.unit_price, dec!(12));
        assert_eq!(new.status, PriceStatus::Active);
        assert_eq!(new.source, PriceSource::Manual);
        assert_eq!(new.valid_from, Some(valid_from));
        assert!(new.valid_to.is_none());
        assert_eq!(new.currency.as_deref(), Some("DKK"));

        assert!(audit.actions().contains(&AuditAction::PriceAccepted));
        assert!(audit.actions().contains(&AuditAction::InvoiceValidated));
    }

    #[tokio::test]
    async fn test_accept_twice_keeps_one_open_record() {
        let invoice = invoice_fixture(InvoiceStatus::NeedsReview);
        let id = invoice.id;
        let repo = Arc::new(MockInvoiceRepository::with_invoice(invoice));
        let line = line_fixture(id, 1, Some("NP-100"), Some("Gasket"), Some(dec!(12)));
        let line_id = line.id;
        repo.add_line(line);

        let prices = Arc::new(MockPriceBook::default());
        prices.add(open_record("Nordic Parts A/S", "NP-100", dec!(10)));
        let audit = Arc::new(MockAuditLog::default());
        let svc = service(repo, prices.clone(), audit);
        let valid_from = NaiveDate::from_ymd_opt(2026, 1, 9).unwrap();

        svc.accept_price(line_id, dec!(12), "raised", valid_from, None)
            .await
            .unwrap();
        svc.accept_price(line_id, dec!(12), "raised", valid_from, None)
            .await
            .unwrap();

        let open: Vec<_> = prices
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.valid_to.is_none())
            .cloned()
            .collect();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].unit_price, dec!(12));
    }

    #[tokio::test]
    async fn test_accept_requires_sku() {
        let invoice = invoice_fixture(InvoiceStatus::NeedsReview);
        let id = invoice.id;
        let repo = Arc::new(MockInvoiceRepository::with_invoice(invoice));
        let line = line_fixture(id, 1, None, Some("Gasket"), Some(dec!(12)));
        let line_id = line.id;
        repo.add_line(line);

        let err = service(
            repo,
            Arc::new(MockPriceBook::default()),
            Arc::new(MockAuditLog::default()),
        )
        .accept_price(
            line_id,
            dec!(12),
            "raised",
            NaiveDate::from_ymd_opt(2026, 1, 9).unwrap(),
            None,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ResolutionError::Validation(_)));
    }

    #[tokio::test]
    async fn test_accept_requires_existing_records() {
        let invoice = invoice_fixture(InvoiceStatus::NeedsReview);
        let id = invoice.id;
        let repo = Arc::new(MockInvoiceRepository::with_invoice(invoice));
        let line = line_fixture(id, 1, Some("NP-999"), Some("Gasket"), Some(dec!(12)));
        let line_id = line.id;
        repo.add_line(line);

        let err = service(
            repo,
            Arc::new(MockPriceBook::default()),
            Arc::new(MockAuditLog::default()),
        )
        .accept_price(
            line_id,
            dec!(12),
            "raised",
            NaiveDate::from_ymd_opt(2026, 1, 9).unwrap(),
            None,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ResolutionError::ReferenceNotFound(_)));
    }

    #[tokio::test]
    async fn test_accept_rejects_nonpositive_price() {
        let err = service(
            Arc::new(MockInvoiceRepository::default()),
            Arc::new(MockPriceBook::default()),
            Arc::new(MockAuditLog::default()),
        )
        .accept_price(
            Uuid::new_v4(),
            dec!(0),
            "zeroed",
            NaiveDate::from_ymd_opt(2026, 1, 9).unwrap(),
            None,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ResolutionError::Validation(_)));
    }

    #[tokio::test]
    async fn test_accept_unknown_line() {
        let err = service(
            Arc::new(MockInvoiceRepository::default()),
            Arc::new(MockPriceBook::default()),
            Arc::new(MockAuditLog::default()),
        )
        .accept_price(
            Uuid::new_v4(),
            dec!(12),
            "raised",
            NaiveDate::from_ymd_opt(2026, 1, 9).unwrap(),
            None,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ResolutionError::LineNotFound(_)));
    }

    #[tokio::test]
    async fn test_dispute_without_line_ids_leaves_lines_untouched() {
        let invoice = invoice_fixture(InvoiceStatus::NeedsReview);
        let id = invoice.id;
        let repo = Arc::new(MockInvoiceRepository::with_invoice(invoice));
        repo.add_line(line_fixture(id, 1, Some("NP-100"), None, Some(dec!(10))));
        repo.add_line(line_fixture(id, 2, Some("NP-200"), None, Some(dec!(20))));
        let audit = Arc::new(MockAuditLog::default());

        let outcome = service(repo.clone(), Arc::new(MockPriceBook::default()), audit.clone())
            .dispute_invoice(id, "wrong prices across the board", &[], Some(Uuid::new_v4()))
            .await
            .unwrap();

        assert_eq!(outcome.lines_marked, 0);
        assert_eq!(repo.status_of(id), InvoiceStatus::Disputed);
        for line in repo.list_lines(id).await.unwrap() {
            assert_eq!(line.match_status, None);
        }
        assert_eq!(audit.actions(), vec![AuditAction::InvoiceDisputed]);
    }

    #[tokio::test]
    async fn test_dispute_subset_of_lines() {
        let invoice = invoice_fixture(InvoiceStatus::NeedsReview);
        let id = invoice.id;
        let repo = Arc::new(MockInvoiceRepository::with_invoice(invoice));
        let first = line_fixture(id, 1, Some("NP-100"), None, Some(dec!(10)));
        let first_id = first.id;
        repo.add_line(first);
        repo.add_line(line_fixture(id, 2, Some("NP-200"), None, Some(dec!(20))));

        let outcome = service(
            repo.clone(),
            Arc::new(MockPriceBook::default()),
            Arc::new(MockAuditLog::default()),
        )
        .dispute_invoice(id, "line 1 is wrong", &[first_id], None)
        .await
        .unwrap();

        assert_eq!(outcome.lines_marked, 1);
        let lines = repo.list_lines(id).await.unwrap();
        assert_eq!(lines[0].match_status, Some(LineStatus::NoMatch));
        assert_eq!(lines[1].match_status, None);
    }

    #[tokio::test]
    async fn test_dispute_is_idempotent() {
        let invoice = invoice_fixture(InvoiceStatus::NeedsReview);
        let id = invoice.id;
        let repo = Arc::new(MockInvoiceRepository::with_invoice(invoice));
        let line = line_fixture(id, 1, Some("NP-100"), None, Some(dec!(10)));
        let line_id = line.id;
        repo.add_line(line);
        let svc = service(
            repo.clone(),
            Arc::new(MockPriceBook::default()),
            Arc::new(MockAuditLog::default()),
        );

        svc.dispute_invoice(id, "bad", &[line_id], None).await.unwrap();
        let second = svc.dispute_invoice(id, "bad", &[line_id], None).await.unwrap();

        assert_eq!(second.lines_marked, 1);
        assert_eq!(repo.status_of(id), InvoiceStatus::Disputed);
    }
}
