//! Mail ingestor implementation.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::Mutex;

use serde::Serialize;
use serde_json::json;
use tracing::{error, info, warn};

use crate::audit::{record_best_effort, AuditAction, AuditLog, EntityKind, NewAuditEntry};
use crate::invoice::{InvoiceRepository, NewInvoice};
use crate::storage::DocumentStore;

use super::types::{MailMessage, MailProvider};
use super::IngestError;

/// Batch and size ceilings for one poll.
#[derive(Debug, Clone, Copy)]
pub struct IngestLimits {
    /// Messages fetched per poll.
    pub batch_size: u64,
    /// Largest accepted PDF, in bytes.
    pub max_pdf_bytes: u64,
}

/// Message ids already handled in this process.
///
/// Rebuilt empty on restart; the database unique constraint on
/// `source_message_id` is the durable dedup.
#[derive(Default)]
pub struct ProcessedMessages {
    ids: Mutex<HashSet<String>>,
}

impl ProcessedMessages {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn contains(&self, id: &str) -> bool {
        self.ids.lock().expect("processed set poisoned").contains(id)
    }

    fn insert(&self, id: &str) {
        self.ids
            .lock()
            .expect("processed set poisoned")
            .insert(id.to_string());
    }
}

/// Counts from one poll.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct IngestReport {
    /// Messages fetched from the mailbox.
    pub fetched: usize,
    /// Invoices created.
    pub ingested: usize,
    /// Messages skipped (already seen, no PDF, oversize).
    pub skipped: usize,
    /// Messages that failed.
    pub failed: usize,
}

/// Polls the mailbox and turns PDF attachments into `received` invoices.
pub struct MailIngestor<M, R, A, S> {
    mail: Arc<M>,
    invoices: Arc<R>,
    audit: Arc<A>,
    documents: Arc<S>,
    processed: Arc<ProcessedMessages>,
    limits: IngestLimits,
}

impl<M, R, A, S> MailIngestor<M, R, A, S>
where
    M: MailProvider,
    R: InvoiceRepository,
    A: AuditLog,
    S: DocumentStore,
{
    /// Create an ingestor.
    pub fn new(
        mail: Arc<M>,
        invoices: Arc<R>,
        audit: Arc<A>,
        documents: Arc<S>,
        processed: Arc<ProcessedMessages>,
        limits: IngestLimits,
    ) -> Self {
        Self {
            mail,
            invoices,
            audit,
            documents,
            processed,
            limits,
        }
    }

    /// Run one poll cycle over the mailbox.
    ///
    /// A failing message is counted and logged, never fatal to the batch.
    ///
    /// # Errors
    ///
    /// Returns an error only when the mailbox itself cannot be fetched.
    pub async fn poll_once(&self) -> Result<IngestReport, IngestError> {
        let messages = self
            .mail
            .fetch_unread_with_attachments(self.limits.batch_size)
            .await?;

        let mut report = IngestReport {
            fetched: messages.len(),
            ..IngestReport::default()
        };

        for message in messages {
            if self.processed.contains(&message.id) {
                report.skipped += 1;
                continue;
            }

            match self.ingest_message(&message).await {
                Ok(true) => report.ingested += 1,
                Ok(false) => report.skipped += 1,
                Err(e) => {
                    report.failed += 1;
                    error!(message_id = %message.id, error = %e, "Failed to ingest message");
                    continue;
                }
            }
            self.processed.insert(&message.id);
        }

        info!(
            fetched = report.fetched,
            ingested = report.ingested,
            skipped = report.skipped,
            failed = report.failed,
            "Mail poll finished"
        );
        Ok(report)
    }

    /// Ingest one message. `Ok(true)` when an invoice was created.
    async fn ingest_message(&self, message: &MailMessage) -> Result<bool, IngestError> {
        if self.invoices.exists_by_message_id(&message.id).await? {
            warn!(message_id = %message.id, "Message already ingested, marking read");
            self.mark_read_best_effort(&message.id).await;
            return Ok(false);
        }

        let attachments = self.mail.list_attachments(&message.id).await?;
        let Some(pdf) = attachments.iter().find(|a| a.is_pdf()) else {
            warn!(message_id = %message.id, "No pdf attachment, marking read");
            self.mark_read_best_effort(&message.id).await;
            return Ok(false);
        };

        // Size checked before download so an oversize attachment never
        // crosses the wire.
        if pdf.size > self.limits.max_pdf_bytes {
            warn!(
                message_id = %message.id,
                size = pdf.size,
                limit = self.limits.max_pdf_bytes,
                "Pdf attachment over size limit, skipping"
            );
            self.mark_read_best_effort(&message.id).await;
            return Ok(false);
        }

        let bytes = self.mail.download_attachment(&message.id, &pdf.id).await?;
        let stored = self.documents.store_pdf(&pdf.name, bytes).await?;

        let invoice = self
            .invoices
            .create(NewInvoice {
                source_message_id: Some(message.id.clone()),
                sender: message.sender.clone(),
                pdf_object_key: Some(stored.key.clone()),
                pdf_filename: Some(pdf.name.clone()),
            })
            .await?;

        record_best_effort(
            self.audit.as_ref(),
            NewAuditEntry::system(
                EntityKind::Invoice,
                invoice.id,
                AuditAction::EmailIngested,
                json!({
                    "message_id": message.id,
                    "sender": message.sender,
                    "subject": message.subject,
                    "received_at": message.received_at,
                }),
            ),
        )
        .await;
        record_best_effort(
            self.audit.as_ref(),
            NewAuditEntry::system(
                EntityKind::Invoice,
                invoice.id,
                AuditAction::PdfStored,
                json!({
                    "object_key": stored.key,
                    "filename": pdf.name,
                    "size": pdf.size,
                    "reused": stored.reused,
                }),
            ),
        )
        .await;

        self.mark_read_best_effort(&message.id).await;

        info!(message_id = %message.id, invoice_id = %invoice.id, "Ingested invoice");
        Ok(true)
    }

    /// A failed mark-read only costs a refetch; the database dedup on
    /// `source_message_id` catches the repeat.
    async fn mark_read_best_effort(&self, message_id: &str) {
        if let Err(e) = self.mail.mark_read(message_id).await {
            warn!(message_id, error = %e, "Failed to mark message read");
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::ingest::types::MailAttachment;
    use crate::invoice::InvoiceStatus;
    use crate::testing::{MockAuditLog, MockDocumentStore, MockInvoiceRepository};

    use super::*;

    #[derive(Default)]
    struct FakeMailbox {
        messages: Vec<MailMessage>,
        attachments: std::collections::HashMap<String, Vec<MailAttachment>>,
        read: Mutex<Vec<String>>,
        fail_download_for: Option<String>,
    }

    impl FakeMailbox {
        fn with_pdf_message(id: &str, filename: &str, size: u64) -> Self {
            let mut mailbox = Self::default();
            mailbox.push_pdf_message(id, filename, size);
            mailbox
        }

        fn push_pdf_message(&mut self, id: &str, filename: &str, size: u64) {
            self.messages.push(MailMessage {
                id: id.into(),
                sender: Some("billing@nordicparts.dk".into()),
                subject: Some("Faktura".into()),
                received_at: Some(chrono::Utc::now()),
            });
            self.attachments.insert(
                id.into(),
                vec![MailAttachment {
                    id: format!("{id}-att"),
                    name: filename.into(),
                    content_type: Some("application/pdf".into()),
                    size,
                }],
            );
        }

        fn read_ids(&self) -> Vec<String> {
            self.read.lock().unwrap().clone()
        }
    }

    impl MailProvider for FakeMailbox {
        async fn fetch_unread_with_attachments(
            &self,
            limit: u64,
        ) -> Result<Vec<MailMessage>, IngestError> {
            Ok(self
                .messages
                .iter()
                .take(usize::try_from(limit).unwrap())
                .cloned()
                .collect())
        }

        async fn list_attachments(
            &self,
            message_id: &str,
        ) -> Result<Vec<MailAttachment>, IngestError> {
            Ok(self.attachments.get(message_id).cloned().unwrap_or_default())
        }

        async fn download_attachment(
            &self,
            message_id: &str,
            _attachment_id: &str,
        ) -> Result<Vec<u8>, IngestError> {
            if self.fail_download_for.as_deref() == Some(message_id) {
                return Err(IngestError::Collaborator("download failed".into()));
            }
            Ok(b"%PDF-1.4".to_vec())
        }

        async fn mark_read(&self, message_id: &str) -> Result<(), IngestError> {
            self.read.lock().unwrap().push(message_id.to_string());
            Ok(())
        }
    }

    fn limits() -> IngestLimits {
        IngestLimits {
            batch_size: 5,
            max_pdf_bytes: 10 * 1024 * 1024,
        }
    }

    fn ingestor(
        mailbox: FakeMailbox,
        repo: Arc<MockInvoiceRepository>,
        audit: Arc<MockAuditLog>,
    ) -> MailIngestor<FakeMailbox, MockInvoiceRepository, MockAuditLog, MockDocumentStore> {
        MailIngestor::new(
            Arc::new(mailbox),
            repo,
            audit,
            Arc::new(MockDocumentStore::default()),
            Arc::new(ProcessedMessages::new()),
            limits(),
        )
    }

    #[tokio::test]
    async fn test_ingests_pdf_message() {
        let mailbox = FakeMailbox::with_pdf_message("msg-1", "faktura.pdf", 1024);
        let repo = Arc::new(MockInvoiceRepository::default());
        let audit = Arc::new(MockAuditLog::default());

        let report = ingestor(mailbox, repo.clone(), audit.clone())
            .poll_once()
            .await
            .unwrap();

        assert_eq!(report.ingested, 1);
        let invoices: Vec<_> = repo.invoices.lock().unwrap().values().cloned().collect();
        assert_eq!(invoices.len(), 1);
        assert_eq!(invoices[0].status, InvoiceStatus::Received);
        assert_eq!(invoices[0].source_message_id.as_deref(), Some("msg-1"));
        assert!(invoices[0].pdf_object_key.is_some());
        assert_eq!(
            audit.actions(),
            vec![AuditAction::EmailIngested, AuditAction::PdfStored]
        );
        let entries = audit.entries.lock().unwrap();
        assert!(entries[0].details["received_at"].is_string());
    }

    #[tokio::test]
    async fn test_duplicate_message_is_skipped_and_marked_read() {
        let mailbox = FakeMailbox::with_pdf_message("msg-1", "faktura.pdf", 1024);
        let repo = Arc::new(MockInvoiceRepository::default());
        repo.create(NewInvoice {
            source_message_id: Some("msg-1".into()),
            sender: None,
            pdf_object_key: None,
            pdf_filename: None,
        })
        .await
        .unwrap();
        let audit = Arc::new(MockAuditLog::default());

        let svc = ingestor(mailbox, repo.clone(), audit);
        let report = svc.poll_once().await.unwrap();

        assert_eq!(report.ingested, 0);
        assert_eq!(report.skipped, 1);
        assert_eq!(repo.invoices.lock().unwrap().len(), 1);
        assert_eq!(svc.mail.read_ids(), vec!["msg-1".to_string()]);
    }

    #[tokio::test]
    async fn test_message_without_pdf_is_marked_read() {
        let mut mailbox = FakeMailbox::default();
        mailbox.messages.push(MailMessage {
            id: "msg-1".into(),
            sender: None,
            subject: None,
            received_at: None,
        });
        mailbox.attachments.insert(
            "msg-1".into(),
            vec![MailAttachment {
                id: "att".into(),
                name: "photo.png".into(),
                content_type: Some("image/png".into()),
                size: 100,
            }],
        );
        let repo = Arc::new(MockInvoiceRepository::default());

        let svc = ingestor(mailbox, repo.clone(), Arc::new(MockAuditLog::default()));
        let report = svc.poll_once().await.unwrap();

        assert_eq!(report.skipped, 1);
        assert!(repo.invoices.lock().unwrap().is_empty());
        assert_eq!(svc.mail.read_ids(), vec!["msg-1".to_string()]);
    }

    #[tokio::test]
    async fn test_oversize_pdf_is_skipped_before_download() {
        let mailbox = FakeMailbox::with_pdf_message("msg-1", "huge.pdf", 50 * 1024 * 1024);
        let repo = Arc::new(MockInvoiceRepository::default());

        let report = ingestor(mailbox, repo.clone(), Arc::new(MockAuditLog::default()))
            .poll_once()
            .await
            .unwrap();

        assert_eq!(report.skipped, 1);
        assert!(repo.invoices.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_one_bad_message_does_not_stop_the_batch() {
        let mut mailbox = FakeMailbox::with_pdf_message("msg-1", "a.pdf", 100);
        mailbox.push_pdf_message("msg-2", "b.pdf", 100);
        mailbox.fail_download_for = Some("msg-1".into());
        let repo = Arc::new(MockInvoiceRepository::default());

        let report = ingestor(mailbox, repo.clone(), Arc::new(MockAuditLog::default()))
            .poll_once()
            .await
            .unwrap();

        assert_eq!(report.failed, 1);
        assert_eq!(report.ingested, 1);
        assert_eq!(repo.invoices.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_processed_set_skips_on_second_poll() {
        let mailbox = FakeMailbox::with_pdf_message("msg-1", "faktura.pdf", 1024);
        let repo = Arc::new(MockInvoiceRepository::default());
        let svc = ingestor(mailbox, repo.clone(), Arc::new(MockAuditLog::default()));

        let first = svc.poll_once().await.unwrap();
        let second = svc.poll_once().await.unwrap();

        assert_eq!(first.ingested, 1);
        assert_eq!(second.ingested, 0);
        assert_eq!(second.skipped, 1);
        assert_eq!(repo.invoices.lock().unwrap().len(), 1);
    }
}
