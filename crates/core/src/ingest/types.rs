//! Mail provider collaborator types.

use chrono::{DateTime, Utc};

use super::IngestError;

/// One mail message, metadata only.
#[derive(Debug, Clone)]
pub struct MailMessage {
    /// Provider message id.
    pub id: String,
    /// Sender address.
    pub sender: Option<String>,
    /// Subject line.
    pub subject: Option<String>,
    /// When the mailbox received the message.
    pub received_at: Option<DateTime<Utc>>,
}

/// One attachment, metadata only. Content is downloaded separately so the
/// size ceiling can be enforced first.
#[derive(Debug, Clone)]
pub struct MailAttachment {
    /// Provider attachment id.
    pub id: String,
    /// Filename.
    pub name: String,
    /// MIME type, when the provider reports one.
    pub content_type: Option<String>,
    /// Size in bytes.
    pub size: u64,
}

impl MailAttachment {
    /// Whether this attachment looks like a PDF.
    #[must_use]
    pub fn is_pdf(&self) -> bool {
        self.content_type.as_deref() == Some("application/pdf")
            || self.name.to_lowercase().ends_with(".pdf")
    }
}

/// Mailbox collaborator.
///
/// Implemented by [`super::GraphMailProvider`] in production and by canned
/// providers in tests.
pub trait MailProvider: Send + Sync {
    /// Fetch up to `limit` unread messages that carry attachments.
    fn fetch_unread_with_attachments(
        &self,
        limit: u64,
    ) -> impl std::future::Future<Output = Result<Vec<MailMessage>, IngestError>> + Send;

    /// List the attachments of a message, without content.
    fn list_attachments(
        &self,
        message_id: &str,
    ) -> impl std::future::Future<Output = Result<Vec<MailAttachment>, IngestError>> + Send;

    /// Download one attachment's bytes.
    fn download_attachment(
        &self,
        message_id: &str,
        attachment_id: &str,
    ) -> impl std::future::Future<Output = Result<Vec<u8>, IngestError>> + Send;

    /// Mark a message as read.
    fn mark_read(
        &self,
        message_id: &str,
    ) -> impl std::future::Future<Output = Result<(), IngestError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_pdf() {
        let by_type = MailAttachment {
            id: "a1".into(),
            name: "bilag".into(),
            content_type: Some("application/pdf".into()),
            size: 10,
        };
        assert!(by_type.is_pdf());

        let by_name = MailAttachment {
            id: "a2".into(),
            name: "Faktura.PDF".into(),
            content_type: Some("application/octet-stream".into()),
            size: 10,
        };
        assert!(by_name.is_pdf());

        let neither = MailAttachment {
            id: "a3".into(),
            name: "photo.png".into(),
            content_type: Some("image/png".into()),
            size: 10,
        };
        assert!(!neither.is_pdf());
    }
}
