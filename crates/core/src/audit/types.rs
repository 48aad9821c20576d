//! Audit entry types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of entity an audit entry refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// An invoice header record.
    Invoice,
    /// A single invoice line.
    InvoiceLine,
    /// A price book (buying price) record.
    PriceRecord,
}

impl EntityKind {
    /// Convert to database string value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Invoice => "invoice",
            Self::InvoiceLine => "invoice_line",
            Self::PriceRecord => "buying_price_record",
        }
    }

    /// Parse from database string value.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "invoice" => Some(Self::Invoice),
            "invoice_line" => Some(Self::InvoiceLine),
            "buying_price_record" => Some(Self::PriceRecord),
            _ => None,
        }
    }
}

/// Enumerated audit actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    /// A mail message was ingested as a new invoice.
    EmailIngested,
    /// A PDF was stored in the pdf bucket.
    PdfStored,
    /// Invoice lines were extracted from a PDF.
    InvoiceParsed,
    /// An invoice finished a validation pass.
    InvoiceValidated,
    /// An invoice or line was routed to human review.
    MarkedNeedReview,
    /// A reference price was learned from an invoice line.
    PriceRecordCreated,
    /// An invoice line price deviated from the reference price.
    PriceMismatch,
    /// A human accepted a new reference price.
    PriceAccepted,
    /// An invoice was disputed.
    InvoiceDisputed,
}

impl AuditAction {
    /// Convert to database string value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EmailIngested => "EMAIL_INGESTED",
            Self::PdfStored => "PDF_STORED",
            Self::InvoiceParsed => "INVOICE_PARSED",
            Self::InvoiceValidated => "INVOICE_VALIDATED",
            Self::MarkedNeedReview => "MARKED_NEED_REVIEW",
            Self::PriceRecordCreated => "PRICE_RECORD_CREATED",
            Self::PriceMismatch => "PRICE_MISMATCH",
            Self::PriceAccepted => "PRICE_ACCEPTED",
            Self::InvoiceDisputed => "INVOICE_DISPUTED",
        }
    }

    /// Parse from database string value.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "EMAIL_INGESTED" => Some(Self::EmailIngested),
            "PDF_STORED" => Some(Self::PdfStored),
            "INVOICE_PARSED" => Some(Self::InvoiceParsed),
            "INVOICE_VALIDATED" => Some(Self::InvoiceValidated),
            "MARKED_NEED_REVIEW" => Some(Self::MarkedNeedReview),
            "PRICE_RECORD_CREATED" => Some(Self::PriceRecordCreated),
            "PRICE_MISMATCH" => Some(Self::PriceMismatch),
            "PRICE_ACCEPTED" => Some(Self::PriceAccepted),
            "INVOICE_DISPUTED" => Some(Self::InvoiceDisputed),
            _ => None,
        }
    }
}

/// Input for appending an audit entry.
#[derive(Debug, Clone)]
pub struct NewAuditEntry {
    /// Kind of entity the event refers to.
    pub entity_type: EntityKind,
    /// Identity of that entity.
    pub entity_id: Uuid,
    /// Enumerated action.
    pub action: AuditAction,
    /// Structured details payload.
    pub details: serde_json::Value,
    /// Performing user; `None` means the system.
    pub performed_by: Option<Uuid>,
}

impl NewAuditEntry {
    /// System-performed entry with a details payload.
    #[must_use]
    pub fn system(
        entity_type: EntityKind,
        entity_id: Uuid,
        action: AuditAction,
        details: serde_json::Value,
    ) -> Self {
        Self {
            entity_type,
            entity_id,
            action,
            details,
            performed_by: None,
        }
    }
}

/// Persisted audit entry. Immutable once written.
#[derive(Debug, Clone)]
pub struct AuditEntry {
    /// Unique identifier.
    pub id: Uuid,
    /// Kind of entity the event refers to.
    pub entity_type: EntityKind,
    /// Identity of that entity.
    pub entity_id: Uuid,
    /// Enumerated action.
    pub action: AuditAction,
    /// Structured details payload.
    pub details: serde_json::Value,
    /// Performing user; `None` means the system.
    pub performed_by: Option<Uuid>,
    /// When the event happened.
    pub performed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_roundtrip() {
        let actions = [
            AuditAction::EmailIngested,
            AuditAction::PdfStored,
            AuditAction::InvoiceParsed,
            AuditAction::InvoiceValidated,
            AuditAction::MarkedNeedReview,
            AuditAction::PriceRecordCreated,
            AuditAction::PriceMismatch,
            AuditAction::PriceAccepted,
            AuditAction::InvoiceDisputed,
        ];
        for action in actions {
            assert_eq!(AuditAction::parse(action.as_str()), Some(action));
        }
    }

    #[test]
    fn test_entity_kind_roundtrip() {
        for kind in [
            EntityKind::Invoice,
            EntityKind::InvoiceLine,
            EntityKind::PriceRecord,
        ] {
            assert_eq!(EntityKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(EntityKind::parse("unknown"), None);
    }
}
