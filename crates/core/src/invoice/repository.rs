//! Invoice repository trait.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::types::{
    Invoice, InvoiceHeaderPatch, InvoiceLine, InvoiceStatus, LineStatus, NewInvoice,
    NewInvoiceLine,
};
use super::InvoiceError;

/// Repository trait for invoice persistence.
///
/// Implemented by the db crate against PostgreSQL and by in-memory mocks in
/// service tests.
pub trait InvoiceRepository: Send + Sync {
    /// Register a freshly ingested invoice in `received` status.
    fn create(
        &self,
        input: NewInvoice,
    ) -> impl std::future::Future<Output = Result<Invoice, InvoiceError>> + Send;

    /// Find an invoice by id.
    fn find_by_id(
        &self,
        id: Uuid,
    ) -> impl std::future::Future<Output = Result<Option<Invoice>, InvoiceError>> + Send;

    /// Whether a mail message id has already produced an invoice.
    fn exists_by_message_id(
        &self,
        message_id: &str,
    ) -> impl std::future::Future<Output = Result<bool, InvoiceError>> + Send;

    /// List invoices in a status, newest first, capped at `limit`.
    fn list_by_status(
        &self,
        status: InvoiceStatus,
        limit: u64,
    ) -> impl std::future::Future<Output = Result<Vec<Invoice>, InvoiceError>> + Send;

    /// List all invoices, newest first, capped at `limit`.
    fn list_recent(
        &self,
        limit: u64,
    ) -> impl std::future::Future<Output = Result<Vec<Invoice>, InvoiceError>> + Send;

    /// Write extracted header fields. `None` fields are left untouched.
    fn update_header(
        &self,
        id: Uuid,
        patch: InvoiceHeaderPatch,
    ) -> impl std::future::Future<Output = Result<(), InvoiceError>> + Send;

    /// Set the lifecycle status, and `validated_at` when given.
    fn set_status(
        &self,
        id: Uuid,
        status: InvoiceStatus,
        validated_at: Option<DateTime<Utc>>,
    ) -> impl std::future::Future<Output = Result<(), InvoiceError>> + Send;

    /// Delete every line of an invoice.
    fn delete_lines(
        &self,
        invoice_id: Uuid,
    ) -> impl std::future::Future<Output = Result<u64, InvoiceError>> + Send;

    /// Insert one line.
    fn insert_line(
        &self,
        invoice_id: Uuid,
        line: NewInvoiceLine,
    ) -> impl std::future::Future<Output = Result<InvoiceLine, InvoiceError>> + Send;

    /// List the lines of an invoice in line-number order.
    fn list_lines(
        &self,
        invoice_id: Uuid,
    ) -> impl std::future::Future<Output = Result<Vec<InvoiceLine>, InvoiceError>> + Send;

    /// Find one line by id.
    fn find_line(
        &self,
        line_id: Uuid,
    ) -> impl std::future::Future<Output = Result<Option<InvoiceLine>, InvoiceError>> + Send;

    /// Write the match outcome of one line.
    fn set_line_match(
        &self,
        line_id: Uuid,
        status: LineStatus,
        matched_price: Option<rust_decimal::Decimal>,
        price_delta: Option<rust_decimal::Decimal>,
    ) -> impl std::future::Future<Output = Result<(), InvoiceError>> + Send;
}
