//! In-memory mock repositories and builders shared by service tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::audit::{AuditAction, AuditError, AuditLog, NewAuditEntry};
use crate::invoice::{
    Invoice, InvoiceError, InvoiceHeaderPatch, InvoiceLine, InvoiceRepository, InvoiceStatus,
    LineStatus, NewInvoice, NewInvoiceLine,
};
use crate::pricebook::{
    NewPriceRecord, PriceBookError, PriceBookRepository, PriceRecord, PriceStatus,
};
use crate::storage::{DocumentStore, StorageError, StoredDocument};

/// Build a bare invoice in the given status.
pub(crate) fn invoice_fixture(status: InvoiceStatus) -> Invoice {
    Invoice {
        id: Uuid::new_v4(),
        source_message_id: Some("msg-1".into()),
        sender: Some("billing@nordicparts.dk".into()),
        pdf_object_key: Some("20260109_100000_invoice.pdf".into()),
        pdf_filename: Some("invoice.pdf".into()),
        supplier_name: Some("Nordic Parts A/S".into()),
        invoice_number: Some("F-1001".into()),
        invoice_date: NaiveDate::from_ymd_opt(2026, 1, 9),
        currency: Some("DKK".into()),
        net_amount: None,
        vat_amount: None,
        freight_amount: None,
        total_amount: None,
        status,
        validated_at: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

/// Build a line for an invoice.
pub(crate) fn line_fixture(
    invoice_id: Uuid,
    line_no: i32,
    sku: Option<&str>,
    product_name: Option<&str>,
    unit_price: Option<Decimal>,
) -> InvoiceLine {
    InvoiceLine {
        id: Uuid::new_v4(),
        invoice_id,
        line_no,
        sku: sku.map(Into::into),
        product_name: product_name.map(Into::into),
        description: None,
        quantity: Some(Decimal::ONE),
        unit: Some("STK".into()),
        unit_price,
        discount_percent: None,
        discount_total: None,
        net_amount: unit_price,
        line_total: unit_price,
        vat_rate: None,
        match_status: None,
        matched_price: None,
        price_delta: None,
        created_at: Utc::now(),
    }
}

/// In-memory invoice repository.
#[derive(Default)]
pub(crate) struct MockInvoiceRepository {
    pub invoices: Mutex<HashMap<Uuid, Invoice>>,
    pub lines: Mutex<Vec<InvoiceLine>>,
    /// When set, `update_header` fails.
    pub fail_header_update: AtomicBool,
    /// When set, `insert_line` fails for this line number.
    pub fail_insert_line_no: Mutex<Option<i32>>,
}

impl MockInvoiceRepository {
    pub fn with_invoice(invoice: Invoice) -> Self {
        let repo = Self::default();
        repo.invoices
            .lock()
            .unwrap()
            .insert(invoice.id, invoice);
        repo
    }

    pub fn add_line(&self, line: InvoiceLine) {
        self.lines.lock().unwrap().push(line);
    }

    pub fn status_of(&self, id: Uuid) -> InvoiceStatus {
        self.invoices.lock().unwrap()[&id].status
    }

    pub fn fail_header(&self) {
        self.fail_header_update.store(true, Ordering::SeqCst);
    }
}

impl InvoiceRepository for MockInvoiceRepository {
    async fn create(&self, input: NewInvoice) -> Result<Invoice, InvoiceError> {
        let invoice = Invoice {
            id: Uuid::new_v4(),
            source_message_id: input.source_message_id,
            sender: input.sender,
            pdf_object_key: input.pdf_object_key,
            pdf_filename: input.pdf_filename,
            supplier_name: None,
            invoice_number: None,
            invoice_date: None,
            currency: None,
            net_amount: None,
            vat_amount: None,
            freight_amount: None,
            total_amount: None,
            status: InvoiceStatus::Received,
            validated_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        self.invoices
            .lock()
            .unwrap()
            .insert(invoice.id, invoice.clone());
        Ok(invoice)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Invoice>, InvoiceError> {
        Ok(self.invoices.lock().unwrap().get(&id).cloned())
    }

    async fn exists_by_message_id(&self, message_id: &str) -> Result<bool, InvoiceError> {
        Ok(self
            .invoices
            .lock()
            .unwrap()
            .values()
            .any(|i| i.source_message_id.as_deref() == Some(message_id)))
    }

    async fn list_by_status(
        &self,
        status: InvoiceStatus,
        limit: u64,
    ) -> Result<Vec<Invoice>, InvoiceError> {
        let mut out: Vec<Invoice> = self
            .invoices
            .lock()
            .unwrap()
            .values()
            .filter(|i| i.status == status)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        out.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(out)
    }

    async fn list_recent(&self, limit: u64) -> Result<Vec<Invoice>, InvoiceError> {
        let mut out: Vec<Invoice> = self.invoices.lock().unwrap().values().cloned().collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        out.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(out)
    }

    async fn update_header(
        &self,
        id: Uuid,
        patch: InvoiceHeaderPatch,
    ) -> Result<(), InvoiceError> {
        if self.fail_header_update.load(Ordering::SeqCst) {
            return Err(InvoiceError::repository("header update failed"));
        }
        let mut invoices = self.invoices.lock().unwrap();
        let invoice = invoices.get_mut(&id).ok_or(InvoiceError::NotFound(id))?;
        if patch.supplier_name.is_some() {
            invoice.supplier_name = patch.supplier_name;
        }
        if patch.invoice_number.is_some() {
            invoice.invoice_number = patch.invoice_number;
        }
        if patch.invoice_date.is_some() {
            invoice.invoice_date = patch.invoice_date;
        }
        if patch.currency.is_some() {
            invoice.currency = patch.currency;
        }
        if patch.net_amount.is_some() {
            invoice.net_amount = patch.net_amount;
        }
        if patch.vat_amount.is_some() {
            invoice.vat_amount = patch.vat_amount;
        }
        if patch.freight_amount.is_some() {
            invoice.freight_amount = patch.freight_amount;
        }
        if patch.total_amount.is_some() {
            invoice.total_amount = patch.total_amount;
        }
        invoice.updated_at = Utc::now();
        Ok(())
    }

    async fn set_status(
        &self,
        id: Uuid,
        status: InvoiceStatus,
        validated_at: Option<DateTime<Utc>>,
    ) -> Result<(), InvoiceError> {
        let mut invoices = self.invoices.lock().unwrap();
        let invoice = invoices.get_mut(&id).ok_or(InvoiceError::NotFound(id))?;
        invoice.status = status;
        if validated_at.is_some() {
            invoice.validated_at = validated_at;
        }
        invoice.updated_at = Utc::now();
        Ok(())
    }

    async fn delete_lines(&self, invoice_id: Uuid) -> Result<u64, InvoiceError> {
        let mut lines = self.lines.lock().unwrap();
        let before = lines.len();
        lines.retain(|l| l.invoice_id != invoice_id);
        Ok((before - lines.len()) as u64)
    }

    async fn insert_line(
        &self,
        invoice_id: Uuid,
        line: NewInvoiceLine,
    ) -> Result<InvoiceLine, InvoiceError> {
        if *self.fail_insert_line_no.lock().unwrap() == Some(line.line_no) {
            return Err(InvoiceError::repository("insert failed"));
        }
        let stored = InvoiceLine {
            id: Uuid::new_v4(),
            invoice_id,
            line_no: line.line_no,
            sku: line.sku,
            product_name: line.product_name,
            description: line.description,
            quantity: line.quantity,
            unit: line.unit,
            unit_price: line.unit_price,
            discount_percent: line.discount_percent,
            discount_total: line.discount_total,
            net_amount: line.net_amount,
            line_total: line.line_total,
            vat_rate: line.vat_rate,
            match_status: None,
            matched_price: None,
            price_delta: None,
            created_at: Utc::now(),
        };
        self.lines.lock().unwrap().push(stored.clone());
        Ok(stored)
    }

    async fn list_lines(&self, invoice_id: Uuid) -> Result<Vec<InvoiceLine>, InvoiceError> {
        let mut out: Vec<InvoiceLine> = self
            .lines
            .lock()
            .unwrap()
            .iter()
            .filter(|l| l.invoice_id == invoice_id)
            .cloned()
            .collect();
        out.sort_by_key(|l| l.line_no);
        Ok(out)
    }

    async fn find_line(&self, line_id: Uuid) -> Result<Option<InvoiceLine>, InvoiceError> {
        Ok(self
            .lines
            .lock()
            .unwrap()
            .iter()
            .find(|l| l.id == line_id)
            .cloned())
    }

    async fn set_line_match(
        &self,
        line_id: Uuid,
        status: LineStatus,
        matched_price: Option<Decimal>,
        price_delta: Option<Decimal>,
    ) -> Result<(), InvoiceError> {
        let mut lines = self.lines.lock().unwrap();
        let line = lines
            .iter_mut()
            .find(|l| l.id == line_id)
            .ok_or_else(|| InvoiceError::repository("line not found"))?;
        line.match_status = Some(status);
        line.matched_price = matched_price;
        line.price_delta = price_delta;
        Ok(())
    }
}

/// In-memory audit log.
#[derive(Default)]
pub(crate) struct MockAuditLog {
    pub entries: Mutex<Vec<NewAuditEntry>>,
}

impl MockAuditLog {
    pub fn actions(&self) -> Vec<AuditAction> {
        self.entries.lock().unwrap().iter().map(|e| e.action).collect()
    }
}

impl AuditLog for MockAuditLog {
    async fn record(&self, entry: NewAuditEntry) -> Result<(), AuditError> {
        self.entries.lock().unwrap().push(entry);
        Ok(())
    }
}

/// In-memory price book.
#[derive(Default)]
pub(crate) struct MockPriceBook {
    pub records: Mutex<Vec<PriceRecord>>,
}

impl MockPriceBook {
    pub fn add(&self, record: PriceRecord) {
        self.records.lock().unwrap().push(record);
    }

    pub fn count(&self) -> usize {
        self.records.lock().unwrap().len()
    }
}

impl PriceBookRepository for MockPriceBook {
    async fn list_by_sku(
        &self,
        supplier_name: &str,
        sku: &str,
    ) -> Result<Vec<PriceRecord>, PriceBookError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.supplier_name == supplier_name && r.sku.as_deref() == Some(sku))
            .cloned()
            .collect())
    }

    async fn list_by_product_name(
        &self,
        supplier_name: &str,
        product_name: &str,
    ) -> Result<Vec<PriceRecord>, PriceBookError> {
        let wanted = product_name.to_lowercase();
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| {
                r.supplier_name == supplier_name
                    && r.product_name
                        .as_deref()
                        .is_some_and(|n| n.to_lowercase() == wanted)
            })
            .cloned()
            .collect())
    }

    async fn exists_in_status(
        &self,
        supplier_name: &str,
        sku: &str,
        status: PriceStatus,
    ) -> Result<bool, PriceBookError> {
        Ok(self.records.lock().unwrap().iter().any(|r| {
            r.supplier_name == supplier_name
                && r.sku.as_deref() == Some(sku)
                && r.status == status
        }))
    }

    async fn insert(&self, record: NewPriceRecord) -> Result<PriceRecord, PriceBookError> {
        let stored = PriceRecord {
            id: Uuid::new_v4(),
            supplier_name: record.supplier_name,
            sku: record.sku,
            product_name: record.product_name,
            unit_price: record.unit_price,
            currency: record.currency,
            valid_from: record.valid_from,
            valid_to: record.valid_to,
            status: record.status,
            source: record.source,
            created_at: Utc::now(),
        };
        self.records.lock().unwrap().push(stored.clone());
        Ok(stored)
    }

    async fn close_record(&self, id: Uuid, valid_to: NaiveDate) -> Result<(), PriceBookError> {
        let mut records = self.records.lock().unwrap();
        let record = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| PriceBookError::repository("record not found"))?;
        record.valid_to = Some(valid_to);
        Ok(())
    }
}

/// In-memory document store.
#[derive(Default)]
pub(crate) struct MockDocumentStore {
    pub objects: Mutex<HashMap<String, Vec<u8>>>,
}

impl MockDocumentStore {
    pub fn with_object(key: &str, bytes: &[u8]) -> Self {
        let store = Self::default();
        store
            .objects
            .lock()
            .unwrap()
            .insert(key.to_string(), bytes.to_vec());
        store
    }
}

impl DocumentStore for MockDocumentStore {
    async fn store_pdf(
        &self,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<StoredDocument, StorageError> {
        let mut objects = self.objects.lock().unwrap();
        let suffix = format!("_{filename}");
        if let Some(existing) = objects.keys().find(|k| k.ends_with(&suffix)).cloned() {
            return Ok(StoredDocument {
                key: existing,
                reused: true,
            });
        }
        let key = format!("20260101_000000_{filename}");
        objects.insert(key.clone(), bytes);
        Ok(StoredDocument { key, reused: false })
    }

    async fn fetch(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }
}
