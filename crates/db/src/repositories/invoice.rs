//! Invoice repository for database operations.
//!
//! Implements invoice and invoice-line persistence using SeaORM.

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use crate::entities::{invoice_lines, invoices};
use factum_core::invoice::{
    Invoice, InvoiceError, InvoiceHeaderPatch, InvoiceLine, InvoiceRepository as InvoiceRepoTrait,
    InvoiceStatus, LineStatus, NewInvoice, NewInvoiceLine,
};

/// Invoice repository implementation.
#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    db: DatabaseConnection,
}

impl InvoiceRepository {
    /// Create a new invoice repository.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

impl InvoiceRepoTrait for InvoiceRepository {
    async fn create(&self, input: NewInvoice) -> Result<Invoice, InvoiceError> {
        let now = Utc::now();
        let active_model = invoices::ActiveModel {
            id: Set(Uuid::new_v4()),
            source_message_id: Set(input.source_message_id),
            sender: Set(input.sender),
            pdf_object_key: Set(input.pdf_object_key),
            pdf_filename: Set(input.pdf_filename),
            supplier_name: Set(None),
            invoice_number: Set(None),
            invoice_date: Set(None),
            currency: Set(None),
            net_amount: Set(None),
            vat_amount: Set(None),
            freight_amount: Set(None),
            total_amount: Set(None),
            status: Set(InvoiceStatus::Received.as_str().to_owned()),
            validated_at: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        let model = active_model
            .insert(&self.db)
            .await
            .map_err(|e| InvoiceError::repository(e.to_string()))?;

        to_domain(model)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Invoice>, InvoiceError> {
        let model = invoices::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| InvoiceError::repository(e.to_string()))?;

        model.map(to_domain).transpose()
    }

    async fn exists_by_message_id(&self, message_id: &str) -> Result<bool, InvoiceError> {
        let count: u64 = invoices::Entity::find()
            .filter(invoices::Column::SourceMessageId.eq(message_id))
            .count(&self.db)
            .await
            .map_err(|e| InvoiceError::repository(e.to_string()))?;

        Ok(count > 0)
    }

    async fn list_by_status(
        &self,
        status: InvoiceStatus,
        limit: u64,
    ) -> Result<Vec<Invoice>, InvoiceError> {
        let models = invoices::Entity::find()
            .filter(invoices::Column::Status.eq(status.as_str()))
            .order_by_desc(invoices::Column::CreatedAt)
            .limit(limit)
            .all(&self.db)
            .await
            .map_err(|e| InvoiceError::repository(e.to_string()))?;

        models.into_iter().map(to_domain).collect()
    }

    async fn list_recent(&self, limit: u64) -> Result<Vec<Invoice>, InvoiceError> {
        let models = invoices::Entity::find()
            .order_by_desc(invoices::Column::CreatedAt)
            .limit(limit)
            .all(&self.db)
            .await
            .map_err(|e| InvoiceError::repository(e.to_string()))?;

        models.into_iter().map(to_domain).collect()
    }

    async fn update_header(&self, id: Uuid, patch: InvoiceHeaderPatch) -> Result<(), InvoiceError> {
        let mut active_model = invoices::ActiveModel {
            id: Set(id),
            updated_at: Set(Utc::now().into()),
            ..Default::default()
        };
        if let Some(v) = patch.supplier_name {
            active_model.supplier_name = Set(Some(v));
        }
        if let Some(v) = patch.invoice_number {
            active_model.invoice_number = Set(Some(v));
        }
        if let Some(v) = patch.invoice_date {
            active_model.invoice_date = Set(Some(v));
        }
        if let Some(v) = patch.currency {
            active_model.currency = Set(Some(v));
        }
        if let Some(v) = patch.net_amount {
            active_model.net_amount = Set(Some(v));
        }
        if let Some(v) = patch.vat_amount {
            active_model.vat_amount = Set(Some(v));
        }
        if let Some(v) = patch.freight_amount {
            active_model.freight_amount = Set(Some(v));
        }
        if let Some(v) = patch.total_amount {
            active_model.total_amount = Set(Some(v));
        }

        active_model
            .update(&self.db)
            .await
            .map_err(|e| InvoiceError::repository(e.to_string()))?;

        Ok(())
    }

    async fn set_status(
        &self,
        id: Uuid,
        status: InvoiceStatus,
        validated_at: Option<DateTime<Utc>>,
    ) -> Result<(), InvoiceError> {
        let mut active_model = invoices::ActiveModel {
            id: Set(id),
            status: Set(status.as_str().to_owned()),
            updated_at: Set(Utc::now().into()),
            ..Default::default()
        };
        if let Some(at) = validated_at {
            active_model.validated_at = Set(Some(at.into()));
        }

        active_model
            .update(&self.db)
            .await
            .map_err(|e| InvoiceError::repository(e.to_string()))?;

        Ok(())
    }

    async fn delete_lines(&self, invoice_id: Uuid) -> Result<u64, InvoiceError> {
        let result = invoice_lines::Entity::delete_many()
            .filter(invoice_lines::Column::InvoiceId.eq(invoice_id))
            .exec(&self.db)
            .await
            .map_err(|e| InvoiceError::repository(e.to_string()))?;

        Ok(result.rows_affected)
    }

    async fn insert_line(
        &self,
        invoice_id: Uuid,
        line: NewInvoiceLine,
    ) -> Result<InvoiceLine, InvoiceError> {
        let active_model = invoice_lines::ActiveModel {
            id: Set(Uuid::new_v4()),
            invoice_id: Set(invoice_id),
            line_no: Set(line.line_no),
            sku: Set(line.sku),
            product_name: Set(line.product_name),
            description: Set(line.description),
            quantity: Set(line.quantity),
            unit: Set(line.unit),
            unit_price: Set(line.unit_price),
            discount_percent: Set(line.discount_percent),
            discount_total: Set(line.discount_total),
            net_amount: Set(line.net_amount),
            line_total: Set(line.line_total),
            vat_rate: Set(line.vat_rate),
            match_status: Set(None),
            matched_price: Set(None),
            price_delta: Set(None),
            created_at: Set(Utc::now().into()),
        };

        let model = active_model
            .insert(&self.db)
            .await
            .map_err(|e| InvoiceError::repository(e.to_string()))?;

        line_to_domain(model)
    }

    async fn list_lines(&self, invoice_id: Uuid) -> Result<Vec<InvoiceLine>, InvoiceError> {
        let models = invoice_lines::Entity::find()
            .filter(invoice_lines::Column::InvoiceId.eq(invoice_id))
            .order_by_asc(invoice_lines::Column::LineNo)
            .all(&self.db)
            .await
            .map_err(|e| InvoiceError::repository(e.to_string()))?;

        models.into_iter().map(line_to_domain).collect()
    }

    async fn find_line(&self, line_id: Uuid) -> Result<Option<InvoiceLine>, InvoiceError> {
        let model = invoice_lines::Entity::find_by_id(line_id)
            .one(&self.db)
            .await
            .map_err(|e| InvoiceError::repository(e.to_string()))?;

        model.map(line_to_domain).transpose()
    }

    async fn set_line_match(
        &self,
        line_id: Uuid,
        status: LineStatus,
        matched_price: Option<rust_decimal::Decimal>,
        price_delta: Option<rust_decimal::Decimal>,
    ) -> Result<(), InvoiceError> {
        let active_model = invoice_lines::ActiveModel {
            id: Set(line_id),
            match_status: Set(Some(status.as_str().to_owned())),
            matched_price: Set(matched_price),
            price_delta: Set(price_delta),
            ..Default::default()
        };

        active_model
            .update(&self.db)
            .await
            .map_err(|e| InvoiceError::repository(e.to_string()))?;

        Ok(())
    }
}

/// Convert a database model to a domain invoice.
fn to_domain(model: invoices::Model) -> Result<Invoice, InvoiceError> {
    let status = InvoiceStatus::parse(&model.status).ok_or_else(|| {
        InvoiceError::repository(format!("unknown invoice status: {}", model.status))
    })?;

    Ok(Invoice {
        id: model.id,
        source_message_id: model.source_message_id,
        sender: model.sender,
        pdf_object_key: model.pdf_object_key,
        pdf_filename: model.pdf_filename,
        supplier_name: model.supplier_name,
        invoice_number: model.invoice_number,
        invoice_date: model.invoice_date,
        currency: model.currency,
        net_amount: model.net_amount,
        vat_amount: model.vat_amount,
        freight_amount: model.freight_amount,
        total_amount: model.total_amount,
        status,
        validated_at: model.validated_at.map(Into::into),
        created_at: model.created_at.into(),
        updated_at: model.updated_at.into(),
    })
}

/// Convert a database model to a domain invoice line.
fn line_to_domain(model: invoice_lines::Model) -> Result<InvoiceLine, InvoiceError> {
    let match_status = model
        .match_status
        .map(|s| {
            LineStatus::parse(&s)
                .ok_or_else(|| InvoiceError::repository(format!("unknown line status: {s}")))
        })
        .transpose()?;

    Ok(InvoiceLine {
        id: model.id,
        invoice_id: model.invoice_id,
        line_no: model.line_no,
        sku: model.sku,
        product_name: model.product_name,
        description: model.description,
        quantity: model.quantity,
        unit: model.unit,
        unit_price: model.unit_price,
        discount_percent: model.discount_percent,
        discount_total: model.discount_total,
        net_amount: model.net_amount,
        line_total: model.line_total,
        vat_rate: model.vat_rate,
        match_status,
        matched_price: model.matched_price,
        price_delta: model.price_delta,
        created_at: model.created_at.into(),
    })
}
