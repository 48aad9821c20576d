//! Price book repository for database operations.
//!
//! Reference price lookups are scoped to one supplier. Product-name
//! lookups compare case-insensitively, matching the functional index the
//! initial migration creates.

use chrono::{NaiveDate, Utc};
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use uuid::Uuid;

use crate::entities::buying_price_records;
use factum_core::pricebook::{
    NewPriceRecord, PriceBookError, PriceBookRepository as PriceBookRepoTrait, PriceRecord,
    PriceSource, PriceStatus,
};

/// Price book repository implementation.
#[derive(Debug, Clone)]
pub struct PriceBookRepository {
    db: DatabaseConnection,
}

impl PriceBookRepository {
    /// Create a new price book repository.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

impl PriceBookRepoTrait for PriceBookRepository {
    async fn list_by_sku(
        &self,
        supplier_name: &str,
        sku: &str,
    ) -> Result<Vec<PriceRecord>, PriceBookError> {
        let models = buying_price_records::Entity::find()
            .filter(buying_price_records::Column::SupplierName.eq(supplier_name))
            .filter(buying_price_records::Column::Sku.eq(sku))
            .order_by_asc(buying_price_records::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(|e| PriceBookError::repository(e.to_string()))?;

        models.into_iter().map(to_domain).collect()
    }

    async fn list_by_product_name(
        &self,
        supplier_name: &str,
        product_name: &str,
    ) -> Result<Vec<PriceRecord>, PriceBookError> {
        let models = buying_price_records::Entity::find()
            .filter(buying_price_records::Column::SupplierName.eq(supplier_name))
            .filter(
                Expr::expr(Func::lower(Expr::col(
                    buying_price_records::Column::ProductName,
                )))
                .eq(product_name.to_lowercase()),
            )
            .order_by_asc(buying_price_records::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(|e| PriceBookError::repository(e.to_string()))?;

        models.into_iter().map(to_domain).collect()
    }

    async fn exists_in_status(
        &self,
        supplier_name: &str,
        sku: &str,
        status: PriceStatus,
    ) -> Result<bool, PriceBookError> {
        let count: u64 = buying_price_records::Entity::find()
            .filter(buying_price_records::Column::SupplierName.eq(supplier_name))
            .filter(buying_price_records::Column::Sku.eq(sku))
            .filter(buying_price_records::Column::Status.eq(status.as_str()))
            .count(&self.db)
            .await
            .map_err(|e| PriceBookError::repository(e.to_string()))?;

        Ok(count > 0)
    }

    async fn insert(&self, record: NewPriceRecord) -> Result<PriceRecord, PriceBookError> {
        let active_model = buying_price_records::ActiveModel {
            id: Set(Uuid::new_v4()),
            supplier_name: Set(record.supplier_name),
            sku: Set(record.sku),
            product_name: Set(record.product_name),
            unit_price: Set(record.unit_price),
            currency: Set(record.currency),
            valid_from: Set(record.valid_from),
            valid_to: Set(record.valid_to),
            status: Set(record.status.as_str().to_owned()),
            source: Set(record.source.as_str().to_owned()),
            created_at: Set(Utc::now().into()),
        };

        let model = active_model
            .insert(&self.db)
            .await
            .map_err(|e| PriceBookError::repository(e.to_string()))?;

        to_domain(model)
    }

    async fn close_record(&self, id: Uuid, valid_to: NaiveDate) -> Result<(), PriceBookError> {
        let active_model = buying_price_records::ActiveModel {
            id: Set(id),
            valid_to: Set(Some(valid_to)),
            ..Default::default()
        };

        active_model
            .update(&self.db)
            .await
            .map_err(|e| PriceBookError::repository(e.to_string()))?;

        Ok(())
    }
}

/// Convert a database model to a domain price record.
fn to_domain(model: buying_price_records::Model) -> Result<PriceRecord, PriceBookError> {
    let status = PriceStatus::parse(&model.status).ok_or_else(|| {
        PriceBookError::repository(format!("unknown price status: {}", model.status))
    })?;
    let source = PriceSource::parse(&model.source).ok_or_else(|| {
        PriceBookError::repository(format!("unknown price source: {}", model.source))
    })?;

    Ok(PriceRecord {
        id: model.id,
        supplier_name: model.supplier_name,
        sku: model.sku,
        product_name: model.product_name,
        unit_price: model.unit_price,
        currency: model.currency,
        valid_from: model.valid_from,
        valid_to: model.valid_to,
        status,
        source,
        created_at: model.created_at.into(),
    })
}
