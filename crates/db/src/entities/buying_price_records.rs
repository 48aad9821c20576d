//! `SeaORM` Entity for the buying_price_records table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "buying_price_records")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub supplier_name: String,
    pub sku: Option<String>,
    pub product_name: Option<String>,
    #[sea_orm(column_type = "Decimal(Some((14, 4)))")]
    pub unit_price: Decimal,
    pub currency: Option<String>,
    pub valid_from: Option<Date>,
    pub valid_to: Option<Date>,
    pub status: String,
    pub source: String,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
