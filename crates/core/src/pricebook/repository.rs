//! Price book repository trait.

use chrono::NaiveDate;
use uuid::Uuid;

use super::types::{NewPriceRecord, PriceRecord, PriceStatus};
use super::PriceBookError;

/// Repository trait for price book persistence.
pub trait PriceBookRepository: Send + Sync {
    /// List records for a supplier and SKU, oldest first.
    fn list_by_sku(
        &self,
        supplier_name: &str,
        sku: &str,
    ) -> impl std::future::Future<Output = Result<Vec<PriceRecord>, PriceBookError>> + Send;

    /// List records for a supplier and product name, case-insensitive,
    /// oldest first.
    fn list_by_product_name(
        &self,
        supplier_name: &str,
        product_name: &str,
    ) -> impl std::future::Future<Output = Result<Vec<PriceRecord>, PriceBookError>> + Send;

    /// Whether a record in the given status exists for a supplier and SKU.
    fn exists_in_status(
        &self,
        supplier_name: &str,
        sku: &str,
        status: PriceStatus,
    ) -> impl std::future::Future<Output = Result<bool, PriceBookError>> + Send;

    /// Insert a record.
    fn insert(
        &self,
        record: NewPriceRecord,
    ) -> impl std::future::Future<Output = Result<PriceRecord, PriceBookError>> + Send;

    /// Close a record by setting its `valid_to`.
    fn close_record(
        &self,
        id: Uuid,
        valid_to: NaiveDate,
    ) -> impl std::future::Future<Output = Result<(), PriceBookError>> + Send;
}
