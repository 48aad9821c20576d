//! Repository implementations backed by PostgreSQL.

mod audit;
mod invoice;
mod price_book;

pub use audit::AuditLogRepository;
pub use invoice::InvoiceRepository;
pub use price_book::PriceBookRepository;
