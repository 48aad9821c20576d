//! `SeaORM` entity definitions.

pub mod audit_log;
pub mod buying_price_records;
pub mod invoice_lines;
pub mod invoices;
