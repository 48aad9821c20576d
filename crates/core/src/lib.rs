//! Core business logic for Factum.
//!
//! This crate contains the invoice lifecycle pipeline with ZERO web or
//! database dependencies. Persistence is reached through repository traits
//! implemented by the db crate; external collaborators (mailbox, document
//! extraction, AI extraction, object storage) sit behind traits with
//! production implementations alongside.
//!
//! # Modules
//!
//! - `audit` - Append-only domain event log
//! - `invoice` - Invoice and invoice-line domain types
//! - `pricebook` - Time-bounded reference prices
//! - `storage` - PDF object storage (OpenDAL)
//! - `ingest` - Mailbox polling and PDF ingestion
//! - `extraction` - PDF download, AI extraction, line cleaning
//! - `matching` - Price validation engine
//! - `resolution` - Human mismatch resolution
//! - `pipeline` - Lifecycle orchestrator state machine

pub mod audit;
pub mod extraction;
pub mod ingest;
pub mod invoice;
pub mod matching;
pub mod pipeline;
pub mod pricebook;
pub mod resolution;
pub mod storage;

#[cfg(test)]
pub(crate) mod testing;
