//! PDF invoice extraction.
//!
//! `ExtractionService` downloads the stored PDF, pulls text and a
//! best-effort logo image out of it, asks the AI extractor for structured
//! header and line data, cleans the raw values, and writes them back.
//! Failure keeps the invoice in `received` so extraction can be retried.

mod clean;
mod dates;
mod error;
mod openai;
mod pdf;
mod service;
mod types;

pub use clean::{clean_amount, clean_percent};
pub use dates::parse_invoice_date;
pub use error::ExtractionError;
pub use openai::OpenAiExtractor;
pub use pdf::{DocumentContent, DocumentExtractor, PdfiumExtractor};
pub use service::{ExtractionService, ParseOutcome};
pub use types::{InvoiceExtractor, RawExtraction, RawLine, RawValue};
