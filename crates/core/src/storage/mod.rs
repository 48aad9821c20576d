//! Invoice PDF storage using Apache OpenDAL.
//!
//! Stored PDFs are keyed `{timestamp}_{sanitized_filename}` inside a single
//! bucket. Storage is content-addressed only by filename: storing the same
//! filename twice reuses the existing object.

mod error;
mod service;

pub use error::StorageError;
pub use service::{DocumentStore, PdfStore, StoredDocument};
