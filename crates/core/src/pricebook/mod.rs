//! Time-bounded reference prices (the price book).
//!
//! A record says: supplier X sells SKU Y at unit price Z between
//! `valid_from` and `valid_to`. Open-ended records have `valid_to = NULL`.
//! Records learned from invoices start in `need_review` and only become
//! `active` through human acceptance.

mod lookup;
mod repository;
mod types;

pub use lookup::active_on;
pub use repository::PriceBookRepository;
pub use types::{NewPriceRecord, PriceRecord, PriceSource, PriceStatus};

/// Price book persistence error.
#[derive(Debug, thiserror::Error)]
pub enum PriceBookError {
    /// Repository operation failed.
    #[error("repository error: {0}")]
    Repository(String),
}

impl PriceBookError {
    /// Create a repository error.
    #[must_use]
    pub fn repository(msg: impl Into<String>) -> Self {
        Self::Repository(msg.into())
    }
}
