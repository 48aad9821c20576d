//! Append-only audit log of domain events.
//!
//! Every pipeline component writes here; nothing reads it back for control
//! decisions. Recording is best-effort: a failed insert is logged at `warn`
//! and never fails the operation that produced the event.

mod types;

pub use types::{AuditAction, AuditEntry, EntityKind, NewAuditEntry};

use tracing::warn;

/// Audit log error.
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    /// Repository operation failed.
    #[error("repository error: {0}")]
    Repository(String),
}

impl AuditError {
    /// Create a repository error.
    #[must_use]
    pub fn repository(msg: impl Into<String>) -> Self {
        Self::Repository(msg.into())
    }
}

/// Repository trait for audit log persistence.
///
/// Implemented by the db crate. Entries are immutable; there is no update
/// or delete operation.
pub trait AuditLog: Send + Sync {
    /// Append one audit entry.
    fn record(
        &self,
        entry: NewAuditEntry,
    ) -> impl std::future::Future<Output = Result<(), AuditError>> + Send;
}

/// Record an entry, downgrading failure to a warning.
pub async fn record_best_effort<A: AuditLog>(audit: &A, entry: NewAuditEntry) {
    let action = entry.action;
    if let Err(e) = audit.record(entry).await {
        warn!(action = action.as_str(), error = %e, "Failed to write audit entry");
    }
}
