//! Audit log repository for database operations.
//!
//! Append-only; there is no update or delete path.

use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use uuid::Uuid;

use crate::entities::audit_log;
use factum_core::audit::{AuditError, AuditLog, NewAuditEntry};

/// Audit log repository implementation.
#[derive(Debug, Clone)]
pub struct AuditLogRepository {
    db: DatabaseConnection,
}

impl AuditLogRepository {
    /// Create a new audit log repository.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

impl AuditLog for AuditLogRepository {
    async fn record(&self, entry: NewAuditEntry) -> Result<(), AuditError> {
        let active_model = audit_log::ActiveModel {
            id: Set(Uuid::new_v4()),
            entity_type: Set(entry.entity_type.as_str().to_owned()),
            entity_id: Set(entry.entity_id),
            action: Set(entry.action.as_str().to_owned()),
            details: Set(entry.details),
            performed_by: Set(entry.performed_by),
            performed_at: Set(Utc::now().into()),
        };

        active_model
            .insert(&self.db)
            .await
            .map_err(|e| AuditError::repository(e.to_string()))?;

        Ok(())
    }
}
