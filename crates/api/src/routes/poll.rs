//! Internal mailbox polling trigger.

use std::sync::Arc;

use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::post};
use serde_json::json;
use tracing::{error, info};

use crate::AppState;
use factum_core::ingest::{IngestError, MailIngestor};
use factum_db::repositories::{AuditLogRepository, InvoiceRepository};

/// Creates the internal polling routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/internal/poll-emails", post(poll_emails))
}

/// POST `/internal/poll-emails`
/// Poll the mailbox once and ingest any new invoice PDFs.
async fn poll_emails(State(state): State<AppState>) -> impl IntoResponse {
    let ingestor = MailIngestor::new(
        Arc::clone(&state.mail),
        Arc::new(InvoiceRepository::new(state.db.clone())),
        Arc::new(AuditLogRepository::new(state.db.clone())),
        Arc::clone(&state.documents),
        Arc::clone(&state.processed),
        state.ingest_limits,
    );

    match ingestor.poll_once().await {
        Ok(report) => {
            info!(
                fetched = report.fetched,
                ingested = report.ingested,
                skipped = report.skipped,
                failed = report.failed,
                "Mail poll finished"
            );
            (StatusCode::OK, Json(report)).into_response()
        }
        Err(e @ (IngestError::Auth(_) | IngestError::Collaborator(_))) => {
            error!(error = %e, "Mail poll failed against the provider");
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({
                    "error": "mail_provider_failed",
                    "message": e.to_string()
                })),
            )
                .into_response()
        }
        Err(e) => {
            error!(error = %e, "Mail poll failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "internal_error",
                    "message": "An error occurred"
                })),
            )
                .into_response()
        }
    }
}
