//! Invoice listing, detail, and extraction routes.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};
use uuid::Uuid;

use crate::AppState;
use factum_core::audit::{record_best_effort, AuditAction, EntityKind, NewAuditEntry};
use factum_core::extraction::{ExtractionError, ExtractionService};
use factum_core::invoice::{
    Invoice, InvoiceLine, InvoiceRepository as InvoiceRepoTrait, InvoiceStatus, NewInvoice,
};
use factum_core::storage::DocumentStore;
use factum_db::repositories::{AuditLogRepository, InvoiceRepository};

const DEFAULT_LIST_LIMIT: u64 = 50;
const MAX_LIST_LIMIT: u64 = 200;

/// Creates the invoice routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/invoices", get(list_invoices))
        .route("/invoices/upload", post(upload_invoice))
        .route("/invoices/{id}", get(get_invoice))
        .route("/invoices/{id}/lines", get(get_invoice_lines))
        .route("/invoices/{id}/parse", post(parse_invoice))
}

/// Query parameters for listing invoices.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    /// Restrict to one lifecycle status.
    pub status: Option<String>,
    /// Maximum rows returned.
    pub limit: Option<u64>,
}

/// Invoice header with its lines.
#[derive(serde::Serialize)]
pub struct InvoiceDetailResponse {
    /// Invoice header.
    pub invoice: Invoice,
    /// Lines in line-number order.
    pub lines: Vec<InvoiceLine>,
}

fn internal_error(e: &impl std::fmt::Display) -> axum::response::Response {
    error!(error = %e, "Invoice route failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "error": "internal_error",
            "message": "An error occurred"
        })),
    )
        .into_response()
}

fn invoice_not_found(id: Uuid) -> axum::response::Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "not_found",
            "message": format!("Invoice {id} not found")
        })),
    )
        .into_response()
}

/// GET `/invoices?status=&limit=`
/// List invoices, newest first.
async fn list_invoices(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> impl IntoResponse {
    let repo = InvoiceRepository::new(state.db.clone());
    let limit = query.limit.unwrap_or(DEFAULT_LIST_LIMIT).min(MAX_LIST_LIMIT);

    let result = match query.status.as_deref() {
        Some(raw) => {
            let Some(status) = InvoiceStatus::parse(raw) else {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({
                        "error": "invalid_status",
                        "message": format!("Unknown invoice status: {raw}")
                    })),
                )
                    .into_response();
            };
            repo.list_by_status(status, limit).await
        }
        None => repo.list_recent(limit).await,
    };

    match result {
        Ok(invoices) => (StatusCode::OK, Json(invoices)).into_response(),
        Err(e) => internal_error(&e),
    }
}

/// GET `/invoices/{id}`
/// One invoice with its lines.
async fn get_invoice(State(state): State<AppState>, Path(id): Path<Uuid>) -> impl IntoResponse {
    let repo = InvoiceRepository::new(state.db.clone());

    let invoice = match repo.find_by_id(id).await {
        Ok(Some(invoice)) => invoice,
        Ok(None) => return invoice_not_found(id),
        Err(e) => return internal_error(&e),
    };

    match repo.list_lines(id).await {
        Ok(lines) => (
            StatusCode::OK,
            Json(InvoiceDetailResponse { invoice, lines }),
        )
            .into_response(),
        Err(e) => internal_error(&e),
    }
}

/// GET `/invoices/{id}/lines`
/// Lines of one invoice in line-number order.
async fn get_invoice_lines(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    let repo = InvoiceRepository::new(state.db.clone());

    match repo.find_by_id(id).await {
        Ok(Some(_)) => {}
        Ok(None) => return invoice_not_found(id),
        Err(e) => return internal_error(&e),
    }

    match repo.list_lines(id).await {
        Ok(lines) => (StatusCode::OK, Json(lines)).into_response(),
        Err(e) => internal_error(&e),
    }
}

fn bad_request(error: &str, message: String) -> axum::response::Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({
            "error": error,
            "message": message
        })),
    )
        .into_response()
}

/// Uploaded filenames must end in `.pdf`, case-insensitive.
fn is_pdf_filename(filename: &str) -> bool {
    filename.to_ascii_lowercase().ends_with(".pdf")
}

/// POST `/invoices/upload`
/// Store a PDF from the `file` multipart field and create a `received`
/// invoice for it. The poll cycle picks the invoice up for extraction.
async fn upload_invoice(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> impl IntoResponse {
    let field = loop {
        match multipart.next_field().await {
            Ok(Some(field)) if field.name() == Some("file") => break field,
            Ok(Some(_)) => {}
            Ok(None) => {
                return bad_request(
                    "missing_file",
                    "Multipart field 'file' is required".to_string(),
                );
            }
            Err(e) => return bad_request("invalid_multipart", e.to_string()),
        }
    };

    let filename = field.file_name().unwrap_or("upload.pdf").to_string();
    if !is_pdf_filename(&filename) {
        return bad_request(
            "invalid_file",
            format!("Only .pdf files are accepted, got {filename}"),
        );
    }

    let bytes = match field.bytes().await {
        Ok(bytes) => bytes,
        Err(e) => return bad_request("invalid_multipart", e.to_string()),
    };
    if bytes.len() as u64 > state.ingest_limits.max_pdf_bytes {
        return bad_request(
            "file_too_large",
            format!("Pdf exceeds {} bytes", state.ingest_limits.max_pdf_bytes),
        );
    }

    let stored = match state.documents.store_pdf(&filename, bytes.to_vec()).await {
        Ok(stored) => stored,
        Err(e) => return internal_error(&e),
    };

    let repo = InvoiceRepository::new(state.db.clone());
    let invoice = match repo
        .create(NewInvoice {
            source_message_id: None,
            sender: None,
            pdf_object_key: Some(stored.key.clone()),
            pdf_filename: Some(filename.clone()),
        })
        .await
    {
        Ok(invoice) => invoice,
        Err(e) => return internal_error(&e),
    };

    record_best_effort(
        &AuditLogRepository::new(state.db.clone()),
        NewAuditEntry::system(
            EntityKind::Invoice,
            invoice.id,
            AuditAction::PdfStored,
            json!({
                "object_key": stored.key,
                "filename": filename,
                "size": bytes.len(),
                "reused": stored.reused,
            }),
        ),
    )
    .await;

    info!(invoice_id = %invoice.id, filename = %filename, "Uploaded invoice pdf");
    (StatusCode::CREATED, Json(invoice)).into_response()
}

/// POST `/invoices/{id}/parse`
/// Extract header and lines from the stored PDF.
async fn parse_invoice(State(state): State<AppState>, Path(id): Path<Uuid>) -> impl IntoResponse {
    let service = ExtractionService::new(
        Arc::new(InvoiceRepository::new(state.db.clone())),
        Arc::new(AuditLogRepository::new(state.db.clone())),
        Arc::clone(&state.documents),
        Arc::clone(&state.pdf),
        Arc::clone(&state.extractor),
    );

    match service.parse_invoice(id).await {
        Ok(outcome) => {
            info!(invoice_id = %id, lines = outcome.lines_parsed, "Invoice parsed");
            (StatusCode::OK, Json(outcome)).into_response()
        }
        Err(ExtractionError::InvoiceNotFound(id)) => invoice_not_found(id),
        Err(e @ ExtractionError::MissingPdf(_)) => (
            StatusCode::CONFLICT,
            Json(json!({
                "error": "missing_pdf",
                "message": e.to_string()
            })),
        )
            .into_response(),
        Err(e @ (ExtractionError::Collaborator(_) | ExtractionError::InvalidResponse(_))) => {
            error!(invoice_id = %id, error = %e, "Extractor call failed");
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({
                    "error": "extractor_failed",
                    "message": e.to_string()
                })),
            )
                .into_response()
        }
        Err(e) => internal_error(&e),
    }
}

#[cfg(test)]
mod tests {
    use super::is_pdf_filename;

    #[test]
    fn test_is_pdf_filename() {
        assert!(is_pdf_filename("faktura.pdf"));
        assert!(is_pdf_filename("FAKTURA.PDF"));
        assert!(!is_pdf_filename("faktura.png"));
        assert!(!is_pdf_filename("faktura.pdf.exe"));
        assert!(!is_pdf_filename("pdf"));
    }
}
