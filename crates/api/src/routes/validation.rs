//! Price validation and mismatch resolution routes.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};
use uuid::Uuid;

use crate::AppState;
use factum_core::matching::{MatchingError, MatchingService};
use factum_core::resolution::{ResolutionError, ResolutionService};
use factum_db::repositories::{AuditLogRepository, InvoiceRepository, PriceBookRepository};

/// Creates the validation routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/validation/invoice/{id}", post(validate_invoice))
        .route("/validation/invoice/{id}/status", get(validation_status))
        .route("/validation/accept-price", post(accept_price))
        .route("/validation/dispute", post(dispute_invoice))
}

/// Request body for accepting a new price on an invoice line.
#[derive(Debug, Deserialize)]
pub struct AcceptPriceRequest {
    /// Line the price belongs to.
    pub line_id: Uuid,
    /// The new reference unit price.
    pub new_price: Decimal,
    /// Human-readable reason.
    pub reason: String,
    /// First day the new price is effective.
    pub valid_from: NaiveDate,
    /// Accepting user, when known.
    #[serde(default)]
    pub performed_by: Option<Uuid>,
}

/// Request body for disputing an invoice.
#[derive(Debug, Deserialize)]
pub struct DisputeRequest {
    /// Invoice to dispute.
    pub invoice_id: Uuid,
    /// Human-readable reason.
    pub reason: String,
    /// Lines to mark `no_match`; empty disputes the invoice without
    /// touching line statuses.
    #[serde(default)]
    pub line_ids: Vec<Uuid>,
    /// Disputing user, when known.
    #[serde(default)]
    pub performed_by: Option<Uuid>,
}

fn matching_service(state: &AppState) -> MatchingService<InvoiceRepository, PriceBookRepository, AuditLogRepository> {
    MatchingService::new(
        Arc::new(InvoiceRepository::new(state.db.clone())),
        Arc::new(PriceBookRepository::new(state.db.clone())),
        Arc::new(AuditLogRepository::new(state.db.clone())),
        state.tolerance,
    )
}

fn resolution_service(state: &AppState) -> ResolutionService<InvoiceRepository, PriceBookRepository, AuditLogRepository> {
    ResolutionService::new(
        Arc::new(InvoiceRepository::new(state.db.clone())),
        Arc::new(PriceBookRepository::new(state.db.clone())),
        Arc::new(AuditLogRepository::new(state.db.clone())),
        state.tolerance,
    )
}

fn internal_error(e: &impl std::fmt::Display) -> axum::response::Response {
    error!(error = %e, "Validation route failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "error": "internal_error",
            "message": "An error occurred"
        })),
    )
        .into_response()
}

fn not_found(message: String) -> axum::response::Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "not_found",
            "message": message
        })),
    )
        .into_response()
}

/// POST `/validation/invoice/{id}`
/// Validate every line of an invoice against the price book.
async fn validate_invoice(State(state): State<AppState>, Path(id): Path<Uuid>) -> impl IntoResponse {
    match matching_service(&state).validate(id).await {
        Ok(summary) => {
            info!(
                invoice_id = %id,
                status = summary.status.as_str(),
                matched = summary.matched_count,
                mismatched = summary.mismatch_count,
                "Invoice validated"
            );
            (StatusCode::OK, Json(summary)).into_response()
        }
        Err(MatchingError::InvoiceNotFound(id)) => not_found(format!("Invoice {id} not found")),
        Err(e) => internal_error(&e),
    }
}

/// GET `/validation/invoice/{id}/status`
/// Stored per-line match outcomes without re-running validation.
async fn validation_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    match matching_service(&state).status(id).await {
        Ok(status) => (StatusCode::OK, Json(status)).into_response(),
        Err(MatchingError::InvoiceNotFound(id)) => not_found(format!("Invoice {id} not found")),
        Err(e) => internal_error(&e),
    }
}

/// POST `/validation/accept-price`
/// Accept a new reference price for a line and re-validate.
async fn accept_price(
    State(state): State<AppState>,
    Json(payload): Json<AcceptPriceRequest>,
) -> impl IntoResponse {
    match resolution_service(&state)
        .accept_price(
            payload.line_id,
            payload.new_price,
            &payload.reason,
            payload.valid_from,
            payload.performed_by,
        )
        .await
    {
        Ok(outcome) => {
            info!(
                line_id = %payload.line_id,
                record_id = %outcome.record_id,
                new_price = %outcome.new_price,
                closed = outcome.closed_count,
                "Price accepted"
            );
            (StatusCode::OK, Json(outcome)).into_response()
        }
        Err(ResolutionError::LineNotFound(id)) => not_found(format!("Invoice line {id} not found")),
        Err(ResolutionError::InvoiceNotFound(id)) => not_found(format!("Invoice {id} not found")),
        Err(ResolutionError::ReferenceNotFound(msg)) => not_found(msg),
        Err(e @ ResolutionError::Validation(_)) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({
                "error": "not_acceptable",
                "message": e.to_string()
            })),
        )
            .into_response(),
        Err(e) => internal_error(&e),
    }
}

/// POST `/validation/dispute`
/// Dispute an invoice and mark its lines `no_match`.
async fn dispute_invoice(
    State(state): State<AppState>,
    Json(payload): Json<DisputeRequest>,
) -> impl IntoResponse {
    match resolution_service(&state)
        .dispute_invoice(
            payload.invoice_id,
            &payload.reason,
            &payload.line_ids,
            payload.performed_by,
        )
        .await
    {
        Ok(outcome) => {
            info!(
                invoice_id = %payload.invoice_id,
                lines_marked = outcome.lines_marked,
                "Invoice disputed"
            );
            (StatusCode::OK, Json(outcome)).into_response()
        }
        Err(ResolutionError::InvoiceNotFound(id)) => not_found(format!("Invoice {id} not found")),
        Err(ResolutionError::LineNotFound(id)) => not_found(format!("Invoice line {id} not found")),
        Err(e @ ResolutionError::Validation(_)) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({
                "error": "not_acceptable",
                "message": e.to_string()
            })),
        )
            .into_response(),
        Err(e) => internal_error(&e),
    }
}
