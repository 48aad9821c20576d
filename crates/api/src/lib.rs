//! HTTP API layer with Axum routes.
//!
//! This crate provides:
//! - REST API routes for invoices, validation, and resolution
//! - An internal trigger for mailbox polling
//!
//! Handlers construct repositories and services per request from the
//! shared state; everything heavyweight (HTTP clients, storage operator,
//! connection pool) lives in [`AppState`] and is cloned cheaply.

pub mod routes;

use std::sync::Arc;

use axum::Router;
use sea_orm::DatabaseConnection;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use factum_core::extraction::{OpenAiExtractor, PdfiumExtractor};
use factum_core::ingest::{GraphMailProvider, IngestLimits, ProcessedMessages};
use factum_core::matching::Tolerance;
use factum_core::storage::PdfStore;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: DatabaseConnection,
    /// PDF object store.
    pub documents: Arc<PdfStore>,
    /// PDF text and logo extractor.
    pub pdf: Arc<PdfiumExtractor>,
    /// AI invoice extractor.
    pub extractor: Arc<OpenAiExtractor>,
    /// Mailbox provider.
    pub mail: Arc<GraphMailProvider>,
    /// Message ids already ingested by this process.
    pub processed: Arc<ProcessedMessages>,
    /// Price comparison tolerance.
    pub tolerance: Tolerance,
    /// Batch and size ceilings for mail polling.
    pub ingest_limits: IngestLimits,
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
