//! Factum API Server
//!
//! Main entry point for the Factum backend service: HTTP API plus the
//! background invoice pipeline (mail ingestion, extraction, validation).

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use factum_api::{AppState, create_router};
use factum_core::extraction::{ExtractionService, OpenAiExtractor, PdfiumExtractor};
use factum_core::ingest::{GraphMailProvider, IngestLimits, MailIngestor, ProcessedMessages};
use factum_core::matching::{MatchingService, Tolerance};
use factum_core::pipeline::{Orchestrator, OrchestratorSettings, run_mail_poller};
use factum_core::storage::PdfStore;
use factum_db::connect;
use factum_db::repositories::{AuditLogRepository, InvoiceRepository, PriceBookRepository};
use factum_shared::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "factum=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = AppConfig::load().expect("Failed to load configuration");

    // Connect to database
    let db = connect(&config.database.url).await?;
    info!("Connected to database");

    // Shared collaborators
    let documents = Arc::new(PdfStore::from_settings(&config.storage)?);
    let pdf = Arc::new(PdfiumExtractor::new());
    let extractor = Arc::new(OpenAiExtractor::new(
        config.extraction.openai_api_key.clone(),
        config.extraction.model.clone(),
    ));
    let mail = Arc::new(GraphMailProvider::new(config.mail.clone()));
    let processed = Arc::new(ProcessedMessages::new());

    let tolerance = if config.pipeline.use_percent_tolerance {
        Tolerance::Percent(config.pipeline.price_tolerance_percent)
    } else {
        Tolerance::Absolute
    };
    let ingest_limits = IngestLimits {
        batch_size: config.pipeline.max_batch_size,
        max_pdf_bytes: config.max_pdf_size_bytes(),
    };

    // Repositories for the background pipeline
    let invoices = Arc::new(InvoiceRepository::new(db.clone()));
    let prices = Arc::new(PriceBookRepository::new(db.clone()));
    let audit = Arc::new(AuditLogRepository::new(db.clone()));

    let ingestor = MailIngestor::new(
        Arc::clone(&mail),
        Arc::clone(&invoices),
        Arc::clone(&audit),
        Arc::clone(&documents),
        Arc::clone(&processed),
        ingest_limits,
    );
    let extraction = ExtractionService::new(
        Arc::clone(&invoices),
        Arc::clone(&audit),
        Arc::clone(&documents),
        Arc::clone(&pdf),
        Arc::clone(&extractor),
    );
    let matching = MatchingService::new(
        Arc::clone(&invoices),
        Arc::clone(&prices),
        Arc::clone(&audit),
        tolerance,
    );

    let cycle_interval = Duration::from_secs(config.pipeline.poll_interval_minutes * 60);
    let settings = OrchestratorSettings {
        batch_size: config.pipeline.max_batch_size,
        cycle_interval,
        ingest_inline: !config.pipeline.enable_background_polling,
        ..OrchestratorSettings::default()
    };
    let orchestrator = Arc::new(Orchestrator::new(
        Arc::clone(&invoices),
        ingestor,
        extraction,
        matching,
        settings,
    ));

    let cancel = CancellationToken::new();

    // Background pipeline
    let orchestrator_task = tokio::spawn({
        let orchestrator = Arc::clone(&orchestrator);
        let cancel = cancel.clone();
        async move {
            orchestrator.run(cancel).await;
        }
    });

    // Dedicated mail poller, when configured
    let poller_task = if config.pipeline.enable_background_polling {
        let poll_ingestor = Arc::new(MailIngestor::new(
            Arc::clone(&mail),
            Arc::clone(&invoices),
            Arc::clone(&audit),
            Arc::clone(&documents),
            Arc::clone(&processed),
            ingest_limits,
        ));
        Some(tokio::spawn(run_mail_poller(
            poll_ingestor,
            cycle_interval,
            cancel.clone(),
        )))
    } else {
        None
    };

    // Create application state
    let state = AppState {
        db,
        documents,
        pdf,
        extractor,
        mail,
        processed,
        tolerance,
        ingest_limits,
    };

    // Create router
    let app = create_router(state);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel.clone()))
        .await?;

    // The shutdown signal cancelled the token; wait for the pipeline to
    // finish its current phase.
    if let Err(e) = orchestrator_task.await {
        error!(error = %e, "Orchestrator task panicked");
    }
    if let Some(task) = poller_task {
        if let Err(e) = task.await {
            error!(error = %e, "Mail poller task panicked");
        }
    }
    info!("Shutdown complete");

    Ok(())
}

/// Wait for Ctrl-C, then cancel the background tasks.
async fn shutdown_signal(cancel: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    info!("Shutdown signal received");
    cancel.cancel();
}
