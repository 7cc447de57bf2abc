//! HTTP server setup and routing
//!
//! Sets up the Axum HTTP server with routes for experience control, progress,
//! recording, frame ingestion, and SSE.

use crate::error::{Error, Result};
use crate::experience::ExperienceEngine;
use crate::progress::ProgressTracker;
use crate::scan::QrIngest;
use crate::state::SharedState;
use artwalk_common::Catalog;
use axum::{
    routing::{get, post},
    Router,
};
use sqlx::{Pool, Sqlite};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

/// Shared application context passed to all handlers
#[derive(Clone)]
pub struct AppContext {
    pub state: Arc<SharedState>,
    pub engine: Arc<ExperienceEngine>,
    pub catalog: Arc<Catalog>,
    pub progress: Arc<ProgressTracker>,
    pub ingest: Arc<QrIngest>,
    pub db_pool: Pool<Sqlite>,
}

/// Build the application router
pub fn create_router(ctx: AppContext) -> Router {
    Router::new()
        // Health endpoint
        .route("/health", get(super::handlers::health))
        // Event stream
        .route("/events", get(super::sse::event_stream))
        // Experience state
        .route("/state", get(super::handlers::get_state))
        .route("/catalog", get(super::handlers::get_catalog))
        .route("/progress", get(super::handlers::get_progress))
        // Artwork control
        .route("/artwork/code", post(super::handlers::apply_code))
        .route("/artwork/:artwork_id/place", post(super::handlers::place_artwork))
        .route("/artwork/commit", post(super::handlers::commit_placement))
        .route("/artwork/reposition", post(super::handlers::reposition))
        .route("/artwork/clear", post(super::handlers::clear_artwork))
        .route("/pointer", post(super::handlers::pointer))
        .route("/visibility", post(super::handlers::set_visibility))
        // QR frame ingestion
        .route("/scan/frame", post(super::handlers::scan_frame))
        // Recording
        .route("/recording/start", post(super::handlers::start_recording))
        .route("/recording/stop", post(super::handlers::stop_recording))
        .route("/recording/clear", post(super::handlers::clear_recording))
        .route("/recording/download", post(super::handlers::download_recording))
        // Persisted UI flags
        .route("/flags/onboarding", get(super::handlers::get_onboarding))
        .route("/flags/onboarding", post(super::handlers::set_onboarding))
        .route("/flags/congrats", get(super::handlers::get_congrats))
        .route("/flags/congrats", post(super::handlers::set_congrats))
        .layer(CorsLayer::permissive())
        .with_state(ctx)
}

/// Run the HTTP API server until a shutdown signal arrives
pub async fn run(bind_addr: &str, ctx: AppContext) -> Result<()> {
    let app = create_router(ctx);

    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .map_err(|e| Error::Http(format!("failed to bind {}: {}", bind_addr, e)))?;
    info!("HTTP server listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| Error::Http(e.to_string()))?;

    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
