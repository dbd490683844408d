//! HTTP server setup with Axum

use std::future::Future;
use std::io;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use super::rest::{auth, records, summary};
use super::state::AppState;

/// Create the Axum router with all endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    // CORS configuration - allow all origins for development
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Authentication
        .route("/auth/token", post(auth::issue_token))
        // REST API endpoints
        .route(
            "/api/records",
            get(records::list_records).post(records::create_record),
        )
        .route("/api/records/export", get(records::export_records))
        .route("/api/summary", get(summary::get_summary))
        .route("/api/stats", get(summary::get_stats))
        .route("/api/catalog", get(summary::get_catalog))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Serve the router until `shutdown` resolves
pub async fn serve<F>(listener: TcpListener, state: Arc<AppState>, shutdown: F) -> io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "HTTP server listening");
    }

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown)
        .await
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
