//! FilingForge search
//!
//! - `retrieval`: query-shape routing over the chunk store
//! - `analysis`: revenue and R&D extraction over retrieved passages
//! - `handlers`: HTTP surface (search, routed query, analysis, chunk lookup, stats, health)

pub mod analysis;
pub mod handlers;
pub mod retrieval;

use analysis::FilingAnalyzer;
use axum::{
    routing::{get, post},
    Router,
};
use filingforge_common::config::AppConfig;
use retrieval::RetrievalEngine;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub engine: Arc<RetrievalEngine>,
    pub analyzer: Arc<FilingAnalyzer>,
}

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let timeout = Duration::from_secs(state.config.server.request_timeout_secs);

    let api_routes = Router::new()
        // Search endpoints
        .route("/search", post(handlers::search::search))
        .route("/query", post(handlers::search::query))
        .route("/analysis", post(handlers::analysis::analyze))

        // Chunk endpoints
        .route("/chunks/{id}", get(handlers::chunks::get_chunk))
        .route("/chunks/{id}/similar", get(handlers::chunks::similar))

        // Collection endpoints
        .route("/stats", get(handlers::stats::stats));

    Router::new()
        // Health endpoints
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        .nest("/v1", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(timeout))
                .layer(cors),
        )
        .with_state(state)
}
