//! FilingForge Search Service
//!
//! HTTP retrieval service over one chunk collection:
//! - Filtered hybrid search (semantic + lexical)
//! - Query-shape routing (single / multi entity, temporal, thematic, generic)
//! - Revenue and R&D analysis over routed results
//! - Chunk lookup and nearest neighbours
//! - Prometheus metrics exporter

use anyhow::Context;
use filingforge_common::{
    config::AppConfig,
    create_embedding_provider,
    metrics::{self, EMBEDDING_BUCKETS, LATENCY_BUCKETS},
    Store, VERSION,
};
use filingforge_search::{analysis::FilingAnalyzer, create_router, retrieval::RetrievalEngine, AppState};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("failed to load configuration")?;
    init_tracing(&config);

    info!("Starting FilingForge Search Service v{}", VERSION);

    // Initialize metrics
    if config.observability.metrics_port != 0 {
        install_exporter(config.observability.metrics_port)?;
        info!(port = config.observability.metrics_port, "Prometheus exporter listening");
    }
    metrics::register_metrics();

    let embedder = create_embedding_provider(&config.embedding).await?;
    let store = Arc::new(Store::open(&config, embedder).await?);
    if store.is_degraded() {
        warn!("Serving on fallback embeddings; semantic ranking is approximate");
    }
    info!(
        collection = %store.collection(),
        records = store.len().await,
        "Collection ready"
    );

    let engine = Arc::new(RetrievalEngine::new(store, config.retrieval.clone())?);
    let analyzer = Arc::new(FilingAnalyzer::new()?);
    let config = Arc::new(config);
    let state = AppState {
        config: config.clone(),
        engine,
        analyzer,
    };

    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", config.server.host, config.server.port))?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.observability.log_level));

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    if config.observability.json_logging {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn install_exporter(port: u16) -> anyhow::Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .set_buckets_for_metric(Matcher::Suffix("search_duration_seconds".to_string()), LATENCY_BUCKETS)?
        .set_buckets_for_metric(Matcher::Suffix("ingestion_duration_seconds".to_string()), LATENCY_BUCKETS)?
        .set_buckets_for_metric(Matcher::Suffix("embedding_duration_seconds".to_string()), EMBEDDING_BUCKETS)?
        .install()
        .context("failed to install Prometheus exporter")
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}
