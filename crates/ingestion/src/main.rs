//! FilingForge Ingestion
//!
//! Loads RawDocument JSON files from a directory, validates and chunks each
//! filing, embeds the chunks and writes them to the collection snapshot.
//!
//! Usage: `ingestion [INPUT_DIR] [--reset]`. Without an argument the
//! configured `ingestion.input_dir` is used.

use anyhow::Context;
use filingforge_common::{config::AppConfig, create_embedding_provider, metrics, Store, VERSION};
use filingforge_ingestion::IngestionProcessor;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("failed to load configuration")?;
    init_tracing(&config);

    info!("Starting FilingForge Ingestion v{}", VERSION);
    metrics::register_metrics();

    let mut reset = false;
    let mut input_dir = config.ingestion.input_dir.clone();
    for arg in std::env::args().skip(1) {
        if arg == "--reset" {
            reset = true;
        } else {
            input_dir = PathBuf::from(arg);
        }
    }

    let embedder = create_embedding_provider(&config.embedding).await?;
    let store = Arc::new(Store::open(&config, embedder).await?);

    if reset {
        info!(collection = %store.collection(), "Resetting collection");
        store.delete_all().await?;
    }

    let processor = IngestionProcessor::new(&config, store.clone())?;
    let report = processor
        .process_directory(&input_dir)
        .await
        .with_context(|| format!("ingestion of {} failed", input_dir.display()))?;

    let stats = store.stats().await;
    info!(
        processed = report.processed,
        skipped = report.skipped,
        errored = report.errored,
        total_chunks = stats.total_chunks,
        degraded = stats.degraded,
        "Ingestion finished"
    );
    println!("{}", serde_json::to_string_pretty(&report)?);

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
