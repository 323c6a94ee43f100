//! FilingForge Common Library
//!
//! Shared code for the ingestion and search services including:
//! - Domain models (raw documents, chunks, company table)
//! - Embedding provider abstraction with a degraded fallback
//! - Durable chunk store with metadata filtering
//! - Query entity extraction
//! - Error types and handling
//! - Configuration management
//! - Metrics and observability

pub mod config;
pub mod context;
pub mod embeddings;
pub mod errors;
pub mod metrics;
pub mod models;
pub mod store;

// Re-export commonly used types
pub use config::AppConfig;
pub use embeddings::{create_embedding_provider, EmbeddingProvider, FitState};
pub use errors::{AppError, Result};
pub use models::{Chunk, ChunkMetadata, DocumentIdentifier, RawDocument};
pub use store::{SearchRequest, SearchResult, Store};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default embedding dimension on both paths
pub const DEFAULT_EMBEDDING_DIMENSION: usize = 384;
