//! Configuration management for FilingForge services
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config.toml, config.yaml)
//! - Default values
//!
//! Every numeric threshold used by validation, chunking and ranking lives
//! here as a tunable default.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Word-window chunking
    #[serde(default)]
    pub chunking: ChunkingConfig,

    /// Content validation gates
    #[serde(default)]
    pub validation: ValidationConfig,

    /// Embedding provider configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Snapshot store configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Ranking weights and per-shape policies
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Batch ingestion configuration
    #[serde(default)]
    pub ingestion: IngestionConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChunkingConfig {
    /// Window size in words
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Words shared between consecutive windows
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// Windows rendering shorter than this (in characters) stop chunking
    #[serde(default = "default_min_chunk_chars")]
    pub min_chunk_chars: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ValidationConfig {
    /// Documents below this word count are rejected
    #[serde(default = "default_min_words")]
    pub min_words: usize,

    /// Co-occurring viewer indicators needed to flag a stub page
    #[serde(default = "default_stub_indicator_threshold")]
    pub stub_indicator_threshold: usize,

    /// Stub detection only applies below this word count
    #[serde(default = "default_stub_max_words")]
    pub stub_max_words: usize,

    /// Minimum fraction of expected doc-type sections present
    #[serde(default = "default_min_content_score")]
    pub min_content_score: f32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmbeddingConfig {
    /// Embedding provider: http, fallback
    #[serde(default = "default_embedding_provider")]
    pub provider: String,

    /// API key for the embedding endpoint
    pub api_key: Option<String>,

    /// API base URL (OpenAI-compatible `/embeddings`)
    pub api_base: Option<String>,

    /// Pretrained model to request
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Target dimension of the fallback projection
    #[serde(default = "default_embedding_dimension")]
    pub dimension: usize,

    /// Request timeout in seconds
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,

    /// Maximum elapsed retry time in seconds
    #[serde(default = "default_embedding_retry_secs")]
    pub max_retry_secs: u64,

    /// Batch size for embedding requests
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Vocabulary bound of the fallback vectorizer
    #[serde(default = "default_max_features")]
    pub max_features: usize,

    /// Seed of the fallback projection matrix
    #[serde(default = "default_projection_seed")]
    pub projection_seed: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    /// Directory holding one snapshot per collection
    #[serde(default = "default_store_dir")]
    pub data_dir: PathBuf,

    /// Collection name (snapshot file stem)
    #[serde(default = "default_collection")]
    pub collection: String,
}

/// Semantic / lexical blend and cutoff for one embedding path
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq)]
pub struct ScoreWeights {
    pub semantic: f32,
    pub lexical: f32,
    pub min_score: f32,
}

impl ScoreWeights {
    /// Fold a keyword boost on top of the blend.
    ///
    /// `sem·w_s·(1−b) + lex·(w_l·(1−b) + b)` keeps the weights summing to
    /// the same total, so combined scores stay within [0, 1].
    pub fn with_keyword_boost(self, boost: f32) -> Self {
        let b = boost.clamp(0.0, 1.0);
        Self {
            semantic: self.semantic * (1.0 - b),
            lexical: self.lexical * (1.0 - b) + b,
            min_score: self.min_score,
        }
    }

    /// Combine the two signals, clamped to [0, 1]
    pub fn combine(&self, semantic: f32, lexical: f32) -> f32 {
        (self.semantic * semantic + self.lexical * lexical).clamp(0.0, 1.0)
    }
}

/// Result budget and shaping for one query shape
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq)]
pub struct PolicyConfig {
    /// Final number of results
    pub budget: usize,

    /// Floor for per-entity sub-search limits
    #[serde(default)]
    pub min_per_entity: usize,

    /// Lexical boost folded into the path weights
    #[serde(default)]
    pub keyword_boost: Option<f32>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetrievalConfig {
    /// Weights used when the pretrained encoder is active
    #[serde(default = "default_primary_weights")]
    pub primary: ScoreWeights,

    /// Weights used on the degraded fallback path
    #[serde(default = "default_fallback_weights")]
    pub fallback: ScoreWeights,

    #[serde(default = "default_single_entity_policy")]
    pub single_entity: PolicyConfig,

    #[serde(default = "default_multi_entity_policy")]
    pub multi_entity: PolicyConfig,

    #[serde(default = "default_temporal_policy")]
    pub temporal: PolicyConfig,

    #[serde(default = "default_thematic_policy")]
    pub thematic: PolicyConfig,

    #[serde(default = "default_generic_policy")]
    pub generic: PolicyConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IngestionConfig {
    /// Directory of RawDocument JSON files
    #[serde(default = "default_input_dir")]
    pub input_dir: PathBuf,

    /// Chunks handed to the store per `add` call
    #[serde(default = "default_ingest_batch_size")]
    pub batch_size: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Metrics port (0 to disable)
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,

    /// Service name for logs
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_request_timeout() -> u64 { 30 }
fn default_chunk_size() -> usize { 1000 }
fn default_chunk_overlap() -> usize { 200 }
fn default_min_chunk_chars() -> usize { 50 }
fn default_min_words() -> usize { 100 }
fn default_stub_indicator_threshold() -> usize { 3 }
fn default_stub_max_words() -> usize { 1000 }
fn default_min_content_score() -> f32 { 0.3 }
fn default_embedding_provider() -> String { "http".to_string() }
fn default_embedding_model() -> String { "all-MiniLM-L6-v2".to_string() }
fn default_embedding_dimension() -> usize { 384 }
fn default_embedding_timeout() -> u64 { 30 }
fn default_embedding_retry_secs() -> u64 { 10 }
fn default_batch_size() -> usize { 64 }
fn default_max_features() -> usize { 5000 }
fn default_projection_seed() -> u64 { 42 }
fn default_store_dir() -> PathBuf { PathBuf::from("./data/store") }
fn default_collection() -> String { "sec_filings".to_string() }
fn default_input_dir() -> PathBuf { PathBuf::from("./data/processed") }
fn default_ingest_batch_size() -> usize { 500 }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }
fn default_metrics_port() -> u16 { 9090 }
fn default_service_name() -> String { "filingforge".to_string() }

fn default_primary_weights() -> ScoreWeights {
    ScoreWeights { semantic: 0.7, lexical: 0.3, min_score: 0.1 }
}

fn default_fallback_weights() -> ScoreWeights {
    ScoreWeights { semantic: 0.4, lexical: 0.6, min_score: 0.05 }
}

fn default_single_entity_policy() -> PolicyConfig {
    PolicyConfig { budget: 15, min_per_entity: 0, keyword_boost: None }
}

fn default_multi_entity_policy() -> PolicyConfig {
    PolicyConfig { budget: 20, min_per_entity: 5, keyword_boost: None }
}

fn default_temporal_policy() -> PolicyConfig {
    PolicyConfig { budget: 20, min_per_entity: 0, keyword_boost: None }
}

fn default_thematic_policy() -> PolicyConfig {
    PolicyConfig { budget: 25, min_per_entity: 0, keyword_boost: Some(0.4) }
}

fn default_generic_policy() -> PolicyConfig {
    PolicyConfig { budget: 15, min_per_entity: 0, keyword_boost: Some(0.3) }
}

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))
            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            // Load local overrides
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables with APP__ prefix
            // e.g., APP__CHUNKING__CHUNK_SIZE=500
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let loaded: Self = config.try_deserialize()?;
        loaded.validate()?;
        Ok(loaded)
    }

    /// Load from a specific TOML file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let loaded: Self = config.try_deserialize()?;
        loaded.validate()?;
        Ok(loaded)
    }

    /// Reject settings that would break scoring invariants
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, w) in [("primary", &self.retrieval.primary), ("fallback", &self.retrieval.fallback)] {
            if w.semantic < 0.0 || w.lexical < 0.0 || (w.semantic + w.lexical - 1.0).abs() > 1e-3 {
                return Err(ConfigError::Message(format!(
                    "retrieval.{name} weights must be non-negative and sum to 1.0"
                )));
            }
        }
        if self.embedding.dimension == 0 {
            return Err(ConfigError::Message("embedding.dimension must be positive".into()));
        }
        Ok(())
    }

    /// Snapshot file path of the configured collection
    pub fn snapshot_path(&self) -> PathBuf {
        self.store.data_dir.join(format!("{}.json", self.store.collection))
    }

    /// Advisory lock held by the one store instance writing this collection
    pub fn lock_path(&self) -> PathBuf {
        self.store.data_dir.join(format!("{}.lock", self.store.collection))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            min_chunk_chars: default_min_chunk_chars(),
        }
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            min_words: default_min_words(),
            stub_indicator_threshold: default_stub_indicator_threshold(),
            stub_max_words: default_stub_max_words(),
            min_content_score: default_min_content_score(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            api_key: None,
            api_base: None,
            model: default_embedding_model(),
            dimension: default_embedding_dimension(),
            timeout_secs: default_embedding_timeout(),
            max_retry_secs: default_embedding_retry_secs(),
            batch_size: default_batch_size(),
            max_features: default_max_features(),
            projection_seed: default_projection_seed(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: default_store_dir(),
            collection: default_collection(),
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            primary: default_primary_weights(),
            fallback: default_fallback_weights(),
            single_entity: default_single_entity_policy(),
            multi_entity: default_multi_entity_policy(),
            temporal: default_temporal_policy(),
            thematic: default_thematic_policy(),
            generic: default_generic_policy(),
        }
    }
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            input_dir: default_input_dir(),
            batch_size: default_ingest_batch_size(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
            metrics_port: default_metrics_port(),
            service_name: default_service_name(),
        }
    }
}
