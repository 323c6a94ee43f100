//! Embedding provider abstraction
//!
//! Two interchangeable implementations behind one trait:
//! - `HttpEmbedder`: a pretrained sentence-embedding model served over an
//!   OpenAI-compatible `/embeddings` endpoint
//! - `FallbackEmbedder`: corpus-fitted 1-2 gram TF-IDF composed with a seeded
//!   random projection, used when the primary cannot be constructed
//!
//! Every vector handed out is L2-normalized.

mod fallback;
mod http;

pub use fallback::{preprocess, FallbackEmbedder};
pub use http::HttpEmbedder;

use crate::config::EmbeddingConfig;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Lifecycle of a corpus-fitted model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitState {
    Unfit,
    Fitting,
    Fitted,
}

/// Trait for embedding generation
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate embedding for a single text
    async fn embed_one(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts (batch)
    async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Get the model name
    fn model_name(&self) -> &str;

    /// Get the embedding dimension
    fn dimension(&self) -> usize;

    /// True when running on the degraded fallback path
    fn is_degraded(&self) -> bool {
        false
    }

    /// Fit state; pretrained models are always fitted
    fn fit_state(&self) -> FitState {
        FitState::Fitted
    }

    /// Rebuild corpus-dependent state. No-op for pretrained models.
    async fn refit(&self, _corpus: &[String]) -> Result<()> {
        Ok(())
    }
}

/// Scale a vector to unit length in place. Zero vectors stay zero.
pub fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for v in vector.iter_mut() {
            *v /= norm;
        }
    }
}

/// Cosine similarity; 0.0 for mismatched lengths or zero vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a <= f32::EPSILON || norm_b <= f32::EPSILON {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Create an embedding provider based on configuration.
///
/// `http` tries the pretrained endpoint first and degrades to the fallback;
/// `fallback` skips the endpoint. Fails only when neither path can be built.
pub async fn create_embedding_provider(config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "http" => match HttpEmbedder::connect(config).await {
            Ok(embedder) => {
                tracing::info!(
                    model = %embedder.model_name(),
                    dimension = embedder.dimension(),
                    "Pretrained embedding model available"
                );
                Ok(Arc::new(embedder))
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "Pretrained embedding model unavailable, running degraded on fallback embeddings"
                );
                build_fallback(config)
            }
        },
        "fallback" => build_fallback(config),
        other => {
            tracing::warn!(provider = other, "Unknown embedding provider, using fallback");
            build_fallback(config)
        }
    }
}

fn build_fallback(config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    let embedder = FallbackEmbedder::new(config.dimension, config.max_features, config.projection_seed)
        .map_err(|e| AppError::EmbeddingUnavailable {
            message: e.to_string(),
        })?;
    Ok(Arc::new(embedder))
}
