//! Pretrained sentence-embedding model over HTTP
//!
//! Talks to any OpenAI-compatible `/embeddings` endpoint (a local inference
//! server hosting all-MiniLM-L6-v2, a hosted API, ...). The native dimension
//! is learned from a sample request at construction time.

use super::{l2_normalize, EmbeddingProvider};
use crate::config::EmbeddingConfig;
use crate::errors::{AppError, Result};
use crate::metrics;
use async_trait::async_trait;
use backoff::ExponentialBackoffBuilder;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

const SAMPLE_TEXT: &str = "annual report revenue";

/// HTTP embedding client
pub struct HttpEmbedder {
    client: reqwest::Client,
    api_key: Option<String>,
    model: String,
    dimension: usize,
    base_url: String,
    batch_size: usize,
    max_retry: Duration,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    input: &'a [String],
    model: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

impl HttpEmbedder {
    /// Build the client and send one sample request to learn the dimension.
    ///
    /// Any failure here means the primary path cannot be constructed.
    pub async fn connect(config: &EmbeddingConfig) -> Result<Self> {
        let base_url = config
            .api_base
            .clone()
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| AppError::Configuration {
                message: "embedding.api_base is not set".to_string(),
            })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let mut embedder = Self {
            client,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            dimension: 0,
            base_url: base_url.trim_end_matches('/').to_string(),
            batch_size: config.batch_size.max(1),
            max_retry: Duration::from_secs(config.max_retry_secs),
        };

        let sample = embedder.request_with_retry(&[SAMPLE_TEXT.to_string()]).await?;
        let dimension = sample.first().map(Vec::len).unwrap_or(0);
        if dimension == 0 {
            return Err(AppError::EmbeddingError {
                message: "sample request returned an empty embedding".to_string(),
            });
        }
        embedder.dimension = dimension;

        Ok(embedder)
    }

    /// Make request with exponential backoff on transient failures
    async fn request_with_retry(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let policy = ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(100))
            .with_max_elapsed_time(Some(self.max_retry))
            .build();

        backoff::future::retry(policy, || async {
            self.make_request(texts).await.map_err(|e| match e {
                AppError::Validation { .. } => backoff::Error::permanent(e),
                other => {
                    tracing::warn!(error = %other, "Embedding request failed, retrying");
                    backoff::Error::transient(other)
                }
            })
        })
        .await
    }

    async fn make_request(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let url = format!("{}/embeddings", self.base_url);

        let mut request = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&EmbeddingRequest {
                input: texts,
                model: &self.model,
            });
        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {}", key));
        }

        let response = request.send().await.map_err(|e| AppError::EmbeddingError {
            message: format!("Request failed: {}", e),
        })?;

        let status = response.status();
        if status.is_client_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Validation {
                message: format!("embedding endpoint rejected request {}: {}", status, body),
                field: None,
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::EmbeddingError {
                message: format!("API error {}: {}", status, body),
            });
        }

        let result: EmbeddingResponse = response.json().await.map_err(|e| AppError::EmbeddingError {
            message: format!("Failed to parse response: {}", e),
        })?;

        if result.data.len() != texts.len() {
            return Err(AppError::EmbeddingError {
                message: format!("expected {} embeddings, got {}", texts.len(), result.data.len()),
            });
        }

        Ok(result
            .data
            .into_iter()
            .map(|d| {
                let mut v = d.embedding;
                l2_normalize(&mut v);
                v
            })
            .collect())
    }

    fn check_dimension(&self, vectors: &[Vec<f32>]) -> Result<()> {
        match vectors.iter().find(|v| v.len() != self.dimension) {
            Some(bad) => Err(AppError::DimensionMismatch {
                expected: self.dimension,
                actual: bad.len(),
            }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbedder {
    async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let embeddings = self.embed_many(&[text.to_string()]).await?;
        embeddings.into_iter().next().ok_or_else(|| AppError::EmbeddingError {
            message: "Empty response".to_string(),
        })
    }

    async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut all_embeddings = Vec::with_capacity(texts.len());

        for batch in texts.chunks(self.batch_size) {
            let start = Instant::now();
            let outcome = self.request_with_retry(batch).await;
            metrics::record_embedding(
                start.elapsed().as_secs_f64(),
                &self.model,
                batch.len(),
                outcome.is_ok(),
            );
            let embeddings = outcome?;
            self.check_dimension(&embeddings)?;
            all_embeddings.extend(embeddings);
        }

        Ok(all_embeddings)
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_requires_api_base() {
        let config = EmbeddingConfig::default();
        let err = HttpEmbedder::connect(&config).await.err().unwrap();
        assert!(matches!(err, AppError::Configuration { .. }));
    }

    #[tokio::test]
    async fn test_connect_fails_on_unreachable_endpoint() {
        let config = EmbeddingConfig {
            api_base: Some("http://127.0.0.1:9".to_string()),
            timeout_secs: 1,
            max_retry_secs: 0,
            ..EmbeddingConfig::default()
        };
        assert!(HttpEmbedder::connect(&config).await.is_err());
    }
}
