//! Corpus-fitted fallback embeddings
//!
//! 1-2 gram term frequencies weighted by smoothed IDF over a bounded
//! vocabulary, projected to the target dimension by a seeded Gaussian matrix.
//! The model is fitted once, on the first batch that yields any token, and is
//! transform-only afterwards until `refit` is called.

use super::{l2_normalize, EmbeddingProvider, FitState};
use crate::errors::{AppError, Result};
use crate::metrics;
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};
use std::time::Instant;
use tokio::sync::Mutex;

const MODEL_NAME: &str = "tfidf-projection";

/// Short tokens that carry meaning in filings
const ALLOWED_SHORT_TOKENS: &[&str] = &["ai", "r&d", "sec", "m&a", "q1", "q2", "q3", "q4"];

/// Lowercase, strip punctuation except `$ % &`, drop 1-char tokens.
pub fn preprocess(text: &str) -> Vec<String> {
    let cleaned: String = text
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c.is_whitespace() || matches!(c, '$' | '%' | '&') {
                c
            } else {
                ' '
            }
        })
        .collect::<String>()
        .to_lowercase();

    cleaned
        .split_whitespace()
        .filter(|token| token.chars().count() >= 2 || ALLOWED_SHORT_TOKENS.contains(token))
        .map(str::to_string)
        .collect()
}

/// Unigrams followed by space-joined bigrams
fn ngrams(tokens: &[String]) -> Vec<String> {
    let mut terms = tokens.to_vec();
    terms.extend(tokens.windows(2).map(|pair| format!("{} {}", pair[0], pair[1])));
    terms
}

struct Model {
    vocabulary: HashMap<String, usize>,
    idf: Vec<f32>,
    /// Row-major `vocabulary.len() × dimension`
    projection: Vec<f32>,
}

struct Inner {
    state: FitState,
    model: Option<Arc<Model>>,
}

/// Degraded-path embedder
pub struct FallbackEmbedder {
    dimension: usize,
    max_features: usize,
    seed: u64,
    inner: RwLock<Inner>,
    fit_guard: Mutex<()>,
}

impl FallbackEmbedder {
    pub fn new(dimension: usize, max_features: usize, seed: u64) -> Result<Self> {
        if dimension == 0 {
            return Err(AppError::Configuration {
                message: "fallback embedding dimension must be positive".to_string(),
            });
        }
        if max_features == 0 {
            return Err(AppError::Configuration {
                message: "fallback vocabulary must allow at least one feature".to_string(),
            });
        }

        Ok(Self {
            dimension,
            max_features,
            seed,
            inner: RwLock::new(Inner {
                state: FitState::Unfit,
                model: None,
            }),
            fit_guard: Mutex::new(()),
        })
    }

    /// Number of terms in the fitted vocabulary
    pub fn vocabulary_size(&self) -> usize {
        self.current_model().map(|m| m.vocabulary.len()).unwrap_or(0)
    }

    fn current_model(&self) -> Option<Arc<Model>> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner.model.clone()
    }

    fn set(&self, state: FitState, model: Option<Arc<Model>>) {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        inner.state = state;
        inner.model = model;
    }

    fn set_state(&self, state: FitState) {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        inner.state = state;
    }

    /// Build a model from tokenized documents; `None` when no document has a token
    fn fit(&self, documents: &[Vec<String>]) -> Option<Model> {
        if documents.iter().all(Vec::is_empty) {
            return None;
        }

        let mut document_frequency: HashMap<String, usize> = HashMap::new();
        for tokens in documents {
            let unique: HashSet<String> = ngrams(tokens).into_iter().collect();
            for term in unique {
                *document_frequency.entry(term).or_insert(0) += 1;
            }
        }

        let mut ranked: Vec<(String, usize)> = document_frequency.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(self.max_features);

        let n_docs = documents.len() as f32;
        let mut vocabulary = HashMap::with_capacity(ranked.len());
        let mut idf = Vec::with_capacity(ranked.len());
        for (position, (term, df)) in ranked.into_iter().enumerate() {
            idf.push(((1.0 + n_docs) / (1.0 + df as f32)).ln() + 1.0);
            vocabulary.insert(term, position);
        }

        let projection = gaussian_projection(vocabulary.len(), self.dimension, self.seed);

        tracing::info!(
            documents = documents.len(),
            vocabulary = vocabulary.len(),
            dimension = self.dimension,
            "Fitted fallback embedding model"
        );

        Some(Model {
            vocabulary,
            idf,
            projection,
        })
    }

    fn transform(&self, model: &Model, tokens: &[String]) -> Vec<f32> {
        let mut weights: HashMap<usize, f32> = HashMap::new();
        for term in ngrams(tokens) {
            if let Some(&position) = model.vocabulary.get(&term) {
                *weights.entry(position).or_insert(0.0) += 1.0;
            }
        }

        let mut output = vec![0.0f32; self.dimension];
        if weights.is_empty() {
            return output;
        }

        let norm = weights
            .iter()
            .map(|(position, tf)| (tf * model.idf[*position]).powi(2))
            .sum::<f32>()
            .sqrt();

        // Sorted so float accumulation order is stable across runs
        let mut entries: Vec<(usize, f32)> = weights.into_iter().collect();
        entries.sort_by_key(|(position, _)| *position);

        for (position, tf) in entries {
            let value = tf * model.idf[position] / norm;
            let row = &model.projection[position * self.dimension..(position + 1) * self.dimension];
            for (out, p) in output.iter_mut().zip(row) {
                *out += value * p;
            }
        }

        l2_normalize(&mut output);
        output
    }

    fn transform_all(&self, model: &Model, documents: &[Vec<String>]) -> Vec<Vec<f32>> {
        documents.iter().map(|tokens| self.transform(model, tokens)).collect()
    }

    /// Transform with the current model, fitting on this batch when there is none
    async fn embed_documents(&self, texts: &[String]) -> Vec<Vec<f32>> {
        let documents: Vec<Vec<String>> = texts.iter().map(|t| preprocess(t)).collect();

        if let Some(model) = self.current_model() {
            return self.transform_all(&model, &documents);
        }

        let _guard = self.fit_guard.lock().await;

        // Another caller may have fitted while we waited
        if let Some(model) = self.current_model() {
            return self.transform_all(&model, &documents);
        }

        self.set_state(FitState::Fitting);
        match self.fit(&documents) {
            Some(model) => {
                let model = Arc::new(model);
                let vectors = self.transform_all(&model, &documents);
                self.set(FitState::Fitted, Some(model));
                vectors
            }
            None => {
                self.set(FitState::Unfit, None);
                vec![vec![0.0; self.dimension]; texts.len()]
            }
        }
    }
}

/// Seeded `N(0, 1/dimension)` matrix, generated row by row in vocabulary order
fn gaussian_projection(rows: usize, dimension: usize, seed: u64) -> Vec<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    let scale = 1.0 / (dimension as f64).sqrt();
    let mut matrix = Vec::with_capacity(rows * dimension);
    while matrix.len() < rows * dimension {
        // Box-Muller
        let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
        let u2: f64 = rng.gen();
        let radius = (-2.0 * u1.ln()).sqrt();
        let angle = 2.0 * std::f64::consts::PI * u2;
        matrix.push((radius * angle.cos() * scale) as f32);
        if matrix.len() < rows * dimension {
            matrix.push((radius * angle.sin() * scale) as f32);
        }
    }
    matrix
}

#[async_trait]
impl EmbeddingProvider for FallbackEmbedder {
    /// Zero vector until a model has been fitted
    async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let start = Instant::now();
        let vector = match self.current_model() {
            Some(model) => self.transform(&model, &preprocess(text)),
            None => vec![0.0; self.dimension],
        };
        metrics::record_embedding(start.elapsed().as_secs_f64(), MODEL_NAME, 1, true);
        Ok(vector)
    }

    async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let start = Instant::now();
        let vectors = self.embed_documents(texts).await;
        metrics::record_embedding(start.elapsed().as_secs_f64(), MODEL_NAME, texts.len(), true);
        Ok(vectors)
    }

    fn model_name(&self) -> &str {
        MODEL_NAME
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn is_degraded(&self) -> bool {
        true
    }

    fn fit_state(&self) -> FitState {
        self.inner.read().unwrap_or_else(|e| e.into_inner()).state
    }

    async fn refit(&self, corpus: &[String]) -> Result<()> {
        let _guard = self.fit_guard.lock().await;
        self.set_state(FitState::Fitting);

        let documents: Vec<Vec<String>> = corpus.iter().map(|t| preprocess(t)).collect();
        match self.fit(&documents) {
            Some(model) => self.set(FitState::Fitted, Some(Arc::new(model))),
            None => self.set(FitState::Unfit, None),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::cosine_similarity;

    fn corpus() -> Vec<String> {
        vec![
            "Apple reported revenue of $383.3 billion in fiscal 2023".to_string(),
            "Research and development spending increased to support innovation".to_string(),
            "Risk factors include supply chain disruption and competition".to_string(),
        ]
    }

    #[test]
    fn test_preprocess() {
        let tokens = preprocess("R&D grew 14%, AI-driven; Q1 revenue: $5.2B (a)");
        assert_eq!(tokens, vec!["r&d", "grew", "14%", "ai", "driven", "q1", "revenue", "$5", "2b"]);
    }

    #[test]
    fn test_new_rejects_zero_sizes() {
        assert!(FallbackEmbedder::new(0, 5000, 42).is_err());
        assert!(FallbackEmbedder::new(384, 0, 42).is_err());
    }

    #[tokio::test]
    async fn test_embed_one_before_fit_is_zero() {
        let embedder = FallbackEmbedder::new(16, 100, 42).unwrap();
        let v = embedder.embed_one("revenue growth").await.unwrap();
        assert_eq!(v.len(), 16);
        assert!(v.iter().all(|x| *x == 0.0));
        assert_eq!(embedder.fit_state(), FitState::Unfit);
    }

    #[tokio::test]
    async fn test_trivial_batch_does_not_fit() {
        let embedder = FallbackEmbedder::new(16, 100, 42).unwrap();
        let vectors = embedder.embed_many(&["!!".to_string(), "".to_string()]).await.unwrap();
        assert_eq!(vectors.len(), 2);
        assert_eq!(embedder.fit_state(), FitState::Unfit);
    }

    #[tokio::test]
    async fn test_fit_on_first_batch_and_normalized() {
        let embedder = FallbackEmbedder::new(32, 5000, 42).unwrap();
        let vectors = embedder.embed_many(&corpus()).await.unwrap();
        assert_eq!(embedder.fit_state(), FitState::Fitted);
        assert!(embedder.vocabulary_size() > 0);

        for v in &vectors {
            let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
            assert!((norm - 1.0).abs() < 1e-4);
        }

        // Later batches transform only
        let size = embedder.vocabulary_size();
        embedder.embed_many(&["entirely new words here".to_string()]).await.unwrap();
        assert_eq!(embedder.vocabulary_size(), size);
    }

    #[tokio::test]
    async fn test_deterministic_across_instances() {
        let a = FallbackEmbedder::new(32, 5000, 7).unwrap();
        let b = FallbackEmbedder::new(32, 5000, 7).unwrap();
        let va = a.embed_many(&corpus()).await.unwrap();
        let vb = b.embed_many(&corpus()).await.unwrap();
        assert_eq!(va, vb);
    }

    #[tokio::test]
    async fn test_query_closest_to_matching_document() {
        let embedder = FallbackEmbedder::new(384, 5000, 42).unwrap();
        let vectors = embedder.embed_many(&corpus()).await.unwrap();
        let query = embedder.embed_one("apple revenue").await.unwrap();

        let scores: Vec<f32> = vectors.iter().map(|v| cosine_similarity(&query, v)).collect();
        assert!(scores[0] > scores[1]);
        assert!(scores[0] > scores[2]);
    }

    #[tokio::test]
    async fn test_vocabulary_bounded() {
        let embedder = FallbackEmbedder::new(8, 3, 42).unwrap();
        embedder.embed_many(&corpus()).await.unwrap();
        assert_eq!(embedder.vocabulary_size(), 3);
    }

    #[tokio::test]
    async fn test_refit_replaces_model() {
        let embedder = FallbackEmbedder::new(16, 5000, 42).unwrap();
        embedder.embed_many(&corpus()).await.unwrap();
        embedder.refit(&["quarterly dividends".to_string()]).await.unwrap();
        assert_eq!(embedder.fit_state(), FitState::Fitted);
        // quarterly, dividends, "quarterly dividends"
        assert_eq!(embedder.vocabulary_size(), 3);

        embedder.refit(&[]).await.unwrap();
        assert_eq!(embedder.fit_state(), FitState::Unfit);
    }

    #[test]
    fn test_embedding_calls_are_metered() {
        use metrics_util::debugging::{DebugValue, DebuggingRecorder};

        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();
        let embedder = FallbackEmbedder::new(16, 5000, 42).unwrap();

        ::metrics::with_local_recorder(&recorder, || {
            tokio_test::block_on(async {
                embedder.embed_many(&corpus()).await.unwrap();
                embedder.embed_one("apple revenue").await.unwrap();
            })
        });

        let batches: u64 = snapshotter
            .snapshot()
            .into_vec()
            .into_iter()
            .filter(|(key, ..)| key.key().name() == "filingforge_embedding_batches_total")
            .map(|(.., value)| match value {
                DebugValue::Counter(n) => n,
                _ => 0,
            })
            .sum();
        assert_eq!(batches, 2);
    }
}
