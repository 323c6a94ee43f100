//! Durable chunk store with metadata filtering and hybrid scoring
//!
//! An in-memory, brute-force collection of chunk + vector records backed by a
//! single JSON snapshot per collection.
//!
//! - `add` embeds, appends, indexes and persists (single writer)
//! - `search` filters through the metadata index, then blends cosine
//!   similarity with lexical overlap
//! - Records are append-only; `delete_all` is the only removal
//!
//! One `Store` per collection at a time: writers are serialized inside the
//! process, and an advisory lock file keeps a second process (or a second
//! instance) from opening the same collection and overwriting its snapshot.

mod index;
mod scoring;
mod snapshot;

pub use index::{FilterValue, Filters, MetadataIndex};
pub use scoring::{lexical_score, query_tokens};

use crate::config::{AppConfig, ScoreWeights};
use crate::embeddings::{cosine_similarity, EmbeddingProvider, FitState};
use crate::errors::{AppError, Result};
use crate::metrics;
use crate::models::{company, Chunk, ChunkMetadata};
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Mutex, RwLock};
use tracing::instrument;

/// One stored chunk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreRecord {
    pub chunk: Chunk,
    pub vector: Option<Vec<f32>>,
    pub inserted_at: DateTime<Utc>,
}

/// Hybrid search parameters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    pub limit: usize,
    #[serde(default)]
    pub filters: Filters,
    /// Extra lexical weight folded into the path weights
    #[serde(default)]
    pub keyword_boost: Option<f32>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>, limit: usize) -> Self {
        Self {
            query: query.into(),
            limit,
            ..Self::default()
        }
    }

    pub fn with_filter(mut self, key: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.filters.insert(key.into(), value.into());
        self
    }

    pub fn with_keyword_boost(mut self, boost: f32) -> Self {
        self.keyword_boost = Some(boost);
        self
    }
}

/// Ranked hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub chunk_id: String,
    pub content: String,
    pub metadata: ChunkMetadata,
    /// Combined score in [0, 1]
    pub similarity_score: f32,
    pub semantic_score: f32,
    pub lexical_score: f32,
}

impl SearchResult {
    fn from_chunk(chunk: &Chunk, similarity_score: f32, semantic_score: f32, lexical_score: f32) -> Self {
        Self {
            chunk_id: chunk.chunk_id.clone(),
            content: chunk.content.clone(),
            metadata: chunk.metadata.clone(),
            similarity_score,
            semantic_score,
            lexical_score,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DateRange {
    pub earliest: Option<String>,
    pub latest: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WordStatistics {
    pub total_words: usize,
    pub average_words_per_chunk: f64,
    pub min_words: usize,
    pub max_words: usize,
}

/// Collection summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionStats {
    pub collection: String,
    pub total_chunks: usize,
    pub unique_tickers: usize,
    pub tickers: Vec<String>,
    pub doc_types: Vec<String>,
    pub sectors: Vec<String>,
    pub date_range: DateRange,
    pub word_statistics: WordStatistics,
    pub embeddings_available: usize,
    pub embedding_model: String,
    pub dimension: usize,
    pub degraded: bool,
    pub fit_state: FitState,
}

#[derive(Default)]
struct StoreState {
    records: Vec<StoreRecord>,
    positions: HashMap<String, usize>,
    index: MetadataIndex,
}

impl StoreState {
    fn from_records(records: Vec<StoreRecord>) -> Self {
        let positions = records
            .iter()
            .enumerate()
            .map(|(position, record)| (record.chunk.chunk_id.clone(), position))
            .collect();
        let index = MetadataIndex::build(records.iter().map(|r| &r.chunk));
        Self {
            records,
            positions,
            index,
        }
    }

    fn truncate(&mut self, len: usize) {
        for record in self.records.drain(len..) {
            self.positions.remove(&record.chunk.chunk_id);
        }
        self.index = MetadataIndex::build(self.records.iter().map(|r| &r.chunk));
    }
}

/// Chunk store bound to one collection and one embedding provider
pub struct Store {
    collection: String,
    path: PathBuf,
    embedder: Arc<dyn EmbeddingProvider>,
    primary_weights: ScoreWeights,
    fallback_weights: ScoreWeights,
    state: RwLock<StoreState>,
    writer: Mutex<()>,
    /// Released on drop
    _lock: File,
}

/// Take the collection's exclusive lock without blocking
fn lock_collection(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| AppError::persistence(parent, e))?;
    }

    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .map_err(|e| AppError::persistence(path, e))?;

    match file.try_lock_exclusive() {
        Ok(()) => Ok(file),
        Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Err(AppError::StoreLocked {
            path: path.display().to_string(),
        }),
        Err(e) => Err(AppError::persistence(path, e)),
    }
}

impl Store {
    /// Open the configured collection, loading its snapshot when one exists.
    ///
    /// Unreadable snapshots are logged and the store starts empty. Records are
    /// re-embedded whenever the provider cannot reproduce the stored vectors:
    /// always on the fallback path, and on the primary path when the snapshot
    /// was written by another model.
    ///
    /// A collection has a single writer. The returned store holds an exclusive
    /// lock on `<data_dir>/<collection>.lock` until it is dropped; opening the
    /// same collection again, from this process or another, fails with
    /// [`AppError::StoreLocked`] instead of racing on the snapshot.
    pub async fn open(config: &AppConfig, embedder: Arc<dyn EmbeddingProvider>) -> Result<Self> {
        let lock = lock_collection(&config.lock_path())?;
        let path = config.snapshot_path();
        let store = Self {
            collection: config.store.collection.clone(),
            path,
            embedder,
            primary_weights: config.retrieval.primary,
            fallback_weights: config.retrieval.fallback,
            state: RwLock::new(StoreState::default()),
            writer: Mutex::new(()),
            _lock: lock,
        };

        if store.embedder.is_degraded() {
            tracing::warn!(
                collection = %store.collection,
                model = %store.embedder.model_name(),
                "Store running on degraded fallback embeddings"
            );
        }

        if let Some(records) = store.load_snapshot().await {
            let records = store.reconcile_vectors(records).await?;
            tracing::info!(
                collection = %store.collection,
                records = records.len(),
                "Loaded collection snapshot"
            );
            *store.state.write().await = StoreState::from_records(records);
        }

        Ok(store)
    }

    /// Read and validate the snapshot; `None` means start empty
    async fn load_snapshot(&self) -> Option<Vec<StoreRecord>> {
        let snapshot = match snapshot::read(&self.path).await {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => return None,
            Err(e) => {
                tracing::error!(error = %e, "Failed to read snapshot, starting empty");
                return None;
            }
        };

        if snapshot.dimension != self.embedder.dimension() {
            tracing::error!(
                path = %self.path.display(),
                expected = self.embedder.dimension(),
                actual = snapshot.dimension,
                "Snapshot dimension mismatch, starting empty"
            );
            return None;
        }

        match snapshot.verify() {
            Ok(true) => {}
            Ok(false) => {
                tracing::error!(path = %self.path.display(), "Snapshot checksum mismatch, starting empty");
                return None;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to verify snapshot, starting empty");
                return None;
            }
        }

        if snapshot.collection != self.collection {
            tracing::warn!(
                expected = %self.collection,
                actual = %snapshot.collection,
                "Snapshot belongs to a differently named collection"
            );
        }

        let rebuilt = MetadataIndex::build(snapshot.records.iter().map(|r| &r.chunk));
        if rebuilt != snapshot.metadata_index {
            tracing::warn!(
                path = %self.path.display(),
                "Persisted metadata index drifted from records, using rebuilt index"
            );
        }

        tracing::debug!(
            saved_at = %snapshot.saved_at,
            model = %snapshot.embedding_model,
            "Snapshot validated"
        );

        if !self.embedder.is_degraded() && snapshot.embedding_model != self.embedder.model_name() {
            tracing::warn!(
                stored = %snapshot.embedding_model,
                active = %self.embedder.model_name(),
                "Snapshot written by another embedding model, re-embedding"
            );
            let mut records = snapshot.records;
            for record in &mut records {
                record.vector = None;
            }
            return Some(records);
        }

        Some(snapshot.records)
    }

    /// Refit the fallback over the reloaded corpus and re-embed where needed
    async fn reconcile_vectors(&self, mut records: Vec<StoreRecord>) -> Result<Vec<StoreRecord>> {
        let needs_embedding = self.embedder.is_degraded() || records.iter().any(|r| r.vector.is_none());
        if records.is_empty() || !needs_embedding {
            return Ok(records);
        }

        let texts: Vec<String> = records.iter().map(|r| r.chunk.content.clone()).collect();
        if self.embedder.is_degraded() {
            self.embedder.refit(&texts).await?;
        }

        let vectors = self.embedder.embed_many(&texts).await?;
        self.check_vectors(&vectors, texts.len())?;
        for (record, vector) in records.iter_mut().zip(vectors) {
            record.vector = Some(vector);
        }

        tracing::info!(
            records = records.len(),
            fit_state = ?self.embedder.fit_state(),
            "Re-embedded reloaded records"
        );
        Ok(records)
    }

    fn check_vectors(&self, vectors: &[Vec<f32>], expected_len: usize) -> Result<()> {
        if vectors.len() != expected_len {
            return Err(AppError::EmbeddingError {
                message: format!("expected {} vectors, got {}", expected_len, vectors.len()),
            });
        }
        let dimension = self.embedder.dimension();
        match vectors.iter().find(|v| v.len() != dimension) {
            Some(bad) => Err(AppError::DimensionMismatch {
                expected: dimension,
                actual: bad.len(),
            }),
            None => Ok(()),
        }
    }

    fn weights(&self) -> ScoreWeights {
        if self.embedder.is_degraded() {
            self.fallback_weights
        } else {
            self.primary_weights
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn snapshot_path(&self) -> &std::path::Path {
        &self.path
    }

    pub fn embedder(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedder
    }

    pub fn is_degraded(&self) -> bool {
        self.embedder.is_degraded()
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Embed and append chunks whose ids are not yet stored, then persist.
    ///
    /// Returns the number of records added. If the snapshot write fails the
    /// batch is rolled back and the error surfaces here.
    #[instrument(skip(self, chunks), fields(collection = %self.collection, batch = chunks.len()))]
    pub async fn add(&self, chunks: Vec<Chunk>) -> Result<usize> {
        if chunks.is_empty() {
            return Ok(0);
        }

        let _writer = self.writer.lock().await;

        let fresh: Vec<Chunk> = {
            let state = self.state.read().await;
            let mut seen = HashSet::new();
            chunks
                .into_iter()
                .filter(|c| !state.positions.contains_key(&c.chunk_id) && seen.insert(c.chunk_id.clone()))
                .collect()
        };

        if fresh.is_empty() {
            tracing::debug!("All chunks already stored");
            return Ok(0);
        }

        let texts: Vec<String> = fresh.iter().map(|c| c.content.clone()).collect();
        let fitted_before = self.embedder.fit_state() == FitState::Fitted;
        let vectors = self.embedder.embed_many(&texts).await?;
        self.check_vectors(&vectors, texts.len())?;

        let added = fresh.len();
        let now = Utc::now();
        let previous_len = {
            let mut state = self.state.write().await;
            let previous_len = state.records.len();
            for (chunk, vector) in fresh.into_iter().zip(vectors) {
                let position = state.records.len();
                state.index.insert(position, &chunk.metadata.fields());
                state.positions.insert(chunk.chunk_id.clone(), position);
                state.records.push(StoreRecord {
                    chunk,
                    vector: Some(vector),
                    inserted_at: now,
                });
            }
            previous_len
        };

        if let Err(e) = self.persist().await {
            self.state.write().await.truncate(previous_len);
            // A fit taken on the discarded batch must not outlive it
            if self.embedder.is_degraded() && !fitted_before {
                if let Err(refit_error) = self.refit_to_records().await {
                    tracing::error!(error = %refit_error, "Failed to restore fallback model after rollback");
                }
            }
            return Err(e);
        }

        tracing::info!(added, "Added chunks to store");
        Ok(added)
    }

    /// Refit the fallback over the stored records and re-embed them. Callers
    /// hold the writer lock.
    async fn refit_to_records(&self) -> Result<()> {
        let texts: Vec<String> = {
            let state = self.state.read().await;
            state.records.iter().map(|r| r.chunk.content.clone()).collect()
        };

        self.embedder.refit(&texts).await?;
        if texts.is_empty() {
            return Ok(());
        }

        let vectors = self.embedder.embed_many(&texts).await?;
        self.check_vectors(&vectors, texts.len())?;
        let mut state = self.state.write().await;
        for (record, vector) in state.records.iter_mut().zip(vectors) {
            record.vector = Some(vector);
        }
        tracing::info!(records = texts.len(), fit_state = ?self.embedder.fit_state(), "Fallback model restored");
        Ok(())
    }

    /// Write the current state to the snapshot file
    async fn persist(&self) -> Result<()> {
        let (bytes, records) = {
            let state = self.state.read().await;
            let view = snapshot::SnapshotView {
                collection: &self.collection,
                embedding_model: self.embedder.model_name(),
                dimension: self.embedder.dimension(),
                saved_at: Utc::now(),
                checksum: snapshot::checksum(&state.records)?,
                records: &state.records,
                metadata_index: &state.index,
            };
            (serde_json::to_vec(&view)?, state.records.len())
        };

        let result = snapshot::write(&self.path, &bytes).await;
        metrics::record_snapshot(result.is_ok(), records);
        if let Err(e) = &result {
            tracing::error!(error = %e, "Snapshot write failed");
        }
        result
    }

    /// Hybrid search: metadata filters, then blended semantic + lexical score
    #[instrument(skip(self, request), fields(limit = request.limit, filters = request.filters.len()))]
    pub async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchResult>> {
        let start = Instant::now();

        if request.limit == 0 || self.is_empty().await {
            return Ok(Vec::new());
        }

        let query_vector = self.embedder.embed_one(&request.query).await?;
        let tokens = query_tokens(&request.query);
        let weights = match request.keyword_boost {
            Some(boost) => self.weights().with_keyword_boost(boost),
            None => self.weights(),
        };

        let state = self.state.read().await;
        let candidates: Vec<usize> = if request.filters.is_empty() {
            (0..state.records.len()).collect()
        } else {
            state.index.candidates(&request.filters)
        };

        let mut scored: Vec<SearchResult> = candidates
            .into_iter()
            .filter_map(|position| {
                let record = &state.records[position];
                let semantic = record
                    .vector
                    .as_deref()
                    .map(|v| cosine_similarity(&query_vector, v).clamp(0.0, 1.0))
                    .unwrap_or(0.0);
                let lexical = lexical_score(&tokens, &record.chunk.content);
                let combined = weights.combine(semantic, lexical);
                (combined >= weights.min_score)
                    .then(|| SearchResult::from_chunk(&record.chunk, combined, semantic, lexical))
            })
            .collect();
        drop(state);

        // Stable: ties keep insertion order
        scored.sort_by(|a, b| {
            b.similarity_score
                .partial_cmp(&a.similarity_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(request.limit);

        metrics::record_search(start.elapsed().as_secs_f64(), "store", scored.len());
        tracing::debug!(results = scored.len(), "Store search complete");
        Ok(scored)
    }

    /// Metadata-only lookup in insertion order; every hit scores 1.0
    pub async fn search_by_metadata(&self, filters: &Filters, limit: usize) -> Vec<SearchResult> {
        let state = self.state.read().await;
        let positions: Vec<usize> = if filters.is_empty() {
            (0..state.records.len()).collect()
        } else {
            state.index.candidates(filters)
        };

        positions
            .into_iter()
            .take(limit)
            .map(|position| SearchResult::from_chunk(&state.records[position].chunk, 1.0, 0.0, 0.0))
            .collect()
    }

    pub async fn get(&self, chunk_id: &str) -> Option<Chunk> {
        let state = self.state.read().await;
        state
            .positions
            .get(chunk_id)
            .map(|&position| state.records[position].chunk.clone())
    }

    /// Nearest stored chunks by vector, excluding the chunk itself
    pub async fn similar_to(&self, chunk_id: &str, limit: usize) -> Vec<SearchResult> {
        let state = self.state.read().await;
        let target = match state
            .positions
            .get(chunk_id)
            .and_then(|&position| state.records[position].vector.as_deref())
        {
            Some(vector) => vector,
            None => return Vec::new(),
        };

        let mut results: Vec<SearchResult> = state
            .records
            .iter()
            .filter(|r| r.chunk.chunk_id != chunk_id)
            .filter_map(|r| {
                r.vector.as_deref().map(|v| {
                    let similarity = cosine_similarity(target, v).clamp(0.0, 1.0);
                    SearchResult::from_chunk(&r.chunk, similarity, similarity, 0.0)
                })
            })
            .collect();

        results.sort_by(|a, b| {
            b.similarity_score
                .partial_cmp(&a.similarity_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(limit);
        results
    }

    /// Drop every record and the snapshot file.
    ///
    /// On the fallback path the model is reset so the next batch fits afresh.
    #[instrument(skip(self), fields(collection = %self.collection))]
    pub async fn delete_all(&self) -> Result<()> {
        let _writer = self.writer.lock().await;

        *self.state.write().await = StoreState::default();
        snapshot::remove(&self.path).await?;

        if self.embedder.is_degraded() {
            self.embedder.refit(&[]).await?;
        }

        metrics::record_snapshot(true, 0);
        tracing::info!("Deleted all records");
        Ok(())
    }

    pub async fn stats(&self) -> CollectionStats {
        let state = self.state.read().await;

        let mut tickers = BTreeSet::new();
        let mut doc_types = BTreeSet::new();
        let mut sectors = BTreeSet::new();
        let mut earliest: Option<&str> = None;
        let mut latest: Option<&str> = None;
        let mut word_statistics = WordStatistics::default();
        let mut min_words: Option<usize> = None;

        for record in &state.records {
            let metadata = &record.chunk.metadata;
            tickers.insert(metadata.ticker.clone());
            doc_types.insert(metadata.doc_type.clone());
            if let Some(c) = company::lookup(&metadata.ticker) {
                sectors.insert(c.sector.to_string());
            }

            let date = metadata.issue_date.as_str();
            if earliest.map_or(true, |e| date < e) {
                earliest = Some(date);
            }
            if latest.map_or(true, |l| date > l) {
                latest = Some(date);
            }

            word_statistics.total_words += metadata.word_count;
            word_statistics.max_words = word_statistics.max_words.max(metadata.word_count);
            min_words = Some(min_words.map_or(metadata.word_count, |m| m.min(metadata.word_count)));
        }

        let total_chunks = state.records.len();
        word_statistics.min_words = min_words.unwrap_or(0);
        if total_chunks > 0 {
            word_statistics.average_words_per_chunk = word_statistics.total_words as f64 / total_chunks as f64;
        }

        CollectionStats {
            collection: self.collection.clone(),
            total_chunks,
            unique_tickers: tickers.len(),
            tickers: tickers.into_iter().collect(),
            doc_types: doc_types.into_iter().collect(),
            sectors: sectors.into_iter().collect(),
            date_range: DateRange {
                earliest: earliest.map(str::to_string),
                latest: latest.map(str::to_string),
            },
            word_statistics,
            embeddings_available: state.records.iter().filter(|r| r.vector.is_some()).count(),
            embedding_model: self.embedder.model_name().to_string(),
            dimension: self.embedder.dimension(),
            degraded: self.embedder.is_degraded(),
            fit_state: self.embedder.fit_state(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::{l2_normalize, FallbackEmbedder};
    use crate::models::FinancialMetrics;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn chunk(ticker: &str, doc_type: &str, date: &str, index: usize, content: &str) -> Chunk {
        let words = content.split_whitespace().count();
        Chunk {
            chunk_id: format!("{}_{}_{}_{:04}", ticker, doc_type, date, index),
            content: content.to_string(),
            metadata: ChunkMetadata {
                ticker: ticker.into(),
                doc_type: doc_type.into(),
                issue_date: date.into(),
                chunk_index: index,
                start_word: 0,
                end_word: words,
                word_count: words,
                quality_score: 0.6,
                content_quality_score: 0.3,
                section_type: "financial".into(),
                primary_content_type: "general".into(),
                content_types: vec![],
                concepts: vec![],
                keywords: vec![],
                financial_metrics: FinancialMetrics::default(),
                financial_metrics_count: 0,
                company_name: company::company_name(ticker),
                citation: format!("{} {} filing dated {}, Section {}", ticker, doc_type, date, index + 1),
            },
            start_word_index: 0,
            end_word_index: words,
        }
    }

    fn corpus() -> Vec<Chunk> {
        vec![
            chunk("AAPL", "10-K", "2023-11-03", 0, "Apple total revenue reached $383.3 billion in fiscal 2023"),
            chunk("AAPL", "10-K", "2023-11-03", 1, "Research and development expenses grew as the company invested"),
            chunk("MSFT", "10-K", "2023-07-27", 0, "Microsoft cloud revenue increased driven by Azure growth"),
            chunk("MSFT", "10-Q", "2024-01-30", 0, "Quarterly dividends and share repurchases returned cash"),
        ]
    }

    fn config(dir: &std::path::Path) -> AppConfig {
        let mut config = AppConfig::default();
        config.store.data_dir = dir.to_path_buf();
        config.embedding.dimension = 64;
        config
    }

    async fn open_store(dir: &std::path::Path) -> Store {
        let embedder = Arc::new(FallbackEmbedder::new(64, 5000, 42).unwrap());
        Store::open(&config(dir), embedder).await.unwrap()
    }

    /// Makes the next snapshot write fail by occupying its temp path
    async fn block_snapshot_writes(store: &Store) -> PathBuf {
        let mut name = store.snapshot_path().as_os_str().to_os_string();
        name.push(".tmp");
        let blocker = PathBuf::from(name);
        tokio::fs::create_dir_all(&blocker).await.unwrap();
        blocker
    }

    const KEYWORDS: &[&str] = &["revenue", "research", "cloud", "dividends"];

    /// Pretrained-style embedder: one dimension per keyword
    struct KeywordEmbedder {
        model: &'static str,
        embedded: AtomicUsize,
    }

    impl KeywordEmbedder {
        fn new(model: &'static str) -> Arc<Self> {
            Arc::new(Self {
                model,
                embedded: AtomicUsize::new(0),
            })
        }

        fn embedded(&self) -> usize {
            self.embedded.load(Ordering::SeqCst)
        }

        fn vector(text: &str) -> Vec<f32> {
            let lower = text.to_lowercase();
            let mut v: Vec<f32> = KEYWORDS
                .iter()
                .map(|k| if lower.contains(k) { 1.0 } else { 0.0 })
                .collect();
            l2_normalize(&mut v);
            v
        }
    }

    #[async_trait]
    impl EmbeddingProvider for KeywordEmbedder {
        async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
            Ok(Self::vector(text))
        }

        async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            self.embedded.fetch_add(texts.len(), Ordering::SeqCst);
            Ok(texts.iter().map(|t| Self::vector(t)).collect())
        }

        fn model_name(&self) -> &str {
            self.model
        }

        fn dimension(&self) -> usize {
            KEYWORDS.len()
        }
    }

    #[tokio::test]
    async fn test_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path()).await;

        assert_eq!(store.add(vec![]).await.unwrap(), 0);
        assert!(store.search(&SearchRequest::new("revenue", 5)).await.unwrap().is_empty());
        assert!(store.get("missing").await.is_none());
        assert_eq!(store.stats().await.total_chunks, 0);
        assert!(store.is_degraded());
    }

    #[tokio::test]
    async fn test_add_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path()).await;

        assert_eq!(store.add(corpus()).await.unwrap(), 4);
        assert_eq!(store.add(corpus()).await.unwrap(), 0);
        assert_eq!(store.len().await, 4);
        assert!(store.snapshot_path().exists());
    }

    #[tokio::test]
    async fn test_search_respects_filters_and_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path()).await;
        store.add(corpus()).await.unwrap();

        let request = SearchRequest::new("revenue growth", 10).with_filter("ticker", "MSFT");
        let results = store.search(&request).await.unwrap();
        assert!(!results.is_empty());
        assert!(results.iter().all(|r| r.metadata.ticker == "MSFT"));

        let results = store.search(&SearchRequest::new("apple revenue 2023", 10)).await.unwrap();
        assert_eq!(results[0].chunk_id, "AAPL_10-K_2023-11-03_0000");
        for pair in results.windows(2) {
            assert!(pair[0].similarity_score >= pair[1].similarity_score);
        }
        for r in &results {
            assert!((0.0..=1.0).contains(&r.similarity_score));
        }
    }

    #[tokio::test]
    async fn test_set_membership_filter() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path()).await;
        store.add(corpus()).await.unwrap();

        let mut filters = Filters::new();
        filters.insert("doc_type".into(), vec!["10-Q".to_string(), "8-K".to_string()].into());
        let hits = store.search_by_metadata(&filters, 10).await;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].metadata.doc_type, "10-Q");
        assert_eq!(hits[0].similarity_score, 1.0);
    }

    #[tokio::test]
    async fn test_similar_to_excludes_self() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path()).await;
        store.add(corpus()).await.unwrap();

        let similar = store.similar_to("AAPL_10-K_2023-11-03_0000", 2).await;
        assert!(similar.len() <= 2);
        assert!(similar.iter().all(|r| r.chunk_id != "AAPL_10-K_2023-11-03_0000"));
        assert!(store.similar_to("missing", 2).await.is_empty());
    }

    #[tokio::test]
    async fn test_reopen_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let (stats, chunk) = {
            let store = open_store(dir.path()).await;
            store.add(corpus()).await.unwrap();
            (store.stats().await, store.get("MSFT_10-Q_2024-01-30_0000").await)
        };

        let reopened = open_store(dir.path()).await;
        assert_eq!(reopened.stats().await, stats);
        assert_eq!(reopened.get("MSFT_10-Q_2024-01-30_0000").await, chunk);
        assert_eq!(reopened.embedder().fit_state(), FitState::Fitted);
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("sec_filings.json"), b"garbage").await.unwrap();
        let store = open_store(dir.path()).await;
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_dimension_mismatch_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = open_store(dir.path()).await;
            store.add(corpus()).await.unwrap();
        }

        let mut config = AppConfig::default();
        config.store.data_dir = dir.path().to_path_buf();
        let embedder = Arc::new(FallbackEmbedder::new(32, 5000, 42).unwrap());
        let store = Store::open(&config, embedder).await.unwrap();
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_delete_all_resets() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path()).await;
        store.add(corpus()).await.unwrap();

        tokio_test::assert_ok!(store.delete_all().await);
        assert!(store.is_empty().await);
        assert!(!store.snapshot_path().exists());
        assert_eq!(store.embedder().fit_state(), FitState::Unfit);
    }

    #[tokio::test]
    async fn test_stats() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path()).await;
        store.add(corpus()).await.unwrap();

        let stats = store.stats().await;
        assert_eq!(stats.total_chunks, 4);
        assert_eq!(stats.tickers, vec!["AAPL", "MSFT"]);
        assert_eq!(stats.doc_types, vec!["10-K", "10-Q"]);
        assert_eq!(stats.sectors, vec!["Technology"]);
        assert_eq!(stats.date_range.earliest.as_deref(), Some("2023-07-27"));
        assert_eq!(stats.date_range.latest.as_deref(), Some("2024-01-30"));
        assert_eq!(stats.embeddings_available, 4);
    }

    #[tokio::test]
    async fn test_failed_write_keeps_previous_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path()).await;
        let mut chunks = corpus();
        let later = chunks.split_off(2);

        assert_eq!(store.add(chunks).await.unwrap(), 2);
        let before = tokio::fs::read(store.snapshot_path()).await.unwrap();

        let blocker = block_snapshot_writes(&store).await;
        let result = store.add(later.clone()).await;
        assert!(matches!(result, Err(AppError::Persistence { .. })));
        assert_eq!(store.len().await, 2);
        assert!(store.get("MSFT_10-K_2023-07-27_0000").await.is_none());
        assert_eq!(tokio::fs::read(store.snapshot_path()).await.unwrap(), before);

        let mut filters = Filters::new();
        filters.insert("ticker".into(), "MSFT".into());
        assert!(store.search_by_metadata(&filters, 10).await.is_empty());

        tokio::fs::remove_dir(&blocker).await.unwrap();
        assert_eq!(store.add(later).await.unwrap(), 2);
        assert_eq!(store.len().await, 4);
    }

    #[tokio::test]
    async fn test_rollback_discards_fallback_fit() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path()).await;
        let mut chunks = corpus();
        let dividends = chunks.split_off(3);

        let blocker = block_snapshot_writes(&store).await;
        assert!(store.add(dividends).await.is_err());
        assert!(store.is_empty().await);
        assert_eq!(store.embedder().fit_state(), FitState::Unfit);

        tokio::fs::remove_dir(&blocker).await.unwrap();
        store.add(chunks).await.unwrap();

        let results = store.search(&SearchRequest::new("apple revenue", 5)).await.unwrap();
        assert_eq!(results[0].chunk_id, "AAPL_10-K_2023-11-03_0000");
        assert!(results[0].semantic_score > 0.0);
    }

    #[tokio::test]
    async fn test_second_writer_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let first = open_store(dir.path()).await;
        first.add(corpus()[..1].to_vec()).await.unwrap();

        let embedder = Arc::new(FallbackEmbedder::new(64, 5000, 42).unwrap());
        let second = Store::open(&config(dir.path()), embedder).await;
        assert!(matches!(second, Err(AppError::StoreLocked { .. })));

        drop(first);
        let reopened = open_store(dir.path()).await;
        assert_eq!(reopened.len().await, 1);
    }

    #[tokio::test]
    async fn test_primary_model_change_reembeds() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());

        {
            let embedder = KeywordEmbedder::new("keywords-v1");
            let store = Store::open(&config, embedder.clone()).await.unwrap();
            store.add(corpus()).await.unwrap();
            assert_eq!(embedder.embedded(), 4);
        }

        {
            let embedder = KeywordEmbedder::new("keywords-v1");
            let store = Store::open(&config, embedder.clone()).await.unwrap();
            assert_eq!(store.len().await, 4);
            assert_eq!(embedder.embedded(), 0);
        }

        let embedder = KeywordEmbedder::new("keywords-v2");
        let store = Store::open(&config, embedder.clone()).await.unwrap();
        assert_eq!(embedder.embedded(), 4);
        assert!(!store.is_degraded());

        let stats = store.stats().await;
        assert_eq!(stats.embedding_model, "keywords-v2");
        assert_eq!(stats.embeddings_available, 4);

        let results = store.search(&SearchRequest::new("cloud", 2)).await.unwrap();
        assert_eq!(results[0].chunk_id, "MSFT_10-K_2023-07-27_0000");
        assert!(results[0].semantic_score > 0.5);
    }
}
