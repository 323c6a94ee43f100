//! Ingestion processor
//!
//! Core batch logic: load RawDocument JSON, validate and chunk each filing,
//! and hand chunks to the store in bounded batches. One bad document never
//! stops a batch; store failures do.

use crate::chunker::DocumentChunker;
use crate::errors::IngestionError;
use filingforge_common::config::AppConfig;
use filingforge_common::metrics::{self, DocumentOutcome};
use filingforge_common::models::{Chunk, RawDocument};
use filingforge_common::Store;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};

/// Counters for one ingestion run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    /// Documents that produced chunks
    pub processed: usize,
    /// Documents rejected by validation or yielding no chunks
    pub skipped: usize,
    /// Documents that could not be read or parsed
    pub errored: usize,
    pub chunks_created: usize,
    /// Chunks newly written; re-ingested ids are not counted
    pub chunks_stored: usize,
}

pub struct IngestionProcessor {
    chunker: DocumentChunker,
    store: Arc<Store>,
    batch_size: usize,
}

impl IngestionProcessor {
    pub fn new(config: &AppConfig, store: Arc<Store>) -> Result<Self, IngestionError> {
        Ok(Self {
            chunker: DocumentChunker::new(config.chunking.clone(), config.validation.clone())?,
            store,
            batch_size: config.ingestion.batch_size.max(1),
        })
    }

    pub fn chunker(&self) -> &DocumentChunker {
        &self.chunker
    }

    /// Read and parse one RawDocument JSON file
    pub async fn load_document(path: &Path) -> Result<RawDocument, IngestionError> {
        let bytes = tokio::fs::read(path).await?;
        let document: RawDocument = serde_json::from_slice(&bytes).map_err(|e| IngestionError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        if let Some(field) = document.identifier.missing_field() {
            return Err(IngestionError::InvalidDocument { field: field.to_string() });
        }
        Ok(document)
    }

    /// Ingest every `*.json` file in `dir`, in file-name order
    #[instrument(skip(self), fields(dir = %dir.display()))]
    pub async fn process_directory(&self, dir: &Path) -> Result<BatchReport, IngestionError> {
        let started = Instant::now();
        let paths = json_files(dir).await?;
        info!(files = paths.len(), "Processing directory of filings");

        let mut run = Run::default();
        for path in paths {
            match Self::load_document(&path).await {
                Ok(document) => self.ingest_one(&document, &mut run).await?,
                Err(e) => {
                    error!(path = %path.display(), error = %e, "Failed to load document");
                    run.report.errored += 1;
                    metrics::record_document(DocumentOutcome::Errored, "unknown", 0);
                }
            }
        }

        self.finish(run, started).await
    }

    /// Ingest an in-memory batch
    #[instrument(skip(self, documents), fields(documents = documents.len()))]
    pub async fn process_documents(&self, documents: &[RawDocument]) -> Result<BatchReport, IngestionError> {
        let started = Instant::now();
        let mut run = Run::default();

        for document in documents {
            if let Some(field) = document.identifier.missing_field() {
                warn!(field, "Document identifier incomplete");
                run.report.errored += 1;
                metrics::record_document(DocumentOutcome::Errored, &document.identifier.doc_type, 0);
                continue;
            }
            self.ingest_one(document, &mut run).await?;
        }

        self.finish(run, started).await
    }

    async fn ingest_one(&self, document: &RawDocument, run: &mut Run) -> Result<(), IngestionError> {
        let id = &document.identifier;
        let (verdict, chunks) = self.chunker.chunk_with_verdict(document);

        if chunks.is_empty() {
            debug!(
                ticker = %id.ticker,
                doc_type = %id.doc_type,
                issue_date = %id.issue_date,
                reason = %verdict.reason,
                "Document skipped"
            );
            run.report.skipped += 1;
            metrics::record_document(DocumentOutcome::Skipped, &id.doc_type, 0);
            return Ok(());
        }

        info!(
            ticker = %id.ticker,
            doc_type = %id.doc_type,
            issue_date = %id.issue_date,
            chunk_count = chunks.len(),
            quality_score = verdict.quality_score,
            "Document chunked"
        );

        run.report.processed += 1;
        run.report.chunks_created += chunks.len();
        metrics::record_document(DocumentOutcome::Processed, &id.doc_type, chunks.len());

        run.pending.extend(chunks);
        if run.pending.len() >= self.batch_size {
            self.flush(run).await?;
        }
        Ok(())
    }

    async fn flush(&self, run: &mut Run) -> Result<(), IngestionError> {
        if run.pending.is_empty() {
            return Ok(());
        }
        let batch = std::mem::take(&mut run.pending);
        let count = batch.len();
        let added = self.store.add(batch).await?;
        debug!(batch = count, added, "Chunk batch stored");
        run.report.chunks_stored += added;
        Ok(())
    }

    async fn finish(&self, mut run: Run, started: Instant) -> Result<BatchReport, IngestionError> {
        self.flush(&mut run).await?;
        metrics::record_ingestion(started.elapsed().as_secs_f64());

        let report = run.report;
        info!(
            processed = report.processed,
            skipped = report.skipped,
            errored = report.errored,
            chunks_created = report.chunks_created,
            chunks_stored = report.chunks_stored,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Ingestion run complete"
        );
        Ok(report)
    }
}

#[derive(Default)]
struct Run {
    report: BatchReport,
    pending: Vec<Chunk>,
}

async fn json_files(dir: &Path) -> Result<Vec<PathBuf>, IngestionError> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut paths = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().map(|e| e == "json").unwrap_or(false) {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use filingforge_common::create_embedding_provider;
    use filingforge_common::models::DocumentIdentifier;

    const FILING: &str = "Annual report Part I Item 1 business overview. Item 2 risk factors. \
        Management discussion of financial statements. Revenue and net income grew in fiscal 2023.";

    fn filing(ticker: &str, date: &str) -> RawDocument {
        let text = format!("{} {}", FILING, "Products and services drove operations. ".repeat(25));
        RawDocument::new(DocumentIdentifier::new(ticker, "10-K", date), text)
    }

    async fn processor(dir: &Path, batch_size: usize) -> (IngestionProcessor, Arc<Store>) {
        let mut config = AppConfig::default();
        config.store.data_dir = dir.join("store");
        config.chunking.chunk_size = 40;
        config.chunking.chunk_overlap = 10;
        config.ingestion.batch_size = batch_size;
        config.embedding.provider = "fallback".into();
        config.embedding.dimension = 64;

        let embedder = create_embedding_provider(&config.embedding).await.unwrap();
        let store = Arc::new(Store::open(&config, embedder).await.unwrap());
        (IngestionProcessor::new(&config, store.clone()).unwrap(), store)
    }

    #[tokio::test]
    async fn test_batch_counts() {
        let dir = tempfile::tempdir().unwrap();
        let (processor, store) = processor(dir.path(), 3).await;

        let documents = vec![
            filing("AAPL", "2023-11-03"),
            RawDocument::new(DocumentIdentifier::new("MSFT", "10-K", "2023-07-27"), "too short"),
            RawDocument::new(DocumentIdentifier::new("", "10-K", "2023-07-27"), "anything"),
            filing("MSFT", "2023-07-27"),
        ];

        let report = processor.process_documents(&documents).await.unwrap();
        assert_eq!(report.processed, 2);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.errored, 1);
        assert_eq!(report.chunks_stored, report.chunks_created);
        assert_eq!(store.len().await, report.chunks_created);
    }

    #[tokio::test]
    async fn test_reingest_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let (processor, store) = processor(dir.path(), 100).await;
        let documents = vec![filing("AAPL", "2023-11-03")];

        let first = tokio_test::assert_ok!(processor.process_documents(&documents).await);
        let second = tokio_test::assert_ok!(processor.process_documents(&documents).await);
        assert_eq!(second.chunks_created, first.chunks_created);
        assert_eq!(second.chunks_stored, 0);
        assert_eq!(store.len().await, first.chunks_created);
    }

    #[tokio::test]
    async fn test_directory_continues_past_bad_files() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("input");
        tokio::fs::create_dir_all(&input).await.unwrap();

        let good = serde_json::to_vec(&filing("JPM", "2024-02-16")).unwrap();
        tokio::fs::write(input.join("a_good.json"), good).await.unwrap();
        tokio::fs::write(input.join("b_broken.json"), b"{\"identifier\":").await.unwrap();
        tokio::fs::write(input.join("notes.txt"), b"ignored").await.unwrap();

        let (processor, store) = processor(dir.path(), 10).await;
        let report = processor.process_directory(&input).await.unwrap();
        assert_eq!(report.processed, 1);
        assert_eq!(report.errored, 1);
        assert_eq!(report.skipped, 0);
        assert!(store.get("JPM_10-K_2024-02-16_0000").await.is_some());
    }

    #[tokio::test]
    async fn test_missing_identifier_field_is_rejected_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.json");
        tokio::fs::write(
            &path,
            br#"{"identifier":{"ticker":"AAPL","doc_type":"10-K","issue_date":""},"full_text":"x"}"#,
        )
        .await
        .unwrap();

        let err = IngestionProcessor::load_document(&path).await.unwrap_err();
        assert!(matches!(err, IngestionError::InvalidDocument { ref field } if field == "issue_date"));
    }
}
