//! Word-window chunking
//!
//! Splits a validated document into overlapping fixed-size word windows and
//! enriches each window with classification metadata and attribution.

use crate::classify::ContentClassifier;
use crate::validator::{ContentValidator, Verdict};
use filingforge_common::config::{ChunkingConfig, ValidationConfig};
use filingforge_common::models::{company, Chunk, ChunkMetadata, RawDocument};
use filingforge_common::Result;
use tracing::debug;

/// Word offsets `[start, end)` of successive windows over `word_count` words.
///
/// `next = end - overlap`, bumped to `start + max(1, size / 2)` when that
/// would not advance. Ends once a window reaches the last word.
#[derive(Debug, Clone)]
pub struct WordWindows {
    word_count: usize,
    size: usize,
    overlap: usize,
    start: Option<usize>,
}

impl WordWindows {
    pub fn new(word_count: usize, chunk_size: usize, overlap: usize) -> Self {
        Self {
            word_count,
            size: chunk_size.max(1),
            overlap,
            start: (word_count > 0).then_some(0),
        }
    }
}

impl Iterator for WordWindows {
    type Item = (usize, usize);

    fn next(&mut self) -> Option<Self::Item> {
        let start = self.start?;
        let end = (start + self.size).min(self.word_count);

        // The window that reaches the last word is the final one; a trailing
        // window made only of the previous window's overlap is never emitted.
        self.start = if end >= self.word_count {
            None
        } else {
            let mut next = end.saturating_sub(self.overlap);
            if next <= start {
                next = start + (self.size / 2).max(1);
            }
            Some(next)
        };

        Some((start, end))
    }
}

pub struct DocumentChunker {
    config: ChunkingConfig,
    validator: ContentValidator,
    classifier: ContentClassifier,
}

impl DocumentChunker {
    pub fn new(config: ChunkingConfig, validation: ValidationConfig) -> Result<Self> {
        Ok(Self {
            config,
            validator: ContentValidator::new(validation),
            classifier: ContentClassifier::new()?,
        })
    }

    pub fn validator(&self) -> &ContentValidator {
        &self.validator
    }

    /// Chunks of a document; empty when validation rejects it
    pub fn chunk(&self, document: &RawDocument) -> Vec<Chunk> {
        self.chunk_with_verdict(document).1
    }

    /// Validate then chunk, returning the verdict alongside
    pub fn chunk_with_verdict(&self, document: &RawDocument) -> (Verdict, Vec<Chunk>) {
        let id = &document.identifier;
        let verdict = self.validator.validate(&document.full_text, &id.doc_type);
        if !verdict.is_valid {
            debug!(ticker = %id.ticker, doc_type = %id.doc_type, reason = %verdict.reason, "Document rejected");
            return (verdict, Vec::new());
        }

        let words: Vec<&str> = document.full_text.split_whitespace().collect();
        let company_name = company::company_name(&id.ticker);
        let mut chunks = Vec::new();

        for (start, end) in WordWindows::new(words.len(), self.config.chunk_size, self.config.chunk_overlap) {
            let content = words[start..end].join(" ");
            if content.chars().count() < self.config.min_chunk_chars {
                break;
            }

            let chunk_index = chunks.len();
            let c = self.classifier.classify(&content, &id.doc_type);

            let metadata = ChunkMetadata {
                ticker: id.ticker.clone(),
                doc_type: id.doc_type.clone(),
                issue_date: id.issue_date.clone(),
                chunk_index,
                start_word: start,
                end_word: end,
                word_count: end - start,
                quality_score: verdict.quality_score,
                content_quality_score: c.content_quality_score,
                section_type: c.section_type.as_str().to_string(),
                primary_content_type: c.primary_content_type().to_string(),
                content_types: c.content_types.iter().map(|ct| ct.as_str().to_string()).collect(),
                financial_metrics_count: c.financial_metrics.count(),
                financial_metrics: c.financial_metrics,
                concepts: c.concepts,
                keywords: c.keywords,
                citation: format!(
                    "{} {} filing dated {}, Section {}",
                    company_name,
                    id.doc_type,
                    id.issue_date,
                    chunk_index + 1
                ),
                company_name: company_name.clone(),
            };

            chunks.push(Chunk {
                chunk_id: id.chunk_id(chunk_index),
                content,
                metadata,
                start_word_index: start,
                end_word_index: end,
            });
        }

        debug!(
            ticker = %id.ticker,
            doc_type = %id.doc_type,
            words = words.len(),
            chunk_count = chunks.len(),
            "Document chunked"
        );

        (verdict, chunks)
    }
}
