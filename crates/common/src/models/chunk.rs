//! Chunk entity with classification metadata

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Regex captures of headline figures found in a chunk
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinancialMetrics {
    pub revenue: Vec<String>,
    pub profitability: Vec<String>,
}

impl FinancialMetrics {
    pub fn count(&self) -> usize {
        self.revenue.len() + self.profitability.len()
    }
}

/// Metadata attached to every chunk.
///
/// Scalar fields are indexed for equality filtering; list and map fields are
/// carried along but never indexed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub ticker: String,
    pub doc_type: String,
    pub issue_date: String,

    /// Position of this chunk within its document
    pub chunk_index: usize,
    pub start_word: usize,
    pub end_word: usize,
    pub word_count: usize,

    /// Document-level validation score
    pub quality_score: f32,

    /// Chunk-level content score
    pub content_quality_score: f32,

    pub section_type: String,
    pub primary_content_type: String,
    pub content_types: Vec<String>,
    pub concepts: Vec<String>,
    pub keywords: Vec<String>,

    pub financial_metrics: FinancialMetrics,
    pub financial_metrics_count: usize,

    /// Attribution
    pub company_name: String,
    pub citation: String,
}

impl ChunkMetadata {
    /// JSON object view used by the metadata index and filters
    pub fn fields(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }
}

/// The unit of retrieval: a word window of one document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// `TICKER_DOCTYPE_DATE_NNNN`
    pub chunk_id: String,

    pub content: String,

    pub metadata: ChunkMetadata,

    /// Word offsets in the source document, end exclusive
    pub start_word_index: usize,
    pub end_word_index: usize,
}
