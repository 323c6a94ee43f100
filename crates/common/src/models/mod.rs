//! Domain models shared by ingestion and search
//!
//! - `RawDocument`: cleaned filing text plus its identifier
//! - `Chunk`: the unit of retrieval, with typed metadata
//! - `company`: static ticker table used for attribution and entity extraction

mod chunk;
pub mod company;
mod document;

pub use chunk::{Chunk, ChunkMetadata, FinancialMetrics};
pub use document::{DocumentIdentifier, RawDocument};
