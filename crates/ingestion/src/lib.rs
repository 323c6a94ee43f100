//! FilingForge ingestion
//!
//! - `validator`: genuine filing text vs. viewer and index stubs
//! - `classify`: content types, sections, concepts and headline metrics
//! - `chunker`: overlapping word windows with enriched metadata
//! - `processor`: batch ingestion into the store

pub mod chunker;
pub mod classify;
pub mod errors;
pub mod processor;
pub mod validator;

pub use chunker::{DocumentChunker, WordWindows};
pub use errors::IngestionError;
pub use processor::{BatchReport, IngestionProcessor};
pub use validator::{ContentValidator, Verdict};
