//! Ingestion error types

use filingforge_common::errors::AppError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestionError {
    #[error("Parse error for {path}: {message}")]
    Parse { path: String, message: String },

    #[error("Invalid document identifier: missing {field}")]
    InvalidDocument { field: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store error: {0}")]
    Store(#[from] AppError),
}
