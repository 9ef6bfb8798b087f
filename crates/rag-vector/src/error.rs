//! Vector index error types.

use thiserror::Error;

use rag_llm::LlmError;
use rag_retrieval::RetrievalError;

/// Errors that can occur during vector operations.
#[derive(Debug, Error)]
pub enum VectorError {
    /// usearch index error
    #[error("Index error: {0}")]
    Index(String),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    /// RocksDB error
    #[error("Database error: {0}")]
    Database(#[from] rocksdb::Error),

    #[error("Embedding error: {0}")]
    Embedding(#[from] LlmError),
}

impl From<VectorError> for RetrievalError {
    fn from(e: VectorError) -> Self {
        RetrievalError::Retrieval(e.to_string())
    }
}
