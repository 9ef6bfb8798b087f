//! Retrieval pipeline errors.
//!
//! Only hard failures live here. Classification and rewrite problems are
//! absorbed by the analyzer and rewriter and never reach this type.

use thiserror::Error;

use rag_llm::LlmError;

#[derive(Debug, Error)]
pub enum RetrievalError {
    /// Index unavailable or the gateway failed
    #[error("Retrieval failed: {0}")]
    Retrieval(String),

    #[error("Answer generation failed: {0}")]
    Generation(#[from] LlmError),

    #[error("Query is empty")]
    EmptyQuery,

    #[error("Answer generation returned no text")]
    EmptyAnswer,

    #[error("Invalid prompt template: {0}")]
    InvalidPrompt(String),
}
