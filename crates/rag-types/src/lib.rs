//! # rag-types
//!
//! Shared domain types for the research-rag pipeline.
//!
//! This crate defines the data structures used throughout the system:
//! - Query analysis: intent, complexity and the rewrite flag
//! - Passages: retrieved text spans with source metadata
//! - Answers: generated text plus grounding passages
//! - Settings: layered configuration
//!
//! ## Usage
//!
//! ```rust
//! use rag_types::{QueryAnalysis, QueryIntent};
//!
//! let analysis = QueryAnalysis::safe_default();
//! assert_eq!(analysis.intent, QueryIntent::Conceptual);
//! ```

pub mod answer;
pub mod config;
pub mod error;
pub mod passage;
pub mod query;

pub use answer::{Answer, QueryResponse, SourceEntry};
pub use config::{
    EmbeddingSettings, IndexSettings, LlmSettings, PromptSettings, RetrievalSettings, Settings,
    DEFAULT_FALLBACK_SENTENCE,
};
pub use error::RagError;
pub use passage::{Passage, PassageMetadata};
pub use query::{QueryAnalysis, QueryComplexity, QueryIntent};
