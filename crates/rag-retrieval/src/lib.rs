//! # rag-retrieval
//!
//! Adaptive retrieval orchestration for research-rag.
//!
//! A query goes through three phases:
//!
//! 1. **Preprocess**: the [`QueryAnalyzer`] classifies intent and complexity
//!    and flags ambiguous queries; flagged queries go through the
//!    [`QueryRewriter`].
//! 2. **Retrieve + generate**: [`determine_top_k`] maps the analysis of the
//!    *original* query to a depth, and the [`AnswerComposer`] retrieves that
//!    many passages for the effective query and generates a grounded answer.
//! 3. **Postprocess**: an [`AnswerPostprocessor`] hook, [`PassThrough`] by
//!    default.
//!
//! Classification and rewriting degrade to safe defaults and never fail a
//! query. Retrieval and generation failures are returned as
//! [`RetrievalError`].
//!
//! ## Usage
//!
//! ```rust,ignore
//! use rag_retrieval::{display_sources, DedupKey, DepthBounds, Orchestrator, PromptTemplates};
//!
//! let orchestrator = Orchestrator::new(generator, gateway, PromptTemplates::default(), DepthBounds::default());
//! let outcome = orchestrator.run("What is the boiling point of water?").await?;
//! println!("{}", outcome.answer.text);
//! for line in display_sources(&outcome.answer.passages, DedupKey::Location) {
//!     println!("{line}");
//! }
//! ```

pub mod analyzer;
pub mod composer;
pub mod error;
pub mod gateway;
pub mod orchestrator;
pub mod policy;
pub mod prompts;
pub mod rewriter;
pub mod sources;

pub use analyzer::{parse_analysis, AnalysisOutcome, QueryAnalyzer, ANALYZE_TASK};
pub use composer::{build_context, is_fallback_answer, AnswerComposer, Composition, ANSWER_TASK};
pub use error::RetrievalError;
pub use gateway::{MockRetrievalGateway, RetrievalGateway};
pub use orchestrator::{
    AnswerPostprocessor, DepthBounds, Orchestrator, PassThrough, QueryOutcome, QueryPlan,
    QueryTrace,
};
pub use policy::{clamp_top_k, determine_top_k, top_k_for_labels};
pub use prompts::PromptTemplates;
pub use rewriter::{QueryRewriter, RewriteOutcome, REWRITE_TASK};
pub use sources::{
    dedup_by_location, dedup_by_title, display_sources, format_source, resolve_title, DedupKey,
};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::gateway::RetrievalGateway;
    pub use crate::orchestrator::{DepthBounds, Orchestrator, QueryOutcome};
    pub use crate::prompts::PromptTemplates;
    pub use crate::sources::{display_sources, DedupKey};
}
