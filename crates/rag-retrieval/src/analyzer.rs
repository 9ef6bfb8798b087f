//! LLM-backed query classification with a safe default.
//!
//! Classification is advisory. Any failure, from a transport error to an
//! out-of-domain label, yields [`AnalysisOutcome::Default`] instead of an
//! error so the pipeline keeps going.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use rag_llm::{extract_json, GenerationRequest, TextGenerator};
use rag_types::QueryAnalysis;

use crate::prompts::PromptTemplates;

pub const ANALYZE_TASK: &str = "analyze";

/// Result of classifying one query.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AnalysisOutcome {
    /// The model returned a well-formed classification
    Classified(QueryAnalysis),
    /// Classification failed; the safe default applies
    Default { reason: String },
}

impl AnalysisOutcome {
    /// The analysis to act on.
    pub fn analysis(&self) -> QueryAnalysis {
        match self {
            AnalysisOutcome::Classified(analysis) => *analysis,
            AnalysisOutcome::Default { .. } => QueryAnalysis::safe_default(),
        }
    }

    pub fn is_default(&self) -> bool {
        matches!(self, AnalysisOutcome::Default { .. })
    }
}

/// Strict decode of classifier output.
///
/// Fenced or prefixed JSON is unwrapped first. All three fields must be
/// present and in domain; unknown extra fields are ignored.
pub fn parse_analysis(raw: &str) -> AnalysisOutcome {
    let json = extract_json(raw);
    match serde_json::from_str::<QueryAnalysis>(&json) {
        Ok(analysis) => AnalysisOutcome::Classified(analysis),
        Err(e) => AnalysisOutcome::Default {
            reason: format!("malformed classification: {}", e),
        },
    }
}

pub struct QueryAnalyzer {
    generator: Arc<dyn TextGenerator>,
    prompts: Arc<PromptTemplates>,
    temperature: f32,
}

impl QueryAnalyzer {
    pub fn new(generator: Arc<dyn TextGenerator>, prompts: Arc<PromptTemplates>) -> Self {
        Self {
            generator,
            prompts,
            temperature: 0.0,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Classify a query. Never fails.
    pub async fn analyze(&self, query: &str) -> AnalysisOutcome {
        let request = GenerationRequest::new(ANALYZE_TASK, self.prompts.render_analysis(query))
            .with_temperature(self.temperature)
            .json();

        let outcome = match self.generator.generate(&request).await {
            Ok(raw) => parse_analysis(&raw),
            Err(e) => AnalysisOutcome::Default {
                reason: format!("classification call failed: {}", e),
            },
        };

        match &outcome {
            AnalysisOutcome::Classified(a) => debug!(
                intent = a.intent.as_str(),
                complexity = a.complexity.as_str(),
                needs_rewrite = a.needs_rewrite,
                "Query classified"
            ),
            AnalysisOutcome::Default { reason } => {
                warn!(reason = %reason, "Query analysis fell back to default")
            }
        }

        outcome
    }
}
