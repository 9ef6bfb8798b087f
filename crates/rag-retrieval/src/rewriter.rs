//! Query rewriting for ambiguous queries.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use rag_llm::{GenerationRequest, TextGenerator};

use crate::prompts::PromptTemplates;

pub const REWRITE_TASK: &str = "rewrite";

/// Result of a rewrite attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RewriteOutcome {
    Rewritten { query: String },
    /// The original query stays in effect
    Unchanged { reason: String },
}

impl RewriteOutcome {
    /// The query to use downstream.
    pub fn effective_query<'a>(&'a self, original: &'a str) -> &'a str {
        match self {
            RewriteOutcome::Rewritten { query } => query,
            RewriteOutcome::Unchanged { .. } => original,
        }
    }

    pub fn is_rewritten(&self) -> bool {
        matches!(self, RewriteOutcome::Rewritten { .. })
    }
}

/// Strip whitespace and one layer of wrapping quotes from model output.
fn clean(raw: &str) -> &str {
    let trimmed = raw.trim();
    trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .map(str::trim)
        .unwrap_or(trimmed)
}

pub struct QueryRewriter {
    generator: Arc<dyn TextGenerator>,
    prompts: Arc<PromptTemplates>,
    temperature: f32,
}

impl QueryRewriter {
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

    /// Rewrite a query. Never fails; falls back to the original text.
    pub async fn rewrite(&self, query: &str) -> RewriteOutcome {
        let request = GenerationRequest::new(REWRITE_TASK, self.prompts.render_rewrite(query))
            .with_temperature(self.temperature);

        let outcome = match self.generator.generate(&request).await {
            Ok(raw) => {
                let cleaned = clean(&raw);
                if cleaned.is_empty() {
                    RewriteOutcome::Unchanged {
                        reason: "rewrite returned empty text".to_string(),
                    }
                } else {
                    RewriteOutcome::Rewritten {
                        query: cleaned.to_string(),
                    }
                }
            }
            Err(e) => RewriteOutcome::Unchanged {
                reason: format!("rewrite call failed: {}", e),
            },
        };

        match &outcome {
            RewriteOutcome::Rewritten { query: rewritten } => {
                debug!(original = %query, rewritten = %rewritten, "Query rewritten")
            }
            RewriteOutcome::Unchanged { reason } => {
                warn!(reason = %reason, "Keeping original query")
            }
        }

        outcome
    }
}
