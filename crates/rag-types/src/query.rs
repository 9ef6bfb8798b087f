//! Query analysis types.
//!
//! - `QueryIntent`: what kind of answer a query seeks
//! - `QueryComplexity`: how much reasoning the answer needs
//! - `QueryAnalysis`: the combined classification that drives retrieval depth

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RagError;

/// Coarse classification of what kind of answer a query seeks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum QueryIntent {
    /// Asks for a specific fact or definition.
    /// Example: "What is the boiling point of water?"
    Factual,

    /// Asks for an explanation or understanding.
    /// Example: "Why does attention scale quadratically?"
    #[default]
    Conceptual,

    /// Asks for steps or a how-to.
    /// Example: "How do I fine-tune the model on my data?"
    Procedural,

    /// Broad, vague or research-style queries.
    /// Example: "What are the open problems in retrieval?"
    Exploratory,
}

impl QueryIntent {
    /// All intents, in the order they are listed to the classifier.
    pub const ALL: [QueryIntent; 4] = [
        QueryIntent::Factual,
        QueryIntent::Conceptual,
        QueryIntent::Procedural,
        QueryIntent::Exploratory,
    ];

    /// Returns the wire name for this intent.
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryIntent::Factual => "factual",
            QueryIntent::Conceptual => "conceptual",
            QueryIntent::Procedural => "procedural",
            QueryIntent::Exploratory => "exploratory",
        }
    }
}

impl fmt::Display for QueryIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for QueryIntent {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        QueryIntent::ALL
            .into_iter()
            .find(|intent| intent.as_str() == s)
            .ok_or_else(|| RagError::InvalidInput(format!("unknown intent: {s}")))
    }
}

/// How much reasoning or breadth a query needs.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum QueryComplexity {
    Low,
    #[default]
    Medium,
    High,
}

impl QueryComplexity {
    /// All complexity tiers, lowest first.
    pub const ALL: [QueryComplexity; 3] = [
        QueryComplexity::Low,
        QueryComplexity::Medium,
        QueryComplexity::High,
    ];

    /// Returns the wire name for this tier.
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryComplexity::Low => "low",
            QueryComplexity::Medium => "medium",
            QueryComplexity::High => "high",
        }
    }
}

impl fmt::Display for QueryComplexity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for QueryComplexity {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        QueryComplexity::ALL
            .into_iter()
            .find(|tier| tier.as_str() == s)
            .ok_or_else(|| RagError::InvalidInput(format!("unknown complexity: {s}")))
    }
}

/// Classification of a single query.
///
/// Every field is always populated from its enumerated domain. When the
/// classifier cannot produce a valid result, `QueryAnalysis::safe_default()`
/// is used instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryAnalysis {
    pub intent: QueryIntent,
    pub complexity: QueryComplexity,
    pub needs_rewrite: bool,
}

impl QueryAnalysis {
    pub fn new(intent: QueryIntent, complexity: QueryComplexity, needs_rewrite: bool) -> Self {
        Self {
            intent,
            complexity,
            needs_rewrite,
        }
    }

    /// `{conceptual, medium, needs_rewrite: false}`.
    pub fn safe_default() -> Self {
        Self::new(QueryIntent::Conceptual, QueryComplexity::Medium, false)
    }
}

impl Default for QueryAnalysis {
    fn default() -> Self {
        Self::safe_default()
    }
}
