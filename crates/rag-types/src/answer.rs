//! Answers and the response shape handed to callers.

use serde::{Deserialize, Serialize};

use crate::passage::{Passage, PassageMetadata};

/// Generated text plus the passages that ground it.
///
/// When the text is a fallback answer the passage list is empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub text: String,
    pub passages: Vec<Passage>,
}

impl Answer {
    pub fn new(text: impl Into<String>, passages: Vec<Passage>) -> Self {
        Self {
            text: text.into(),
            passages,
        }
    }

    /// True if no passages back this answer.
    pub fn is_ungrounded(&self) -> bool {
        self.passages.is_empty()
    }
}

/// One source entry in a query response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceEntry {
    pub content: String,
    pub metadata: PassageMetadata,
}

impl From<Passage> for SourceEntry {
    fn from(passage: Passage) -> Self {
        Self {
            content: passage.content,
            metadata: passage.metadata,
        }
    }
}

/// `{answer, sources}` as returned by `run_query`.
///
/// Sources keep retrieval order and are not deduplicated; display-level
/// deduplication is the caller's concern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub answer: String,
    pub sources: Vec<SourceEntry>,
}

impl From<Answer> for QueryResponse {
    fn from(answer: Answer) -> Self {
        Self {
            answer: answer.text,
            sources: answer.passages.into_iter().map(SourceEntry::from).collect(),
        }
    }
}
