//! Retrieval gateway contract.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use rag_types::Passage;

use crate::error::RetrievalError;

/// Source of ranked passages for a query.
///
/// Implementations return at most `k` passages, best first. A `k` larger
/// than the index and an empty index are not errors.
#[async_trait]
pub trait RetrievalGateway: Send + Sync {
    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<Passage>, RetrievalError>;

    /// Gateway name for logs.
    fn name(&self) -> &str {
        "gateway"
    }
}

/// In-memory gateway for tests.
///
/// Returns the first `k` configured passages regardless of the query and
/// records every `(query, k)` call.
#[derive(Debug, Default)]
pub struct MockRetrievalGateway {
    passages: Vec<Passage>,
    fail: bool,
    calls: Mutex<Vec<(String, usize)>>,
}

impl MockRetrievalGateway {
    pub fn with_passages(mut self, passages: Vec<Passage>) -> Self {
        self.passages = passages;
        self
    }

    pub fn with_failure(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Recorded `(query, k)` calls, in order.
    pub fn calls(&self) -> Vec<(String, usize)> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl RetrievalGateway for MockRetrievalGateway {
    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<Passage>, RetrievalError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((query.to_string(), k));

        if self.fail {
            return Err(RetrievalError::Retrieval("index unavailable".to_string()));
        }

        Ok(self.passages.iter().take(k).cloned().collect())
    }

    fn name(&self) -> &str {
        "mock"
    }
}
