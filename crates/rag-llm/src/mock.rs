//! In-process model doubles for tests and offline runs.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::embedder::{Embedding, EmbeddingModel, ModelInfo};
use crate::error::LlmError;
use crate::generator::{GenerationRequest, TextGenerator};

/// Scripted text generator keyed by request task.
///
/// Tasks without a configured reply get the default response. Every request
/// is recorded so tests can assert on prompts and call order.
#[derive(Debug)]
pub struct MockGenerator {
    responses: HashMap<String, String>,
    delays: HashMap<String, Duration>,
    fail_tasks: HashSet<String>,
    default_response: String,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl Default for MockGenerator {
    fn default() -> Self {
        Self {
            responses: HashMap::new(),
            delays: HashMap::new(),
            fail_tasks: HashSet::new(),
            default_response: "mock response".to_string(),
            requests: Mutex::new(Vec::new()),
        }
    }
}

impl MockGenerator {
    /// Reply for a task.
    pub fn with_response(mut self, task: &str, response: impl Into<String>) -> Self {
        self.responses.insert(task.to_string(), response.into());
        self
    }

    /// Reply for tasks with no configured response.
    pub fn with_default_response(mut self, response: impl Into<String>) -> Self {
        self.default_response = response.into();
        self
    }

    /// Fail every request for a task.
    pub fn with_failure(mut self, task: &str) -> Self {
        self.fail_tasks.insert(task.to_string());
        self
    }

    /// Delay replies for a task.
    pub fn with_delay(mut self, task: &str, delay: Duration) -> Self {
        self.delays.insert(task.to_string(), delay);
        self
    }

    /// All recorded requests, in call order.
    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Recorded requests for one task.
    pub fn requests_for(&self, task: &str) -> Vec<GenerationRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.task == task)
            .collect()
    }

    /// Task labels in call order.
    pub fn call_order(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.task).collect()
    }
}

#[async_trait]
impl TextGenerator for MockGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, LlmError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());

        if let Some(delay) = self.delays.get(&request.task) {
            tokio::time::sleep(*delay).await;
        }

        if self.fail_tasks.contains(&request.task) {
            return Err(LlmError::ApiError(format!(
                "{} generation failed",
                request.task
            )));
        }

        Ok(self
            .responses
            .get(&request.task)
            .cloned()
            .unwrap_or_else(|| self.default_response.clone()))
    }

    fn name(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock-model"
    }
}

/// Deterministic bag-of-words embedder.
///
/// Each lowercase alphanumeric token is hashed (FNV-1a) into a bucket, so
/// texts sharing words land close together. Text with no tokens maps to the
/// first basis vector.
#[derive(Debug)]
pub struct MockEmbedder {
    info: ModelInfo,
    fail: bool,
}

impl MockEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            info: ModelInfo {
                name: "mock-embedder".to_string(),
                dimension: dimension.max(1),
            },
            fail: false,
        }
    }

    /// An embedder whose every call fails.
    pub fn failing(dimension: usize) -> Self {
        Self {
            fail: true,
            ..Self::new(dimension)
        }
    }

    /// Embed without going through the async trait.
    pub fn embed_sync(&self, text: &str) -> Embedding {
        let dim = self.info.dimension;
        let mut values = vec![0.0f32; dim];
        let mut any = false;

        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let bucket = (fnv1a(&token.to_lowercase()) % dim as u64) as usize;
            values[bucket] += 1.0;
            any = true;
        }

        if !any {
            values[0] = 1.0;
        }

        Embedding::new(values)
    }
}

fn fnv1a(s: &str) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in s.bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

#[async_trait]
impl EmbeddingModel for MockEmbedder {
    fn info(&self) -> &ModelInfo {
        &self.info
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>, LlmError> {
        if self.fail {
            return Err(LlmError::ApiError("embedding service unavailable".to_string()));
        }
        Ok(texts.iter().map(|t| self.embed_sync(t)).collect())
    }
}
