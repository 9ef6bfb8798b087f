//! Embedding model trait and the HTTP embeddings client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

use rag_types::EmbeddingSettings;

use crate::api::check_status;
use crate::error::LlmError;
use crate::retry::RetryPolicy;

/// Vector embedding, normalized to unit length.
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding {
    pub values: Vec<f32>,
}

impl Embedding {
    /// Create an embedding, normalizing to unit length.
    pub fn new(values: Vec<f32>) -> Self {
        let norm: f32 = values.iter().map(|x| x * x).sum::<f32>().sqrt();
        let values = if norm > 0.0 {
            values.iter().map(|x| x / norm).collect()
        } else {
            values
        };
        Self { values }
    }

    pub fn dimension(&self) -> usize {
        self.values.len()
    }

    /// Cosine similarity in [-1, 1]. Returns 0.0 on dimension mismatch.
    pub fn cosine_similarity(&self, other: &Embedding) -> f32 {
        if self.values.len() != other.values.len() {
            return 0.0;
        }
        self.values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| a * b)
            .sum()
    }
}

/// Model information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelInfo {
    pub name: String,
    pub dimension: usize,
}

/// Trait for embedding models.
///
/// Implementations must be thread-safe (Send + Sync) for concurrent use.
#[async_trait]
pub trait EmbeddingModel: Send + Sync {
    fn info(&self) -> &ModelInfo;

    /// Generate embedding for a single text.
    async fn embed(&self, text: &str) -> Result<Embedding, LlmError> {
        let mut batch = self.embed_batch(&[text.to_string()]).await?;
        batch.pop().ok_or(LlmError::EmptyResponse)
    }

    /// Generate embeddings for multiple texts, in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>, LlmError>;
}

/// Configuration for [`ApiEmbedder`].
#[derive(Debug, Clone)]
pub struct ApiEmbedderConfig {
    /// API base URL (e.g., "https://api.openai.com/v1")
    pub base_url: String,
    pub model: String,
    pub dimension: usize,
    pub api_key: SecretString,
    pub batch_size: usize,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl ApiEmbedderConfig {
    pub fn openai(api_key: impl Into<String>, model: impl Into<String>, dimension: usize) -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: model.into(),
            dimension,
            api_key: SecretString::from(api_key.into()),
            batch_size: 64,
            timeout: Duration::from_secs(60),
            retry: RetryPolicy::default(),
        }
    }

    /// Build from loaded settings. Fails if no API key can be resolved.
    pub fn from_settings(settings: &EmbeddingSettings) -> Result<Self, LlmError> {
        let api_key = settings.resolved_api_key().ok_or_else(|| {
            LlmError::ConfigError("no API key configured for embeddings".to_string())
        })?;

        let mut config = Self::openai(api_key, settings.model.clone(), settings.dimension);
        if let Some(base_url) = settings.api_base_url.as_ref().filter(|u| !u.is_empty()) {
            config.base_url = base_url.trim_end_matches('/').to_string();
        }
        config.batch_size = settings.batch_size.max(1);
        Ok(config)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// Embedding model served by an OpenAI-compatible `/embeddings` endpoint.
pub struct ApiEmbedder {
    client: Client,
    config: ApiEmbedderConfig,
    info: ModelInfo,
}

impl ApiEmbedder {
    pub fn new(config: ApiEmbedderConfig) -> Result<Self, LlmError> {
        if config.dimension == 0 {
            return Err(LlmError::ConfigError(
                "embedding dimension must be > 0".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::ConfigError(e.to_string()))?;

        let info = ModelInfo {
            name: config.model.clone(),
            dimension: config.dimension,
        };

        Ok(Self {
            client,
            config,
            info,
        })
    }

    async fn request_chunk(&self, chunk: &[String]) -> Result<Vec<Embedding>, LlmError> {
        #[derive(Serialize)]
        struct EmbeddingsRequest<'a> {
            model: &'a str,
            input: &'a [String],
        }

        #[derive(Deserialize)]
        struct EmbeddingsResponse {
            data: Vec<EmbeddingData>,
        }

        #[derive(Deserialize)]
        struct EmbeddingData {
            index: usize,
            embedding: Vec<f32>,
        }

        let url = format!("{}/embeddings", self.config.base_url);

        let response = self
            .client
            .post(&url)
            .header(
                "Authorization",
                format!("Bearer {}", self.config.api_key.expose_secret()),
            )
            .json(&EmbeddingsRequest {
                model: &self.config.model,
                input: chunk,
            })
            .send()
            .await?;

        let response = check_status(response).await?;

        let mut body: EmbeddingsResponse = response
            .json()
            .await
            .map_err(|e| LlmError::ParseError(e.to_string()))?;

        if body.data.len() != chunk.len() {
            return Err(LlmError::ParseError(format!(
                "expected {} embeddings, got {}",
                chunk.len(),
                body.data.len()
            )));
        }

        body.data.sort_by_key(|d| d.index);

        body.data
            .into_iter()
            .map(|d| {
                if d.embedding.len() != self.config.dimension {
                    return Err(LlmError::DimensionMismatch {
                        expected: self.config.dimension,
                        actual: d.embedding.len(),
                    });
                }
                Ok(Embedding::new(d.embedding))
            })
            .collect()
    }
}

#[async_trait]
impl EmbeddingModel for ApiEmbedder {
    fn info(&self) -> &ModelInfo {
        &self.info
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>, LlmError> {
        let mut embeddings = Vec::with_capacity(texts.len());

        for chunk in texts.chunks(self.config.batch_size) {
            debug!(model = %self.config.model, count = chunk.len(), "Embedding batch");
            let batch = self
                .config
                .retry
                .run("embed", || self.request_chunk(chunk))
                .await?;
            embeddings.extend(batch);
        }

        Ok(embeddings)
    }
}
