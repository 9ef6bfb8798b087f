//! # rag-llm
//!
//! Model clients for the research-rag pipeline.
//!
//! - [`TextGenerator`]: prompt in, text out. [`ApiGenerator`] speaks the
//!   OpenAI chat-completions and Anthropic messages protocols.
//! - [`EmbeddingModel`]: text in, unit vector out. [`ApiEmbedder`] calls an
//!   OpenAI-compatible `/embeddings` endpoint.
//! - [`RetryPolicy`]: bounded exponential backoff shared by both clients.
//!
//! [`MockGenerator`] and [`MockEmbedder`] are deterministic stand-ins used by
//! tests and offline runs.

pub mod api;
pub mod embedder;
pub mod error;
pub mod generator;
pub mod mock;
pub mod retry;

pub use api::{ApiGenerator, ApiGeneratorConfig, ApiProvider};
pub use embedder::{ApiEmbedder, ApiEmbedderConfig, Embedding, EmbeddingModel, ModelInfo};
pub use error::LlmError;
pub use generator::{extract_json, GenerationRequest, TextGenerator};
pub use mock::{MockEmbedder, MockGenerator};
pub use retry::RetryPolicy;
