//! Text-generation trait and request type.

use async_trait::async_trait;

use crate::error::LlmError;

/// One text-generation call.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    /// Short label for the calling stage ("analyze", "rewrite", "answer")
    pub task: String,

    /// Fully rendered prompt
    pub prompt: String,

    pub temperature: f32,

    /// Ask the provider for a JSON object response where supported
    pub json_mode: bool,
}

impl GenerationRequest {
    pub fn new(task: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            prompt: prompt.into(),
            temperature: 0.0,
            json_mode: false,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn json(mut self) -> Self {
        self.json_mode = true;
        self
    }
}

/// A text-generation backend.
///
/// Implementations must be safe to share across concurrent queries.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate a completion for the request.
    async fn generate(&self, request: &GenerationRequest) -> Result<String, LlmError>;

    /// Backend name for logs and status output.
    fn name(&self) -> &str;

    /// Model identifier.
    fn model(&self) -> &str;
}

/// Extract a JSON object from model output.
///
/// Handles fenced code blocks and leading or trailing chatter around the
/// object. Returns the input unchanged when no object is found.
pub fn extract_json(text: &str) -> String {
    if let Some(start) = text.find("```json") {
        if let Some(end) = text[start + 7..].find("```") {
            return text[start + 7..start + 7 + end].trim().to_string();
        }
    }

    if let Some(start) = text.find("```") {
        if let Some(end) = text[start + 3..].find("```") {
            return text[start + 3..start + 3 + end].trim().to_string();
        }
    }

    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
        if start < end {
            return text[start..=end].to_string();
        }
    }

    text.trim().to_string()
}
