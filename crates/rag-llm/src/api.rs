//! HTTP text generator for OpenAI-compatible and Anthropic endpoints.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

use rag_types::LlmSettings;

use crate::error::LlmError;
use crate::generator::{GenerationRequest, TextGenerator};
use crate::retry::RetryPolicy;

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 1024;

/// Wire protocol spoken by the endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiProvider {
    OpenAi,
    Anthropic,
}

impl ApiProvider {
    pub fn parse(name: &str) -> Result<Self, LlmError> {
        match name.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(ApiProvider::OpenAi),
            "anthropic" | "claude" => Ok(ApiProvider::Anthropic),
            other => Err(LlmError::ConfigError(format!(
                "unknown LLM provider '{}'",
                other
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ApiProvider::OpenAi => "openai",
            ApiProvider::Anthropic => "anthropic",
        }
    }

    fn default_base_url(&self) -> &'static str {
        match self {
            ApiProvider::OpenAi => OPENAI_BASE_URL,
            ApiProvider::Anthropic => ANTHROPIC_BASE_URL,
        }
    }
}

/// Configuration for [`ApiGenerator`].
#[derive(Debug, Clone)]
pub struct ApiGeneratorConfig {
    pub provider: ApiProvider,

    /// API base URL (e.g., "https://api.openai.com/v1")
    pub base_url: String,

    pub model: String,

    pub api_key: SecretString,

    /// Per-request timeout
    pub timeout: Duration,

    pub retry: RetryPolicy,
}

impl ApiGeneratorConfig {
    /// Config for the OpenAI API.
    pub fn openai(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self::for_provider(ApiProvider::OpenAi, api_key, model)
    }

    /// Config for the Anthropic API.
    pub fn anthropic(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self::for_provider(ApiProvider::Anthropic, api_key, model)
    }

    fn for_provider(
        provider: ApiProvider,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            base_url: provider.default_base_url().to_string(),
            model: model.into(),
            api_key: SecretString::from(api_key.into()),
            timeout: Duration::from_secs(60),
            retry: RetryPolicy::default(),
        }
    }

    /// Build from loaded settings. Fails if no API key can be resolved.
    pub fn from_settings(settings: &LlmSettings) -> Result<Self, LlmError> {
        let provider = ApiProvider::parse(&settings.provider)?;
        let api_key = settings.resolved_api_key().ok_or_else(|| {
            LlmError::ConfigError(format!(
                "no API key configured for provider '{}'",
                provider.as_str()
            ))
        })?;

        let mut config = Self::for_provider(provider, api_key, settings.model.clone());
        if let Some(base_url) = settings.api_base_url.as_ref().filter(|u| !u.is_empty()) {
            config.base_url = base_url.trim_end_matches('/').to_string();
        }
        config.timeout = Duration::from_secs(settings.timeout_secs);
        config.retry = config.retry.with_max_retries(settings.max_retries);
        Ok(config)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// Text generator backed by a hosted chat-completion API.
pub struct ApiGenerator {
    client: Client,
    config: ApiGeneratorConfig,
}

impl ApiGenerator {
    pub fn new(config: ApiGeneratorConfig) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::ConfigError(e.to_string()))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ApiGeneratorConfig {
        &self.config
    }

    async fn make_request(&self, request: &GenerationRequest) -> Result<String, LlmError> {
        let text = match self.config.provider {
            ApiProvider::OpenAi => self.make_openai_request(request).await?,
            ApiProvider::Anthropic => self.make_anthropic_request(request).await?,
        };

        if text.trim().is_empty() {
            return Err(LlmError::EmptyResponse);
        }
        Ok(text)
    }

    async fn make_openai_request(&self, request: &GenerationRequest) -> Result<String, LlmError> {
        #[derive(Serialize)]
        struct OpenAIRequest<'a> {
            model: &'a str,
            messages: Vec<OpenAIMessage<'a>>,
            temperature: f32,
            max_tokens: u32,
            #[serde(skip_serializing_if = "Option::is_none")]
            response_format: Option<OpenAIResponseFormat>,
        }

        #[derive(Serialize)]
        struct OpenAIMessage<'a> {
            role: &'a str,
            content: &'a str,
        }

        #[derive(Serialize)]
        struct OpenAIResponseFormat {
            #[serde(rename = "type")]
            format_type: &'static str,
        }

        #[derive(Deserialize)]
        struct OpenAIResponse {
            choices: Vec<OpenAIChoice>,
        }

        #[derive(Deserialize)]
        struct OpenAIChoice {
            message: OpenAIMessageResponse,
        }

        #[derive(Deserialize)]
        struct OpenAIMessageResponse {
            content: Option<String>,
        }

        let body = OpenAIRequest {
            model: &self.config.model,
            messages: vec![OpenAIMessage {
                role: "user",
                content: &request.prompt,
            }],
            temperature: request.temperature,
            max_tokens: MAX_TOKENS,
            response_format: request.json_mode.then_some(OpenAIResponseFormat {
                format_type: "json_object",
            }),
        };

        let url = format!("{}/chat/completions", self.config.base_url);

        let response = self
            .client
            .post(&url)
            .header(
                "Authorization",
                format!("Bearer {}", self.config.api_key.expose_secret()),
            )
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let response = check_status(response).await?;

        let response_body: OpenAIResponse = response
            .json()
            .await
            .map_err(|e| LlmError::ParseError(e.to_string()))?;

        response_body
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::ParseError("No choices in response".to_string()))?
            .message
            .content
            .ok_or(LlmError::EmptyResponse)
    }

    async fn make_anthropic_request(
        &self,
        request: &GenerationRequest,
    ) -> Result<String, LlmError> {
        #[derive(Serialize)]
        struct AnthropicRequest<'a> {
            model: &'a str,
            max_tokens: u32,
            temperature: f32,
            messages: Vec<AnthropicMessage<'a>>,
        }

        #[derive(Serialize)]
        struct AnthropicMessage<'a> {
            role: &'a str,
            content: &'a str,
        }

        #[derive(Deserialize)]
        struct AnthropicResponse {
            content: Vec<AnthropicContent>,
        }

        #[derive(Deserialize)]
        struct AnthropicContent {
            #[serde(default)]
            text: String,
        }

        // Anthropic has no JSON response mode; the prompt already asks for JSON
        let body = AnthropicRequest {
            model: &self.config.model,
            max_tokens: MAX_TOKENS,
            temperature: request.temperature,
            messages: vec![AnthropicMessage {
                role: "user",
                content: &request.prompt,
            }],
        };

        let url = format!("{}/messages", self.config.base_url);

        let response = self
            .client
            .post(&url)
            .header("x-api-key", self.config.api_key.expose_secret())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let response = check_status(response).await?;

        let response_body: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| LlmError::ParseError(e.to_string()))?;

        response_body
            .content
            .into_iter()
            .next()
            .map(|c| c.text)
            .ok_or_else(|| LlmError::ParseError("No content in response".to_string()))
    }
}

/// Map non-success responses onto [`LlmError`].
pub(crate) async fn check_status(response: Response) -> Result<Response, LlmError> {
    let status = response.status();
    if status.as_u16() == 429 {
        return Err(LlmError::RateLimitExceeded);
    }

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(LlmError::Status {
            status: status.as_u16(),
            body,
        });
    }

    Ok(response)
}

#[async_trait]
impl TextGenerator for ApiGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, LlmError> {
        debug!(
            task = %request.task,
            provider = self.config.provider.as_str(),
            model = %self.config.model,
            json_mode = request.json_mode,
            "Generating"
        );
        self.config
            .retry
            .run(&request.task, || self.make_request(request))
            .await
    }

    fn name(&self) -> &str {
        self.config.provider.as_str()
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn openai_reply(content: &str) -> serde_json::Value {
        json!({
            "choices": [{"message": {"role": "assistant", "content": content}}]
        })
    }

    fn fast_retry(max_retries: u32) -> RetryPolicy {
        RetryPolicy::default()
            .with_max_retries(max_retries)
            .with_initial_interval(Duration::from_millis(5))
    }

    fn openai_generator(server: &MockServer, max_retries: u32) -> ApiGenerator {
        let config = ApiGeneratorConfig::openai("test-key", "gpt-4o")
            .with_base_url(server.uri())
            .with_retry(fast_retry(max_retries));
        ApiGenerator::new(config).unwrap()
    }

    #[test]
    fn test_provider_parse() {
        assert_eq!(ApiProvider::parse("OpenAI").unwrap(), ApiProvider::OpenAi);
        assert_eq!(
            ApiProvider::parse("anthropic").unwrap(),
            ApiProvider::Anthropic
        );
        assert!(matches!(
            ApiProvider::parse("bard"),
            Err(LlmError::ConfigError(_))
        ));
    }

    #[test]
    fn test_from_settings_applies_overrides() {
        let settings = LlmSettings {
            provider: "anthropic".to_string(),
            model: "claude-3-5-sonnet-latest".to_string(),
            api_key: Some("sk-test".to_string()),
            api_base_url: Some("http://localhost:9999/v1/".to_string()),
            timeout_secs: 5,
            max_retries: 4,
            ..Default::default()
        };
        let config = ApiGeneratorConfig::from_settings(&settings).unwrap();
        assert_eq!(config.provider, ApiProvider::Anthropic);
        assert_eq!(config.base_url, "http://localhost:9999/v1");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.retry.max_retries, 4);
    }

    #[tokio::test]
    async fn test_openai_json_mode_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("Authorization", "Bearer test-key"))
            .and(body_partial_json(json!({
                "model": "gpt-4o",
                "response_format": {"type": "json_object"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(openai_reply(
                r#"{"intent": "factual", "complexity": "low", "needs_rewrite": false}"#,
            )))
            .expect(1)
            .mount(&server)
            .await;

        let generator = openai_generator(&server, 0);
        let request = GenerationRequest::new("analyze", "classify").json();
        let text = generator.generate(&request).await.unwrap();
        assert!(text.contains("factual"));
    }

    #[tokio::test]
    async fn test_retries_server_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(openai_reply("Paris.")))
            .expect(1)
            .mount(&server)
            .await;

        let generator = openai_generator(&server, 2);
        let text = generator
            .generate(&GenerationRequest::new("answer", "Capital of France?"))
            .await
            .unwrap();
        assert_eq!(text, "Paris.");
    }

    #[tokio::test]
    async fn test_rate_limit_surfaces_after_retries() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429))
            .expect(2)
            .mount(&server)
            .await;

        let generator = openai_generator(&server, 1);
        let result = generator
            .generate(&GenerationRequest::new("answer", "question"))
            .await;
        assert!(matches!(result, Err(LlmError::RateLimitExceeded)));
    }

    #[tokio::test]
    async fn test_client_error_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .expect(1)
            .mount(&server)
            .await;

        let generator = openai_generator(&server, 3);
        let result = generator
            .generate(&GenerationRequest::new("answer", "question"))
            .await;
        match result {
            Err(LlmError::Status { status, body }) => {
                assert_eq!(status, 401);
                assert_eq!(body, "bad key");
            }
            other => panic!("expected status error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_null_content_is_empty_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": null}}]
            })))
            .mount(&server)
            .await;

        let generator = openai_generator(&server, 0);
        let result = generator
            .generate(&GenerationRequest::new("answer", "question"))
            .await;
        assert!(matches!(result, Err(LlmError::EmptyResponse)));
    }

    #[tokio::test]
    async fn test_anthropic_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/messages"))
            .and(header("x-api-key", "test-key"))
            .and(header("anthropic-version", ANTHROPIC_VERSION))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "content": [{"type": "text", "text": "Rewritten query"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let config = ApiGeneratorConfig::anthropic("test-key", "claude-3-5-sonnet-latest")
            .with_base_url(server.uri())
            .with_retry(fast_retry(0));
        let generator = ApiGenerator::new(config).unwrap();
        assert_eq!(generator.name(), "anthropic");

        let text = generator
            .generate(&GenerationRequest::new("rewrite", "rewrite this"))
            .await
            .unwrap();
        assert_eq!(text, "Rewritten query");
    }
}
