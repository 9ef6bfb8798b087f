//! Configuration loading for research-rag.
//!
//! Layered config: defaults -> config file -> env vars -> CLI flags.
//! The default config file lives at ~/.config/research-rag/config.toml.

use config::{Config, Environment, File};
use directories::{BaseDirs, ProjectDirs};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::RagError;

/// The sentence the answer prompt asks the model to open with when the
/// retrieved context does not cover the question.
pub const DEFAULT_FALLBACK_SENTENCE: &str =
    "I couldn't find this information in the provided documents.";

/// Text-generation client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    /// Provider name ("openai" or "anthropic")
    #[serde(default = "default_llm_provider")]
    pub provider: String,

    /// Model name (e.g., "gpt-4o", "claude-3-5-sonnet-latest")
    #[serde(default = "default_llm_model")]
    pub model: String,

    /// API key (prefer the provider's env var over storing it in the file)
    #[serde(default)]
    pub api_key: Option<String>,

    /// API base URL (for custom endpoints)
    #[serde(default)]
    pub api_base_url: Option<String>,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Retries after the first failed attempt
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Sampling temperature for answer generation
    #[serde(default = "default_answer_temperature")]
    pub answer_temperature: f32,

    /// Sampling temperature for classification and rewriting
    #[serde(default)]
    pub analysis_temperature: f32,
}

fn default_llm_provider() -> String {
    "openai".to_string()
}

fn default_llm_model() -> String {
    "gpt-4o".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_max_retries() -> u32 {
    2
}

fn default_answer_temperature() -> f32 {
    0.3
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            model: default_llm_model(),
            api_key: None,
            api_base_url: None,
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            answer_temperature: default_answer_temperature(),
            analysis_temperature: 0.0,
        }
    }
}

impl LlmSettings {
    /// API key from the config, or from the provider's environment variable.
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.is_empty())
            .or_else(|| std::env::var(provider_key_var(&self.provider)).ok())
            .filter(|k| !k.is_empty())
    }
}

fn provider_key_var(provider: &str) -> &'static str {
    match provider {
        "anthropic" => "ANTHROPIC_API_KEY",
        _ => "OPENAI_API_KEY",
    }
}

/// Embedding client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingSettings {
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Embedding dimension (must match the index)
    #[serde(default = "default_embedding_dimension")]
    pub dimension: usize,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default)]
    pub api_base_url: Option<String>,

    /// Texts per embeddings request
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_embedding_dimension() -> usize {
    1536
}

fn default_batch_size() -> usize {
    64
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            model: default_embedding_model(),
            dimension: default_embedding_dimension(),
            api_key: None,
            api_base_url: None,
            batch_size: default_batch_size(),
        }
    }
}

impl EmbeddingSettings {
    /// API key from the config, or from OPENAI_API_KEY.
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.is_empty())
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .filter(|k| !k.is_empty())
    }
}

/// Vector index settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexSettings {
    /// Directory holding the HNSW index and the passage store
    #[serde(default = "default_index_path")]
    pub index_path: String,

    /// HNSW M parameter
    #[serde(default = "default_connectivity")]
    pub connectivity: usize,

    /// HNSW ef_construction
    #[serde(default = "default_expansion_add")]
    pub expansion_add: usize,

    /// HNSW ef_search
    #[serde(default = "default_expansion_search")]
    pub expansion_search: usize,

    /// Pre-allocated capacity
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

fn default_index_path() -> String {
    ProjectDirs::from("", "", "research-rag")
        .map(|p| p.data_local_dir().join("vector-index"))
        .unwrap_or_else(|| PathBuf::from("./vector-index"))
        .to_string_lossy()
        .to_string()
}

fn default_connectivity() -> usize {
    16
}

fn default_expansion_add() -> usize {
    200
}

fn default_expansion_search() -> usize {
    100
}

fn default_capacity() -> usize {
    100_000
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            index_path: default_index_path(),
            connectivity: default_connectivity(),
            expansion_add: default_expansion_add(),
            expansion_search: default_expansion_search(),
            capacity: default_capacity(),
        }
    }
}

/// Retrieval depth bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalSettings {
    /// Depth used when adaptive analysis is switched off
    #[serde(default = "default_top_k")]
    pub default_top_k: usize,

    /// Upper bound applied to every depth decision
    #[serde(default = "default_max_top_k")]
    pub max_top_k: usize,

    /// Run query analysis and rewriting before retrieval
    #[serde(default = "default_adaptive")]
    pub adaptive: bool,
}

fn default_top_k() -> usize {
    6
}

fn default_max_top_k() -> usize {
    8
}

fn default_adaptive() -> bool {
    true
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            default_top_k: default_top_k(),
            max_top_k: default_max_top_k(),
            adaptive: default_adaptive(),
        }
    }
}

/// Prompt configuration.
///
/// Template overrides are validated by the retrieval crate, which owns the
/// placeholder names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptSettings {
    #[serde(default = "default_fallback_sentence")]
    pub fallback_sentence: String,

    #[serde(default)]
    pub analysis_template: Option<String>,

    #[serde(default)]
    pub rewrite_template: Option<String>,

    #[serde(default)]
    pub answer_template: Option<String>,
}

fn default_fallback_sentence() -> String {
    DEFAULT_FALLBACK_SENTENCE.to_string()
}

impl Default for PromptSettings {
    fn default() -> Self {
        Self {
            fallback_sentence: default_fallback_sentence(),
            analysis_template: None,
            rewrite_template: None,
            answer_template: None,
        }
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub llm: LlmSettings,

    #[serde(default)]
    pub embeddings: EmbeddingSettings,

    #[serde(default)]
    pub index: IndexSettings,

    #[serde(default)]
    pub retrieval: RetrievalSettings,

    #[serde(default)]
    pub prompts: PromptSettings,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            llm: LlmSettings::default(),
            embeddings: EmbeddingSettings::default(),
            index: IndexSettings::default(),
            retrieval: RetrievalSettings::default(),
            prompts: PromptSettings::default(),
            log_level: default_log_level(),
        }
    }
}

impl Settings {
    /// Load settings with layered precedence:
    /// 1. Built-in defaults
    /// 2. Config file (~/.config/research-rag/config.toml)
    /// 3. CLI-specified config file (optional)
    /// 4. Environment variables (RAG_*, nested keys joined by `__`,
    ///    e.g. RAG_LLM__MODEL, RAG_RETRIEVAL__MAX_TOP_K)
    ///
    /// CLI flags should be applied by the caller after this returns.
    pub fn load(cli_config_path: Option<&str>) -> Result<Self, RagError> {
        let config_dir = ProjectDirs::from("", "", "research-rag")
            .map(|p| p.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        let default_config_path = config_dir.join("config");

        let mut builder = Config::builder()
            .set_default("log_level", default_log_level())
            .map_err(|e| RagError::Config(e.to_string()))?
            .set_default("llm.provider", default_llm_provider())
            .map_err(|e| RagError::Config(e.to_string()))?
            .set_default("llm.model", default_llm_model())
            .map_err(|e| RagError::Config(e.to_string()))?
            .set_default("index.index_path", default_index_path())
            .map_err(|e| RagError::Config(e.to_string()))?
            .add_source(File::with_name(&default_config_path.to_string_lossy()).required(false));

        if let Some(path) = cli_config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix("RAG")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| RagError::Config(e.to_string()))?;

        let settings: Settings = config
            .try_deserialize()
            .map_err(|e| RagError::Config(e.to_string()))?;

        settings.validate()?;
        Ok(settings)
    }

    /// Validate cross-field constraints.
    pub fn validate(&self) -> Result<(), RagError> {
        if self.retrieval.max_top_k == 0 {
            return Err(RagError::Config("retrieval.max_top_k must be >= 1".to_string()));
        }
        if self.retrieval.default_top_k == 0
            || self.retrieval.default_top_k > self.retrieval.max_top_k
        {
            return Err(RagError::Config(format!(
                "retrieval.default_top_k must be within 1..={}, got {}",
                self.retrieval.max_top_k, self.retrieval.default_top_k
            )));
        }
        if self.prompts.fallback_sentence.trim().is_empty() {
            return Err(RagError::Config(
                "prompts.fallback_sentence must not be empty".to_string(),
            ));
        }
        if self.embeddings.dimension == 0 {
            return Err(RagError::Config("embeddings.dimension must be > 0".to_string()));
        }
        if self.embeddings.batch_size == 0 {
            return Err(RagError::Config("embeddings.batch_size must be > 0".to_string()));
        }
        Ok(())
    }

    /// Expand ~ in index_path to the home directory
    pub fn expanded_index_path(&self) -> PathBuf {
        let path = &self.index.index_path;
        if let Some(rest) = path.strip_prefix("~/") {
            if let Some(dirs) = BaseDirs::new() {
                return dirs.home_dir().join(rest);
            }
        }
        PathBuf::from(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.llm.provider, "openai");
        assert_eq!(settings.llm.model, "gpt-4o");
        assert_eq!(settings.llm.max_retries, 2);
        assert_eq!(settings.retrieval.default_top_k, 6);
        assert_eq!(settings.retrieval.max_top_k, 8);
        assert!(settings.retrieval.adaptive);
        assert_eq!(settings.prompts.fallback_sentence, DEFAULT_FALLBACK_SENTENCE);
        assert_eq!(settings.log_level, "info");
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_default_matches_empty_document() {
        let parsed: Settings = serde_json::from_str("{}").unwrap();
        let built = Settings::default();
        assert_eq!(parsed.log_level, built.log_level);
        assert_eq!(parsed.index.index_path, built.index.index_path);
        assert_eq!(parsed.retrieval.max_top_k, built.retrieval.max_top_k);
    }

    #[test]
    fn test_load_from_file() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("rag.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
log_level = "debug"

[llm]
model = "gpt-4o-mini"
max_retries = 1

[retrieval]
max_top_k = 10
"#
        )
        .unwrap();

        let settings = Settings::load(Some(path.to_str().unwrap())).unwrap();
        assert_eq!(settings.log_level, "debug");
        assert_eq!(settings.llm.model, "gpt-4o-mini");
        assert_eq!(settings.llm.max_retries, 1);
        assert_eq!(settings.retrieval.max_top_k, 10);
        // Untouched sections keep their defaults
        assert_eq!(settings.retrieval.default_top_k, 6);
        assert_eq!(settings.embeddings.model, "text-embedding-3-small");
    }

    #[test]
    fn test_missing_cli_config_is_an_error() {
        let result = Settings::load(Some("/nonexistent/research-rag/config.toml"));
        assert!(matches!(result, Err(RagError::Config(_))));
    }

    #[test]
    fn test_validation() {
        let mut settings = Settings::default();
        settings.retrieval.max_top_k = 0;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.retrieval.default_top_k = 9;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.prompts.fallback_sentence = "   ".to_string();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_explicit_api_key_wins() {
        let settings = LlmSettings {
            api_key: Some("sk-test".to_string()),
            ..Default::default()
        };
        assert_eq!(settings.resolved_api_key().as_deref(), Some("sk-test"));
    }

    #[test]
    fn test_expanded_index_path() {
        let mut settings = Settings::default();
        settings.index.index_path = "/var/lib/rag/index".to_string();
        assert_eq!(
            settings.expanded_index_path(),
            PathBuf::from("/var/lib/rag/index")
        );

        settings.index.index_path = "~/rag-index".to_string();
        assert!(settings.expanded_index_path().ends_with("rag-index"));
        assert!(!settings.expanded_index_path().starts_with("~"));
    }
}
