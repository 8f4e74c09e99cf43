//! Pipeline configuration with builder pattern and environment variable support.
//!
//! Configuration is resolved in order: explicit values → environment variables → defaults.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::NqlError;

/// Default base URL: Ollama's OpenAI-compatible endpoint.
const DEFAULT_BASE_URL: &str = "http://localhost:11434/v1";
/// Default model identifier.
const DEFAULT_MODEL: &str = "qwen2.5-coder:1.5b";
/// Default max tokens for SQL generation and correction.
const DEFAULT_MAX_TOKENS: u32 = 1024;
/// Default max tokens for the human-readable answer.
const DEFAULT_SUMMARY_MAX_TOKENS: u32 = 512;
/// Default model request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 120;
/// Default database statement timeout in seconds.
const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 30;
/// Default correction budget for `chat`.
const DEFAULT_MAX_RETRIES: u32 = 3;
/// Default number of result rows shown to the summarizer.
const DEFAULT_SUMMARY_ROW_LIMIT: usize = 50;

/// Configuration for the NL-to-SQL pipeline.
#[derive(Debug, Clone)]
pub struct NqlConfig {
    /// LLM provider name (e.g., "openai").
    pub provider: String,
    /// API key for the provider. Local servers usually need none.
    pub api_key: Option<String>,
    /// Base URL of the OpenAI-compatible API.
    pub base_url: String,
    /// Model identifier used for every call.
    pub model: String,
    /// Maximum tokens for generation and correction responses.
    pub max_tokens: u32,
    /// Maximum tokens for the human-readable answer.
    pub summary_max_tokens: u32,
    /// Model request timeout. Always non-zero.
    pub timeout: Duration,
    /// Database statement timeout. Always non-zero.
    pub query_timeout: Duration,
    /// Correction budget used when the caller does not give one.
    pub max_retries: u32,
    /// Maximum rows embedded in the summarization prompt.
    pub summary_row_limit: usize,
    /// Directory containing prompt template files.
    ///
    /// When set, system prompts are loaded from markdown files in this
    /// directory, falling back to compiled-in defaults for any missing files.
    pub prompt_dir: Option<PathBuf>,
}

impl NqlConfig {
    /// Creates a new builder for `NqlConfig`.
    #[must_use]
    pub fn builder() -> NqlConfigBuilder {
        NqlConfigBuilder::default()
    }

    /// Creates configuration from environment variables with defaults.
    ///
    /// # Errors
    ///
    /// Returns [`NqlError::Configuration`] if the resolved values are invalid.
    pub fn from_env() -> Result<Self, NqlError> {
        Self::builder().from_env().build()
    }
}

/// Builder for [`NqlConfig`].
#[derive(Debug, Clone, Default)]
pub struct NqlConfigBuilder {
    provider: Option<String>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    max_tokens: Option<u32>,
    summary_max_tokens: Option<u32>,
    timeout: Option<Duration>,
    query_timeout: Option<Duration>,
    max_retries: Option<u32>,
    summary_row_limit: Option<usize>,
    prompt_dir: Option<PathBuf>,
}

impl NqlConfigBuilder {
    /// Populates unset fields from environment variables.
    #[must_use]
    pub fn from_env(mut self) -> Self {
        if self.provider.is_none() {
            self.provider = std::env::var("NQL_PROVIDER").ok();
        }
        if self.api_key.is_none() {
            self.api_key = std::env::var("NQL_API_KEY")
                .or_else(|_| std::env::var("OPENAI_API_KEY"))
                .ok();
        }
        if self.base_url.is_none() {
            self.base_url = std::env::var("NQL_BASE_URL")
                .or_else(|_| std::env::var("OPENAI_BASE_URL"))
                .ok();
        }
        if self.model.is_none() {
            self.model = std::env::var("NQL_MODEL").ok();
        }
        if self.timeout.is_none() {
            self.timeout = std::env::var("NQL_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs);
        }
        if self.query_timeout.is_none() {
            self.query_timeout = std::env::var("NQL_QUERY_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs);
        }
        if self.max_retries.is_none() {
            self.max_retries = std::env::var("NQL_MAX_RETRIES")
                .ok()
                .and_then(|v| v.parse().ok());
        }
        if self.prompt_dir.is_none() {
            self.prompt_dir = std::env::var("NQL_PROMPT_DIR").ok().map(PathBuf::from);
        }
        self
    }

    /// Sets the LLM provider name.
    #[must_use]
    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Sets the API key.
    #[must_use]
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the base URL.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the model identifier.
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the generation max tokens.
    #[must_use]
    pub const fn max_tokens(mut self, n: u32) -> Self {
        self.max_tokens = Some(n);
        self
    }

    /// Sets the summary max tokens.
    #[must_use]
    pub const fn summary_max_tokens(mut self, n: u32) -> Self {
        self.summary_max_tokens = Some(n);
        self
    }

    /// Sets the model request timeout.
    #[must_use]
    pub const fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    /// Sets the database statement timeout.
    #[must_use]
    pub const fn query_timeout(mut self, duration: Duration) -> Self {
        self.query_timeout = Some(duration);
        self
    }

    /// Sets the default correction budget.
    #[must_use]
    pub const fn max_retries(mut self, n: u32) -> Self {
        self.max_retries = Some(n);
        self
    }

    /// Sets the maximum rows shown to the summarizer.
    #[must_use]
    pub const fn summary_row_limit(mut self, n: usize) -> Self {
        self.summary_row_limit = Some(n);
        self
    }

    /// Sets the prompt template directory.
    #[must_use]
    pub fn prompt_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.prompt_dir = Some(dir.into());
        self
    }

    /// Builds the [`NqlConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`NqlError::Configuration`] if the model name is empty or a
    /// timeout is zero.
    pub fn build(self) -> Result<NqlConfig, NqlError> {
        let model = self.model.unwrap_or_else(|| DEFAULT_MODEL.to_string());
        if model.trim().is_empty() {
            return Err(NqlError::configuration("model name is empty"));
        }

        let timeout = self
            .timeout
            .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        let query_timeout = self
            .query_timeout
            .unwrap_or(Duration::from_secs(DEFAULT_QUERY_TIMEOUT_SECS));
        if timeout.is_zero() || query_timeout.is_zero() {
            return Err(NqlError::configuration("timeouts must be non-zero"));
        }

        Ok(NqlConfig {
            provider: self.provider.unwrap_or_else(|| "openai".to_string()),
            api_key: self.api_key.filter(|k| !k.is_empty()),
            base_url: self
                .base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model,
            max_tokens: self.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            summary_max_tokens: self
                .summary_max_tokens
                .unwrap_or(DEFAULT_SUMMARY_MAX_TOKENS),
            timeout,
            query_timeout,
            max_retries: self.max_retries.unwrap_or(DEFAULT_MAX_RETRIES),
            summary_row_limit: self.summary_row_limit.unwrap_or(DEFAULT_SUMMARY_ROW_LIMIT),
            prompt_dir: self.prompt_dir,
        })
    }
}
