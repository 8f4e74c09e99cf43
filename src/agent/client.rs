//! Provider registry and factory.
//!
//! Maps provider names to concrete [`LlmProvider`] implementations.

use crate::agent::config::NqlConfig;
use crate::agent::provider::LlmProvider;
use crate::agent::providers::OpenAiProvider;
use crate::error::NqlError;

/// Creates an [`LlmProvider`] based on the configured provider name.
///
/// # Supported Providers
///
/// - `"openai"` (default) — OpenAI-compatible APIs via `async-openai`
/// - `"ollama"` — alias for `"openai"`; point `base_url` at Ollama's `/v1`
///
/// # Errors
///
/// Returns [`NqlError::UnsupportedProvider`] for unknown provider names.
pub fn create_provider(config: &NqlConfig) -> Result<Box<dyn LlmProvider>, NqlError> {
    match config.provider.as_str() {
        "openai" | "ollama" => Ok(Box::new(OpenAiProvider::new(config))),
        other => Err(NqlError::UnsupportedProvider {
            name: other.to_string(),
        }),
    }
}
