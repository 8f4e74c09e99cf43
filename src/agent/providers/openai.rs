//! `OpenAI` provider implementation using the `async-openai` crate.
//!
//! Supports any `OpenAI`-compatible API (`OpenAI`, Azure, Ollama's `/v1`
//! endpoint, local proxies) via the base URL in [`NqlConfig`].

use std::future::Future;
use std::time::Duration;

use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::error::{ApiError, OpenAIError};
use async_openai::types::{
    ChatCompletionRequestAssistantMessage, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessage, ChatCompletionRequestUserMessage,
    CreateChatCompletionRequest,
};
use async_trait::async_trait;
use backoff::ExponentialBackoffBuilder;
use tracing::debug;

use crate::agent::config::NqlConfig;
use crate::agent::message::{ChatMessage, ChatRequest, ChatResponse, Role, TokenUsage};
use crate::agent::provider::LlmProvider;
use crate::error::NqlError;

/// `OpenAI`-compatible LLM provider.
///
/// Wraps the `async-openai` client for chat completions and model listing.
/// Every call is a single HTTP request bounded by the configured timeout;
/// the client's built-in rate-limit retry is disabled.
pub struct OpenAiProvider {
    client: Client<OpenAIConfig>,
    timeout: Duration,
}

impl OpenAiProvider {
    /// Creates a new provider from pipeline configuration.
    #[must_use]
    pub fn new(config: &NqlConfig) -> Self {
        let mut openai_config = OpenAIConfig::new().with_api_base(&config.base_url);

        if let Some(ref api_key) = config.api_key {
            openai_config = openai_config.with_api_key(api_key);
        }

        // zero elapsed-time budget: the first 429 is returned as-is
        let no_retry = ExponentialBackoffBuilder::new()
            .with_max_elapsed_time(Some(Duration::ZERO))
            .build();

        Self {
            client: Client::with_config(openai_config).with_backoff(no_retry),
            timeout: config.timeout,
        }
    }

    /// Converts our message type to the `OpenAI` SDK type.
    fn convert_message(msg: &ChatMessage) -> ChatCompletionRequestMessage {
        match msg.role {
            Role::System => {
                ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage {
                    content: async_openai::types::ChatCompletionRequestSystemMessageContent::Text(
                        msg.content.clone(),
                    ),
                    name: None,
                })
            }
            Role::User => ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
                content: async_openai::types::ChatCompletionRequestUserMessageContent::Text(
                    msg.content.clone(),
                ),
                name: None,
            }),
            Role::Assistant => {
                #[allow(deprecated)]
                ChatCompletionRequestMessage::Assistant(ChatCompletionRequestAssistantMessage {
                    content: Some(
                        async_openai::types::ChatCompletionRequestAssistantMessageContent::Text(
                            msg.content.clone(),
                        ),
                    ),
                    name: None,
                    tool_calls: None,
                    refusal: None,
                    audio: None,
                    function_call: None,
                })
            }
        }
    }

    /// Builds an `OpenAI` chat completion request from our generic request.
    fn build_request(request: &ChatRequest) -> CreateChatCompletionRequest {
        let messages: Vec<_> = request.messages.iter().map(Self::convert_message).collect();

        CreateChatCompletionRequest {
            model: request.model.clone(),
            messages,
            temperature: request.temperature,
            max_completion_tokens: request.max_tokens,
            ..Default::default()
        }
    }

    /// Runs `fut` under the configured timeout, classifying SDK errors.
    async fn bounded<T, F>(&self, what: &str, fut: F) -> Result<T, NqlError>
    where
        F: Future<Output = Result<T, OpenAIError>> + Send,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result.map_err(classify_error),
            Err(_) => Err(NqlError::ModelUnavailable {
                message: format!(
                    "{what} timed out after {:.1}s",
                    self.timeout.as_secs_f64()
                ),
            }),
        }
    }
}

/// Transport failures, rate limits and exhausted quotas mean the service is
/// unavailable; any other API error or undecodable body is a bad response.
fn classify_error(e: OpenAIError) -> NqlError {
    match e {
        OpenAIError::Reqwest(err) => NqlError::ModelUnavailable {
            message: err.to_string(),
        },
        OpenAIError::ApiError(err) if is_rate_limited(&err) => NqlError::ModelUnavailable {
            message: format!("rate limited: {err}"),
        },
        other => NqlError::ModelResponse {
            message: other.to_string(),
        },
    }
}

/// The API error carries no HTTP status, so rate limits are recognized by
/// the error type or code OpenAI-compatible servers put in the body.
fn is_rate_limited(err: &ApiError) -> bool {
    [err.r#type.as_deref(), err.code.as_deref()]
        .into_iter()
        .flatten()
        .any(|tag| tag.contains("rate_limit") || tag == "insufficient_quota")
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("client", &"<async-openai::Client>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, NqlError> {
        let openai_request = Self::build_request(request);
        let chat = self.client.chat();

        let response = self
            .bounded("chat completion", chat.create(openai_request))
            .await?;

        let choice = response
            .choices
            .first()
            .ok_or_else(|| NqlError::ModelResponse {
                message: "response contained no choices".to_string(),
            })?;

        let content = choice.message.content.clone().unwrap_or_default();

        let finish_reason = choice
            .finish_reason
            .as_ref()
            .map(|fr| format!("{fr:?}").to_lowercase());

        let usage = response
            .usage
            .map_or_else(TokenUsage::default, |u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            });

        debug!(
            model = request.model,
            tokens = usage.total_tokens,
            finish_reason = finish_reason.as_deref().unwrap_or("unknown"),
            "chat completion received"
        );

        Ok(ChatResponse {
            content,
            usage,
            finish_reason,
        })
    }

    async fn list_models(&self) -> Result<Vec<String>, NqlError> {
        let models = self.client.models();
        let response = self.bounded("model listing", models.list()).await?;
        Ok(response.data.into_iter().map(|m| m.id).collect())
    }
}
