//! Pluggable LLM provider trait.
//!
//! Implementations translate provider-agnostic [`ChatRequest`]/[`ChatResponse`]
//! into provider-specific SDK calls. Providers are pure transport: they never
//! retry, because retrying is the correction loop's decision.

use async_trait::async_trait;

use super::message::{ChatRequest, ChatResponse};
use crate::error::NqlError;

/// Trait for LLM provider backends.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name (e.g., `"openai"`).
    fn name(&self) -> &'static str;

    /// Executes a chat completion request.
    ///
    /// # Errors
    ///
    /// Returns [`NqlError::ModelUnavailable`] on connection failures and
    /// timeouts, [`NqlError::ModelResponse`] on a malformed envelope.
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, NqlError>;

    /// Lists the model identifiers the service offers, in service order.
    ///
    /// # Errors
    ///
    /// Same as [`LlmProvider::chat`].
    async fn list_models(&self) -> Result<Vec<String>, NqlError>;
}
