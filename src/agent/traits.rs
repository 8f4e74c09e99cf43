//! Agent trait definition.
//!
//! Both agents (SQL generation and summarization) implement this trait,
//! which gives the orchestrator a uniform way to call the model.

use async_trait::async_trait;

use super::message::{ChatRequest, ChatResponse, TokenUsage, system_message, user_message};
use super::prompt::Prompt;
use super::provider::LlmProvider;
use crate::error::NqlError;

/// Response from an agent execution.
#[derive(Debug, Clone)]
pub struct AgentResponse {
    /// The agent's text output. Never blank.
    pub content: String,
    /// Token usage for this call.
    pub usage: TokenUsage,
    /// Why the model stopped generating (e.g. `"stop"`, `"length"`).
    pub finish_reason: Option<String>,
}

/// Trait implemented by all agents in the system.
///
/// Agents fix a model configuration for one role. The prompt itself is
/// assembled by the caller, since it depends on the question, the schema,
/// and the previous attempt.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Agent name for logging and identification.
    fn name(&self) -> &'static str;

    /// Model identifier to use for this agent.
    fn model(&self) -> &str;

    /// Sampling temperature (0.0 = deterministic, higher = more creative).
    fn temperature(&self) -> f32 {
        0.0
    }

    /// Maximum tokens for the response.
    fn max_tokens(&self) -> u32 {
        1024
    }

    /// Executes the agent with the given prompt.
    ///
    /// Builds a [`ChatRequest`] from the agent's configuration and
    /// delegates to the provider.
    ///
    /// # Errors
    ///
    /// Propagates provider errors. Returns [`NqlError::ModelResponse`] when
    /// the model answers with blank content.
    async fn execute(
        &self,
        provider: &dyn LlmProvider,
        prompt: &Prompt,
    ) -> Result<AgentResponse, NqlError> {
        let request = ChatRequest {
            model: self.model().to_string(),
            messages: vec![system_message(&prompt.system), user_message(&prompt.user)],
            temperature: Some(self.temperature()),
            max_tokens: Some(self.max_tokens()),
        };

        let response: ChatResponse = provider.chat(&request).await?;

        if response.content.trim().is_empty() {
            return Err(NqlError::ModelResponse {
                message: format!("{} agent received an empty completion", self.name()),
            });
        }

        Ok(AgentResponse {
            content: response.content,
            usage: response.usage,
            finish_reason: response.finish_reason,
        })
    }
}
