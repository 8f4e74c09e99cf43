//! Summarizer agent for the human-readable answer.

use async_trait::async_trait;

use super::config::NqlConfig;
use super::traits::Agent;

/// Agent that phrases query results as a short natural-language answer.
#[derive(Debug, Clone)]
pub struct SummarizerAgent {
    model: String,
    max_tokens: u32,
}

impl SummarizerAgent {
    /// Creates a new summarizer agent with the given configuration.
    #[must_use]
    pub fn new(config: &NqlConfig) -> Self {
        Self {
            model: config.model.clone(),
            max_tokens: config.summary_max_tokens,
        }
    }
}

#[async_trait]
impl Agent for SummarizerAgent {
    fn name(&self) -> &'static str {
        "summarizer"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn temperature(&self) -> f32 {
        0.1
    }

    fn max_tokens(&self) -> u32 {
        self.max_tokens
    }
}
