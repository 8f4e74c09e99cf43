//! SQL generation agent.
//!
//! Serves both initial generation and correction: the difference lives in
//! the prompt, not the model settings.

use async_trait::async_trait;

use super::config::NqlConfig;
use super::traits::Agent;

/// Agent that turns a question (or a failed attempt) into SQL.
///
/// Runs at temperature zero so the same prompt yields the same statement.
#[derive(Debug, Clone)]
pub struct SqlAgent {
    model: String,
    max_tokens: u32,
}

impl SqlAgent {
    /// Creates a new SQL agent with the given configuration.
    #[must_use]
    pub fn new(config: &NqlConfig) -> Self {
        Self {
            model: config.model.clone(),
            max_tokens: config.max_tokens,
        }
    }
}

#[async_trait]
impl Agent for SqlAgent {
    fn name(&self) -> &'static str {
        "sql"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn temperature(&self) -> f32 {
        0.0
    }

    fn max_tokens(&self) -> u32 {
        self.max_tokens
    }
}
