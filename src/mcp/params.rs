//! MCP tool parameter types.
//!
//! Defines the input schemas for MCP tools using `schemars` for automatic
//! JSON Schema generation required by the MCP protocol.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `generate_sql` MCP tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GenerateSqlParams {
    /// The natural-language question.
    pub question: String,
}

/// Parameters for the `chat` MCP tool.
///
/// Runs the generate/execute/correct loop against the connected database.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ChatParams {
    /// The natural-language question.
    pub question: String,

    /// Maximum correction attempts after the first try (server default when absent).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,

    /// Also phrase the results as a short natural-language answer.
    #[serde(default)]
    pub human_response: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_params_defaults() {
        let params: ChatParams = serde_json::from_str(r#"{"question": "How many customers?"}"#)
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(params.question, "How many customers?");
        assert!(params.max_retries.is_none());
        assert!(!params.human_response);
    }
}
