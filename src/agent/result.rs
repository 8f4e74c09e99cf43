//! Result types for the `chat` workflow.

use std::time::Duration;

use serde::{Serialize, Serializer};

use crate::error::NqlError;
use crate::sql::{CandidateQuery, Row};

/// Default correction budget when none is given.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Per-call options for [`Orchestrator::chat`](super::Orchestrator::chat).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChatOptions {
    /// Maximum number of correction attempts after the first try.
    pub max_retries: u32,
    /// Whether to phrase successful results as a natural-language answer.
    pub human_response: bool,
}

impl Default for ChatOptions {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            human_response: false,
        }
    }
}

impl ChatOptions {
    /// Options with the given correction budget and no human answer.
    #[must_use]
    pub const fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            human_response: false,
        }
    }

    /// Requests (or not) a human-readable answer.
    #[must_use]
    pub const fn with_human_response(mut self, human_response: bool) -> Self {
        self.human_response = human_response;
        self
    }
}

/// The optional natural-language answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum Answer {
    /// The model's summary of the results.
    Summary(String),
    /// Summarization failed; the rows are still valid.
    Unavailable {
        /// Why the summary could not be produced.
        reason: String,
    },
}

impl Answer {
    /// The summary text, if summarization succeeded.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Summary(text) => Some(text),
            Self::Unavailable { .. } => None,
        }
    }
}

/// How the correction loop ended.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ChatOutcome {
    /// A candidate executed successfully.
    Success {
        /// Materialized result rows.
        rows: Vec<Row>,
        /// Present only when a human response was requested.
        #[serde(skip_serializing_if = "Option::is_none")]
        answer: Option<Answer>,
    },
    /// Every attempt failed and the retry budget ran out.
    Exhausted {
        /// Error text of the last failed attempt.
        error: String,
    },
}

/// One generation attempt in the loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttemptRecord {
    /// The extracted candidate, or `None` when the output was malformed.
    pub query: Option<CandidateQuery>,
    /// Failure text; `None` for the attempt that succeeded.
    pub error: Option<String>,
    /// Execution time of this attempt (zero if it never ran).
    #[serde(rename = "elapsed_seconds", serialize_with = "serialize_secs")]
    pub elapsed: Duration,
}

/// Terminal artifact of one `chat` call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatResult {
    /// The last extracted candidate query.
    pub query: Option<CandidateQuery>,
    /// Success with rows, or exhaustion with the last error.
    #[serde(flatten)]
    pub outcome: ChatOutcome,
    /// Duration of the last execution only; never accumulated across retries.
    #[serde(rename = "execution_time_seconds", serialize_with = "serialize_secs")]
    pub execution_time: Duration,
    /// Correction attempts actually performed.
    pub retries_used: u32,
    /// Every attempt, in order.
    pub history: Vec<AttemptRecord>,
    /// Tokens reported by the provider across all calls.
    pub total_tokens: u32,
}

impl ChatResult {
    /// Whether a query executed successfully.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.outcome, ChatOutcome::Success { .. })
    }

    /// Result rows, or `None` after exhaustion.
    #[must_use]
    pub fn results(&self) -> Option<&[Row]> {
        match &self.outcome {
            ChatOutcome::Success { rows, .. } => Some(rows),
            ChatOutcome::Exhausted { .. } => None,
        }
    }

    /// The human-readable answer, if one was requested and execution succeeded.
    #[must_use]
    pub fn answer(&self) -> Option<&Answer> {
        match &self.outcome {
            ChatOutcome::Success { answer, .. } => answer.as_ref(),
            ChatOutcome::Exhausted { .. } => None,
        }
    }

    /// Error text of the last attempt after exhaustion.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            ChatOutcome::Success { .. } => None,
            ChatOutcome::Exhausted { error } => Some(error),
        }
    }

    /// Consumes the result, returning the rows or the final database
    /// failure as [`NqlError::Execution`].
    ///
    /// # Errors
    ///
    /// Returns [`NqlError::Execution`] carrying the last error text when the
    /// retry budget ran out.
    pub fn into_rows(self) -> Result<Vec<Row>, NqlError> {
        match self.outcome {
            ChatOutcome::Success { rows, .. } => Ok(rows),
            ChatOutcome::Exhausted { error } => Err(NqlError::Execution { message: error }),
        }
    }

    /// Execution time in fractional seconds.
    #[must_use]
    pub fn execution_time_seconds(&self) -> f64 {
        self.execution_time.as_secs_f64()
    }
}

fn serialize_secs<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn success(answer: Option<Answer>) -> ChatResult {
        let mut row = Row::new();
        row.insert("name".to_string(), Value::from("Ada"));
        ChatResult {
            query: CandidateQuery::extract("SELECT name FROM customers").ok(),
            outcome: ChatOutcome::Success {
                rows: vec![row],
                answer,
            },
            execution_time: Duration::from_millis(1500),
            retries_used: 1,
            history: Vec::new(),
            total_tokens: 42,
        }
    }

    #[test]
    fn test_options_default() {
        let options = ChatOptions::default();
        assert_eq!(options.max_retries, 3);
        assert!(!options.human_response);
        assert!(ChatOptions::new(0).with_human_response(true).human_response);
    }

    #[test]
    fn test_success_accessors() {
        let result = success(None);
        assert!(result.is_success());
        assert_eq!(result.results().map(<[Row]>::len), Some(1));
        assert!(result.answer().is_none());
        assert!(result.error().is_none());
        assert!((result.execution_time_seconds() - 1.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_exhausted_accessors() {
        let result = ChatResult {
            query: None,
            outcome: ChatOutcome::Exhausted {
                error: "no such table: orders".to_string(),
            },
            execution_time: Duration::ZERO,
            retries_used: 0,
            history: Vec::new(),
            total_tokens: 0,
        };
        assert!(!result.is_success());
        assert!(result.results().is_none());
        assert_eq!(result.error(), Some("no such table: orders"));
        assert!(matches!(
            result.into_rows(),
            Err(NqlError::Execution { ref message }) if message == "no such table: orders"
        ));
    }

    #[test]
    fn test_into_rows_on_success() {
        let rows = success(None).into_rows().unwrap_or_default();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["name"], "Ada");
    }

    #[test]
    fn test_serialization_shape() {
        let result = success(Some(Answer::Summary("Ada is the only customer.".to_string())));
        let json = serde_json::to_value(&result).unwrap_or(Value::Null);
        assert_eq!(json["status"], "success");
        assert_eq!(json["query"], "SELECT name FROM customers");
        assert_eq!(json["rows"][0]["name"], "Ada");
        assert_eq!(json["answer"]["status"], "summary");
        assert_eq!(json["answer"]["detail"], "Ada is the only customer.");
        assert_eq!(json["execution_time_seconds"], 1.5);
        assert_eq!(json["retries_used"], 1);
    }

    #[test]
    fn test_unavailable_answer_has_no_text() {
        let answer = Answer::Unavailable {
            reason: "timeout".to_string(),
        };
        assert!(answer.text().is_none());
        assert_eq!(Answer::Summary("x".to_string()).text(), Some("x"));
    }
}
