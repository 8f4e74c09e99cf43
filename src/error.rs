//! Error types for nql-rs.
//!
//! [`NqlError`] is the taxonomy of the query pipeline. Semantic failures
//! (malformed model output, database errors) are retryable inside the
//! correction loop; everything else stops it. [`CommandError`] and the
//! top-level [`Error`] cover the command-line layer.

use thiserror::Error;

/// Errors raised by the natural-language-to-SQL pipeline.
#[derive(Debug, Clone, Error)]
pub enum NqlError {
    /// Missing or invalid schema, model, or database setup.
    #[error("configuration error: {message}")]
    Configuration {
        /// What is misconfigured.
        message: String,
    },

    /// The language-model service could not be reached or timed out.
    #[error("model unavailable: {message}")]
    ModelUnavailable {
        /// Transport error text.
        message: String,
    },

    /// The language-model service answered with an empty or malformed envelope.
    #[error("model response error: {message}")]
    ModelResponse {
        /// Description of the bad response.
        message: String,
    },

    /// The model output contained no recognizable `SELECT` statement.
    #[error("model output contains no SELECT statement")]
    MalformedOutput {
        /// The raw model output that was rejected.
        content: String,
    },

    /// The database rejected or failed the SQL.
    #[error("execution error: {message}")]
    Execution {
        /// Driver error text, passed verbatim to the correction prompt.
        message: String,
    },

    /// The human-readable answer could not be produced.
    #[error("summarization failed: {message}")]
    Summarization {
        /// Underlying failure.
        message: String,
    },

    /// No provider implementation exists for the configured name.
    #[error("unsupported LLM provider: {name}")]
    UnsupportedProvider {
        /// Provider name that was requested.
        name: String,
    },
}

impl NqlError {
    /// Shorthand for a [`NqlError::Configuration`] error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Whether the correction loop may spend a retry on this error.
    ///
    /// Only semantic failures qualify. Transport and configuration problems
    /// are not something a corrected query can fix.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::MalformedOutput { .. } | Self::Execution { .. })
    }
}

/// Errors raised while running a CLI command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The command could not complete.
    #[error("{0}")]
    ExecutionFailed(String),

    /// Output could not be rendered in the requested format.
    #[error("output format error: {0}")]
    OutputFormat(String),

    /// A command-line argument was invalid.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// Top-level error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Pipeline error.
    #[error(transparent)]
    Nql(#[from] NqlError),

    /// CLI command error.
    #[error(transparent)]
    Command(#[from] CommandError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias using the top-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
