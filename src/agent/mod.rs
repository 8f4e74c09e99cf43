//! LLM-driven query pipeline for nql-rs.
//!
//! Turns a natural-language question into SQL grounded on a schema, runs it,
//! and asks the model to repair failures within a retry budget. Uses a
//! pluggable provider abstraction backed by OpenAI-compatible APIs.
//!
//! # Architecture
//!
//! ```text
//! Question → Orchestrator
//!   ├── PromptBuilder (generate | correct | summarize)
//!   ├── SqlAgent → LlmProvider → extract_sql → CandidateQuery
//!   ├── QueryExecutor → rows | error text
//!   │   └── on failure: correction prompt, retry while budget remains
//!   └── SummarizerAgent (optional) → Answer
//! ```

pub mod client;
pub mod config;
pub mod message;
pub mod orchestrator;
pub mod prompt;
pub mod provider;
pub mod providers;
pub mod result;
pub mod sql_agent;
pub mod summarizer;
pub mod traits;

// Re-export key types
pub use client::create_provider;
pub use config::{NqlConfig, NqlConfigBuilder};
pub use message::{ChatMessage, ChatRequest, ChatResponse, Role, TokenUsage};
pub use orchestrator::Orchestrator;
pub use prompt::{Prompt, PromptBuilder, PromptSet};
pub use provider::LlmProvider;
pub use result::{Answer, AttemptRecord, ChatOptions, ChatOutcome, ChatResult};
pub use sql_agent::SqlAgent;
pub use summarizer::SummarizerAgent;
pub use traits::{Agent, AgentResponse};
