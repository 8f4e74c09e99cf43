//! MCP (Model Context Protocol) server for nql-rs.
//!
//! Exposes the NL-to-SQL pipeline as an MCP server, so external agents can
//! ask questions of a database without writing SQL themselves.
//!
//! # Feature Gate
//!
//! This module requires the `mcp` feature flag:
//! ```toml
//! [dependencies]
//! nql-rs = { version = "...", features = ["mcp"] }
//! ```
//!
//! # Architecture
//!
//! ```text
//! MCP Client
//!   ↓ generate_sql(question) | chat(question, max_retries, human_response) | list_models()
//! NqlMcpServer
//!   ↓
//! Orchestrator (shared, read-only)
//!   ├── SqlAgent → LlmProvider
//!   ├── QueryExecutor (SQLite)
//!   └── SummarizerAgent
//!   ↓
//! ChatResult JSON → MCP Client
//! ```

pub mod params;
pub mod server;
pub mod transport;

pub use params::{ChatParams, GenerateSqlParams};
pub use server::{NqlMcpServer, SCHEMA_RESOURCE_URI};
pub use transport::{serve_sse, serve_stdio};
