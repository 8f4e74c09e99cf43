//! CLI layer for nql-rs.
//!
//! Provides the command-line interface using clap, with commands for
//! generating and running SQL, listing models, and managing schema and
//! prompt files.

pub mod commands;
pub mod output;
pub mod parser;

pub use commands::execute;
pub use output::OutputFormat;
#[cfg(feature = "mcp")]
pub use parser::McpCommands;
pub use parser::{Cli, Commands, SchemaCommands};
