//! Command-line argument parsing.
//!
//! Defines the CLI structure using clap derive macros.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::error::NqlError;
use crate::schema::SchemaContext;

/// nql-rs: natural-language questions to SQL, with automatic query correction.
///
/// Generates a SELECT statement grounded on a schema description, runs it,
/// and asks the model to repair it when the database rejects it.
#[derive(Parser, Debug)]
#[command(name = "nql-rs")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the schema description file.
    #[arg(long, env = "NQL_SCHEMA_FILE", global = true, conflicts_with = "schema")]
    pub schema_file: Option<PathBuf>,

    /// Schema name, resolved to `<name>.txt` in the current directory.
    #[arg(long, global = true)]
    pub schema: Option<String>,

    /// Model identifier (overrides `NQL_MODEL`).
    #[arg(short, long, global = true)]
    pub model: Option<String>,

    /// Base URL of the OpenAI-compatible API (overrides `NQL_BASE_URL`).
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Skip checking that the model is offered by the service.
    #[arg(long, global = true)]
    pub skip_model_check: bool,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Write logs to this file instead of stderr.
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Output format (text, json).
    #[arg(long, default_value = "text", global = true)]
    pub format: String,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate SQL for a question without running it.
    #[command(after_help = r#"Examples:
  nql-rs --schema-file schema.txt sql "How many customers are there?"
  nql-rs --schema shop --model llama3.2 sql "Top 5 products by revenue"
"#)]
    Sql {
        /// The natural-language question.
        question: String,
    },

    /// Generate, execute, and correct SQL until it runs.
    ///
    /// Failed queries are sent back to the model with the database error,
    /// up to `--max-retries` times.
    #[command(after_help = r#"Examples:
  nql-rs --schema-file schema.txt chat "List orders from the last 30 days" --database sqlite:///shop.db
  nql-rs --schema shop chat "How many customers?" -d shop.db --human
  nql-rs --format json --schema shop chat "Average order value" -d shop.db --max-retries 5
"#)]
    Chat {
        /// The natural-language question.
        question: String,

        /// Database URL (`sqlite:///path.db`) or SQLite file path.
        #[arg(short, long, env = "NQL_DATABASE_URL")]
        database: String,

        /// Maximum correction attempts (defaults to `NQL_MAX_RETRIES` or 3).
        #[arg(long)]
        max_retries: Option<u32>,

        /// Also phrase the results as a natural-language answer.
        #[arg(long)]
        human: bool,
    },

    /// List the models offered by the service.
    Models,

    /// Schema description utilities.
    #[command(subcommand)]
    Schema(SchemaCommands),

    /// Write default prompt templates to disk for customization.
    ///
    /// Creates markdown template files in the prompt directory so users
    /// can customize system prompts without recompiling.
    #[command(name = "init-prompts")]
    #[command(after_help = r#"Examples:
  nql-rs init-prompts                      # Write to ~/.config/nql-rs/prompts/
  nql-rs init-prompts --dir ./my-prompts   # Write to custom directory
"#)]
    InitPrompts {
        /// Target directory for prompt templates.
        ///
        /// Defaults to `~/.config/nql-rs/prompts/`.
        #[arg(long)]
        dir: Option<PathBuf>,
    },

    /// Start MCP (Model Context Protocol) server.
    #[cfg(feature = "mcp")]
    #[command(subcommand)]
    Mcp(McpCommands),
}

/// Schema subcommands.
#[derive(Subcommand, Debug)]
pub enum SchemaCommands {
    /// Dump a SQLite database's structure into a schema description file.
    #[command(after_help = r#"Examples:
  nql-rs schema extract sqlite:///shop.db shop.txt
  nql-rs schema extract ./shop.db schema.txt
"#)]
    Extract {
        /// Database URL (`sqlite:///path.db`) or SQLite file path.
        database: String,

        /// Output file for the schema description.
        output: PathBuf,
    },
}

/// MCP server subcommands.
#[cfg(feature = "mcp")]
#[derive(Subcommand, Debug)]
pub enum McpCommands {
    /// Start MCP server with stdio transport.
    ///
    /// Reads JSON-RPC messages from stdin, writes responses to stdout.
    #[command(after_help = r#"Examples:
  nql-rs --schema shop mcp stdio --database shop.db
"#)]
    Stdio {
        /// Database URL used by the `chat` tool.
        #[arg(short, long, env = "NQL_DATABASE_URL")]
        database: Option<String>,
    },

    /// Start MCP server with SSE/HTTP transport.
    ///
    /// Listens for incoming HTTP connections using streamable HTTP transport.
    #[command(after_help = r#"Examples:
  nql-rs --schema shop mcp sse                            # Listen on 127.0.0.1:3000
  nql-rs --schema shop mcp sse --host 0.0.0.0 --port 8080 -d shop.db
"#)]
    Sse {
        /// Host to bind to.
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to.
        #[arg(long, default_value = "3000")]
        port: u16,

        /// Database URL used by the `chat` tool.
        #[arg(short, long, env = "NQL_DATABASE_URL")]
        database: Option<String>,
    },
}

impl Cli {
    /// Loads the schema named by `--schema-file` or `--schema`.
    ///
    /// # Errors
    ///
    /// Returns [`NqlError::Configuration`] if neither is given or the file
    /// is missing or empty.
    pub fn load_schema(&self) -> Result<SchemaContext, NqlError> {
        match (&self.schema_file, &self.schema) {
            (Some(path), _) => SchemaContext::from_file(path),
            (None, Some(name)) => SchemaContext::from_name(name),
            (None, None) => Err(NqlError::configuration(
                "no schema given; pass --schema-file <path> or --schema <name>",
            )),
        }
    }
}
