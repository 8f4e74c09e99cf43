//! CLI command implementations.
//!
//! Contains the business logic for each CLI command. Commands that talk to
//! the model create their own tokio runtime as the sync/async bridge.

use std::fmt::Write as FmtWrite;
use std::path::Path;
use std::sync::Arc;

use crate::agent::client::create_provider;
use crate::agent::config::NqlConfig;
use crate::agent::orchestrator::Orchestrator;
use crate::agent::prompt::PromptSet;
use crate::agent::result::ChatOptions;
use crate::cli::output::{OutputFormat, format_chat_result, format_models, format_sql};
#[cfg(feature = "mcp")]
use crate::cli::parser::McpCommands;
use crate::cli::parser::{Cli, Commands, SchemaCommands};
use crate::error::{CommandError, NqlError, Result};
use crate::schema::write_schema_file;

/// Parameters for the chat command.
#[derive(Debug, Clone, Copy)]
pub struct ChatCommandParams<'a> {
    /// The natural-language question.
    pub question: &'a str,
    /// Database URL.
    pub database: &'a str,
    /// Correction budget override.
    pub max_retries: Option<u32>,
    /// Whether to request a human-readable answer.
    pub human: bool,
}

/// Executes the CLI command.
///
/// # Returns
///
/// Result with output string on success.
///
/// # Errors
///
/// Returns an error if the command fails to execute.
pub fn execute(cli: &Cli) -> Result<String> {
    let format = match cli.format.to_lowercase().as_str() {
        "text" | "json" => OutputFormat::parse(&cli.format),
        other => {
            return Err(CommandError::InvalidArgument(format!(
                "unknown output format '{other}' (expected text or json)"
            ))
            .into());
        }
    };

    match &cli.command {
        Commands::Sql { question } => cmd_sql(cli, question, format),
        Commands::Chat {
            question,
            database,
            max_retries,
            human,
        } => {
            let params = ChatCommandParams {
                question,
                database,
                max_retries: *max_retries,
                human: *human,
            };
            cmd_chat(cli, &params, format)
        }
        Commands::Models => cmd_models(cli, format),
        Commands::Schema(SchemaCommands::Extract { database, output }) => {
            cmd_schema_extract(database, output, format)
        }
        Commands::InitPrompts { dir } => cmd_init_prompts(dir.as_deref(), format),
        #[cfg(feature = "mcp")]
        Commands::Mcp(cmd) => cmd_mcp(cli, cmd),
    }
}

/// Resolves configuration from the environment plus CLI overrides.
///
/// # Errors
///
/// Returns [`NqlError::Configuration`] if the resolved values are invalid.
pub fn build_config(cli: &Cli) -> std::result::Result<NqlConfig, NqlError> {
    let mut builder = NqlConfig::builder();
    if let Some(model) = &cli.model {
        builder = builder.model(model);
    }
    if let Some(url) = &cli.base_url {
        builder = builder.base_url(url);
    }
    builder.from_env().build()
}

/// Builds an orchestrator from CLI arguments. Does not connect a database.
fn build_orchestrator(cli: &Cli) -> Result<Orchestrator> {
    let schema = cli.load_schema()?;
    let config = build_config(cli)?;
    let provider = create_provider(&config)?;
    Ok(Orchestrator::new(Arc::from(provider), config, schema))
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().map_err(|e| {
        CommandError::ExecutionFailed(format!("Failed to create async runtime: {e}")).into()
    })
}

/// Checks the configured model unless `--skip-model-check` was given.
async fn check_model(cli: &Cli, orchestrator: &Orchestrator) -> std::result::Result<(), NqlError> {
    if cli.skip_model_check {
        return Ok(());
    }
    orchestrator.verify_model().await
}

fn cmd_sql(cli: &Cli, question: &str, format: OutputFormat) -> Result<String> {
    let orchestrator = build_orchestrator(cli)?;
    let rt = runtime()?;

    let query = rt.block_on(async {
        check_model(cli, &orchestrator).await?;
        orchestrator.generate_sql(question).await
    })?;

    Ok(format_sql(query.as_str(), format))
}

fn cmd_chat(cli: &Cli, params: &ChatCommandParams<'_>, format: OutputFormat) -> Result<String> {
    let mut orchestrator = build_orchestrator(cli)?;
    orchestrator.connect(params.database)?;

    let mut options = orchestrator
        .default_options()
        .with_human_response(params.human);
    if let Some(n) = params.max_retries {
        options = ChatOptions { max_retries: n, ..options };
    }

    let rt = runtime()?;
    let result = rt.block_on(async {
        check_model(cli, &orchestrator).await?;
        orchestrator.chat(params.question, options).await
    })?;

    match format {
        OutputFormat::Text => Ok(format_chat_result(&result)),
        OutputFormat::Json => serde_json::to_string_pretty(&result).map_err(|e| {
            CommandError::OutputFormat(format!("JSON serialization failed: {e}")).into()
        }),
    }
}

fn cmd_models(cli: &Cli, format: OutputFormat) -> Result<String> {
    let config = build_config(cli)?;
    let provider = create_provider(&config)?;

    let rt = runtime()?;
    let models = rt.block_on(provider.list_models())?;

    Ok(format_models(&models, &config.model, format))
}

fn cmd_schema_extract(database: &str, output: &Path, format: OutputFormat) -> Result<String> {
    let bytes = write_schema_file(database, output)?;

    match format {
        OutputFormat::Text => Ok(format!(
            "Wrote schema ({bytes} bytes) to: {}\n",
            output.display()
        )),
        OutputFormat::Json => Ok(format.to_json(&serde_json::json!({
            "output": output.to_string_lossy(),
            "bytes": bytes,
        }))),
    }
}

fn cmd_init_prompts(dir: Option<&Path>, format: OutputFormat) -> Result<String> {
    let target_dir = dir
        .map(std::path::PathBuf::from)
        .or_else(PromptSet::default_dir)
        .ok_or_else(|| {
            CommandError::ExecutionFailed(
                "Could not determine home directory for default prompt path".to_string(),
            )
        })?;

    let written = PromptSet::write_defaults(&target_dir).map_err(|e| {
        CommandError::ExecutionFailed(format!("Failed to write prompt templates: {e}"))
    })?;

    match format {
        OutputFormat::Text => {
            if written.is_empty() {
                Ok(format!(
                    "All prompt templates already exist in: {}\n",
                    target_dir.display()
                ))
            } else {
                let mut output = format!(
                    "Wrote {} prompt template(s) to: {}\n",
                    written.len(),
                    target_dir.display()
                );
                for path in &written {
                    let _ = writeln!(
                        output,
                        "  {}",
                        path.file_name()
                            .and_then(|n| n.to_str())
                            .unwrap_or("unknown")
                    );
                }
                output.push_str("\nEdit these files to customize the system prompts.\n");
                Ok(output)
            }
        }
        OutputFormat::Json => {
            let json = serde_json::json!({
                "directory": target_dir.to_string_lossy(),
                "written": written.iter().map(|p| p.to_string_lossy().into_owned()).collect::<Vec<_>>(),
                "count": written.len()
            });
            Ok(format.to_json(&json))
        }
    }
}

/// Starts the MCP server with the specified transport.
///
/// Runs until the client disconnects (stdio) or the server is stopped (SSE).
#[cfg(feature = "mcp")]
fn cmd_mcp(cli: &Cli, cmd: &McpCommands) -> Result<String> {
    use crate::mcp::{NqlMcpServer, serve_sse, serve_stdio};

    let mut orchestrator = build_orchestrator(cli)?;
    let database = match cmd {
        McpCommands::Stdio { database } | McpCommands::Sse { database, .. } => database,
    };
    if let Some(url) = database {
        orchestrator.connect(url)?;
    }
    let server = NqlMcpServer::new(Arc::new(orchestrator));

    let rt = runtime()?;
    rt.block_on(async {
        match cmd {
            McpCommands::Stdio { .. } => serve_stdio(server).await,
            McpCommands::Sse { host, port, .. } => serve_sse(server, host, *port).await,
        }
    })
    .map_err(|e| CommandError::ExecutionFailed(format!("MCP server error: {e}")))?;

    Ok(String::new())
}
