//! MCP server implementation for nql-rs.
//!
//! Exposes SQL generation, the correction loop, and model listing as MCP
//! tools, and the schema description as an MCP resource.

use std::sync::Arc;

use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{
    AnnotateAble, CallToolResult, Content, Implementation, ListResourcesResult,
    PaginatedRequestParams, ProtocolVersion, RawResource, ReadResourceRequestParams,
    ReadResourceResult, ResourceContents, ServerCapabilities, ServerInfo,
};
use rmcp::service::RequestContext;
use rmcp::{ErrorData as McpError, RoleServer, ServerHandler, tool, tool_handler, tool_router};

use crate::agent::orchestrator::Orchestrator;
use crate::agent::result::ChatOptions;
use crate::error::NqlError;

use super::params::{ChatParams, GenerateSqlParams};

/// URI of the schema resource.
pub const SCHEMA_RESOURCE_URI: &str = "nql-rs://schema";

/// Maps pipeline errors onto MCP error codes.
fn to_mcp_error(e: &NqlError) -> McpError {
    match e {
        NqlError::Configuration { .. } | NqlError::MalformedOutput { .. } => {
            McpError::invalid_params(e.to_string(), None)
        }
        _ => McpError::internal_error(e.to_string(), None),
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, McpError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| McpError::internal_error(format!("Serialization error: {e}"), None))
}

/// nql-rs MCP server.
///
/// Shares one [`Orchestrator`] across all sessions; it is read-only after
/// construction.
#[derive(Clone)]
pub struct NqlMcpServer {
    tool_router: ToolRouter<Self>,
    orchestrator: Arc<Orchestrator>,
}

#[tool_router]
impl NqlMcpServer {
    /// Generate SQL for a question without executing it.
    #[tool(
        name = "generate_sql",
        description = "Generate a single SQL SELECT statement for a natural-language question, grounded on the server's database schema. The query is not executed. Returns JSON with the query."
    )]
    async fn generate_sql(
        &self,
        Parameters(params): Parameters<GenerateSqlParams>,
    ) -> Result<CallToolResult, McpError> {
        let query = self
            .orchestrator
            .generate_sql(&params.question)
            .await
            .map_err(|e| to_mcp_error(&e))?;

        let json = to_json(&serde_json::json!({ "query": query }))?;
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }

    /// Run the generate/execute/correct loop.
    #[tool(
        name = "chat",
        description = "Answer a natural-language question against the connected database. Generates SQL, executes it, and on failure asks the model to correct it using the database error, up to max_retries times. Returns JSON with the final query, status, rows (or the last error), execution time, and retries used."
    )]
    async fn chat(
        &self,
        Parameters(params): Parameters<ChatParams>,
    ) -> Result<CallToolResult, McpError> {
        let options = self.chat_options(&params);
        let result = self
            .orchestrator
            .chat(&params.question, options)
            .await
            .map_err(|e| to_mcp_error(&e))?;

        let json = to_json(&result)?;
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }

    /// List the models the language-model service offers.
    #[tool(
        name = "list_models",
        description = "List the model identifiers offered by the configured language-model service, and which one this server uses."
    )]
    async fn list_models(&self) -> Result<CallToolResult, McpError> {
        let models = self
            .orchestrator
            .list_available_models()
            .await
            .map_err(|e| to_mcp_error(&e))?;

        let json = to_json(&serde_json::json!({
            "models": models,
            "configured": self.orchestrator.config().model,
        }))?;
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }
}

#[tool_handler]
impl ServerHandler for NqlMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .build(),
            server_info: Implementation {
                name: "nql-rs".to_string(),
                title: Some("nql-rs MCP Server".to_string()),
                version: env!("CARGO_PKG_VERSION").to_string(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "nql-rs: natural-language questions to SQL. Use `generate_sql` to get a query \
                 without running it, or `chat` to run it against the connected database with \
                 automatic correction. Read `nql-rs://schema` for the tables and columns."
                    .to_string(),
            ),
        }
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, McpError> {
        let mut raw = RawResource::new(SCHEMA_RESOURCE_URI, "Database schema".to_string());
        raw.description = Some(format!(
            "Schema description used to ground every prompt ({} bytes)",
            self.orchestrator.schema().as_str().len()
        ));
        raw.mime_type = Some("text/plain".to_string());

        Ok(ListResourcesResult {
            resources: vec![raw.no_annotation()],
            next_cursor: None,
            meta: None,
        })
    }

    async fn read_resource(
        &self,
        ReadResourceRequestParams { uri, .. }: ReadResourceRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, McpError> {
        if uri != SCHEMA_RESOURCE_URI {
            return Err(McpError::resource_not_found(
                format!("Unknown resource: {uri}. Expected {SCHEMA_RESOURCE_URI}"),
                None,
            ));
        }

        Ok(ReadResourceResult {
            contents: vec![ResourceContents::text(
                self.orchestrator.schema().as_str(),
                uri,
            )],
        })
    }
}

impl NqlMcpServer {
    /// Creates a new MCP server around a configured orchestrator.
    #[must_use]
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            tool_router: Self::tool_router(),
            orchestrator,
        }
    }

    /// The shared orchestrator.
    #[must_use]
    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    /// Per-call options for the `chat` tool.
    ///
    /// Clients may lower the correction budget but never raise it above the
    /// configured `max_retries`.
    fn chat_options(&self, params: &ChatParams) -> ChatOptions {
        let defaults = self
            .orchestrator
            .default_options()
            .with_human_response(params.human_response);
        match params.max_retries {
            Some(n) => ChatOptions {
                max_retries: n.min(defaults.max_retries),
                ..defaults
            },
            None => defaults,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::client::create_provider;
    use crate::agent::config::NqlConfig;
    use crate::schema::SchemaContext;

    fn server(max_retries: u32) -> NqlMcpServer {
        let config = NqlConfig::builder()
            .max_retries(max_retries)
            .build()
            .unwrap_or_else(|_| unreachable!());
        let provider = create_provider(&config).unwrap_or_else(|_| unreachable!());
        let schema =
            SchemaContext::from_text("Table: t\n- id (INTEGER)").unwrap_or_else(|_| unreachable!());
        NqlMcpServer::new(Arc::new(Orchestrator::new(
            Arc::from(provider),
            config,
            schema,
        )))
    }

    fn params(max_retries: Option<u32>) -> ChatParams {
        ChatParams {
            question: "How many?".to_string(),
            max_retries,
            human_response: true,
        }
    }

    #[test]
    fn test_chat_options_caps_client_budget() {
        let server = server(3);
        assert_eq!(server.chat_options(&params(Some(u32::MAX))).max_retries, 3);
        assert_eq!(server.chat_options(&params(Some(1))).max_retries, 1);
        assert_eq!(server.chat_options(&params(None)).max_retries, 3);
        assert!(server.chat_options(&params(None)).human_response);
    }

    #[test]
    fn test_error_mapping() {
        let err = to_mcp_error(&NqlError::configuration("no database connected"));
        assert_eq!(err.code, rmcp::model::ErrorCode::INVALID_PARAMS);

        let err = to_mcp_error(&NqlError::ModelUnavailable {
            message: "connection refused".to_string(),
        });
        assert_eq!(err.code, rmcp::model::ErrorCode::INTERNAL_ERROR);
    }
}
