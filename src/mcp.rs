//! MCP JSON-RPC protocol bridge.
//!
//! Adapts the [`ToolRegistry`] to the Model Context Protocol so MCP clients
//! (Cursor, Claude Desktop, ...) can call the query tools. The same bridge
//! backs both transports:
//!
//! * stdio, via [`serve_stdio`] (`apih serve`);
//! * streamable HTTP, mounted at `/mcp` by [`crate::server`].

use std::borrow::Cow;
use std::sync::Arc;

use anyhow::Result;
use rmcp::model::*;
use rmcp::{ErrorData as McpError, ServerHandler, ServiceExt};
use tracing::info;

use crate::traits::{validate_params, ToolContext, ToolRegistry};

/// Bridges the tool registry to MCP.
///
/// Each MCP session receives a clone (everything is behind `Arc`), so all
/// sessions share one tool set and one published state.
#[derive(Clone)]
pub struct McpBridge {
    ctx: ToolContext,
    tools: Arc<ToolRegistry>,
}

impl McpBridge {
    pub fn new(ctx: ToolContext, tools: Arc<ToolRegistry>) -> Self {
        Self { ctx, tools }
    }

    fn to_mcp_tool(tool: &dyn crate::traits::Tool) -> Tool {
        let input_schema = match tool.parameters_schema() {
            serde_json::Value::Object(map) => Arc::new(map),
            _ => Arc::new(serde_json::Map::new()),
        };

        Tool {
            name: Cow::Owned(tool.name().to_string()),
            title: None,
            description: Some(Cow::Owned(tool.description().to_string())),
            input_schema,
            output_schema: None,
            annotations: Some(ToolAnnotations::new().read_only(true)),
            execution: None,
            icons: None,
            meta: None,
        }
    }
}

impl ServerHandler for McpBridge {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "api-harness".to_string(),
                title: Some("API Harness".to_string()),
                version: env!("CARGO_PKG_VERSION").to_string(),
                description: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "API Harness serves OpenAPI and Swagger documents. Use list_all_sources to see \
                 the loaded APIs, list_endpoints_for_source to page through one API, and \
                 search_endpoint to find endpoints across every API by free text."
                    .to_string(),
            ),
        }
    }

    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: rmcp::service::RequestContext<rmcp::RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListToolsResult, McpError>> + Send + '_ {
        let tools: Vec<Tool> = self
            .tools
            .tools()
            .iter()
            .map(|t| Self::to_mcp_tool(t.as_ref()))
            .collect();
        std::future::ready(Ok(ListToolsResult::with_all_items(tools)))
    }

    fn get_tool(&self, name: &str) -> Option<Tool> {
        self.tools.find(name).map(Self::to_mcp_tool)
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        _context: rmcp::service::RequestContext<rmcp::RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let tool = self.tools.find(&request.name).ok_or_else(|| {
            McpError::new(
                ErrorCode::METHOD_NOT_FOUND,
                format!("no tool registered with name: {}", request.name),
                None,
            )
        })?;

        let params = request
            .arguments
            .map(serde_json::Value::Object)
            .unwrap_or(serde_json::Value::Object(serde_json::Map::new()));

        let params = validate_params(&tool.parameters_schema(), &params)
            .map_err(|e| McpError::invalid_params(e.to_string(), None))?;

        match tool.execute(params, &self.ctx).await {
            Ok(result) => {
                let text = serde_json::to_string_pretty(&result).unwrap_or_default();
                if result.get("error").is_some() {
                    Ok(CallToolResult::error(vec![Content::text(text)]))
                } else {
                    Ok(CallToolResult::success(vec![Content::text(text)]))
                }
            }
            Err(e) => Ok(CallToolResult::error(vec![Content::text(e.to_string())])),
        }
    }
}

/// Serve MCP over stdin/stdout until the client disconnects.
pub async fn serve_stdio(bridge: McpBridge) -> Result<()> {
    info!("serving MCP over stdio");
    let service = bridge.serve(rmcp::transport::stdio()).await?;
    service.waiting().await?;
    Ok(())
}
