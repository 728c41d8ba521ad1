//! Query tools exposed to AI clients.
//!
//! Every transport (MCP stdio, MCP over HTTP, the plain JSON API) dispatches
//! through the same [`ToolRegistry`]:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                      ToolRegistry                        │
//! │  list_all_sources │ list_endpoints_for_source │ search_… │
//! └─────────────────────────────┬────────────────────────────┘
//!                               ▼
//!                 ToolContext → QueryGateway → PublishedState
//! ```
//!
//! Query failures (unknown source, failed source, bad pagination) are part
//! of a tool's result as `{ "error": "<message>" }`. Only malformed
//! parameters and internal faults surface as `Err`.

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};

use api_harness_core::pagination::{DEFAULT_LIMIT, MAX_LIMIT};
use api_harness_core::query::QueryError;

use crate::gateway::QueryGateway;

/// A tool that agents can discover and call.
///
/// Registered in a [`ToolRegistry`], listed via `GET /tools/list` and MCP
/// `tools/list`, invoked via `POST /tools/{name}` and MCP `tools/call`.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Lowercase identifier with underscores; also the HTTP route segment.
    fn name(&self) -> &str;

    /// One-line description agents use to pick a tool.
    fn description(&self) -> &str;

    /// Whether this tool ships with API Harness. Defaults to `false`.
    fn is_builtin(&self) -> bool {
        false
    }

    /// JSON Schema (`type: "object"`) for the tool's parameters.
    fn parameters_schema(&self) -> Value;

    /// Execute with parameters already checked by [`validate_params`].
    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value>;
}

/// What a tool can see while it runs.
#[derive(Clone)]
pub struct ToolContext {
    gateway: QueryGateway,
}

impl ToolContext {
    pub fn new(gateway: QueryGateway) -> Self {
        Self { gateway }
    }

    pub fn gateway(&self) -> &QueryGateway {
        &self.gateway
    }
}

/// Serializable tool info for tool listings.
#[derive(Debug, Clone, Serialize)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
    pub builtin: bool,
    pub parameters: Value,
}

impl ToolInfo {
    pub fn of(tool: &dyn Tool) -> Self {
        Self {
            name: tool.name().to_string(),
            description: tool.description().to_string(),
            builtin: tool.is_builtin(),
            parameters: tool.parameters_schema(),
        }
    }
}

fn query_error(err: QueryError) -> Value {
    json!({ "error": err.to_string() })
}

/// A pagination argument. Integers outside `i64` are rejected, not defaulted.
fn page_arg(params: &Value, key: &str) -> Result<Option<i64>, QueryError> {
    match &params[key] {
        Value::Null => Ok(None),
        value => value.as_i64().map(Some).ok_or_else(|| {
            QueryError::InvalidPagination(format!("{} is out of range, got {}", key, value))
        }),
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Built-in tools
// ═══════════════════════════════════════════════════════════════════════

pub struct ListAllSourcesTool;

#[async_trait]
impl Tool for ListAllSourcesTool {
    fn name(&self) -> &str {
        "list_all_sources"
    }

    fn description(&self) -> &str {
        "List every successfully loaded API source with its title and version"
    }

    fn is_builtin(&self) -> bool {
        true
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {}
        })
    }

    async fn execute(&self, _params: Value, ctx: &ToolContext) -> Result<Value> {
        Ok(match ctx.gateway.list_sources().await {
            Ok(sources) => json!({ "sources": sources }),
            Err(e) => query_error(e),
        })
    }
}

pub struct ListEndpointsForSourceTool;

#[async_trait]
impl Tool for ListEndpointsForSourceTool {
    fn name(&self) -> &str {
        "list_endpoints_for_source"
    }

    fn description(&self) -> &str {
        "List the endpoints of one API source, paginated"
    }

    fn is_builtin(&self) -> bool {
        true
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "name": { "type": "string", "description": "Source name from list_all_sources" },
                "limit": {
                    "type": "integer",
                    "description": format!("Page size, 1 to {}", MAX_LIMIT),
                    "default": DEFAULT_LIMIT
                },
                "offset": { "type": "integer", "description": "Number of endpoints to skip", "default": 0 }
            },
            "required": ["name"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        let name = params["name"].as_str().unwrap_or("");
        let (limit, offset) = match (page_arg(&params, "limit"), page_arg(&params, "offset")) {
            (Ok(limit), Ok(offset)) => (limit, offset),
            (Err(e), _) | (_, Err(e)) => return Ok(query_error(e)),
        };

        Ok(match ctx.gateway.list_endpoints(name, limit, offset).await {
            Ok(page) => serde_json::to_value(page)?,
            Err(e) => query_error(e),
        })
    }
}

pub struct SearchEndpointTool;

#[async_trait]
impl Tool for SearchEndpointTool {
    fn name(&self) -> &str {
        "search_endpoint"
    }

    fn description(&self) -> &str {
        "Fuzzy-search endpoints across all sources by description, summary, path, method, source and tags"
    }

    fn is_builtin(&self) -> bool {
        true
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "description": "Free-text search, e.g. \"create user\"" }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        let query = params["query"].as_str().unwrap_or("");
        let endpoints = ctx.gateway.search_endpoints(query).await;
        Ok(json!({ "endpoints": endpoints }))
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Registry
// ═══════════════════════════════════════════════════════════════════════

/// Registry for tools.
///
/// ```rust,no_run
/// use api_harness::traits::ToolRegistry;
///
/// let mut tools = ToolRegistry::with_builtins();
/// // tools.register(Box::new(MyTool));
/// ```
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// A registry holding the three query tools.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(ListAllSourcesTool));
        registry.register(Box::new(ListEndpointsForSourceTool));
        registry.register(Box::new(SearchEndpointTool));
        registry
    }

    pub fn register(&mut self, tool: Box<dyn Tool>) {
        self.tools.push(tool);
    }

    pub fn tools(&self) -> &[Box<dyn Tool>] {
        &self.tools
    }

    pub fn find(&self, name: &str) -> Option<&dyn Tool> {
        self.tools
            .iter()
            .find(|t| t.name() == name)
            .map(|t| t.as_ref())
    }

    pub fn infos(&self) -> Vec<ToolInfo> {
        self.tools.iter().map(|t| ToolInfo::of(t.as_ref())).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Parameter validation
// ═══════════════════════════════════════════════════════════════════════

/// Check `params` against a tool's JSON Schema.
///
/// Verifies required fields, primitive types and `enum` membership, and
/// fills in `default` values for absent properties. `null` params are
/// treated as an empty object.
pub fn validate_params(schema: &Value, params: &Value) -> Result<Value> {
    let params_obj = match params {
        Value::Object(map) => map.clone(),
        Value::Null => serde_json::Map::new(),
        other => bail!("parameters must be an object, got {}", json_type_name(other)),
    };

    let properties = schema
        .get("properties")
        .and_then(|p| p.as_object())
        .cloned()
        .unwrap_or_default();

    let required: Vec<&str> = schema
        .get("required")
        .and_then(|r| r.as_array())
        .map(|arr| arr.iter().filter_map(|v| v.as_str()).collect())
        .unwrap_or_default();

    for field in &required {
        if !params_obj.contains_key(*field) {
            bail!("missing required parameter: {}", field);
        }
    }

    let mut result = params_obj.clone();

    for (prop_name, prop_schema) in &properties {
        let Some(value) = params_obj.get(prop_name) else {
            if let Some(default) = prop_schema.get("default") {
                result.insert(prop_name.clone(), default.clone());
            }
            continue;
        };

        if let Some(expected) = prop_schema.get("type").and_then(|t| t.as_str()) {
            let type_ok = match expected {
                "string" => value.is_string(),
                "integer" => value.is_i64() || value.is_u64(),
                "number" => value.is_number(),
                "boolean" => value.is_boolean(),
                "array" => value.is_array(),
                "object" => value.is_object(),
                _ => true,
            };
            if !type_ok {
                bail!(
                    "parameter '{}' must be of type '{}', got {}",
                    prop_name,
                    expected,
                    json_type_name(value)
                );
            }
        }

        if let Some(allowed) = prop_schema.get("enum").and_then(|e| e.as_array()) {
            if !allowed.contains(value) {
                let allowed: Vec<String> = allowed.iter().map(|v| v.to_string()).collect();
                bail!(
                    "parameter '{}' must be one of [{}], got {}",
                    prop_name,
                    allowed.join(", "),
                    value
                );
            }
        }
    }

    Ok(Value::Object(result))
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
