//! End-to-end tests: real parser, real coordinator, HTTP server on a free port.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use api_harness::config::load_config;
use api_harness::coordinator::{RefreshCoordinator, RefreshReason};
use api_harness::gateway::QueryGateway;
use api_harness::parser::OpenApiParser;
use api_harness::server::run_server;
use api_harness::traits::{Tool, ToolContext, ToolRegistry};

// ─── Fixtures ───────────────────────────────────────────────────────

const SOURCE_A: &str = r##"{
  "openapi": "3.0.3",
  "info": { "title": "Accounts API", "version": "2.1.0" },
  "components": {
    "schemas": {
      "User": { "type": "object", "properties": { "id": { "type": "string" } } }
    }
  },
  "paths": {
    "/users": {
      "post": {
        "operationId": "createUser",
        "description": "Creates a new user account",
        "tags": ["users"],
        "responses": {
          "201": { "content": { "application/json": { "schema": { "$ref": "#/components/schemas/User" } } } }
        }
      }
    },
    "/users/{id}": {
      "get": { "summary": "Fetch a user by id", "tags": ["users"] }
    },
    "/payments/{id}": {
      "delete": { "description": "Delete a payment record", "tags": ["payments"] }
    }
  }
}"##;

const SOURCE_A_GROWN: &str = r#"
openapi: 3.0.3
info:
  title: Accounts API
  version: 2.2.0
paths:
  /users:
    post:
      description: Creates a new user account
    get:
      summary: List users
  /users/{id}:
    get:
      summary: Fetch a user by id
  /payments/{id}:
    delete:
      description: Delete a payment record
"#;

fn setup(tmp: &TempDir, port: u16) -> PathBuf {
    let specs = tmp.path().join("specs");
    fs::create_dir_all(&specs).unwrap();
    fs::write(specs.join("source-a.json"), SOURCE_A).unwrap();

    let config = format!(
        r#"
fetch_timeout_secs = 5

[server]
bind = "127.0.0.1:{}"

[[sources]]
name = "source-a"
source = "specs/source-a.json"
description = "Accounts and payments"

[[sources]]
name = "source-b"
source = "http://127.0.0.1:1/openapi.json"
description = "Unreachable"
"#,
        port
    );
    let path = tmp.path().join("apih.toml");
    fs::write(&path, config).unwrap();
    path
}

async fn start(config_path: &Path) -> Arc<RefreshCoordinator> {
    let cfg = load_config(config_path).unwrap();
    let parser = Arc::new(OpenApiParser::new().unwrap());
    RefreshCoordinator::start(cfg, Some(config_path.to_path_buf()), parser)
        .await
        .unwrap()
}

fn find_free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

async fn wait_for_server(port: u16) {
    let client = reqwest::Client::new();
    let url = format!("http://127.0.0.1:{}/health", port);
    for _ in 0..50 {
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        if let Ok(resp) = client.get(&url).send().await {
            if resp.status().is_success() {
                return;
            }
        }
    }
    panic!("Server did not become ready within 5 seconds");
}

struct Harness {
    _tmp: TempDir,
    port: u16,
    coordinator: Arc<RefreshCoordinator>,
    config_path: PathBuf,
    shutdown: CancellationToken,
    client: reqwest::Client,
}

impl Harness {
    async fn new(tools: ToolRegistry) -> Self {
        let tmp = TempDir::new().unwrap();
        let port = find_free_port();
        let config_path = setup(&tmp, port);
        let coordinator = start(&config_path).await;

        let shutdown = CancellationToken::new();
        let gateway = QueryGateway::new(coordinator.clone());
        let bind = format!("127.0.0.1:{}", port);
        let token = shutdown.clone();
        let tools = Arc::new(tools);
        tokio::spawn(async move {
            run_server(gateway, tools, &bind, token).await.ok();
        });
        wait_for_server(port).await;

        Self {
            _tmp: tmp,
            port,
            coordinator,
            config_path,
            shutdown,
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://127.0.0.1:{}{}", self.port, path)
    }

    async fn call(&self, tool: &str, params: Value) -> (u16, Value) {
        let resp = self
            .client
            .post(self.url(&format!("/tools/{}", tool)))
            .json(&params)
            .send()
            .await
            .unwrap();
        let status = resp.status().as_u16();
        (status, resp.json().await.unwrap())
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Counts endpoints per source through the gateway.
struct EndpointTotalsTool;

#[async_trait]
impl Tool for EndpointTotalsTool {
    fn name(&self) -> &str {
        "endpoint_totals"
    }

    fn description(&self) -> &str {
        "Endpoint counts per loaded source"
    }

    fn parameters_schema(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }

    async fn execute(&self, _params: Value, ctx: &ToolContext) -> Result<Value> {
        let sources = ctx.gateway().list_sources().await?;
        let totals: serde_json::Map<String, Value> = sources
            .into_iter()
            .map(|s| (s.name, json!(s.endpoint_count)))
            .collect();
        Ok(Value::Object(totals))
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_health_reports_generation() {
    let h = Harness::new(ToolRegistry::with_builtins()).await;
    let body: Value = h
        .client
        .get(h.url("/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["generation"], 1);
    assert_eq!(body["phase"], "idle");
    assert_eq!(body["last_refresh"]["succeeded"], 1);
    assert_eq!(body["last_refresh"]["failed"], 1);
}

#[tokio::test]
async fn test_tool_list_has_builtins() {
    let h = Harness::new(ToolRegistry::with_builtins()).await;
    let body: Value = h
        .client
        .get(h.url("/tools/list"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let names: Vec<&str> = body["tools"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert_eq!(
        names,
        vec!["list_all_sources", "list_endpoints_for_source", "search_endpoint"]
    );
}

#[tokio::test]
async fn test_failed_source_is_hidden_but_explained() {
    let h = Harness::new(ToolRegistry::with_builtins()).await;

    let (status, body) = h.call("list_all_sources", json!({})).await;
    assert_eq!(status, 200);
    let sources = body["result"]["sources"].as_array().unwrap();
    assert_eq!(sources.len(), 1);
    assert_eq!(sources[0]["name"], "source-a");
    assert_eq!(sources[0]["info"]["title"], "Accounts API");
    assert_eq!(sources[0]["info"]["version"], "2.1.0");

    let (status, body) = h
        .call("list_endpoints_for_source", json!({ "name": "source-b" }))
        .await;
    assert_eq!(status, 200);
    let error = body["result"]["error"].as_str().unwrap();
    assert!(
        error.starts_with("Source 'source-b' failed to parse - "),
        "unexpected error: {}",
        error
    );
}

#[tokio::test]
async fn test_endpoints_are_paginated_and_refs_inlined() {
    let h = Harness::new(ToolRegistry::with_builtins()).await;
    let (_, body) = h
        .call(
            "list_endpoints_for_source",
            json!({ "name": "source-a", "limit": 2 }),
        )
        .await;
    let result = &body["result"];
    assert_eq!(result["pagination"]["total"], 3);
    assert_eq!(result["pagination"]["hasNext"], true);
    assert_eq!(result["pagination"]["hasPrevious"], false);

    let create = &result["endpoints"][0];
    assert_eq!(create["method"], "POST");
    assert_eq!(create["path"], "/users");
    assert_eq!(
        create["responses"]["201"]["content"]["application/json"]["schema"]["type"],
        "object"
    );
}

#[tokio::test]
async fn test_search_ranks_create_user_first() {
    let h = Harness::new(ToolRegistry::with_builtins()).await;
    let (_, body) = h
        .call("search_endpoint", json!({ "query": "create user" }))
        .await;
    let hits = body["result"]["endpoints"].as_array().unwrap();
    assert!(!hits.is_empty());
    assert_eq!(hits[0]["path"], "/users");
    assert_eq!(hits[0]["method"], "POST");
    assert_eq!(hits[0]["source_name"], "source-a");

    let create_pos = 0;
    if let Some(delete_pos) = hits.iter().position(|e| e["path"] == "/payments/{id}") {
        assert!(create_pos < delete_pos);
    }
}

#[tokio::test]
async fn test_transport_errors() {
    let h = Harness::new(ToolRegistry::with_builtins()).await;

    let (status, body) = h.call("nonexistent", json!({})).await;
    assert_eq!(status, 404);
    assert_eq!(body["error"]["code"], "not_found");

    let (status, body) = h.call("list_endpoints_for_source", json!({})).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "bad_request");

    let (status, body) = h
        .call("list_endpoints_for_source", json!({ "name": "source-a", "limit": 500 }))
        .await;
    assert_eq!(status, 200);
    assert!(body["result"]["error"]
        .as_str()
        .unwrap()
        .starts_with("Invalid pagination"));
}

#[tokio::test]
async fn test_refresh_publishes_edited_document() {
    let h = Harness::new(ToolRegistry::with_builtins()).await;

    let spec = h.config_path.parent().unwrap().join("specs/source-a.json");
    fs::write(&spec, SOURCE_A_GROWN).unwrap();
    let report = h.coordinator.refresh(RefreshReason::Manual).await.unwrap();
    assert_eq!(report.generation, 2);

    let (_, body) = h
        .call("list_endpoints_for_source", json!({ "name": "source-a" }))
        .await;
    assert_eq!(body["result"]["pagination"]["total"], 4);

    let (_, body) = h.call("list_all_sources", json!({})).await;
    assert_eq!(body["result"]["sources"][0]["info"]["version"], "2.2.0");
}

#[tokio::test]
async fn test_custom_tool_via_http_server() {
    let mut tools = ToolRegistry::with_builtins();
    tools.register(Box::new(EndpointTotalsTool));
    let h = Harness::new(tools).await;

    let (status, body) = h.call("endpoint_totals", json!({})).await;
    assert_eq!(status, 200);
    assert_eq!(body["result"]["source-a"], 3);
    assert!(body["result"].get("source-b").is_none());
}

#[tokio::test]
async fn test_mcp_endpoint_accepts_initialize() {
    let h = Harness::new(ToolRegistry::with_builtins()).await;
    let resp = h
        .client
        .post(h.url("/mcp"))
        .header("Accept", "application/json, text/event-stream")
        .json(&json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "initialize",
            "params": {
                "protocolVersion": "2025-03-26",
                "capabilities": {},
                "clientInfo": { "name": "test", "version": "0.0.0" }
            }
        }))
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_success(), "status: {}", resp.status());
    assert!(resp.headers().contains_key("mcp-session-id"));
}
