//! HTTP server.
//!
//! Serves the query tools over a plain JSON API and the MCP streamable HTTP
//! transport from one axum router.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Status, version, served generation, last refresh |
//! | `GET`  | `/tools/list` | All registered tools with parameter schemas |
//! | `POST` | `/tools/{name}` | Call a tool by name |
//! | `*`    | `/mcp` | MCP streamable HTTP transport |
//!
//! # Error contract
//!
//! Transport-level failures use:
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "missing required parameter: name" } }
//! ```
//!
//! Codes: `bad_request` (400), `not_found` (404), `tool_error` (500).
//! Query failures such as an unknown source are NOT transport errors: they
//! come back as `200 { "result": { "error": "Source 'x' not found" } }`.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use rmcp::transport::streamable_http_server::{
    session::local::LocalSessionManager, StreamableHttpServerConfig, StreamableHttpService,
};
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::coordinator::{Phase, RefreshReport};
use crate::gateway::QueryGateway;
use crate::mcp::McpBridge;
use crate::traits::{validate_params, ToolContext, ToolInfo, ToolRegistry};

#[derive(Clone)]
struct AppState {
    ctx: ToolContext,
    tools: Arc<ToolRegistry>,
}

/// Build the application router.
pub fn router(gateway: QueryGateway, tools: Arc<ToolRegistry>) -> Router {
    let ctx = ToolContext::new(gateway);

    let bridge = McpBridge::new(ctx.clone(), tools.clone());
    let mcp = StreamableHttpService::new(
        move || Ok(bridge.clone()),
        LocalSessionManager::default().into(),
        StreamableHttpServerConfig::default(),
    );

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/tools/list", get(handle_list_tools))
        .route("/tools/{name}", post(handle_tool_call))
        .nest_service("/mcp", mcp)
        .layer(cors)
        .with_state(AppState { ctx, tools })
}

/// Bind `bind` and serve until `shutdown` is cancelled.
pub async fn run_server(
    gateway: QueryGateway,
    tools: Arc<ToolRegistry>,
    bind: &str,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    for t in tools.tools() {
        println!("  POST /tools/{} — {}", t.name(), t.description());
    }

    let app = router(gateway, tools);
    let listener = tokio::net::TcpListener::bind(bind).await?;
    let addr = listener.local_addr()?;
    println!("API Harness listening on http://{}", addr);
    println!("MCP endpoint: http://{}/mcp", addr);
    info!(%addr, "http server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    info!("http server stopped");
    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found",
        message: message.into(),
    }
}

fn tool_error(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "tool_error",
        message: message.into(),
    }
}

/// Tools only fail for bad input or internal faults; map the former to 400.
fn classify_tool_error(tool_name: &str, err: anyhow::Error) -> AppError {
    let msg = err.to_string();
    if msg.contains("must not be empty") || msg.contains("invalid") {
        bad_request(format!("{}: {}", tool_name, msg))
    } else {
        tool_error(format!("{}: {}", tool_name, msg))
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    generation: u64,
    phase: Phase,
    last_refresh: Option<RefreshReport>,
}

async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
    let coordinator = state.ctx.gateway().coordinator();
    let status = coordinator.status();
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        generation: coordinator.published_generation(),
        phase: status.phase,
        last_refresh: status.last,
    })
}

// ============ GET /tools/list ============

#[derive(Serialize)]
struct ToolListResponse {
    tools: Vec<ToolInfo>,
}

async fn handle_list_tools(State(state): State<AppState>) -> Json<ToolListResponse> {
    Json(ToolListResponse {
        tools: state.tools.infos(),
    })
}

// ============ POST /tools/{name} ============

async fn handle_tool_call(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(params): Json<serde_json::Value>,
) -> Result<Json<serde_json::Value>, AppError> {
    let tool = state
        .tools
        .find(&name)
        .ok_or_else(|| not_found(format!("no tool registered with name: {}", name)))?;

    let params = validate_params(&tool.parameters_schema(), &params)
        .map_err(|e| bad_request(e.to_string()))?;

    let result = tool
        .execute(params, &state.ctx)
        .await
        .map_err(|e| classify_tool_error(&name, e))?;

    Ok(Json(serde_json::json!({ "result": result })))
}
