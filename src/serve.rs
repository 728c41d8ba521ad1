//! `apih serve`: coordinator, triggers and one transport.

use anyhow::Result;
use clap::ValueEnum;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::Config;
use crate::coordinator::RefreshCoordinator;
use crate::debounce::CONFIG_DEBOUNCE;
use crate::gateway::QueryGateway;
use crate::mcp::{serve_stdio, McpBridge};
use crate::parser::OpenApiParser;
use crate::server::run_server;
use crate::traits::{ToolContext, ToolRegistry};
use crate::triggers::{spawn_config_watcher, spawn_refresh_timer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Transport {
    /// MCP over stdin/stdout.
    Stdio,
    /// JSON API plus MCP streamable HTTP at `/mcp`.
    Http,
}

pub async fn run_serve(config: Config, config_path: &Path, transport: Transport) -> Result<()> {
    let parser = Arc::new(OpenApiParser::new()?);
    let bind = config.server.bind.clone();

    let coordinator =
        RefreshCoordinator::start(config, Some(config_path.to_path_buf()), parser).await?;

    let shutdown = CancellationToken::new();
    let timer = spawn_refresh_timer(coordinator.clone(), shutdown.clone());
    let watcher = match spawn_config_watcher(
        coordinator.clone(),
        config_path,
        CONFIG_DEBOUNCE,
        shutdown.clone(),
    ) {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!(error = %format!("{:#}", e), "config watching disabled");
            None
        }
    };

    let signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, shutting down");
        }
        signal.cancel();
    });

    let gateway = QueryGateway::new(coordinator);
    let tools = Arc::new(ToolRegistry::with_builtins());

    let served = match transport {
        Transport::Http => run_server(gateway, tools, &bind, shutdown.clone()).await,
        Transport::Stdio => {
            let bridge = McpBridge::new(ToolContext::new(gateway), tools);
            tokio::select! {
                r = serve_stdio(bridge) => r,
                _ = shutdown.cancelled() => Ok(()),
            }
        }
    };

    shutdown.cancel();
    let _ = timer.await;
    if let Some(watcher) = watcher {
        let _ = watcher.await;
    }
    served
}
