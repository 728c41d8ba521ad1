//! # API Harness CLI (`apih`)
//!
//! ## Usage
//!
//! ```bash
//! apih --config ./apih.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `apih serve` | Serve the query tools over MCP stdio (default) or HTTP |
//! | `apih check` | Validate configuration and print the source set |
//! | `apih sources` | Ingest once and print every source's status |
//! | `apih endpoints <name>` | Ingest once and print a page of one source's endpoints |
//! | `apih search "<query>"` | Ingest once and print ranked endpoint matches |
//!
//! ## Examples
//!
//! ```bash
//! # Cursor / Claude Desktop (stdio MCP)
//! apih --config ./apih.toml serve
//!
//! # HTTP API and MCP streamable HTTP on [server].bind
//! apih --config ./apih.toml serve --transport http
//!
//! # Which sources load?
//! apih --config ./apih.toml sources
//!
//! apih endpoints petstore --limit 20 --offset 20
//! apih search "create user"
//! ```
//!
//! Diagnostics go to stderr through `tracing`; set `RUST_LOG` to adjust.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use api_harness::config;
use api_harness::search;
use api_harness::serve::{self, Transport};
use api_harness::sources;

/// API Harness CLI — serve OpenAPI and Swagger endpoint catalogs to AI tools.
#[derive(Parser)]
#[command(
    name = "apih",
    about = "API Harness — serve OpenAPI and Swagger endpoint catalogs to AI tools",
    version,
    long_about = "API Harness loads OpenAPI and Swagger documents from local files or URLs, \
    keeps them fresh in the background, and exposes source listing, paginated endpoint \
    listing, and fuzzy endpoint search over MCP and a JSON HTTP API."
)]
struct Cli {
    /// Path to configuration file (TOML, or JSON with a `.json` extension).
    #[arg(long, global = true, default_value = "./apih.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the query server.
    ///
    /// Runs the startup ingestion (exits non-zero if no source loads), then
    /// refreshes on `refresh_interval` and whenever the config file changes.
    Serve {
        /// Transport to serve on.
        #[arg(long, value_enum, default_value = "stdio")]
        transport: Transport,
    },

    /// Validate the configuration and print the source set.
    Check,

    /// Ingest every source once and print its status.
    Sources,

    /// Print a page of one source's endpoints.
    Endpoints {
        /// Source name.
        name: String,

        /// Page size (1-100).
        #[arg(long)]
        limit: Option<i64>,

        /// Number of endpoints to skip.
        #[arg(long)]
        offset: Option<i64>,
    },

    /// Fuzzy-search endpoints across all sources.
    Search {
        /// The search query string.
        query: String,
    },
}

fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Serve { .. } => init_tracing("info"),
        _ => init_tracing("warn"),
    }

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Serve { transport } => {
            serve::run_serve(cfg, &cli.config, transport).await?;
        }
        Commands::Check => {
            sources::run_check(&cfg)?;
        }
        Commands::Sources => {
            sources::list_sources(&cfg).await?;
        }
        Commands::Endpoints {
            name,
            limit,
            offset,
        } => {
            sources::run_endpoints(&cfg, &name, limit, offset).await?;
        }
        Commands::Search { query } => {
            search::run_search(&cfg, &query).await?;
        }
    }

    Ok(())
}
