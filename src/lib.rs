//! # API Harness
//!
//! Serves OpenAPI / Swagger documents to AI tools.
//!
//! API Harness loads a configured set of API description documents (local
//! files or remote URLs), keeps an immutable snapshot of their endpoints
//! fresh in the background, and answers three queries over MCP and a plain
//! JSON HTTP API: list the sources, page through one source's endpoints, and
//! fuzzy-search endpoints across every source.
//!
//! ## Architecture
//!
//! ```text
//!  timer ─┐                         ┌──────────────────────────┐
//!  config ├─▶ RefreshCoordinator ──▶│ PublishedState (ArcSwap) │
//!  watch ─┘     │ single-flight     │  snapshot + search index │
//!               ▼                   └────────────┬─────────────┘
//!          ingest(sources)                       ▼
//!          DocumentParser ×N             QueryGateway → tools
//!                                          │          │
//!                                     MCP stdio   HTTP + /mcp
//! ```
//!
//! The pure pieces (models, snapshot, fuzzy engine, index, pagination, read
//! queries) live in the `api-harness-core` crate.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML / JSON configuration parsing and validation |
//! | [`parser`] | Document fetch, decode, `$ref` resolution, endpoint extraction |
//! | [`ingest`] | Concurrent, failure-isolated ingestion pass |
//! | [`coordinator`] | Single-flight refresh and atomic publish |
//! | [`debounce`] | Quiet-period debouncing of change bursts |
//! | [`triggers`] | Refresh timer and config file watcher |
//! | [`gateway`] | Consistent read access for queries |
//! | [`traits`] | `Tool` trait, built-in tools, registry |
//! | [`mcp`] | MCP bridge and stdio transport |
//! | [`server`] | HTTP server |

pub mod config;
pub mod coordinator;
pub mod debounce;
pub mod gateway;
pub mod ingest;
pub mod mcp;
pub mod parser;
pub mod search;
pub mod serve;
pub mod server;
pub mod sources;
pub mod traits;
pub mod triggers;
