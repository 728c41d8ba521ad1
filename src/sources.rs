//! One-shot source commands: `apih check`, `apih sources`, `apih endpoints`.

use anyhow::{bail, Result};
use std::sync::Arc;

use api_harness_core::models::SourceOutcome;
use api_harness_core::pagination::PageRequest;
use api_harness_core::state::PublishedState;

use crate::config::Config;
use crate::ingest::ingest;
use crate::parser::OpenApiParser;

/// Run a single ingestion pass outside any coordinator.
pub async fn load_once(config: &Config) -> Result<PublishedState> {
    let parser = OpenApiParser::new()?;
    let sources = config.source_set();
    let snapshot = ingest(&parser, &sources, 1, config.fetch_timeout()).await;
    Ok(PublishedState::build(sources, snapshot, config.search_params()))
}

/// Load once and fail like startup does when nothing could be ingested.
pub async fn load_serving(config: &Config) -> Result<Arc<PublishedState>> {
    let state = load_once(config).await?;
    if state.snapshot().success_count() == 0 {
        bail!(
            "every source failed to ingest ({} attempted); run `apih sources` for details",
            state.snapshot().len()
        );
    }
    Ok(Arc::new(state))
}

pub fn run_check(config: &Config) -> Result<()> {
    println!("Configuration OK.");
    println!(
        "refresh every {}s, fetch timeout {}s, fuzzy threshold {}, max results {}",
        config.refresh_interval,
        config.fetch_timeout_secs,
        config.search.fuzzy_threshold,
        config.search.max_results
    );
    println!();
    println!("{:<20} {:<6} LOCATOR", "SOURCE", "KIND");
    for s in config.source_set() {
        println!("{:<20} {:<6} {}", s.name, s.kind, s.locator);
    }
    Ok(())
}

pub async fn list_sources(config: &Config) -> Result<()> {
    let state = load_once(config).await?;
    let snapshot = state.snapshot();

    println!("{:<20} {:<8} {:>9}  DETAIL", "SOURCE", "STATUS", "ENDPOINTS");
    for (name, outcome) in snapshot.outcomes() {
        match outcome {
            SourceOutcome::Success { endpoints, info } => println!(
                "{:<20} {:<8} {:>9}  {} {} ({})",
                name,
                "OK",
                endpoints.len(),
                info.title,
                info.version,
                info.spec_version
            ),
            SourceOutcome::Failure { kind, detail } => {
                println!("{:<20} {:<8} {:>9}  {}: {}", name, "FAILED", "-", kind, detail)
            }
        }
    }

    if snapshot.success_count() == 0 {
        bail!("every source failed to ingest");
    }
    Ok(())
}

pub async fn run_endpoints(
    config: &Config,
    name: &str,
    limit: Option<i64>,
    offset: Option<i64>,
) -> Result<()> {
    let state = load_serving(config).await?;
    let page = state.list_endpoints(name, PageRequest::new(limit, offset)?)?;

    for ep in &page.endpoints {
        let label = ep
            .summary
            .as_deref()
            .or(ep.description.as_deref())
            .unwrap_or("");
        let deprecated = if ep.deprecated { " [deprecated]" } else { "" };
        println!("{:<7} {}  {}{}", ep.method, ep.path, label, deprecated);
    }

    let p = &page.pagination;
    println!();
    println!(
        "{}-{} of {}{}",
        if page.endpoints.is_empty() { p.offset } else { p.offset + 1 },
        p.offset + page.endpoints.len(),
        p.total,
        if p.has_next {
            format!(" (next: --offset {})", p.offset + p.limit)
        } else {
            String::new()
        }
    );
    Ok(())
}
