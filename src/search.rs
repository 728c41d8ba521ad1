//! `apih search`: rank endpoints across all sources from the command line.

use anyhow::Result;

use crate::config::Config;
use crate::sources::load_serving;

pub async fn run_search(config: &Config, query: &str) -> Result<()> {
    if query.trim().is_empty() {
        println!("No results.");
        return Ok(());
    }

    let state = load_serving(config).await?;
    let results = state.search(query);
    if results.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (i, hit) in results.iter().enumerate() {
        let ep = &hit.endpoint.endpoint;
        println!(
            "{}. [{:.3}] {} {}  ({})",
            i + 1,
            hit.score,
            ep.method,
            ep.path,
            hit.endpoint.source_name
        );
        if let Some(text) = ep.summary.as_deref().or(ep.description.as_deref()) {
            println!("   {}", text);
        }
    }
    Ok(())
}
