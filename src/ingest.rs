//! Ingestion pipeline: source set → registry snapshot.
//!
//! Every source is parsed independently and concurrently on the calling
//! task. A failing source is recorded as a [`SourceOutcome::Failure`] and
//! never stops the others. Each parse is bounded by the fetch timeout; a
//! source that exceeds it is recorded as a `NetworkError` for this pass.

use futures::future::join_all;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use api_harness_core::models::{ParseErrorKind, SourceDescriptor, SourceOutcome};
use api_harness_core::snapshot::RegistrySnapshot;

use crate::parser::{DocumentParser, ParseError};

/// Run one ingestion pass and return a fresh snapshot tagged `generation`.
///
/// Outcomes keep the order of `sources`. Nothing outside the returned value
/// is modified.
pub async fn ingest(
    parser: &dyn DocumentParser,
    sources: &[SourceDescriptor],
    generation: u64,
    fetch_timeout: Duration,
) -> RegistrySnapshot {
    let passes = sources
        .iter()
        .map(|source| ingest_one(parser, source, fetch_timeout));
    let outcomes = join_all(passes).await;

    RegistrySnapshot::new(
        generation,
        sources.iter().map(|s| s.name.clone()).zip(outcomes),
    )
}

async fn ingest_one(
    parser: &dyn DocumentParser,
    source: &SourceDescriptor,
    fetch_timeout: Duration,
) -> SourceOutcome {
    let started = Instant::now();
    let result = tokio::time::timeout(fetch_timeout, parser.parse(source)).await;

    let outcome = match result {
        Ok(Ok(doc)) => SourceOutcome::from(doc),
        Ok(Err(e)) => {
            let err = ParseError::from_anyhow(&e);
            SourceOutcome::Failure {
                kind: err.kind,
                detail: err.detail,
            }
        }
        Err(_) => SourceOutcome::Failure {
            kind: ParseErrorKind::NetworkError,
            detail: format!(
                "fetching {} timed out after {}s",
                source.locator,
                fetch_timeout.as_secs_f64()
            ),
        },
    };

    match &outcome {
        SourceOutcome::Success { endpoints, info } => debug!(
            source = %source.name,
            endpoints = endpoints.len(),
            spec = %info.spec_version,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "source ingested"
        ),
        SourceOutcome::Failure { kind, detail } => warn!(
            source = %source.name,
            kind = %kind,
            detail = %detail,
            "source failed to ingest"
        ),
    }

    outcome
}
