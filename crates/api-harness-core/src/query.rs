//! Read-side queries over a [`PublishedState`].
//!
//! These are the pure halves of the three query tools. The application's
//! gateway obtains a consistent state first and then calls into here.

use serde::Serialize;
use thiserror::Error;

use crate::index::ScoredEndpoint;
use crate::models::{Endpoint, SourceOutcome, SpecInfo};
use crate::pagination::{paginate, PageRequest, Pagination};
use crate::state::PublishedState;

/// Caller-facing query failures. These are returned as structured results,
/// never raised across the query boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("Source '{0}' not found")]
    SourceNotFound(String),
    #[error("Source '{name}' failed to parse - {detail}")]
    SourceFailed { name: String, detail: String },
    #[error("No sources available - every configured source failed to parse")]
    NoSources,
    #[error("Invalid pagination: {0}")]
    InvalidPagination(String),
}

/// One entry of `list_all_sources`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceSummary {
    pub name: String,
    pub description: String,
    pub info: SpecInfo,
    pub endpoint_count: usize,
}

/// Response of `list_endpoints_for_source`.
#[derive(Debug, Clone, Serialize)]
pub struct EndpointPage {
    pub endpoints: Vec<Endpoint>,
    pub pagination: Pagination,
}

impl PublishedState {
    /// Successfully parsed sources in source-set order. Failed sources are
    /// omitted; if none succeeded the result is [`QueryError::NoSources`].
    pub fn list_sources(&self) -> Result<Vec<SourceSummary>, QueryError> {
        let summaries: Vec<SourceSummary> = self
            .snapshot()
            .outcomes()
            .filter_map(|(name, outcome)| match outcome {
                SourceOutcome::Success { endpoints, info } => Some(SourceSummary {
                    name: name.to_string(),
                    description: self
                        .source(name)
                        .map(|s| s.description.clone())
                        .unwrap_or_default(),
                    info: info.clone(),
                    endpoint_count: endpoints.len(),
                }),
                SourceOutcome::Failure { .. } => None,
            })
            .collect();

        if summaries.is_empty() {
            return Err(QueryError::NoSources);
        }
        Ok(summaries)
    }

    /// One page of a source's endpoints.
    pub fn list_endpoints(&self, name: &str, page: PageRequest) -> Result<EndpointPage, QueryError> {
        match self.snapshot().get(name) {
            None => Err(QueryError::SourceNotFound(name.to_string())),
            Some(SourceOutcome::Failure { kind, detail }) => Err(QueryError::SourceFailed {
                name: name.to_string(),
                detail: format!("{}: {}", kind, detail),
            }),
            Some(SourceOutcome::Success { endpoints, .. }) => {
                let (endpoints, pagination) = paginate(endpoints, page);
                Ok(EndpointPage {
                    endpoints,
                    pagination,
                })
            }
        }
    }

    /// Ranked fuzzy matches, capped at the configured result limit.
    pub fn search(&self, query: &str) -> Vec<ScoredEndpoint> {
        self.index().search(query, self.params().max_results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ParseErrorKind, SourceDescriptor, SourceKind, SpecVersion};
    use crate::snapshot::RegistrySnapshot;
    use crate::state::SearchParams;
    use std::collections::BTreeMap;

    fn descriptor(name: &str) -> SourceDescriptor {
        SourceDescriptor {
            name: name.into(),
            locator: format!("{}.json", name),
            kind: SourceKind::File,
            headers: BTreeMap::new(),
            description: format!("{} description", name),
        }
    }

    fn info() -> SpecInfo {
        SpecInfo {
            title: "Source A".into(),
            version: "2.1.0".into(),
            description: None,
            spec_version: SpecVersion::OpenApiV3,
        }
    }

    fn state(a_endpoints: usize) -> PublishedState {
        let endpoints = (0..a_endpoints)
            .map(|i| Endpoint::new("GET", format!("/things/{}", i)))
            .collect();
        let snapshot = RegistrySnapshot::new(
            1,
            vec![
                (
                    "source-a".to_string(),
                    SourceOutcome::Success {
                        endpoints,
                        info: info(),
                    },
                ),
                (
                    "source-b".to_string(),
                    SourceOutcome::Failure {
                        kind: ParseErrorKind::NetworkError,
                        detail: "connection refused".into(),
                    },
                ),
            ],
        );
        PublishedState::build(
            vec![descriptor("source-a"), descriptor("source-b")],
            snapshot,
            SearchParams::default(),
        )
    }

    #[test]
    fn test_list_sources_omits_failed() {
        let sources = state(3).list_sources().unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].name, "source-a");
        assert_eq!(sources[0].description, "source-a description");
        assert_eq!(sources[0].info.version, "2.1.0");
        assert_eq!(sources[0].endpoint_count, 3);
    }

    #[test]
    fn test_list_sources_none_successful() {
        let snapshot = RegistrySnapshot::new(
            1,
            vec![(
                "b".to_string(),
                SourceOutcome::Failure {
                    kind: ParseErrorKind::Unknown,
                    detail: "boom".into(),
                },
            )],
        );
        let st = PublishedState::build(vec![descriptor("b")], snapshot, SearchParams::default());
        assert_eq!(st.list_sources().unwrap_err(), QueryError::NoSources);
    }

    #[test]
    fn test_list_endpoints_unknown_source() {
        let err = state(3)
            .list_endpoints("nope", PageRequest::default())
            .unwrap_err();
        assert_eq!(err.to_string(), "Source 'nope' not found");
    }

    #[test]
    fn test_list_endpoints_failed_source_carries_detail() {
        let err = state(3)
            .list_endpoints("source-b", PageRequest::default())
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.starts_with("Source 'source-b' failed to parse - "), "{}", msg);
        assert!(msg.contains("connection refused"));
    }

    #[test]
    fn test_list_endpoints_paginates() {
        let st = state(7);
        let page = st
            .list_endpoints("source-a", PageRequest::new(Some(3), Some(3)).unwrap())
            .unwrap();
        assert_eq!(page.endpoints.len(), 3);
        assert_eq!(page.endpoints[0].path, "/things/3");
        assert!(page.pagination.has_next);
        assert!(page.pagination.has_previous);

        let last = st
            .list_endpoints("source-a", PageRequest::new(Some(3), Some(6)).unwrap())
            .unwrap();
        assert_eq!(last.endpoints.len(), 1);
        assert!(!last.pagination.has_next);
    }

    #[test]
    fn test_search_empty_query() {
        assert!(state(3).search("").is_empty());
    }
}
