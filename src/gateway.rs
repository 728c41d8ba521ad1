//! Query gateway: the read side used by every transport.
//!
//! Each call first obtains a consistent [`PublishedState`] from the
//! coordinator (waiting out any in-flight refresh) and then answers from
//! that one state only.

use std::sync::Arc;

use api_harness_core::index::ScoredEndpoint;
use api_harness_core::pagination::PageRequest;
use api_harness_core::query::{EndpointPage, QueryError, SourceSummary};
use api_harness_core::state::PublishedState;

use crate::coordinator::RefreshCoordinator;

#[derive(Clone)]
pub struct QueryGateway {
    coordinator: Arc<RefreshCoordinator>,
}

impl QueryGateway {
    pub fn new(coordinator: Arc<RefreshCoordinator>) -> Self {
        Self { coordinator }
    }

    pub fn coordinator(&self) -> &Arc<RefreshCoordinator> {
        &self.coordinator
    }

    pub async fn state(&self) -> Arc<PublishedState> {
        self.coordinator.current().await
    }

    pub async fn list_sources(&self) -> Result<Vec<SourceSummary>, QueryError> {
        self.state().await.list_sources()
    }

    pub async fn list_endpoints(
        &self,
        name: &str,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<EndpointPage, QueryError> {
        let page = PageRequest::new(limit, offset)?;
        self.state().await.list_endpoints(name, page)
    }

    /// Ranked matches; an empty or whitespace query yields no results.
    pub async fn search_endpoints(&self, query: &str) -> Vec<ScoredEndpoint> {
        if query.trim().is_empty() {
            return Vec::new();
        }
        self.state().await.search(query)
    }
}
