//! The published snapshot/index pair.
//!
//! A [`PublishedState`] is the unit that the refresh coordinator swaps in
//! atomically. It can only be built from a snapshot, so the index it carries
//! always belongs to that snapshot's generation.

use crate::index::{FieldWeights, SearchIndex};
use crate::models::SourceDescriptor;
use crate::snapshot::RegistrySnapshot;

/// Search tuning carried from configuration into the index builder.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchParams {
    /// Minimum similarity in `[0, 1]`; lower is more permissive.
    pub fuzzy_threshold: f64,
    /// Maximum number of search results returned.
    pub max_results: usize,
    pub weights: FieldWeights,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            fuzzy_threshold: 0.6,
            max_results: 20,
            weights: FieldWeights::default(),
        }
    }
}

#[derive(Debug)]
pub struct PublishedState {
    sources: Vec<SourceDescriptor>,
    snapshot: RegistrySnapshot,
    index: SearchIndex,
    params: SearchParams,
}

impl PublishedState {
    /// Build the index for `snapshot` and pair them. `sources` is the source
    /// set the snapshot was ingested from.
    pub fn build(
        sources: Vec<SourceDescriptor>,
        snapshot: RegistrySnapshot,
        params: SearchParams,
    ) -> Self {
        let index = SearchIndex::build(&snapshot, params.weights, params.fuzzy_threshold);
        Self {
            sources,
            snapshot,
            index,
            params,
        }
    }

    pub fn generation(&self) -> u64 {
        self.snapshot.generation()
    }

    pub fn snapshot(&self) -> &RegistrySnapshot {
        &self.snapshot
    }

    pub fn index(&self) -> &SearchIndex {
        &self.index
    }

    pub fn sources(&self) -> &[SourceDescriptor] {
        &self.sources
    }

    pub fn params(&self) -> &SearchParams {
        &self.params
    }

    pub fn source(&self, name: &str) -> Option<&SourceDescriptor> {
        self.sources.iter().find(|s| s.name == name)
    }
}
