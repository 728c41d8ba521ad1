//! Endpoint search index builder.
//!
//! Flattens every successful source of a [`RegistrySnapshot`] into
//! [`TaggedEndpoint`]s and indexes them with the [`FuzzyIndex`] engine over
//! a fixed set of weighted fields:
//!
//! | Field | Weight |
//! |-------|--------|
//! | `description` | 0.30 |
//! | `summary` | 0.20 |
//! | `path` | 0.20 |
//! | `method` | 0.15 |
//! | `sourceName` | 0.10 |
//! | `tags` | 0.05 |
//!
//! The index records the generation of the snapshot it was built from so a
//! published pair can be checked for consistency.

use serde::Serialize;

use crate::fuzzy::{FuzzyIndex, Searchable, WeightedField};
use crate::models::TaggedEndpoint;
use crate::snapshot::RegistrySnapshot;

/// Per-field weights used to rank endpoints.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldWeights {
    pub description: f64,
    pub summary: f64,
    pub path: f64,
    pub method: f64,
    pub source_name: f64,
    pub tags: f64,
}

/// The policy weights. They sum to `1.0`.
pub const ENDPOINT_FIELD_WEIGHTS: FieldWeights = FieldWeights {
    description: 0.30,
    summary: 0.20,
    path: 0.20,
    method: 0.15,
    source_name: 0.10,
    tags: 0.05,
};

impl Default for FieldWeights {
    fn default() -> Self {
        ENDPOINT_FIELD_WEIGHTS
    }
}

impl FieldWeights {
    fn to_fields(self) -> Vec<WeightedField> {
        vec![
            WeightedField::new("description", self.description),
            WeightedField::new("summary", self.summary),
            WeightedField::new("path", self.path),
            WeightedField::new("method", self.method),
            WeightedField::new("sourceName", self.source_name),
            WeightedField::new("tags", self.tags),
        ]
    }
}

impl Searchable for TaggedEndpoint {
    fn field_text(&self, field: &str) -> Vec<&str> {
        let ep = &self.endpoint;
        match field {
            "description" => ep.description.as_deref().into_iter().collect(),
            "summary" => ep.summary.as_deref().into_iter().collect(),
            "path" => vec![ep.path.as_str()],
            "method" => vec![ep.method.as_str()],
            "sourceName" => vec![self.source_name.as_str()],
            "tags" => ep.tags.iter().map(String::as_str).collect(),
            _ => Vec::new(),
        }
    }
}

/// A search result: the endpoint, its source, and its relevance.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredEndpoint {
    #[serde(flatten)]
    pub endpoint: TaggedEndpoint,
    pub score: f64,
}

/// Read-only fuzzy index over one snapshot's endpoints.
pub struct SearchIndex {
    generation: u64,
    engine: FuzzyIndex<TaggedEndpoint>,
}

impl SearchIndex {
    /// Build the index for `snapshot`.
    ///
    /// `fuzzy_threshold` is a minimum similarity in `[0, 1]`: **lower values
    /// widen the match tolerance** (more permissive), higher values demand
    /// closer matches. Building twice from the same inputs yields identical
    /// query results.
    pub fn build(snapshot: &RegistrySnapshot, weights: FieldWeights, fuzzy_threshold: f64) -> Self {
        let engine = FuzzyIndex::build(snapshot.flatten(), &weights.to_fields(), fuzzy_threshold);
        Self {
            generation: snapshot.generation(),
            engine,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Number of indexed endpoints.
    pub fn len(&self) -> usize {
        self.engine.len()
    }

    pub fn is_empty(&self) -> bool {
        self.engine.is_empty()
    }

    /// Ranked matches for `query`, best first, at most `limit`.
    pub fn search(&self, query: &str, limit: usize) -> Vec<ScoredEndpoint> {
        self.engine
            .search(query, limit)
            .into_iter()
            .map(|m| ScoredEndpoint {
                endpoint: m.record.clone(),
                score: m.score,
            })
            .collect()
    }
}

impl std::fmt::Debug for SearchIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchIndex")
            .field("generation", &self.generation)
            .field("endpoints", &self.engine.len())
            .field("threshold", &self.engine.threshold())
            .finish()
    }
}
