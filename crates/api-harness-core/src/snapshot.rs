//! Immutable registry snapshots.
//!
//! A [`RegistrySnapshot`] holds exactly one [`SourceOutcome`] per source in
//! the source set it was built from, in source-set order. Snapshots are never
//! edited: every refresh builds a brand-new one.

use indexmap::IndexMap;

use crate::models::{SourceOutcome, TaggedEndpoint};

#[derive(Debug, Clone, PartialEq)]
pub struct RegistrySnapshot {
    generation: u64,
    outcomes: IndexMap<String, SourceOutcome>,
}

impl RegistrySnapshot {
    /// Build a snapshot from `(source name, outcome)` pairs.
    ///
    /// Names are expected to be unique (configuration validation enforces
    /// it); a repeated name keeps the first position and the last outcome.
    pub fn new(
        generation: u64,
        outcomes: impl IntoIterator<Item = (String, SourceOutcome)>,
    ) -> Self {
        Self {
            generation,
            outcomes: outcomes.into_iter().collect(),
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn get(&self, name: &str) -> Option<&SourceOutcome> {
        self.outcomes.get(name)
    }

    /// All outcomes in source-set order.
    pub fn outcomes(&self) -> impl Iterator<Item = (&str, &SourceOutcome)> {
        self.outcomes.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn success_count(&self) -> usize {
        self.outcomes.values().filter(|o| o.is_success()).count()
    }

    pub fn failure_count(&self) -> usize {
        self.len() - self.success_count()
    }

    /// Total endpoints across successful sources.
    pub fn endpoint_count(&self) -> usize {
        self.outcomes.values().map(|o| o.endpoints().len()).sum()
    }

    /// Flatten every successful source's endpoints into one collection,
    /// tagging each with its owning source name. Order: source-set order,
    /// then document order within a source.
    pub fn flatten(&self) -> Vec<TaggedEndpoint> {
        self.outcomes
            .iter()
            .flat_map(|(name, outcome)| {
                outcome.endpoints().iter().map(move |ep| TaggedEndpoint {
                    endpoint: ep.clone(),
                    source_name: name.clone(),
                })
            })
            .collect()
    }
}
