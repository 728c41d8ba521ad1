//! Weighted-field fuzzy search engine.
//!
//! A [`FuzzyIndex`] is built once from a collection of records and a set of
//! [`WeightedField`]s and then answers text queries with ranked matches. It
//! holds no interior mutability: the same records, fields, and threshold
//! always produce the same results for the same query.
//!
//! # Scoring
//!
//! 1. Query and field text are split into lowercase alphanumeric tokens.
//! 2. Each query term is compared against every token of a field with
//!    Jaro-Winkler similarity (`1.0` = identical). The best similarity counts
//!    only if it is `>= threshold`; otherwise the term contributes `0.0`.
//! 3. A field scores the mean of its term similarities, or `1.0` when the
//!    whole query appears verbatim in the field text.
//! 4. A record scores the weight-normalised sum of its field scores.
//! 5. Records scoring `0.0` are dropped; the rest sort by score (desc), then
//!    by insertion order.
//!
//! # Threshold convention
//!
//! The threshold is a *minimum similarity*. A **lower** threshold accepts
//! less similar terms, so it is **more permissive**; `1.0` only accepts exact
//! token matches and `0.0` accepts any token pairing.

use std::cmp::Ordering;

/// A record that exposes text for named fields.
pub trait Searchable {
    /// Text values of `field`; empty when the record has none.
    fn field_text(&self, field: &str) -> Vec<&str>;
}

/// A field name and its relative weight.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedField {
    pub name: String,
    pub weight: f64,
}

impl WeightedField {
    pub fn new(name: impl Into<String>, weight: f64) -> Self {
        Self {
            name: name.into(),
            weight,
        }
    }
}

/// A ranked search hit.
#[derive(Debug)]
pub struct Match<'a, T> {
    pub record: &'a T,
    /// Relevance in `[0.0, 1.0]`.
    pub score: f64,
}

struct FieldEntry {
    tokens: Vec<String>,
    text: String,
}

pub struct FuzzyIndex<T> {
    records: Vec<T>,
    entries: Vec<Vec<FieldEntry>>,
    fields: Vec<WeightedField>,
    threshold: f64,
}

impl<T: Searchable> FuzzyIndex<T> {
    /// Index `records` over `fields`. `threshold` is clamped to `[0, 1]`.
    pub fn build(records: Vec<T>, fields: &[WeightedField], threshold: f64) -> Self {
        let entries = records
            .iter()
            .map(|record| {
                fields
                    .iter()
                    .map(|field| {
                        let text = record.field_text(&field.name).join(" ").to_lowercase();
                        FieldEntry {
                            tokens: tokenize(&text),
                            text,
                        }
                    })
                    .collect()
            })
            .collect();

        Self {
            records,
            entries,
            fields: fields.to_vec(),
            threshold: threshold.clamp(0.0, 1.0),
        }
    }

    /// Return up to `limit` records matching `query`, best first.
    ///
    /// An empty or whitespace-only query yields no results.
    pub fn search(&self, query: &str, limit: usize) -> Vec<Match<'_, T>> {
        let phrase = query.trim().to_lowercase();
        let terms = tokenize(&phrase);
        if terms.is_empty() || limit == 0 {
            return Vec::new();
        }

        let total_weight: f64 = self.fields.iter().map(|f| f.weight).sum();
        if total_weight <= 0.0 {
            return Vec::new();
        }

        let mut hits: Vec<(usize, f64)> = self
            .entries
            .iter()
            .enumerate()
            .filter_map(|(i, fields)| {
                let weighted: f64 = fields
                    .iter()
                    .zip(&self.fields)
                    .map(|(entry, field)| field.weight * self.field_score(&terms, &phrase, entry))
                    .sum();
                let score = weighted / total_weight;
                (score > 0.0).then_some((i, score))
            })
            .collect();

        // Stable sort keeps insertion order for equal scores.
        hits.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        hits.truncate(limit);

        hits.into_iter()
            .map(|(i, score)| Match {
                record: &self.records[i],
                score,
            })
            .collect()
    }

    fn field_score(&self, terms: &[String], phrase: &str, entry: &FieldEntry) -> f64 {
        if entry.tokens.is_empty() {
            return 0.0;
        }
        if entry.text.contains(phrase) {
            return 1.0;
        }
        let sum: f64 = terms
            .iter()
            .map(|term| {
                let best = entry
                    .tokens
                    .iter()
                    .map(|token| strsim::jaro_winkler(term, token))
                    .fold(0.0, f64::max);
                if best >= self.threshold && best > 0.0 {
                    best
                } else {
                    0.0
                }
            })
            .sum();
        sum / terms.len() as f64
    }
}

impl<T> FuzzyIndex<T> {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn records(&self) -> &[T] {
        &self.records
    }
}

/// Split text into lowercase alphanumeric tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Doc {
        title: &'static str,
        body: &'static str,
    }

    impl Searchable for Doc {
        fn field_text(&self, field: &str) -> Vec<&str> {
            match field {
                "title" => vec![self.title],
                "body" => vec![self.body],
                _ => Vec::new(),
            }
        }
    }

    fn fields() -> Vec<WeightedField> {
        vec![WeightedField::new("title", 0.7), WeightedField::new("body", 0.3)]
    }

    fn docs() -> Vec<Doc> {
        vec![
            Doc {
                title: "Delete a payment record",
                body: "Removes the payment permanently",
            },
            Doc {
                title: "Creates a new user account",
                body: "Registers a user",
            },
            Doc {
                title: "List invoices",
                body: "",
            },
        ]
    }

    #[test]
    fn test_tokenize() {
        assert_eq!(tokenize("/users/{id}/Orders"), vec!["users", "id", "orders"]);
        assert!(tokenize("  --  ").is_empty());
    }

    #[test]
    fn test_empty_query_returns_nothing() {
        let index = FuzzyIndex::build(docs(), &fields(), 0.6);
        assert!(index.search("", 10).is_empty());
        assert!(index.search("   ", 10).is_empty());
    }

    #[test]
    fn test_related_record_ranks_first() {
        let index = FuzzyIndex::build(docs(), &fields(), 0.6);
        let hits = index.search("create user", 10);
        assert!(!hits.is_empty());
        assert_eq!(hits[0].record.title, "Creates a new user account");
        if let Some(other) = hits.iter().find(|h| h.record.title.starts_with("Delete")) {
            assert!(other.score < hits[0].score);
        }
    }

    #[test]
    fn test_exact_threshold_requires_exact_tokens() {
        let index = FuzzyIndex::build(docs(), &fields(), 1.0);
        assert!(index.search("invoicez", 10).is_empty());
        let hits = index.search("invoices", 10);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].record.title, "List invoices");
    }

    #[test]
    fn test_lower_threshold_is_more_permissive() {
        let strict = FuzzyIndex::build(docs(), &fields(), 0.95);
        let loose = FuzzyIndex::build(docs(), &fields(), 0.3);
        let strict_hits = strict.search("paymnt", 10).len();
        let loose_hits = loose.search("paymnt", 10).len();
        assert!(loose_hits >= strict_hits);
        assert!(loose_hits > 0);
    }

    #[test]
    fn test_scores_in_unit_range_and_sorted() {
        let index = FuzzyIndex::build(docs(), &fields(), 0.0);
        let hits = index.search("user payment", 10);
        for pair in hits.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
        for h in &hits {
            assert!(h.score > 0.0 && h.score <= 1.0, "score out of range: {}", h.score);
        }
    }

    #[test]
    fn test_limit_truncates() {
        let index = FuzzyIndex::build(docs(), &fields(), 0.0);
        assert!(index.search("a", 1).len() <= 1);
        assert!(index.search("a", 0).is_empty());
    }

    #[test]
    fn test_threshold_clamped() {
        let index = FuzzyIndex::build(docs(), &fields(), 7.0);
        assert_eq!(index.threshold(), 1.0);
    }
}
