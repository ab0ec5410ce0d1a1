// Copyright 2026-present rtrv contributors
// SPDX-License-Identifier: Apache-2.0

//! Scoring: the part everyone argues about.
//!
//! A `Ranker` is one method plus a name, resolved by name through the
//! [`RankerRegistry`]. Two rankers ship: TF-IDF (the classic) and Okapi
//! BM25 (the default). Both scan the document's concatenated field text
//! for term frequencies, case-insensitively, and read document frequency
//! out of the [`IndexStats`] the engine populates per query.
//!
//! Rankers hold no per-query mutable state; one instance serves any number
//! of concurrent searches.

use std::collections::HashMap;
use std::sync::Arc;

use crate::types::Document;

/// Corpus statistics the engine snapshots for a single query.
#[derive(Debug, Clone, Default)]
pub struct IndexStats {
    pub total_docs: usize,
    /// Mean analyzed-term count over live documents.
    pub avg_doc_length: f64,
    /// Document frequency for each term of the query being scored.
    pub doc_frequency: HashMap<String, usize>,
}

/// A parsed-down query: the flat term list retrieval operates on.
#[derive(Debug, Clone, Default)]
pub struct Query {
    pub terms: Vec<String>,
}

/// A scoring function keyed by name.
pub trait Ranker: Send + Sync {
    /// Score `doc` for `query`; non-negative, higher is better.
    fn score(&self, query: &Query, doc: &Document, stats: &IndexStats) -> f64;

    /// Registry key for this ranker.
    fn name(&self) -> &str;

    /// Score many documents at once. The default just loops; rankers with
    /// vectorizable math can override.
    fn score_batch(&self, query: &Query, docs: &[&Document], stats: &IndexStats) -> Vec<f64> {
        docs.iter().map(|doc| self.score(query, doc, stats)).collect()
    }
}

/// Case-insensitive, non-overlapping substring count of `term` in `text`.
fn term_frequency(text_lower: &str, term: &str) -> u32 {
    if term.is_empty() {
        return 0;
    }
    let needle = term.to_ascii_lowercase();
    let mut count = 0;
    let mut from = 0;
    while let Some(at) = text_lower[from..].find(&needle) {
        count += 1;
        from += at + needle.len();
    }
    count
}

/// ln(1 + tf) · ln(N / df), summed over query terms with df ≥ 1.
#[derive(Debug, Clone, Copy, Default)]
pub struct TfIdfRanker;

impl TfIdfRanker {
    pub fn new() -> Self {
        TfIdfRanker
    }
}

impl Ranker for TfIdfRanker {
    fn score(&self, query: &Query, doc: &Document, stats: &IndexStats) -> f64 {
        if stats.total_docs == 0 {
            return 0.0;
        }
        let text = doc.all_text().to_ascii_lowercase();
        let mut score = 0.0;
        for term in &query.terms {
            let df = stats.doc_frequency.get(term).copied().unwrap_or(0);
            if df == 0 {
                continue;
            }
            let tf = term_frequency(&text, term) as f64;
            score += (1.0 + tf).ln() * (stats.total_docs as f64 / df as f64).ln();
        }
        score
    }

    fn name(&self) -> &str {
        "tfidf"
    }
}

/// Okapi BM25 with tunable saturation (`k1`) and length normalization (`b`).
#[derive(Debug, Clone, Copy)]
pub struct Bm25Ranker {
    k1: f64,
    b: f64,
}

impl Default for Bm25Ranker {
    fn default() -> Self {
        Bm25Ranker { k1: 1.5, b: 0.75 }
    }
}

impl Bm25Ranker {
    pub fn new(k1: f64, b: f64) -> Self {
        Bm25Ranker { k1, b }
    }

    pub fn k1(&self) -> f64 {
        self.k1
    }

    pub fn b(&self) -> f64 {
        self.b
    }
}

impl Ranker for Bm25Ranker {
    fn score(&self, query: &Query, doc: &Document, stats: &IndexStats) -> f64 {
        let text = doc.all_text().to_ascii_lowercase();
        // Prefer the analyzed term count; fall back to raw text length for
        // documents indexed before term counts existed.
        let doc_len = if doc.term_count > 0 {
            doc.term_count as f64
        } else {
            text.len() as f64
        };
        let norm = if stats.avg_doc_length > 0.0 {
            1.0 - self.b + self.b * doc_len / stats.avg_doc_length
        } else {
            1.0
        };

        let n = stats.total_docs as f64;
        let mut score = 0.0;
        for term in &query.terms {
            let tf = term_frequency(&text, term) as f64;
            if tf == 0.0 {
                continue;
            }
            let df = stats.doc_frequency.get(term).copied().unwrap_or(0) as f64;
            let idf = ((n - df + 0.5) / (df + 0.5) + 1.0).ln();
            score += idf * tf * (self.k1 + 1.0) / (tf + self.k1 * norm);
        }
        score
    }

    fn name(&self) -> &str {
        "bm25"
    }
}

/// Name → ranker, with a current default. Registering under an existing
/// name replaces the old ranker.
pub struct RankerRegistry {
    rankers: HashMap<String, Arc<dyn Ranker>>,
    default_name: String,
}

impl Default for RankerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl RankerRegistry {
    /// A registry preloaded with TF-IDF and BM25; BM25 is the default.
    pub fn new() -> Self {
        let mut registry = RankerRegistry {
            rankers: HashMap::new(),
            default_name: "bm25".to_string(),
        };
        registry.register(Arc::new(TfIdfRanker::new()));
        registry.register(Arc::new(Bm25Ranker::default()));
        registry
    }

    /// Register a ranker under its own name. Rankers with an empty name are
    /// rejected. Returns whether the ranker was accepted.
    pub fn register(&mut self, ranker: Arc<dyn Ranker>) -> bool {
        let name = ranker.name().to_string();
        if name.is_empty() {
            return false;
        }
        self.rankers.insert(name, ranker);
        true
    }

    /// The named ranker, or the default when the name is absent or empty.
    pub fn get(&self, name: &str) -> Arc<dyn Ranker> {
        self.rankers
            .get(name)
            .or_else(|| self.rankers.get(&self.default_name))
            .cloned()
            .unwrap_or_else(|| Arc::new(Bm25Ranker::default()))
    }

    /// Look up a ranker strictly by name.
    pub fn get_exact(&self, name: &str) -> Option<Arc<dyn Ranker>> {
        self.rankers.get(name).cloned()
    }

    pub fn has(&self, name: &str) -> bool {
        self.rankers.contains_key(name)
    }

    /// Change the default. Fails (and changes nothing) when the name is
    /// not registered.
    pub fn set_default(&mut self, name: &str) -> bool {
        if self.rankers.contains_key(name) {
            self.default_name = name.to_string();
            true
        } else {
            false
        }
    }

    pub fn default_name(&self) -> &str {
        &self.default_name
    }

    /// Registered ranker names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.rankers.keys().cloned().collect();
        names.sort();
        names
    }
}
