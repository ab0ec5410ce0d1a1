// Copyright 2026-present rtrv contributors
// SPDX-License-Identifier: Apache-2.0

//! The building blocks of the engine's public surface.
//!
//! Everything a caller hands in or gets back lives here: documents, search
//! options, results, and the statistics structs. The engine returns documents
//! by value, so nothing in a `SearchResult` borrows into the index.

use std::collections::{BTreeMap, HashMap};
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::snippet::SnippetOptions;

/// A searchable document: an id plus named text fields.
///
/// Field names are kept sorted (`BTreeMap`) so the all-fields concatenation
/// the rankers and the snippet extractor see is the same in every process.
/// Field insertion order carries no meaning for retrieval.
///
/// `term_count` is filled in by the engine at index time (the number of
/// analyzed terms the tokenizer emitted) and is used for BM25 length
/// normalization. Callers constructing documents leave it at 0.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Unique document id. 0 asks the engine to assign the next id.
    pub id: u64,
    /// Field name → field value.
    pub fields: BTreeMap<String, String>,
    /// Analyzed term count, cached at index time.
    #[serde(default)]
    pub term_count: u64,
}

impl Document {
    /// Create a document with the given id and no fields.
    pub fn new(id: u64) -> Self {
        Document {
            id,
            fields: BTreeMap::new(),
            term_count: 0,
        }
    }

    /// Builder-style field insertion.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Look up a field value by name.
    pub fn get_field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Concatenation of all field values, in field-name order, joined by a
    /// single space. This is the text the tokenizer, rankers, and snippet
    /// extractor operate on.
    pub fn all_text(&self) -> String {
        let mut out = String::with_capacity(self.fields.values().map(|v| v.len() + 1).sum());
        for (i, value) in self.fields.values().enumerate() {
            if i > 0 {
                out.push(' ');
            }
            out.push_str(value);
        }
        out
    }
}

/// Legacy ranking algorithm selector. Superseded by
/// [`SearchOptions::ranker_name`], which wins when it names a registered
/// ranker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RankingAlgorithm {
    TfIdf,
    #[default]
    Bm25,
}

/// Knobs for a single search call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchOptions {
    /// Ranker to score with; empty string means the registry default.
    pub ranker_name: String,
    /// Legacy selector, consulted only when `ranker_name` is empty.
    pub algorithm: RankingAlgorithm,
    /// Number of results to return.
    pub max_results: usize,
    /// Attach a human-readable score breakdown to each result.
    pub explain_scores: bool,
    /// Select with the bounded top-K heap instead of a full sort.
    pub use_top_k_heap: bool,
    /// Attach highlighted snippets to each result.
    pub generate_snippets: bool,
    /// Snippet configuration, used when `generate_snippets` is set.
    pub snippet_options: SnippetOptions,
    /// Expand query terms that miss the vocabulary via fuzzy matching.
    pub fuzzy_enabled: bool,
    /// Edit-distance bound for fuzzy expansion; 0 picks a bound from the
    /// term length.
    pub max_edit_distance: u32,
    /// Consult and populate the query-result cache.
    pub use_cache: bool,
    /// Offset-based pagination: skip the first N ranked results.
    pub offset: usize,
    /// Cursor-based pagination: score of the last result on the previous page.
    pub search_after_score: Option<f64>,
    /// Cursor-based pagination: doc id of the last result on the previous page.
    pub search_after_id: Option<u64>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        SearchOptions {
            ranker_name: String::new(),
            algorithm: RankingAlgorithm::default(),
            max_results: 10,
            explain_scores: false,
            use_top_k_heap: true,
            generate_snippets: false,
            snippet_options: SnippetOptions::default(),
            fuzzy_enabled: false,
            max_edit_distance: 0,
            use_cache: true,
            offset: 0,
            search_after_score: None,
            search_after_id: None,
        }
    }
}

impl SearchOptions {
    /// Hash of every option that can change the result set.
    ///
    /// Combined with the normalized query text to form the cache key. Must
    /// cover anything user-observable in the results; must exclude
    /// `use_cache` itself and the pagination fields (the paginated path
    /// bypasses the cache entirely).
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        self.ranker_name.hash(&mut hasher);
        self.algorithm.hash(&mut hasher);
        self.max_results.hash(&mut hasher);
        self.explain_scores.hash(&mut hasher);
        self.use_top_k_heap.hash(&mut hasher);
        self.generate_snippets.hash(&mut hasher);
        self.snippet_options.max_snippet_length.hash(&mut hasher);
        self.snippet_options.num_snippets.hash(&mut hasher);
        self.snippet_options.highlight_open.hash(&mut hasher);
        self.snippet_options.highlight_close.hash(&mut hasher);
        self.fuzzy_enabled.hash(&mut hasher);
        self.max_edit_distance.hash(&mut hasher);
        hasher.finish()
    }
}

/// One ranked hit: the document (deep copy), its score, and any decorations
/// the options asked for.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub document: Document,
    pub score: f64,
    /// Score breakdown, populated when `explain_scores` is set.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub explanation: String,
    /// Highlighted snippets, populated when `generate_snippets` is set.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub snippets: Vec<String>,
    /// Fuzzy expansions applied to this query: original term → substituted
    /// vocabulary term. Empty when no expansion happened.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub expanded_terms: HashMap<String, String>,
}

/// Aggregate index statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexStatistics {
    pub total_documents: usize,
    pub total_terms: usize,
    /// Mean analyzed-term count over live documents.
    pub avg_doc_length: f64,
}

/// Query-cache counters. `hit_rate` is hits / (hits + misses), or 0 when
/// the cache has never been consulted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheStatistics {
    pub hit_count: usize,
    pub miss_count: usize,
    pub eviction_count: usize,
    pub current_size: usize,
    pub max_size: usize,
    pub hit_rate: f64,
}

/// Pagination metadata returned alongside a page of results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationInfo {
    /// Number of candidate documents that matched the query.
    pub total_hits: usize,
    /// Offset used for this page (0 on the cursor path).
    pub offset: usize,
    /// Number of results in this page.
    pub page_size: usize,
    /// Whether more results remain beyond this page.
    pub has_next_page: bool,
}

/// A page of results plus its pagination metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaginatedSearchResults {
    pub results: Vec<SearchResult>,
    pub pagination: PaginationInfo,
}
