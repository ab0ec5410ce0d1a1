// Copyright 2026-present rtrv contributors
// SPDX-License-Identifier: Apache-2.0

//! The façade that ties the pieces together.
//!
//! `SearchEngine` owns the tokenizer, inverted index, parser, ranker
//! registry, fuzzy matcher, snippet extractor, query cache, and the
//! document store, and enforces the locking discipline:
//!
//! - One engine-wide shared/exclusive lock guards the document store, the
//!   id counter, the index, the fuzzy index, and tokenizer configuration.
//!   Writers (index/update/delete/load/configure) take it exclusively;
//!   readers (search/stats/save/list) share it.
//! - The query cache has its own lock and atomic counters; cache traffic
//!   never contends with the engine lock.
//! - Every write clears the query cache, so readers may lose hits but
//!   never see stale results.
//!
//! The read path (see [`SearchEngine::search`]): cache probe → term
//! extraction → optional fuzzy expansion → candidate union over posting
//! lists → ranking → bounded top-K or full-sort selection → optional
//! explanation and snippets → fuzzy penalty → cache fill. Note that
//! candidate selection consumes the flat extracted terms; boolean
//! operators parse but do not constrain retrieval.
//!
//! Failure semantics: no public operation panics or propagates errors.
//! Malformed queries degrade via the parser fallback, bad ids return
//! `false`, and snapshot I/O failures return `false` leaving in-memory
//! state unchanged.

use std::collections::{BTreeSet, HashMap};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write as _};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;

use crate::cache::{QueryCache, QueryCacheKey};
use crate::fuzzy::FuzzySearch;
use crate::index::InvertedIndex;
use crate::parser::{QueryNode, QueryParser};
use crate::ranker::{IndexStats, Query, Ranker, RankerRegistry};
use crate::snapshot::{read_snapshot, write_snapshot, SnapshotView};
use crate::snippet::SnippetExtractor;
use crate::tokenizer::{StemmerType, Tokenizer};
use crate::topk::{ScoredHit, TopKHeap};
use crate::types::{
    CacheStatistics, Document, IndexStatistics, PaginatedSearchResults, PaginationInfo,
    RankingAlgorithm, SearchOptions, SearchResult,
};

/// Fuzzy expansion asks for this many candidates per unmatched term.
const FUZZY_CANDIDATES: usize = 5;

/// Everything guarded by the engine-wide lock.
struct EngineState {
    tokenizer: Tokenizer,
    index: InvertedIndex,
    parser: QueryParser,
    fuzzy: FuzzySearch,
    documents: HashMap<u64, Document>,
    next_doc_id: u64,
}

/// Thread-safe search engine: many concurrent readers, one writer.
pub struct SearchEngine {
    state: RwLock<EngineState>,
    rankers: RwLock<RankerRegistry>,
    snippet_extractor: SnippetExtractor,
    cache: QueryCache,
}

impl Default for SearchEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchEngine {
    pub fn new() -> Self {
        SearchEngine {
            state: RwLock::new(EngineState {
                tokenizer: Tokenizer::new(),
                index: InvertedIndex::new(),
                parser: QueryParser::new(),
                fuzzy: FuzzySearch::new(),
                documents: HashMap::new(),
                next_doc_id: 1,
            }),
            rankers: RwLock::new(RankerRegistry::new()),
            snippet_extractor: SnippetExtractor::new(),
            cache: QueryCache::new(1024, Duration::from_secs(60)),
        }
    }

    // ========================================================================
    // Indexing
    // ========================================================================

    /// Index one document, returning its id.
    ///
    /// A zero id gets the next assigned id; a caller-supplied id wins and
    /// pushes the counter strictly past it. A search beginning after this
    /// returns observes the document.
    pub fn index_document(&self, doc: Document) -> u64 {
        let id = {
            let mut state = self.state.write();
            let tokens = {
                let text = doc.all_text();
                state.tokenizer.tokenize_with_positions(&text)
            };
            Self::install_document(&mut state, doc, tokens)
        };
        self.cache.clear();
        id
    }

    /// Index a batch under one write-lock acquisition.
    ///
    /// With the `parallel` feature the tokenization map phase fans out over
    /// rayon; index insertions stay serial, preserving the single-writer
    /// posting-order invariant.
    pub fn index_documents(&self, docs: Vec<Document>) -> Vec<u64> {
        let ids = {
            let mut state = self.state.write();
            let tokenizer = state.tokenizer.clone();

            #[cfg(feature = "parallel")]
            let analyzed: Vec<(Document, Vec<crate::tokenizer::Token>)> = {
                use rayon::prelude::*;
                docs.into_par_iter()
                    .map(|doc| {
                        let tokens = tokenizer.tokenize_with_positions(&doc.all_text());
                        (doc, tokens)
                    })
                    .collect()
            };
            #[cfg(not(feature = "parallel"))]
            let analyzed: Vec<(Document, Vec<crate::tokenizer::Token>)> = docs
                .into_iter()
                .map(|doc| {
                    let tokens = tokenizer.tokenize_with_positions(&doc.all_text());
                    (doc, tokens)
                })
                .collect();

            analyzed
                .into_iter()
                .map(|(doc, tokens)| Self::install_document(&mut state, doc, tokens))
                .collect()
        };
        self.cache.clear();
        ids
    }

    /// Replace the document stored under `id`. Returns false for unknown
    /// ids. Readers observe either the old or the new version, never a
    /// torn mix.
    pub fn update_document(&self, id: u64, mut doc: Document) -> bool {
        let updated = {
            let mut state = self.state.write();
            if !state.documents.contains_key(&id) {
                return false;
            }
            state.index.remove_document(id);
            doc.id = id;
            let tokens = {
                let text = doc.all_text();
                state.tokenizer.tokenize_with_positions(&text)
            };
            Self::install_document(&mut state, doc, tokens);
            true
        };
        self.cache.clear();
        updated
    }

    /// Remove a document from the index and the store. Returns false for
    /// unknown ids.
    pub fn delete_document(&self, id: u64) -> bool {
        let deleted = {
            let mut state = self.state.write();
            if state.documents.remove(&id).is_none() {
                return false;
            }
            state.index.remove_document(id);
            true
        };
        self.cache.clear();
        deleted
    }

    /// Tokens are pre-analyzed; the caller holds the write lock.
    fn install_document(
        state: &mut EngineState,
        mut doc: Document,
        tokens: Vec<crate::tokenizer::Token>,
    ) -> u64 {
        let id = if doc.id != 0 { doc.id } else { state.next_doc_id };
        if id >= state.next_doc_id {
            state.next_doc_id = id + 1;
        }
        // Re-indexing a live id is a replace; stale postings would break
        // the ascending-doc-id invariant.
        if state.documents.contains_key(&id) {
            state.index.remove_document(id);
        }
        doc.id = id;
        doc.term_count = tokens.len() as u64;

        for token in &tokens {
            state.index.add_term(&token.text, id, token.position);
        }
        if state.fuzzy.is_index_built() {
            for token in &tokens {
                state.fuzzy.add_term(&token.text);
            }
        }
        state.documents.insert(id, doc);
        id
    }

    // ========================================================================
    // Search
    // ========================================================================

    /// Ranked keyword search.
    pub fn search(&self, query: &str, options: &SearchOptions) -> Vec<SearchResult> {
        let cache_key = QueryCacheKey::new(normalize_query(query), options.fingerprint());
        if options.use_cache {
            if let Some(hit) = self.cache.get(&cache_key) {
                return hit;
            }
        }

        let (results, _) = self.search_ranked(query, options, options.max_results);

        if options.use_cache {
            self.cache.put(cache_key, results.clone());
        }
        results
    }

    /// Convenience overload: search with a named ranker.
    pub fn search_with_ranker(
        &self,
        query: &str,
        ranker_name: &str,
        max_results: usize,
    ) -> Vec<SearchResult> {
        let options = SearchOptions {
            ranker_name: ranker_name.to_string(),
            max_results,
            ..SearchOptions::default()
        };
        self.search(query, &options)
    }

    /// Paginated search: offset-based, or cursor-based when
    /// `search_after_score`/`search_after_id` are set.
    ///
    /// This path bypasses the query cache in both directions; the cache
    /// fingerprint deliberately excludes pagination state.
    pub fn search_paginated(&self, query: &str, options: &SearchOptions) -> PaginatedSearchResults {
        let (ranked, total_hits) = self.search_ranked(query, options, usize::MAX);

        if options.search_after_score.is_some() || options.search_after_id.is_some() {
            let cursor = ScoredHit {
                doc_id: options.search_after_id.unwrap_or(0),
                score: options.search_after_score.unwrap_or(f64::INFINITY),
            };
            let mut after: Vec<SearchResult> = ranked
                .into_iter()
                .filter(|r| {
                    ScoredHit {
                        doc_id: r.document.id,
                        score: r.score,
                    } < cursor
                })
                .collect();
            let has_next_page = after.len() > options.max_results;
            after.truncate(options.max_results);
            let page_size = after.len();
            return PaginatedSearchResults {
                results: after,
                pagination: PaginationInfo {
                    total_hits,
                    offset: 0,
                    page_size,
                    has_next_page,
                },
            };
        }

        let results: Vec<SearchResult> = ranked
            .into_iter()
            .skip(options.offset)
            .take(options.max_results)
            .collect();
        let page_size = results.len();
        PaginatedSearchResults {
            results,
            pagination: PaginationInfo {
                total_hits,
                offset: options.offset,
                page_size,
                has_next_page: options.offset + page_size < total_hits,
            },
        }
    }

    /// Core read path. Returns the ranked results (up to `limit`) and the
    /// candidate count.
    fn search_ranked(
        &self,
        query: &str,
        options: &SearchOptions,
        limit: usize,
    ) -> (Vec<SearchResult>, usize) {
        if options.fuzzy_enabled {
            self.ensure_fuzzy_index();
        }

        let state = self.state.read();

        let mut terms = state.parser.extract_terms(query);
        if terms.is_empty() {
            return (Vec::new(), 0);
        }

        let mut expansions: HashMap<String, String> = HashMap::new();
        if options.fuzzy_enabled {
            terms = expand_terms(&state, &terms, options.max_edit_distance, &mut expansions);
        }

        let stats = IndexStats {
            total_docs: state.documents.len(),
            avg_doc_length: average_doc_length(&state),
            doc_frequency: terms
                .iter()
                .map(|t| (t.clone(), state.index.document_frequency(t)))
                .collect(),
        };

        // Candidate set: union over the (expanded) terms' posting lists.
        let mut candidates: BTreeSet<u64> = BTreeSet::new();
        for term in &terms {
            for posting in state.index.get_postings(term) {
                candidates.insert(posting.doc_id);
            }
        }
        let total_hits = candidates.len();
        if total_hits == 0 {
            return (Vec::new(), 0);
        }

        let ranker = self.select_ranker(options);
        let query_obj = Query {
            terms: terms.clone(),
        };

        let mut hits: Vec<ScoredHit> = Vec::with_capacity(candidates.len());
        for &doc_id in &candidates {
            let Some(doc) = state.documents.get(&doc_id) else {
                continue;
            };
            let score = ranker.score(&query_obj, doc, &stats);
            if score > 0.0 {
                hits.push(ScoredHit { doc_id, score });
            }
        }

        let selected = if options.use_top_k_heap {
            let mut heap = TopKHeap::new(limit.min(hits.len().max(1)));
            for hit in hits {
                heap.push(hit);
            }
            heap.into_sorted_desc()
        } else {
            hits.sort_by(|a, b| b.cmp(a));
            hits.truncate(limit);
            hits
        };

        let penalty = if expansions.is_empty() {
            1.0
        } else {
            (1.0 - 0.1 * expansions.len() as f64).max(0.5)
        };
        let selection_method = if options.use_top_k_heap {
            "top_k_heap"
        } else {
            "full_sort"
        };

        let mut results = Vec::with_capacity(selected.len());
        for hit in selected {
            let Some(doc) = state.documents.get(&hit.doc_id) else {
                continue;
            };
            let mut result = SearchResult {
                document: doc.clone(),
                score: hit.score * penalty,
                ..Default::default()
            };
            if options.explain_scores {
                result.explanation = format!(
                    "ranker={} score={:.6} selection={}",
                    ranker.name(),
                    result.score,
                    selection_method
                );
            }
            if options.generate_snippets {
                result.snippets = self.snippet_extractor.generate_snippets(
                    &doc.all_text(),
                    &terms,
                    &options.snippet_options,
                );
            }
            if !expansions.is_empty() {
                result.expanded_terms = expansions.clone();
            }
            results.push(result);
        }
        (results, total_hits)
    }

    /// Build the fuzzy n-gram index from the current vocabulary if it has
    /// not been built yet.
    fn ensure_fuzzy_index(&self) {
        if self.state.read().fuzzy.is_index_built() {
            return;
        }
        let mut state = self.state.write();
        if !state.fuzzy.is_index_built() {
            let vocabulary = state.index.vocabulary();
            state.fuzzy.build_ngram_index(&vocabulary);
        }
    }

    fn select_ranker(&self, options: &SearchOptions) -> Arc<dyn Ranker> {
        let registry = self.rankers.read();
        if !options.ranker_name.is_empty() {
            if let Some(ranker) = registry.get_exact(&options.ranker_name) {
                return ranker;
            }
        }
        if options.algorithm == RankingAlgorithm::TfIdf {
            return registry.get("tfidf");
        }
        registry.get("")
    }

    // ========================================================================
    // Statistics and browsing
    // ========================================================================

    pub fn stats(&self) -> IndexStatistics {
        let state = self.state.read();
        IndexStatistics {
            total_documents: state.documents.len(),
            total_terms: state.index.term_count(),
            avg_doc_length: average_doc_length(&state),
        }
    }

    pub fn cache_stats(&self) -> CacheStatistics {
        self.cache.stats()
    }

    /// Page through stored documents in id order. Returns deep copies.
    pub fn get_documents(&self, offset: usize, limit: usize) -> Vec<(u64, Document)> {
        let state = self.state.read();
        let mut ids: Vec<u64> = state.documents.keys().copied().collect();
        ids.sort_unstable();
        ids.into_iter()
            .skip(offset)
            .take(limit)
            .filter_map(|id| state.documents.get(&id).map(|d| (id, d.clone())))
            .collect()
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    pub fn set_cache_config(&self, max_entries: usize, ttl: Duration) {
        self.cache.set_max_entries(max_entries);
        self.cache.set_ttl(ttl);
    }

    // ========================================================================
    // Snapshots
    // ========================================================================

    /// Serialize the state visible at call time. Returns false on any I/O
    /// failure; in-memory state is never affected.
    pub fn save_snapshot(&self, path: impl AsRef<Path>) -> bool {
        let state = self.state.read();
        let view = SnapshotView {
            next_doc_id: state.next_doc_id,
            documents: &state.documents,
            index: &state.index,
        };
        let result = File::create(path).and_then(|file| {
            let mut writer = BufWriter::new(file);
            write_snapshot(&view, &mut writer)?;
            writer.flush()
        });
        result.is_ok()
    }

    /// Replace the engine state with a snapshot's contents.
    ///
    /// The file is fully decoded before anything is touched, so a failure
    /// (missing file, bad magic or version, truncation) returns false with
    /// the engine unchanged. On success the previous state is cleared, the
    /// index is rebuilt by replaying postings (positions preserved), the
    /// fuzzy index is left unbuilt for the next fuzzy query, and the query
    /// cache is emptied.
    pub fn load_snapshot(&self, path: impl AsRef<Path>) -> bool {
        let data = match File::open(path).map(BufReader::new) {
            Ok(mut reader) => match read_snapshot(&mut reader) {
                Ok(data) => data,
                Err(_) => return false,
            },
            Err(_) => return false,
        };

        {
            let mut state = self.state.write();
            state.index.clear();
            state.documents.clear();
            state.fuzzy.clear();
            state.next_doc_id = data.next_doc_id;

            for doc in data.documents {
                state.documents.insert(doc.id, doc);
            }
            for entry in data.terms {
                for posting in entry.postings {
                    for &pos in &posting.positions {
                        state.index.add_term(&entry.term, posting.doc_id, pos);
                    }
                    // Presence-only occurrences beyond the recorded
                    // positions replay at position 0.
                    let replayed = posting.positions.len() as u32;
                    for _ in replayed..posting.term_frequency {
                        state.index.add_term(&entry.term, posting.doc_id, 0);
                    }
                }
            }
        }
        self.cache.clear();
        true
    }

    // ========================================================================
    // Configuration
    // ========================================================================

    /// Replace the tokenizer wholesale. Affects future indexing only.
    pub fn set_tokenizer(&self, tokenizer: Tokenizer) {
        self.state.write().tokenizer = tokenizer;
        self.cache.clear();
    }

    /// Toggle the tokenizer's SIMD fast path (honored only on supported
    /// hosts; token streams are identical either way).
    pub fn enable_simd(&self, enabled: bool) {
        self.state.write().tokenizer.enable_simd(enabled);
        self.cache.clear();
    }

    pub fn set_stemmer(&self, stemmer: StemmerType) {
        self.state.write().tokenizer.set_stemmer(stemmer);
        self.cache.clear();
    }

    pub fn set_remove_stopwords(&self, enabled: bool) {
        self.state.write().tokenizer.set_remove_stopwords(enabled);
        self.cache.clear();
    }

    // ========================================================================
    // Ranker management
    // ========================================================================

    /// Register a ranker under its own name, replacing any previous ranker
    /// with that name. Rankers with empty names are rejected.
    pub fn register_custom_ranker(&self, ranker: Arc<dyn Ranker>) -> bool {
        self.rankers.write().register(ranker)
    }

    /// Make a registered ranker the default. False if unknown.
    pub fn set_default_ranker(&self, name: &str) -> bool {
        self.rankers.write().set_default(name)
    }

    pub fn get_default_ranker(&self) -> String {
        self.rankers.read().default_name().to_string()
    }

    pub fn list_available_rankers(&self) -> Vec<String> {
        self.rankers.read().names()
    }

    pub fn has_ranker(&self, name: &str) -> bool {
        self.rankers.read().has(name)
    }

    /// The named ranker, or the default when the name is unknown.
    pub fn get_ranker(&self, name: &str) -> Arc<dyn Ranker> {
        self.rankers.read().get(name)
    }

    // ========================================================================
    // Component access
    // ========================================================================

    /// Run `f` against the inverted index under the shared lock.
    pub fn with_index<R>(&self, f: impl FnOnce(&InvertedIndex) -> R) -> R {
        f(&self.state.read().index)
    }

    /// Run `f` against the inverted index under the exclusive lock
    /// (e.g. for explicit skip-pointer rebuilds).
    pub fn with_index_mut<R>(&self, f: impl FnOnce(&mut InvertedIndex) -> R) -> R {
        f(&mut self.state.write().index)
    }

    /// Run `f` against the fuzzy matcher under the shared lock.
    pub fn with_fuzzy<R>(&self, f: impl FnOnce(&FuzzySearch) -> R) -> R {
        f(&self.state.read().fuzzy)
    }

    /// The snippet extractor (stateless).
    pub fn snippet_extractor(&self) -> &SnippetExtractor {
        &self.snippet_extractor
    }

    /// Parse a query into its syntax tree. The tree is informational; the
    /// retrieval path scores over the flat extracted terms.
    pub fn parse_query(&self, query: &str) -> QueryNode {
        self.state.read().parser.parse(query)
    }
}

/// Lowercase and collapse whitespace; the cache-key normal form.
fn normalize_query(query: &str) -> String {
    query
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn average_doc_length(state: &EngineState) -> f64 {
    if state.documents.is_empty() {
        return 0.0;
    }
    let total: u64 = state.documents.values().map(|d| d.term_count).sum();
    total as f64 / state.documents.len() as f64
}

/// Fuzzy expansion, per term: keep terms the index knows; otherwise try
/// the shortest vocabulary prefix completion; otherwise take the best
/// fuzzy candidate within the edit bound; otherwise keep the term (it
/// will simply match nothing). Substitutions are recorded in `expansions`.
fn expand_terms(
    state: &EngineState,
    terms: &[String],
    max_edit_distance: u32,
    expansions: &mut HashMap<String, String>,
) -> Vec<String> {
    let mut expanded = Vec::with_capacity(terms.len());
    for term in terms {
        if state.index.document_frequency(term) > 0 {
            expanded.push(term.clone());
            continue;
        }

        if let Some(completion) = shortest_prefix_completion(&state.index, term) {
            expansions.insert(term.clone(), completion.clone());
            expanded.push(completion);
            continue;
        }

        let matches = state
            .fuzzy
            .find_matches(term, max_edit_distance, FUZZY_CANDIDATES);
        if let Some(best) = matches.first() {
            expansions.insert(term.clone(), best.matched_term.clone());
            expanded.push(best.matched_term.clone());
        } else {
            expanded.push(term.clone());
        }
    }
    expanded
}

/// The shortest vocabulary term starting with `prefix`; ties break
/// lexicographically. None when nothing completes it.
fn shortest_prefix_completion(index: &InvertedIndex, prefix: &str) -> Option<String> {
    if prefix.is_empty() {
        return None;
    }
    let mut best: Option<&str> = None;
    for term in index.terms() {
        if !term.starts_with(prefix) {
            continue;
        }
        best = match best {
            None => Some(term),
            Some(current) => {
                if (term.len(), term) < (current.len(), current) {
                    Some(term)
                } else {
                    Some(current)
                }
            }
        };
    }
    best.map(str::to_string)
}
