// Copyright 2026-present rtrv contributors
// SPDX-License-Identifier: Apache-2.0

//! Embeddable full-text search with ranked retrieval.
//!
//! `rtrv` ingests field-based documents, maintains an in-memory inverted
//! index with skip-pointer acceleration, and answers ranked keyword queries
//! with optional fuzzy matching, highlighted snippets, and a TTL+LRU result
//! cache. One process, one index; durability is an atomic full-state
//! snapshot to a single file.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────┐   ┌───────────────┐   ┌────────────┐
//! │ tokenizer  │──▶│ index          │◀──│ snapshot   │
//! │ (analyze)  │   │ (postings +    │   │ (codec)    │
//! └────────────┘   │  skip ptrs)    │   └────────────┘
//!                  └───────┬────────┘
//! ┌────────────┐           │            ┌────────────┐
//! │ parser     │──▶ search_ranked ◀─────│ fuzzy      │
//! │ (AST+terms)│           │            │ (bigrams)  │
//! └────────────┘   ┌───────▼────────┐   └────────────┘
//!                  │ ranker → topk  │
//!                  │ snippet, cache │
//!                  └───────┬────────┘
//!                     SearchEngine
//! ```
//!
//! # Usage
//!
//! ```
//! use rtrv::{Document, SearchEngine, SearchOptions};
//!
//! let engine = SearchEngine::new();
//! engine.index_document(
//!     Document::new(0)
//!         .with_field("title", "Skip pointers")
//!         .with_field("body", "posting list intersection in sublinear steps"),
//! );
//!
//! let results = engine.search("posting intersection", &SearchOptions::default());
//! assert_eq!(results[0].document.get_field("title"), Some("Skip pointers"));
//! ```
//!
//! # Concurrency
//!
//! The engine is thread-safe for any mix of concurrent readers and one
//! writer: an engine-wide shared/exclusive lock covers the document store,
//! index, fuzzy index, and tokenizer configuration, while the query cache
//! synchronizes independently. A search that begins after `index_document`
//! returns observes that document; updates are atomic with respect to
//! concurrent searches.

pub mod cache;
pub mod engine;
pub mod fuzzy;
pub mod index;
pub mod parser;
pub mod ranker;
pub mod simd;
pub mod snapshot;
pub mod snippet;
pub mod tokenizer;
pub mod topk;
pub mod types;

#[doc(hidden)]
pub mod testing;

// Re-exports: the public surface most callers need.
pub use cache::{QueryCache, QueryCacheKey};
pub use engine::SearchEngine;
pub use fuzzy::{auto_max_edit_distance, damerau_levenshtein_distance, FuzzyMatch, FuzzySearch};
pub use index::{intersect_with_skips, InvertedIndex, Posting, PostingList, SkipPointer};
pub use parser::{QueryNode, QueryParser};
pub use ranker::{Bm25Ranker, IndexStats, Query, Ranker, RankerRegistry, TfIdfRanker};
pub use snapshot::{SNAPSHOT_MAGIC, SNAPSHOT_VERSION};
pub use snippet::{SnippetExtractor, SnippetOptions};
pub use tokenizer::{StemmerType, Token, Tokenizer};
pub use topk::{ScoredHit, TopKHeap};
pub use types::{
    CacheStatistics, Document, IndexStatistics, PaginatedSearchResults, PaginationInfo,
    RankingAlgorithm, SearchOptions, SearchResult,
};
