//! Test utilities shared across unit and integration tests.
//!
//! Always compiled but hidden from documentation; the canonical place for
//! fixture builders so individual test files don't grow their own copies.

#![doc(hidden)]

use crate::types::Document;

/// A document with a single `content` field.
pub fn doc_with_content(id: u64, content: &str) -> Document {
    Document::new(id).with_field("content", content)
}

/// A document with `title` and `content` fields.
pub fn doc_with_title(id: u64, title: &str, content: &str) -> Document {
    Document::new(id)
        .with_field("title", title)
        .with_field("content", content)
}

/// The five-document fuzzy-search fixture corpus.
pub fn fuzzy_corpus() -> Vec<Document> {
    [
        "Machine learning is a subset of AI",
        "The quick brown fox jumps over the lazy dog",
        "Search engine algorithms rank documents by relevance",
        "Neural networks power modern computer science",
        "Deep learning and machine learning are related fields",
    ]
    .iter()
    .map(|content| doc_with_content(0, content))
    .collect()
}
