// Copyright 2026-present rtrv contributors
// SPDX-License-Identifier: Apache-2.0

//! Context snippets: short windows of document text with the query terms
//! highlighted.
//!
//! The extractor scores a window starting at every word position by how
//! many query terms land inside it, greedily picks the densest
//! non-overlapping windows, snaps their edges so no word is cut in half,
//! and wraps matched words in the configured markers. Matching is
//! whole-word and case-insensitive; the original casing is preserved in
//! the output.
//!
//! All indices are byte offsets. Word runs are ASCII (alphanumeric plus
//! apostrophe), so run edges are always valid char boundaries; the only
//! index that can land mid-character is a raw window end, which gets
//! floored to a boundary before slicing.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::simd::is_word_byte;

/// Configuration for snippet generation and highlighting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnippetOptions {
    /// Maximum characters per snippet window.
    pub max_snippet_length: usize,
    /// Number of snippets to generate.
    pub num_snippets: usize,
    /// Opening highlight marker.
    pub highlight_open: String,
    /// Closing highlight marker.
    pub highlight_close: String,
}

impl Default for SnippetOptions {
    fn default() -> Self {
        SnippetOptions {
            max_snippet_length: 150,
            num_snippets: 3,
            highlight_open: "<em>".to_string(),
            highlight_close: "</em>".to_string(),
        }
    }
}

/// A candidate window over the document text.
#[derive(Debug, Clone, Copy)]
struct Window {
    start: usize,
    end: usize,
    match_count: usize,
}

/// A word run: byte range plus its lowercased text.
struct WordRun {
    start: usize,
    end: usize,
    lower: String,
}

/// Generates context-aware snippets with query-term highlighting.
#[derive(Debug, Clone, Copy, Default)]
pub struct SnippetExtractor;

impl SnippetExtractor {
    pub fn new() -> Self {
        SnippetExtractor
    }

    /// Generate up to `options.num_snippets` highlighted snippets from
    /// `text` for the given query terms.
    ///
    /// Text no longer than one window comes back whole, highlighted, with
    /// no ellipsis. Otherwise the densest non-overlapping windows win;
    /// when nothing matches at all, a single fallback window from the
    /// start of the text is returned.
    pub fn generate_snippets(
        &self,
        text: &str,
        query_terms: &[String],
        options: &SnippetOptions,
    ) -> Vec<String> {
        if text.is_empty() || query_terms.is_empty() {
            return Vec::new();
        }

        if text.len() <= options.max_snippet_length {
            return vec![self.highlight_terms(
                text,
                query_terms,
                &options.highlight_open,
                &options.highlight_close,
            )];
        }

        let windows = find_best_windows(
            text,
            query_terms,
            options.max_snippet_length,
            options.num_snippets,
        );

        let mut snippets = Vec::with_capacity(windows.len());
        for win in windows {
            let (start, end) = snap_to_word_boundaries(text, win.start, win.end);
            let raw = &text[start..end];
            let mut highlighted = self.highlight_terms(
                raw,
                query_terms,
                &options.highlight_open,
                &options.highlight_close,
            );
            if start > 0 {
                highlighted = format!("...{highlighted}");
            }
            if end < text.len() {
                highlighted.push_str("...");
            }
            snippets.push(highlighted);
        }
        snippets
    }

    /// Wrap every whole-word, case-insensitive occurrence of a query term
    /// in the given markers, preserving the original casing.
    pub fn highlight_terms(
        &self,
        text: &str,
        query_terms: &[String],
        open_tag: &str,
        close_tag: &str,
    ) -> String {
        if text.is_empty() || query_terms.is_empty() {
            return text.to_string();
        }

        let term_set: HashSet<String> =
            query_terms.iter().map(|t| t.to_ascii_lowercase()).collect();

        let bytes = text.as_bytes();
        let mut out = String::with_capacity(text.len() + 16);
        let mut i = 0;
        while i < bytes.len() {
            if is_word_byte(bytes[i]) {
                let start = i;
                while i < bytes.len() && is_word_byte(bytes[i]) {
                    i += 1;
                }
                let word = &text[start..i];
                if term_set.contains(&word.to_ascii_lowercase()) {
                    out.push_str(open_tag);
                    out.push_str(word);
                    out.push_str(close_tag);
                } else {
                    out.push_str(word);
                }
            } else {
                let start = i;
                while i < bytes.len() && !is_word_byte(bytes[i]) {
                    i += 1;
                }
                out.push_str(&text[start..i]);
            }
        }
        out
    }
}

/// Scan the text into word runs with lowercased copies.
fn word_runs(text: &str) -> Vec<WordRun> {
    let bytes = text.as_bytes();
    let mut runs = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if is_word_byte(bytes[i]) {
            let start = i;
            while i < bytes.len() && is_word_byte(bytes[i]) {
                i += 1;
            }
            runs.push(WordRun {
                start,
                end: i,
                lower: text[start..i].to_ascii_lowercase(),
            });
        } else {
            i += 1;
        }
    }
    runs
}

/// Largest char boundary not exceeding `i`.
fn floor_char_boundary(text: &str, mut i: usize) -> usize {
    if i >= text.len() {
        return text.len();
    }
    while !text.is_char_boundary(i) {
        i -= 1;
    }
    i
}

/// Score a window starting at every word position and greedily select the
/// densest non-overlapping ones, earliest-first on ties. Returns the
/// chosen windows in reading order; a zero-match fallback window when
/// nothing matched anywhere.
fn find_best_windows(
    text: &str,
    query_terms: &[String],
    window_size: usize,
    num_windows: usize,
) -> Vec<Window> {
    let term_set: HashSet<String> = query_terms.iter().map(|t| t.to_ascii_lowercase()).collect();
    let words = word_runs(text);
    if words.is_empty() {
        return Vec::new();
    }

    let mut scored: Vec<Window> = Vec::new();
    for (wi, word) in words.iter().enumerate() {
        let w_start = word.start;
        let w_end = floor_char_boundary(text, (w_start + window_size).min(text.len()));

        let mut score = 0;
        for later in &words[wi..] {
            if later.start >= w_end {
                break;
            }
            if term_set.contains(&later.lower) {
                score += 1;
            }
        }
        if score > 0 {
            scored.push(Window {
                start: w_start,
                end: w_end,
                match_count: score,
            });
        }
    }

    if scored.is_empty() {
        return vec![Window {
            start: 0,
            end: floor_char_boundary(text, window_size.min(text.len())),
            match_count: 0,
        }];
    }

    scored.sort_by(|a, b| {
        b.match_count
            .cmp(&a.match_count)
            .then_with(|| a.start.cmp(&b.start))
    });

    let mut chosen: Vec<Window> = Vec::new();
    for win in scored {
        if chosen.len() >= num_windows {
            break;
        }
        let overlaps = chosen
            .iter()
            .any(|c| win.start < c.end && win.end > c.start);
        if !overlaps {
            chosen.push(win);
        }
    }

    chosen.sort_by_key(|w| w.start);
    chosen
}

/// Push the window edges outward so no word is split: a start that lands
/// mid-word advances past the broken word, an end that lands mid-word
/// extends to finish it.
fn snap_to_word_boundaries(text: &str, mut start: usize, mut end: usize) -> (usize, usize) {
    let bytes = text.as_bytes();

    if start > 0 && start < bytes.len() && is_word_byte(bytes[start]) && is_word_byte(bytes[start - 1])
    {
        while start < bytes.len() && is_word_byte(bytes[start]) {
            start += 1;
        }
        while start < bytes.len() && !is_word_byte(bytes[start]) {
            start += 1;
        }
    }

    if end > 0 && end < bytes.len() && is_word_byte(bytes[end - 1]) && is_word_byte(bytes[end]) {
        while end < bytes.len() && is_word_byte(bytes[end]) {
            end += 1;
        }
    }

    if start >= end {
        end = (start + 1).min(bytes.len());
    }
    (start, floor_char_boundary(text, end))
}
