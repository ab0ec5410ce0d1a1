// Copyright 2026-present rtrv contributors
// SPDX-License-Identifier: Apache-2.0

//! The analyzer pipeline: raw text in, ordered terms out.
//!
//! Four stages, always in this order: ASCII case fold (optional), word-run
//! classification, stopword filter (optional, before stemming), stemmer
//! (optional). Tokens are maximal runs of alphanumeric-or-apostrophe bytes;
//! non-ASCII bytes pass through the fold untouched and act as separators in
//! classification.
//!
//! Positions are dense over the *emitted* stream: filtering a stopword does
//! not leave a hole. Byte offsets always refer to the original input text,
//! never the folded buffer.
//!
//! `tokenize` is a pure function of (text, configuration) - the same input
//! and settings produce the same stream every time, SIMD on or off.

use std::collections::HashSet;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

use crate::simd;

/// Which stemmer the pipeline applies after stopword filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StemmerType {
    /// No stemming.
    #[default]
    None,
    /// One-suffix stripper, longest match wins. The supported stemmer.
    Simple,
    /// Reserved. Currently a pass-through; use [`StemmerType::Simple`].
    Porter,
}

/// An emitted token: analyzed text plus provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// Analyzed surface form (folded, filtered, stemmed).
    pub text: String,
    /// Ordinal among emitted tokens of this document; dense after filtering.
    pub position: u32,
    /// Byte offset of the raw token's first byte in the original text.
    pub start: usize,
    /// Byte offset one past the raw token's last byte.
    pub end: usize,
}

/// Default English stopword list, shipped in `data/stopwords.txt`.
static DEFAULT_STOP_WORDS: LazyLock<HashSet<String>> = LazyLock::new(|| {
    include_str!("../data/stopwords.txt")
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| line.to_ascii_lowercase())
        .collect()
});

/// Configurable text analyzer.
///
/// Cheap to clone; holds no per-call state. The engine keeps one behind its
/// write lock and hands copies to the parallel batch-indexing map phase.
#[derive(Debug, Clone)]
pub struct Tokenizer {
    lowercase: bool,
    remove_stopwords: bool,
    /// Custom stopword set; `None` falls back to the shipped English list.
    stop_words: Option<HashSet<String>>,
    stemmer: StemmerType,
    simd_enabled: bool,
}

impl Default for Tokenizer {
    fn default() -> Self {
        Tokenizer {
            lowercase: true,
            remove_stopwords: false,
            stop_words: None,
            stemmer: StemmerType::None,
            simd_enabled: false,
        }
    }
}

impl Tokenizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable ASCII case folding.
    pub fn set_lowercase(&mut self, enabled: bool) {
        self.lowercase = enabled;
    }

    /// Enable or disable the stopword filter.
    pub fn set_remove_stopwords(&mut self, enabled: bool) {
        self.remove_stopwords = enabled;
    }

    /// Install a custom stopword set (replaces the shipped English list)
    /// and switch the filter on.
    pub fn set_stop_words(&mut self, stops: HashSet<String>) {
        self.stop_words = Some(stops);
        self.remove_stopwords = true;
    }

    /// Select the stemmer stage.
    pub fn set_stemmer(&mut self, stemmer: StemmerType) {
        self.stemmer = stemmer;
    }

    pub fn stemmer(&self) -> StemmerType {
        self.stemmer
    }

    /// Request the SIMD fast path. Honored only when the host has a
    /// supported vector unit; otherwise the scalar path stays active.
    /// Output is identical either way.
    pub fn enable_simd(&mut self, enabled: bool) {
        self.simd_enabled = enabled && simd::simd_supported();
    }

    /// Whether the SIMD fast path is active.
    pub fn simd_enabled(&self) -> bool {
        self.simd_enabled
    }

    /// Analyze `text` into terms, in emission order.
    ///
    /// Empty input yields an empty vector; every emitted term is non-empty.
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        self.tokenize_with_positions(text)
            .into_iter()
            .map(|t| t.text)
            .collect()
    }

    /// Analyze `text` into [`Token`]s carrying positions and byte offsets.
    pub fn tokenize_with_positions(&self, text: &str) -> Vec<Token> {
        if text.is_empty() {
            return Vec::new();
        }

        let mut buf = text.as_bytes().to_vec();
        if self.lowercase {
            simd::fold_lower(&mut buf, self.simd_enabled);
        }
        let mask = simd::word_mask(&buf, self.simd_enabled);

        let stops = self.active_stop_words();
        let mut tokens = Vec::with_capacity(buf.len() / 6);
        let mut position = 0u32;
        let mut i = 0;
        while i < buf.len() {
            if !mask[i] {
                i += 1;
                continue;
            }
            let start = i;
            while i < buf.len() && mask[i] {
                i += 1;
            }
            // Runs are pure ASCII, so byte-to-char is exact.
            let raw: String = buf[start..i].iter().map(|&b| b as char).collect();

            if let Some(stops) = stops {
                if stops.contains(&raw) {
                    continue;
                }
            }

            let analyzed = match self.stemmer {
                StemmerType::None | StemmerType::Porter => raw,
                StemmerType::Simple => simple_stem(&raw),
            };

            tokens.push(Token {
                text: analyzed,
                position,
                start,
                end: i,
            });
            position += 1;
        }
        tokens
    }

    fn active_stop_words(&self) -> Option<&HashSet<String>> {
        if !self.remove_stopwords {
            return None;
        }
        Some(self.stop_words.as_ref().unwrap_or(&DEFAULT_STOP_WORDS))
    }
}

/// Strip at most one suffix, longest rule first.
///
/// Tokens shorter than four characters are returned unchanged.
fn simple_stem(token: &str) -> String {
    if token.len() < 4 {
        return token.to_string();
    }
    if let Some(stem) = token.strip_suffix("ational") {
        return format!("{stem}ate");
    }
    if let Some(stem) = token.strip_suffix("tional") {
        return format!("{stem}tion");
    }
    if let Some(stem) = token.strip_suffix("ional") {
        // Drop the final "al".
        return format!("{stem}ion");
    }
    for suffix in ["ing", "ed", "ly"] {
        if let Some(stem) = token.strip_suffix(suffix) {
            return stem.to_string();
        }
    }
    if token.ends_with('s') && !token.ends_with("ss") {
        return token[..token.len() - 1].to_string();
    }
    token.to_string()
}
