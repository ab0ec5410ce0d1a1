// Copyright 2026-present rtrv contributors
// SPDX-License-Identifier: Apache-2.0

//! Typo tolerance: a character-bigram index over the vocabulary plus
//! bounded Damerau-Levenshtein verification.
//!
//! Candidate generation first: every vocabulary term is decomposed into the
//! bigrams of its padded form `^term$`, and a query term pulls in every
//! term sharing enough bigrams to plausibly sit within the edit bound. One
//! edit can destroy at most `NGRAM_SIZE + 1` shared bigrams, which gives
//! the filter threshold. Only survivors pay for the O(nm) distance DP, and
//! that DP abandons a row as soon as its minimum exceeds the bound.

use std::collections::{HashMap, HashSet};

/// Bigram size. Padding markers make boundary characters count double,
/// which is what you want for short terms.
const NGRAM_SIZE: usize = 2;

/// One fuzzy candidate for a query term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuzzyMatch {
    /// The (presumably misspelled) query term.
    pub original_term: String,
    /// The vocabulary term it matched.
    pub matched_term: String,
    pub edit_distance: u32,
}

/// Bigram index over the index vocabulary.
///
/// Invariant: a term `t` is in the set for bigram `g` iff `g` occurs in
/// `^t$`. `build_ngram_index` establishes it wholesale; `add_term` /
/// `remove_term` maintain it incrementally.
#[derive(Debug, Clone, Default)]
pub struct FuzzySearch {
    ngram_index: HashMap<String, HashSet<String>>,
    vocabulary: HashSet<String>,
    index_built: bool,
}

impl FuzzySearch {
    pub fn new() -> Self {
        FuzzySearch::default()
    }

    /// Rebuild from scratch over `vocabulary`.
    pub fn build_ngram_index(&mut self, vocabulary: &HashSet<String>) {
        self.clear();
        self.vocabulary = vocabulary.clone();
        for term in &self.vocabulary {
            for ngram in extract_ngrams(term) {
                self.ngram_index
                    .entry(ngram)
                    .or_default()
                    .insert(term.clone());
            }
        }
        self.index_built = true;
    }

    /// Incrementally add one term. No-op when already present.
    pub fn add_term(&mut self, term: &str) {
        if self.vocabulary.contains(term) {
            return;
        }
        self.vocabulary.insert(term.to_string());
        for ngram in extract_ngrams(term) {
            self.ngram_index
                .entry(ngram)
                .or_default()
                .insert(term.to_string());
        }
        self.index_built = true;
    }

    /// Remove one term, dropping bigram buckets that drain empty.
    pub fn remove_term(&mut self, term: &str) {
        if !self.vocabulary.contains(term) {
            return;
        }
        for ngram in extract_ngrams(term) {
            if let Some(bucket) = self.ngram_index.get_mut(&ngram) {
                bucket.remove(term);
                if bucket.is_empty() {
                    self.ngram_index.remove(&ngram);
                }
            }
        }
        self.vocabulary.remove(term);
    }

    pub fn clear(&mut self) {
        self.ngram_index.clear();
        self.vocabulary.clear();
        self.index_built = false;
    }

    pub fn is_index_built(&self) -> bool {
        self.index_built
    }

    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }

    /// Ranked fuzzy candidates for `term`.
    ///
    /// `max_edit_distance` 0 selects a bound from the term length
    /// ([`auto_max_edit_distance`]); if the bound is still 0 the only
    /// possible match is the term itself. Results are sorted by
    /// (distance, term) and truncated to `max_candidates`.
    pub fn find_matches(
        &self,
        term: &str,
        max_edit_distance: u32,
        max_candidates: usize,
    ) -> Vec<FuzzyMatch> {
        if term.is_empty() {
            return Vec::new();
        }

        let mut bound = max_edit_distance;
        if bound == 0 {
            bound = auto_max_edit_distance(term.len());
        }
        if bound == 0 {
            return if self.vocabulary.contains(term) {
                vec![FuzzyMatch {
                    original_term: term.to_string(),
                    matched_term: term.to_string(),
                    edit_distance: 0,
                }]
            } else {
                Vec::new()
            };
        }

        let query_ngrams = extract_ngrams(term);
        if query_ngrams.is_empty() {
            return Vec::new();
        }

        // Tally shared bigrams per candidate.
        let mut shared: HashMap<&str, usize> = HashMap::new();
        for ngram in &query_ngrams {
            if let Some(bucket) = self.ngram_index.get(ngram) {
                for candidate in bucket {
                    *shared.entry(candidate.as_str()).or_insert(0) += 1;
                }
            }
        }

        // Each edit destroys at most NGRAM_SIZE + 1 shared bigrams.
        let max_destroyed = bound as usize * (NGRAM_SIZE + 1);
        let min_shared = query_ngrams.len().saturating_sub(max_destroyed).max(1);

        let mut matches = Vec::new();
        for (candidate, count) in shared {
            if count < min_shared {
                continue;
            }
            let dist = damerau_levenshtein_distance(term, candidate, bound);
            if dist <= bound {
                matches.push(FuzzyMatch {
                    original_term: term.to_string(),
                    matched_term: candidate.to_string(),
                    edit_distance: dist,
                });
            }
        }

        matches.sort_by(|a, b| {
            a.edit_distance
                .cmp(&b.edit_distance)
                .then_with(|| a.matched_term.cmp(&b.matched_term))
        });
        matches.truncate(max_candidates);
        matches
    }
}

/// Bigrams of the padded form `^term$`.
fn extract_ngrams(term: &str) -> Vec<String> {
    if term.is_empty() {
        return Vec::new();
    }
    let padded = format!("^{term}$");
    let bytes = padded.as_bytes();
    let mut ngrams = Vec::with_capacity(bytes.len().saturating_sub(NGRAM_SIZE - 1));
    let mut i = 0;
    while i + NGRAM_SIZE <= bytes.len() {
        // Analyzed terms are ASCII; treat the padded form as bytes.
        ngrams.push(bytes[i..i + NGRAM_SIZE].iter().map(|&b| b as char).collect());
        i += 1;
    }
    ngrams
}

/// Edit-distance bound appropriate for a term of `term_length` characters:
/// 0 for ≤ 2, 1 for 3–4, 2 for ≥ 5.
pub fn auto_max_edit_distance(term_length: usize) -> u32 {
    match term_length {
        0..=2 => 0,
        3..=4 => 1,
        _ => 2,
    }
}

/// Damerau-Levenshtein distance (optimal string alignment) bounded by
/// `max_distance`; returns `max_distance + 1` as soon as the bound is
/// provably exceeded.
///
/// Besides insertion, deletion, and substitution, adjacent transposition
/// counts as one edit. Two early exits: a length difference beyond the
/// bound, and a DP row whose minimum exceeds the bound.
pub fn damerau_levenshtein_distance(s1: &str, s2: &str, max_distance: u32) -> u32 {
    let a = s1.as_bytes();
    let b = s2.as_bytes();
    let (len1, len2) = (a.len(), b.len());

    // Length difference is a lower bound on edit distance.
    if len1.abs_diff(len2) > max_distance as usize {
        return max_distance + 1;
    }
    if len1 == 0 {
        return len2 as u32;
    }
    if len2 == 0 {
        return len1 as u32;
    }
    if a == b {
        return 0;
    }

    let cols = len2 + 1;
    let mut dp = vec![0u32; (len1 + 1) * cols];
    for (i, cell) in dp.iter_mut().step_by(cols).enumerate() {
        *cell = i as u32;
    }
    for (j, cell) in dp[..cols].iter_mut().enumerate() {
        *cell = j as u32;
    }

    for i in 1..=len1 {
        let mut row_min = u32::MAX;
        for j in 1..=len2 {
            let cost = u32::from(a[i - 1] != b[j - 1]);
            let deletion = dp[(i - 1) * cols + j] + 1;
            let insertion = dp[i * cols + j - 1] + 1;
            let substitution = dp[(i - 1) * cols + j - 1] + cost;
            let mut cell = deletion.min(insertion).min(substitution);

            // Damerau extension: adjacent transposition.
            if i > 1 && j > 1 && a[i - 1] == b[j - 2] && a[i - 2] == b[j - 1] {
                cell = cell.min(dp[(i - 2) * cols + j - 2] + cost);
            }

            dp[i * cols + j] = cell;
            row_min = row_min.min(cell);
        }
        // The minimum over a row never decreases in later rows.
        if row_min > max_distance {
            return max_distance + 1;
        }
    }

    dp[len1 * cols + len2]
}
