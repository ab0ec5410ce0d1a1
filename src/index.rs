// Copyright 2026-present rtrv contributors
// SPDX-License-Identifier: Apache-2.0

//! The inverted index: term → posting list, plus skip pointers.
//!
//! # Invariants
//!
//! 1. **POSTING_LIST_SORTED**: postings are strictly ascending by `doc_id`,
//!    no duplicates. Holds because each document is indexed in one
//!    contiguous session under the engine's write lock, so doc ids arrive
//!    monotonically within a term, and removal is retain-on-sorted-vec.
//! 2. **SKIP_CONSISTENT**: for a non-dirty list, every skip pointer
//!    satisfies `postings[sp.position].doc_id == sp.doc_id`.
//! 3. **DF_IS_LIST_LEN**: `document_frequency(t) == postings(t).len()`
//!    (one posting per document per term).
//! 4. **NON_EMPTY**: every stored term has at least one posting; removal
//!    deletes lists that drain.
//!
//! Skip pointers are derived state. Mutation marks them dirty; readers get
//! a freshly materialized copy (`get_posting_list`) without touching the
//! stored list, and writers can rebuild in place (`rebuild_skip_pointers`).
//! That split keeps the read path borrow-clean under the shared lock.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

/// One document's occurrences of one term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub doc_id: u64,
    pub term_frequency: u32,
    /// Emitted token positions, ascending. May be empty, in which case
    /// phrase-style consumers degrade to presence-only.
    pub positions: Vec<u32>,
}

impl Posting {
    pub fn new(doc_id: u64, term_frequency: u32) -> Self {
        Posting {
            doc_id,
            term_frequency,
            positions: Vec::new(),
        }
    }
}

/// Sparse index entry over a posting list: `postings[position].doc_id`
/// equals `doc_id` whenever the list is not dirty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipPointer {
    pub position: usize,
    pub doc_id: u64,
}

/// A term's postings plus the derived skip-pointer cache.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostingList {
    pub postings: Vec<Posting>,
    #[serde(skip)]
    skip_pointers: Vec<SkipPointer>,
    #[serde(skip)]
    skip_dirty: bool,
}

impl PostingList {
    pub fn new() -> Self {
        PostingList::default()
    }

    /// The skip pointers as last built. Check [`PostingList::is_skip_dirty`]
    /// before trusting them against the current postings.
    pub fn skip_pointers(&self) -> &[SkipPointer] {
        &self.skip_pointers
    }

    pub fn is_skip_dirty(&self) -> bool {
        self.skip_dirty
    }

    /// Skip pointers that are safe to use for traversal: present and not
    /// stale. Dirty or absent caches read as "no skips".
    fn usable_skips(&self) -> Option<&[SkipPointer]> {
        if self.skip_dirty || self.skip_pointers.is_empty() {
            None
        } else {
            Some(&self.skip_pointers)
        }
    }

    /// Rebuild skip pointers at `interval`; 0 selects the default
    /// `max(1, ⌊√n⌋)`. Pointers land at positions 0, s, 2s, …
    pub fn build_skip_pointers(&mut self, interval: usize) {
        let n = self.postings.len();
        let step = if interval == 0 {
            ((n as f64).sqrt().floor() as usize).max(1)
        } else {
            interval
        };

        self.skip_pointers.clear();
        let mut pos = 0;
        while pos < n {
            self.skip_pointers.push(SkipPointer {
                position: pos,
                doc_id: self.postings[pos].doc_id,
            });
            pos += step;
        }
        self.skip_dirty = false;
    }

    /// Position of the greatest skip pointer whose `doc_id` does not exceed
    /// `target`, or 0 when the first pointer already does. Callers advance
    /// their merge cursor to the returned position.
    pub fn find_skip_target(&self, target: u64) -> usize {
        let idx = self.skip_pointers.partition_point(|sp| sp.doc_id <= target);
        if idx == 0 {
            0
        } else {
            self.skip_pointers[idx - 1].position
        }
    }

    fn mark_dirty(&mut self) {
        self.skip_dirty = true;
    }
}

/// Term → posting list, with a vocabulary view for fuzzy expansion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InvertedIndex {
    index: HashMap<String, PostingList>,
}

impl InvertedIndex {
    pub fn new() -> Self {
        InvertedIndex::default()
    }

    /// Record one occurrence of `term` in `doc_id` at `position`.
    ///
    /// The caller indexes a document in a single contiguous session under
    /// the engine's write lock, so doc ids arrive monotonically within a
    /// term and appending preserves POSTING_LIST_SORTED. Dropping that
    /// serialization would require an insertion sort here instead.
    pub fn add_term(&mut self, term: &str, doc_id: u64, position: u32) {
        let list = self.index.entry(term.to_string()).or_default();
        match list.postings.last_mut() {
            Some(last) if last.doc_id == doc_id => {
                last.term_frequency += 1;
                if position != 0 {
                    last.positions.push(position);
                }
            }
            _ => {
                let mut posting = Posting::new(doc_id, 1);
                posting.positions.push(position);
                list.postings.push(posting);
            }
        }
        list.mark_dirty();
    }

    /// Copy of the postings for `term`; empty when the term is absent.
    pub fn get_postings(&self, term: &str) -> Vec<Posting> {
        self.index
            .get(term)
            .map(|list| list.postings.clone())
            .unwrap_or_default()
    }

    /// Copy of the full posting list with skip pointers materialized.
    ///
    /// If the stored list is dirty the returned copy gets freshly built
    /// skips; the stored list itself is only rebuilt under the write path
    /// ([`InvertedIndex::rebuild_skip_pointers`]).
    pub fn get_posting_list(&self, term: &str) -> PostingList {
        match self.index.get(term) {
            Some(list) => {
                let mut copy = list.clone();
                if copy.skip_dirty {
                    copy.build_skip_pointers(0);
                }
                copy
            }
            None => PostingList::new(),
        }
    }

    /// Remove every posting for `doc_id`, deleting terms that drain empty.
    pub fn remove_document(&mut self, doc_id: u64) {
        self.index.retain(|_, list| {
            let before = list.postings.len();
            list.postings.retain(|p| p.doc_id != doc_id);
            if list.postings.len() != before {
                list.mark_dirty();
            }
            !list.postings.is_empty()
        });
    }

    /// Number of documents containing `term`.
    pub fn document_frequency(&self, term: &str) -> usize {
        self.index.get(term).map_or(0, |list| list.postings.len())
    }

    /// Number of distinct terms in the index.
    pub fn term_count(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn clear(&mut self) {
        self.index.clear();
    }

    /// Iterate the stored terms.
    pub fn terms(&self) -> impl Iterator<Item = &str> {
        self.index.keys().map(String::as_str)
    }

    /// Iterate terms with their posting lists (read-side, for the codec).
    pub fn entries(&self) -> impl Iterator<Item = (&str, &PostingList)> {
        self.index.iter().map(|(t, l)| (t.as_str(), l))
    }

    /// The vocabulary as an owned set, for fuzzy n-gram construction.
    pub fn vocabulary(&self) -> HashSet<String> {
        self.index.keys().cloned().collect()
    }

    pub fn contains_term(&self, term: &str) -> bool {
        self.index.contains_key(term)
    }

    /// Rebuild skip pointers for every list at the default interval.
    pub fn rebuild_skip_pointers(&mut self) {
        for list in self.index.values_mut() {
            list.build_skip_pointers(0);
        }
    }

    /// Rebuild skip pointers for one term. No-op when the term is absent.
    pub fn rebuild_skip_pointers_for(&mut self, term: &str) {
        if let Some(list) = self.index.get_mut(term) {
            list.build_skip_pointers(0);
        }
    }
}

/// Intersect two posting lists into the ascending vector of shared doc ids.
///
/// A standard two-pointer merge; when one cursor lags, it jumps forward via
/// the lagging list's skip pointers (amortized O(√n) steps per advance)
/// when a clean skip cache is available, else by one.
pub fn intersect_with_skips(list1: &PostingList, list2: &PostingList) -> Vec<u64> {
    let mut out = Vec::new();
    let (a, b) = (&list1.postings, &list2.postings);
    let skips_a = list1.usable_skips().is_some();
    let skips_b = list2.usable_skips().is_some();

    let mut i = 0;
    let mut j = 0;
    while i < a.len() && j < b.len() {
        let da = a[i].doc_id;
        let db = b[j].doc_id;
        if da == db {
            out.push(da);
            i += 1;
            j += 1;
        } else if da < db {
            let jump = if skips_a { list1.find_skip_target(db) } else { 0 };
            i = if jump > i { jump } else { i + 1 };
        } else {
            let jump = if skips_b { list2.find_skip_target(da) } else { 0 };
            j = if jump > j { jump } else { j + 1 };
        }
    }
    out
}
