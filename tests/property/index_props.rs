//! Inverted-index invariants: sortedness, df, skip consistency,
//! intersection against a naive oracle.

use proptest::prelude::*;
use rtrv::{intersect_with_skips, InvertedIndex, PostingList};
use std::collections::BTreeSet;

fn word_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z]{1,6}").unwrap()
}

fn corpus_strategy() -> impl Strategy<Value = Vec<Vec<String>>> {
    prop::collection::vec(prop::collection::vec(word_strategy(), 1..12), 1..8)
}

/// Index each document's words at their ordinal positions, doc ids 1..=n.
fn build_index(corpus: &[Vec<String>]) -> InvertedIndex {
    let mut index = InvertedIndex::new();
    for (i, doc) in corpus.iter().enumerate() {
        for (pos, word) in doc.iter().enumerate() {
            index.add_term(word, (i + 1) as u64, pos as u32);
        }
    }
    index
}

fn doc_id_set_strategy() -> impl Strategy<Value = Vec<u64>> {
    prop::collection::btree_set(1u64..500, 0..60).prop_map(|s| s.into_iter().collect())
}

fn list_of(ids: &[u64]) -> PostingList {
    let mut index = InvertedIndex::new();
    for &id in ids {
        index.add_term("t", id, 0);
    }
    index.get_posting_list("t")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// df(t) equals the posting list length for every term.
    #[test]
    fn prop_df_equals_list_len(corpus in corpus_strategy()) {
        let index = build_index(&corpus);
        let terms: Vec<String> = index.terms().map(str::to_string).collect();
        for term in terms {
            prop_assert_eq!(
                index.document_frequency(&term),
                index.get_postings(&term).len()
            );
        }
    }

    /// Posting lists are strictly ascending by doc id.
    #[test]
    fn prop_postings_strictly_ascending(corpus in corpus_strategy()) {
        let index = build_index(&corpus);
        let terms: Vec<String> = index.terms().map(str::to_string).collect();
        for term in terms {
            let postings = index.get_postings(&term);
            for pair in postings.windows(2) {
                prop_assert!(pair[0].doc_id < pair[1].doc_id);
            }
        }
    }

    /// Every non-dirty skip pointer lands on its doc id.
    #[test]
    fn prop_skip_pointers_consistent(corpus in corpus_strategy()) {
        let index = build_index(&corpus);
        let terms: Vec<String> = index.terms().map(str::to_string).collect();
        for term in terms {
            let list = index.get_posting_list(&term);
            prop_assert!(!list.is_skip_dirty());
            for sp in list.skip_pointers() {
                prop_assert_eq!(list.postings[sp.position].doc_id, sp.doc_id);
            }
        }
    }

    /// Term frequency equals the number of occurrences in the document.
    #[test]
    fn prop_term_frequency_counts_occurrences(corpus in corpus_strategy()) {
        let index = build_index(&corpus);
        for (i, doc) in corpus.iter().enumerate() {
            let doc_id = (i + 1) as u64;
            let mut counts = std::collections::HashMap::new();
            for word in doc {
                *counts.entry(word.clone()).or_insert(0u32) += 1;
            }
            for (word, count) in counts {
                let postings = index.get_postings(&word);
                let posting = postings.iter().find(|p| p.doc_id == doc_id);
                prop_assert!(posting.is_some());
                prop_assert_eq!(posting.map(|p| p.term_frequency), Some(count));
            }
        }
    }

    /// Removal erases exactly the target document everywhere.
    #[test]
    fn prop_remove_document_is_exact(corpus in corpus_strategy(), victim in 1u64..9) {
        let mut index = build_index(&corpus);
        index.remove_document(victim);
        let terms: Vec<String> = index.terms().map(str::to_string).collect();
        for term in terms {
            let postings = index.get_postings(&term);
            prop_assert!(!postings.is_empty());
            prop_assert!(postings.iter().all(|p| p.doc_id != victim));
            for pair in postings.windows(2) {
                prop_assert!(pair[0].doc_id < pair[1].doc_id);
            }
        }
    }

    /// Skip-accelerated intersection equals the set-intersection oracle.
    #[test]
    fn prop_intersection_matches_oracle(a in doc_id_set_strategy(), b in doc_id_set_strategy()) {
        let list_a = list_of(&a);
        let list_b = list_of(&b);
        let got = intersect_with_skips(&list_a, &list_b);

        let set_a: BTreeSet<u64> = a.iter().copied().collect();
        let set_b: BTreeSet<u64> = b.iter().copied().collect();
        let expected: Vec<u64> = set_a.intersection(&set_b).copied().collect();

        prop_assert_eq!(got, expected);
    }

    /// Intersection is symmetric.
    #[test]
    fn prop_intersection_symmetric(a in doc_id_set_strategy(), b in doc_id_set_strategy()) {
        let list_a = list_of(&a);
        let list_b = list_of(&b);
        prop_assert_eq!(
            intersect_with_skips(&list_a, &list_b),
            intersect_with_skips(&list_b, &list_a)
        );
    }
}
