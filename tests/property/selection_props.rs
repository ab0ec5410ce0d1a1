//! Selection invariants: heap vs. full sort, result-order totality.

use proptest::prelude::*;
use rtrv::{ScoredHit, SearchOptions, TopKHeap};

fn hits_strategy() -> impl Strategy<Value = Vec<(u64, u32)>> {
    // Scores as small integers so ties actually happen.
    prop::collection::vec((1u64..40, 1u32..6), 0..60)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Heap selection equals sort-and-truncate under the same ordering.
    #[test]
    fn prop_heap_equals_sort(hits in hits_strategy(), k in 0usize..20) {
        let scored: Vec<ScoredHit> = hits
            .iter()
            .map(|&(doc_id, s)| ScoredHit { doc_id, score: s as f64 })
            .collect();

        let mut heap = TopKHeap::new(k);
        for &hit in &scored {
            heap.push(hit);
        }
        let via_heap = heap.into_sorted_desc();

        let mut via_sort = scored;
        via_sort.sort_by(|a, b| b.cmp(a));
        via_sort.truncate(k);

        // Items comparing equal carry identical (doc_id, score), so the
        // two sequences must agree element-wise.
        prop_assert_eq!(via_heap, via_sort);
    }

    /// The ScoredHit order is total and antisymmetric over realistic data.
    #[test]
    fn prop_hit_order_total(hits in hits_strategy()) {
        let scored: Vec<ScoredHit> = hits
            .iter()
            .map(|&(doc_id, s)| ScoredHit { doc_id, score: s as f64 })
            .collect();
        for a in &scored {
            for b in &scored {
                let ab = a.cmp(b);
                let ba = b.cmp(a);
                prop_assert_eq!(ab, ba.reverse());
            }
        }
    }
}

/// Engine-level: the two selection paths return identical ranked results.
#[test]
fn engine_heap_and_sort_agree_on_random_corpora() {
    let engine = rtrv::SearchEngine::new();
    let words = ["rust", "index", "search", "score", "query", "token"];
    for i in 0..30 {
        let body: String = (0..(i % 6 + 1))
            .map(|j| words[(i + j) % words.len()])
            .collect::<Vec<_>>()
            .join(" ");
        engine.index_document(rtrv::testing::doc_with_content(0, &body));
    }

    for query in ["rust search", "index", "score query token", "rust rust"] {
        let heap = engine.search(
            query,
            &SearchOptions {
                max_results: 10,
                use_cache: false,
                ..SearchOptions::default()
            },
        );
        let sort = engine.search(
            query,
            &SearchOptions {
                max_results: 10,
                use_top_k_heap: false,
                use_cache: false,
                ..SearchOptions::default()
            },
        );
        assert_eq!(heap.len(), sort.len(), "query {query}");
        for (a, b) in heap.iter().zip(&sort) {
            assert_eq!(a.document.id, b.document.id, "query {query}");
            assert_eq!(a.score, b.score, "query {query}");
        }
    }
}
