//! Offset and cursor pagination.

use super::common::*;
use rtrv::SearchOptions;

#[test]
fn offset_pages_partition_the_ranked_list() {
    let engine = bulk_engine(12);

    let full = engine.search(
        "common",
        &SearchOptions {
            max_results: 12,
            use_cache: false,
            ..SearchOptions::default()
        },
    );
    assert_eq!(full.len(), 12);

    let mut paged = Vec::new();
    for page in 0..3 {
        let options = SearchOptions {
            max_results: 4,
            offset: page * 4,
            use_cache: false,
            ..SearchOptions::default()
        };
        let result = engine.search_paginated("common", &options);
        assert_eq!(result.pagination.total_hits, 12);
        assert_eq!(result.pagination.offset, page * 4);
        assert_eq!(result.pagination.page_size, 4);
        assert_eq!(result.pagination.has_next_page, page < 2);
        paged.extend(result.results);
    }

    assert_eq!(paged.len(), 12);
    for (a, b) in full.iter().zip(&paged) {
        assert_eq!(a.document.id, b.document.id);
        assert_eq!(a.score, b.score);
    }
}

#[test]
fn offset_beyond_results_is_an_empty_page() {
    let engine = bulk_engine(3);
    let options = SearchOptions {
        max_results: 10,
        offset: 50,
        use_cache: false,
        ..SearchOptions::default()
    };
    let result = engine.search_paginated("common", &options);
    assert!(result.results.is_empty());
    assert_eq!(result.pagination.page_size, 0);
    assert_eq!(result.pagination.total_hits, 3);
}

#[test]
fn cursor_pagination_resumes_after_the_last_result() {
    let engine = bulk_engine(9);

    let first = engine.search_paginated(
        "common",
        &SearchOptions {
            max_results: 4,
            use_cache: false,
            ..SearchOptions::default()
        },
    );
    assert_eq!(first.results.len(), 4);
    assert!(first.pagination.has_next_page);

    let last = first.results.last().unwrap();
    let second = engine.search_paginated(
        "common",
        &SearchOptions {
            max_results: 4,
            search_after_score: Some(last.score),
            search_after_id: Some(last.document.id),
            use_cache: false,
            ..SearchOptions::default()
        },
    );

    // No overlap between pages, and ordering continues.
    let first_ids: Vec<u64> = first.results.iter().map(|r| r.document.id).collect();
    for r in &second.results {
        assert!(!first_ids.contains(&r.document.id));
    }
    assert_eq!(second.results.len(), 4);
    assert!(second.pagination.has_next_page);

    // Walking to the end exhausts the list.
    let last = second.results.last().unwrap();
    let third = engine.search_paginated(
        "common",
        &SearchOptions {
            max_results: 4,
            search_after_score: Some(last.score),
            search_after_id: Some(last.document.id),
            use_cache: false,
            ..SearchOptions::default()
        },
    );
    assert_eq!(third.results.len(), 1);
    assert!(!third.pagination.has_next_page);
}

#[test]
fn paginated_search_bypasses_the_cache() {
    let engine = bulk_engine(6);
    let baseline = engine.cache_stats();

    let options = SearchOptions {
        max_results: 3,
        offset: 0,
        ..SearchOptions::default() // use_cache stays true
    };
    engine.search_paginated("common", &options);
    engine.search_paginated("common", &options);

    let after = engine.cache_stats();
    assert_eq!(after.hit_count, baseline.hit_count);
    assert_eq!(after.miss_count, baseline.miss_count);
    assert_eq!(after.current_size, 0);
}
