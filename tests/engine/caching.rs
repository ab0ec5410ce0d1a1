//! Query cache behavior at the engine boundary.

use super::common::*;
use rtrv::SearchOptions;
use std::time::Duration;

#[test]
fn repeated_searches_hit_the_cache() {
    let engine = basic_engine();
    let options = SearchOptions::default();

    let first = engine.search("quick dog", &options);
    let second = engine.search("quick dog", &options);
    assert_eq!(first, second);

    let stats = engine.cache_stats();
    assert_eq!(stats.hit_count, 1);
    assert_eq!(stats.miss_count, 1);
    assert!((stats.hit_rate - 0.5).abs() < 1e-9);
}

#[test]
fn normalization_folds_case_and_whitespace_into_one_key() {
    let engine = basic_engine();
    let options = SearchOptions::default();

    engine.search("quick   dog", &options);
    engine.search("QUICK DOG", &options);
    engine.search("  Quick\tDog ", &options);

    let stats = engine.cache_stats();
    assert_eq!(stats.miss_count, 1);
    assert_eq!(stats.hit_count, 2);
    assert_eq!(stats.current_size, 1);
}

#[test]
fn different_options_occupy_different_entries() {
    let engine = basic_engine();

    engine.search("quick", &SearchOptions::default());
    engine.search(
        "quick",
        &SearchOptions {
            max_results: 3,
            ..SearchOptions::default()
        },
    );

    let stats = engine.cache_stats();
    assert_eq!(stats.miss_count, 2);
    assert_eq!(stats.current_size, 2);
}

#[test]
fn use_cache_false_skips_lookup_and_store() {
    let engine = basic_engine();
    engine.search("quick", &uncached_options());
    engine.search("quick", &uncached_options());

    let stats = engine.cache_stats();
    assert_eq!(stats.hit_count, 0);
    assert_eq!(stats.miss_count, 0);
    assert_eq!(stats.current_size, 0);
}

#[test]
fn every_write_clears_the_cache() {
    let engine = basic_engine();
    let options = SearchOptions::default();

    engine.search("quick", &options);
    assert_eq!(engine.cache_stats().current_size, 1);
    engine.index_document(doc_with_content(0, "new"));
    assert_eq!(engine.cache_stats().current_size, 0);

    engine.search("quick", &options);
    assert!(engine.update_document(1, doc_with_content(0, "changed")));
    assert_eq!(engine.cache_stats().current_size, 0);

    engine.search("quick", &options);
    assert!(engine.delete_document(2));
    assert_eq!(engine.cache_stats().current_size, 0);
}

#[test]
fn cache_config_is_adjustable() {
    let engine = basic_engine();
    engine.set_cache_config(1, Duration::from_secs(60));

    engine.search("quick", &SearchOptions::default());
    engine.search("dog", &SearchOptions::default());
    let stats = engine.cache_stats();
    assert_eq!(stats.current_size, 1);
    assert_eq!(stats.max_size, 1);
    assert_eq!(stats.eviction_count, 1);

    engine.clear_cache();
    assert_eq!(engine.cache_stats().current_size, 0);
}

#[test]
fn expired_entries_miss_after_ttl() {
    let engine = basic_engine();
    engine.set_cache_config(64, Duration::from_millis(1));

    let options = SearchOptions::default();
    engine.search("quick", &options);
    std::thread::sleep(Duration::from_millis(10));
    engine.search("quick", &options);

    let stats = engine.cache_stats();
    assert_eq!(stats.hit_count, 0);
    assert_eq!(stats.miss_count, 2);
}
