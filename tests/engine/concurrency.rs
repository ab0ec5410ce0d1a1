//! Concurrency discipline: many readers, one writer, no torn views.

use super::common::*;
use rtrv::{SearchEngine, SearchOptions};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

#[test]
fn concurrent_searches_during_writes_never_tear() {
    let engine = Arc::new(SearchEngine::new());
    for i in 0..50 {
        engine.index_document(doc_with_content(0, &format!("stable corpus entry {i}")));
    }
    // Document 1 flips between two self-consistent bodies; a reader must
    // see one or the other, never a blend.
    let stop = Arc::new(AtomicBool::new(false));

    let writer = {
        let engine = Arc::clone(&engine);
        let stop = Arc::clone(&stop);
        thread::spawn(move || {
            let mut flip = false;
            while !stop.load(Ordering::Relaxed) {
                let body = if flip {
                    "alpha alpha alpha"
                } else {
                    "omega omega omega"
                };
                assert!(engine.update_document(1, doc_with_content(0, body)));
                flip = !flip;
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let engine = Arc::clone(&engine);
            let stop = Arc::clone(&stop);
            thread::spawn(move || {
                let options = SearchOptions {
                    use_cache: false,
                    ..SearchOptions::default()
                };
                while !stop.load(Ordering::Relaxed) {
                    let alphas = engine.search("alpha", &options);
                    let omegas = engine.search("omega", &options);
                    for r in alphas.iter().chain(&omegas) {
                        if r.document.id == 1 {
                            let text = r.document.all_text();
                            assert!(
                                text == "alpha alpha alpha" || text == "omega omega omega",
                                "torn read: {text}"
                            );
                        }
                    }
                }
            })
        })
        .collect();

    thread::sleep(std::time::Duration::from_millis(100));
    stop.store(true, Ordering::Relaxed);
    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }
}

#[test]
fn a_search_after_indexing_returns_observes_the_document() {
    let engine = Arc::new(SearchEngine::new());
    let mut handles = Vec::new();
    for t in 0..4 {
        let engine = Arc::clone(&engine);
        handles.push(thread::spawn(move || {
            for i in 0..25 {
                let marker = format!("marker{t}x{i}");
                let id = engine.index_document(doc_with_content(0, &marker));
                let results = engine.search(&marker, &SearchOptions::default());
                assert!(
                    results.iter().any(|r| r.document.id == id),
                    "document {id} invisible right after indexing"
                );
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(engine.stats().total_documents, 100);
}

#[test]
fn cache_counters_are_coherent_under_contention() {
    let engine = Arc::new(basic_engine());
    let options = SearchOptions::default();
    engine.search("quick dog", &options); // warm the entry

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let engine = Arc::clone(&engine);
            let options = options.clone();
            thread::spawn(move || {
                for _ in 0..50 {
                    let results = engine.search("quick dog", &options);
                    assert!(!results.is_empty());
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let stats = engine.cache_stats();
    assert_eq!(stats.hit_count + stats.miss_count, 401);
    assert_eq!(stats.current_size, 1);
    assert!(stats.hit_rate > 0.9);
}
