//! Snapshot persistence at the engine boundary.

use super::common::*;
use rtrv::{SearchEngine, SearchOptions};

#[test]
fn save_and_load_preserve_document_ids_and_counter() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ids.snapshot");

    let engine = SearchEngine::new();
    engine.index_document(doc_with_content(7, "seven"));
    engine.index_document(doc_with_content(0, "eight implicitly"));
    assert!(engine.save_snapshot(&path));

    let restored = SearchEngine::new();
    assert!(restored.load_snapshot(&path));
    let docs = restored.get_documents(0, 10);
    let ids: Vec<u64> = docs.iter().map(|(id, _)| *id).collect();
    assert_eq!(ids, vec![7, 8]);

    // The id counter continues past the loaded state.
    let next = restored.index_document(doc_with_content(0, "nine"));
    assert_eq!(next, 9);
}

#[test]
fn load_failure_leaves_engine_untouched() {
    let dir = tempfile::tempdir().unwrap();

    let engine = basic_engine();
    let before = engine.stats();

    // Missing file.
    assert!(!engine.load_snapshot(dir.path().join("missing.snapshot")));
    // Garbage file.
    let garbage = dir.path().join("garbage.snapshot");
    std::fs::write(&garbage, b"this is not a snapshot").unwrap();
    assert!(!engine.load_snapshot(&garbage));

    let after = engine.stats();
    assert_eq!(before, after);
    assert!(!engine.search("quick", &uncached_options()).is_empty());
}

#[test]
fn save_failure_reports_false_and_preserves_state() {
    let engine = basic_engine();
    // A directory path cannot be created as a file.
    let dir = tempfile::tempdir().unwrap();
    assert!(!engine.save_snapshot(dir.path()));
    assert_eq!(engine.stats().total_documents, 3);
}

#[test]
fn snapshot_files_are_byte_identical_across_a_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("first.snapshot");
    let second = dir.path().join("second.snapshot");

    let engine = SearchEngine::new();
    engine.index_document(doc_with_title(0, "Alpha", "alpha bravo charlie alpha"));
    engine.index_document(doc_with_title(0, "Delta", "delta echo bravo"));
    assert!(engine.save_snapshot(&first));

    let restored = SearchEngine::new();
    assert!(restored.load_snapshot(&first));
    assert!(restored.save_snapshot(&second));

    let a = std::fs::read(&first).unwrap();
    let b = std::fs::read(&second).unwrap();
    assert_eq!(a, b);
}

#[test]
fn positions_survive_the_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("positions.snapshot");

    let engine = SearchEngine::new();
    engine.index_document(doc_with_content(0, "alpha beta alpha gamma alpha"));
    assert!(engine.save_snapshot(&path));

    let restored = SearchEngine::new();
    assert!(restored.load_snapshot(&path));

    let original = engine.with_index(|index| index.get_postings("alpha"));
    let replayed = restored.with_index(|index| index.get_postings("alpha"));
    assert_eq!(original, replayed);
    assert_eq!(replayed[0].term_frequency, 3);
    assert_eq!(replayed[0].positions, vec![0, 2, 4]);
}

#[test]
fn fuzzy_index_rebuilds_after_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fuzzy.snapshot");

    let engine = fuzzy_engine();
    // Force the fuzzy index to exist pre-save.
    let options = SearchOptions {
        fuzzy_enabled: true,
        use_cache: false,
        ..SearchOptions::default()
    };
    assert!(!engine.search("machne", &options).is_empty());
    assert!(engine.save_snapshot(&path));

    let restored = SearchEngine::new();
    assert!(restored.load_snapshot(&path));
    // Left unbuilt by load; built on demand by the next fuzzy query.
    assert!(!restored.with_fuzzy(|f| f.is_index_built()));
    assert!(!restored.search("machne", &options).is_empty());
    assert!(restored.with_fuzzy(|f| f.is_index_built()));
}
