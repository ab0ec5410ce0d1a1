// Copyright 2026-present rtrv contributors
// SPDX-License-Identifier: Apache-2.0

//! The query-result cache: bounded LRU with TTL.
//!
//! Keys pair the normalized query text with a fingerprint of every option
//! that shapes the result set ([`crate::SearchOptions::fingerprint`]).
//! Values are the exact result vectors returned to callers; hits hand back
//! a copy.
//!
//! The cache carries its own lock, independent of the engine-wide one, so
//! cache traffic never contends with indexing. Counters are atomics: a
//! stats read never has to take the write side. Reads take the shared side
//! first to reject plain misses cheaply, then upgrade for the LRU touch or
//! the expired-entry eviction.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use lru::LruCache;
use parking_lot::RwLock;

use crate::types::{CacheStatistics, SearchResult};

/// Cache key: normalized query text plus the options fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryCacheKey {
    pub normalized_query: String,
    pub options_hash: u64,
}

impl QueryCacheKey {
    pub fn new(normalized_query: impl Into<String>, options_hash: u64) -> Self {
        QueryCacheKey {
            normalized_query: normalized_query.into(),
            options_hash,
        }
    }
}

struct CacheEntry {
    results: Vec<SearchResult>,
    inserted_at: Instant,
}

struct CacheInner {
    /// Unbounded at the `lru` layer; the cap is enforced by
    /// `evict_overflow` so a cap of 0 (cache disabled) works too.
    entries: LruCache<QueryCacheKey, CacheEntry>,
    max_entries: usize,
    ttl: Duration,
}

impl CacheInner {
    fn is_expired(&self, entry: &CacheEntry, now: Instant) -> bool {
        !self.ttl.is_zero() && now.duration_since(entry.inserted_at) > self.ttl
    }
}

/// Bounded LRU + TTL cache over search results.
pub struct QueryCache {
    inner: RwLock<CacheInner>,
    hit_count: AtomicUsize,
    miss_count: AtomicUsize,
    eviction_count: AtomicUsize,
}

impl QueryCache {
    pub fn new(max_entries: usize, ttl: Duration) -> Self {
        QueryCache {
            inner: RwLock::new(CacheInner {
                entries: LruCache::unbounded(),
                max_entries,
                ttl,
            }),
            hit_count: AtomicUsize::new(0),
            miss_count: AtomicUsize::new(0),
            eviction_count: AtomicUsize::new(0),
        }
    }

    /// Look up a non-expired entry, promoting it to most-recently-used.
    /// Returns a copy of the cached results.
    pub fn get(&self, key: &QueryCacheKey) -> Option<Vec<SearchResult>> {
        let now = Instant::now();

        {
            let inner = self.inner.read();
            if inner.entries.peek(key).is_none() {
                self.miss_count.fetch_add(1, Ordering::Relaxed);
                return None;
            }
            // Present: upgrade to the write side for the LRU touch (or the
            // expired-entry erase).
        }

        let mut inner = self.inner.write();
        let Some(entry) = inner.entries.peek(key) else {
            // Raced with an eviction between the two lock scopes.
            self.miss_count.fetch_add(1, Ordering::Relaxed);
            return None;
        };

        if inner.is_expired(entry, now) {
            inner.entries.pop(key);
            self.eviction_count.fetch_add(1, Ordering::Relaxed);
            self.miss_count.fetch_add(1, Ordering::Relaxed);
            return None;
        }

        self.hit_count.fetch_add(1, Ordering::Relaxed);
        // `get` performs the LRU promotion.
        inner.entries.get(key).map(|e| e.results.clone())
    }

    /// Insert or overwrite; either way the entry becomes most recent.
    /// Evicts from the LRU tail while over capacity.
    pub fn put(&self, key: QueryCacheKey, results: Vec<SearchResult>) {
        let mut inner = self.inner.write();
        inner.entries.push(
            key,
            CacheEntry {
                results,
                inserted_at: Instant::now(),
            },
        );
        self.evict_overflow(&mut inner);
    }

    /// Drop every entry. Counters are preserved.
    pub fn clear(&self) {
        self.inner.write().entries.clear();
    }

    /// Change the capacity, evicting the overflow immediately.
    pub fn set_max_entries(&self, max_entries: usize) {
        let mut inner = self.inner.write();
        inner.max_entries = max_entries;
        self.evict_overflow(&mut inner);
    }

    /// Change the TTL. A zero duration disables expiry.
    pub fn set_ttl(&self, ttl: Duration) {
        self.inner.write().ttl = ttl;
    }

    pub fn stats(&self) -> CacheStatistics {
        let inner = self.inner.read();
        let hit_count = self.hit_count.load(Ordering::Relaxed);
        let miss_count = self.miss_count.load(Ordering::Relaxed);
        let total = hit_count + miss_count;
        CacheStatistics {
            hit_count,
            miss_count,
            eviction_count: self.eviction_count.load(Ordering::Relaxed),
            current_size: inner.entries.len(),
            max_size: inner.max_entries,
            hit_rate: if total > 0 {
                hit_count as f64 / total as f64
            } else {
                0.0
            },
        }
    }

    fn evict_overflow(&self, inner: &mut CacheInner) {
        while inner.entries.len() > inner.max_entries {
            if inner.entries.pop_lru().is_none() {
                break;
            }
            self.eviction_count.fetch_add(1, Ordering::Relaxed);
        }
    }
}
