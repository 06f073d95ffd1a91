//! Opt-in, TTL-bound result cache with FIFO eviction (§4.6).

use crate::value::Row;
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

struct CachedEntry {
    rows: Vec<Row>,
    inserted_at: Instant,
    ttl: Duration,
}

impl CachedEntry {
    fn is_expired(&self) -> bool {
        self.inserted_at.elapsed() >= self.ttl
    }
}

/// The pool's per-instance result cache. Shared by every caller that opts in
/// via `(use_cache, cache_key, ttl_ms)`.
#[derive(Default)]
pub struct ResultCache {
    entries: HashMap<String, CachedEntry>,
    insertion_order: VecDeque<String>,
    max_entries: usize,
    hits: u64,
    misses: u64,
}

impl ResultCache {
    #[must_use]
    pub fn new(max_entries: usize) -> Self {
        Self { max_entries, ..Self::default() }
    }

    /// Look up `key`; returns `None` on a miss or expiry (counts toward the
    /// cache-hit-rate statistic either way).
    pub fn get(&mut self, key: &str) -> Option<Vec<Row>> {
        if let Some(entry) = self.entries.get(key) {
            if !entry.is_expired() {
                self.hits += 1;
                return Some(entry.rows.clone());
            }
            self.entries.remove(key);
        }
        self.misses += 1;
        None
    }

    /// Insert `rows` under `key`, evicting the oldest entry (FIFO) if the
    /// cache is at capacity.
    pub fn insert(&mut self, key: String, rows: Vec<Row>, ttl: Duration) {
        if self.max_entries == 0 {
            return;
        }
        if !self.entries.contains_key(&key) && self.entries.len() >= self.max_entries {
            if let Some(oldest) = self.insertion_order.pop_front() {
                self.entries.remove(&oldest);
                tracing::debug!(key = %oldest, "result cache evicted oldest entry at capacity");
            }
        }
        if !self.entries.contains_key(&key) {
            self.insertion_order.push_back(key.clone());
        }
        self.entries.insert(key, CachedEntry { rows, inserted_at: Instant::now(), ttl });
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.insertion_order.clear();
    }

    /// Drop every entry whose TTL has elapsed (reaper-driven cache expiry, §4.6).
    pub fn purge_expired(&mut self) {
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired())
            .map(|(key, _)| key.clone())
            .collect();
        for key in expired {
            self.entries.remove(&key);
            self.insertion_order.retain(|k| k != &key);
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Fraction of lookups that were hits, in `[0.0, 1.0]`; `0.0` when there
    /// have been no lookups at all.
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            f64::from(u32::try_from(self.hits.min(u64::from(u32::MAX))).unwrap_or(u32::MAX))
                / f64::from(u32::try_from(total.min(u64::from(u32::MAX))).unwrap_or(u32::MAX))
        }
    }
}
