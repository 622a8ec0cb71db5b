//! Watch Index: a bidirectional, concurrent multimap between cache keys and
//! the watch keys whose release events must invalidate them.
//!
//! Maintains both projections (`forward`/`reverse`) explicitly rather than
//! deriving the reverse from entry metadata, so `register` and
//! `remove_cache_key` update both sides in lockstep.

use dashmap::DashMap;
use std::collections::HashSet;

/// Bidirectional `watch key <-> cache key` relation.
///
/// `forward[w]` holds every cache key registered under watch key `w`;
/// `reverse[k]` holds every watch key a cache key `k` was registered with.
/// The two are kept in lockstep so that, at any quiescent moment,
/// `k in forward[w] <=> w in reverse[k]`.
#[derive(Default)]
pub struct WatchIndex {
    forward: DashMap<String, HashSet<String>>,
    reverse: DashMap<String, HashSet<String>>,
}

impl WatchIndex {
    pub fn new() -> Self {
        Self {
            forward: DashMap::new(),
            reverse: DashMap::new(),
        }
    }

    /// Registers `cache_key` under every watch key in `watch_keys`.
    pub fn register(&self, cache_key: &str, watch_keys: &HashSet<String>) {
        if watch_keys.is_empty() {
            return;
        }
        for w in watch_keys {
            self.forward
                .entry(w.clone())
                .or_default()
                .insert(cache_key.to_string());
        }
        self.reverse
            .entry(cache_key.to_string())
            .or_default()
            .extend(watch_keys.iter().cloned());
    }

    /// Returns an owned snapshot of the cache keys registered under
    /// `watch_key`, safe to iterate while concurrent mutators run.
    pub fn lookup_cache_keys(&self, watch_key: &str) -> Vec<String> {
        self.forward
            .get(watch_key)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Removes `cache_key` from every watch key's forward set, then drops
    /// its reverse entry. This is the callback wired to the Cache Engine's
    /// eviction listener.
    pub fn remove_cache_key(&self, cache_key: &str) {
        if let Some((_, watch_keys)) = self.reverse.remove(cache_key) {
            for w in watch_keys {
                if let Some(mut set) = self.forward.get_mut(&w) {
                    set.remove(cache_key);
                    if set.is_empty() {
                        drop(set);
                        self.forward.remove(&w);
                    }
                }
            }
        }
    }

    /// Number of distinct cache keys currently tracked (test/diagnostic use).
    pub fn reverse_len(&self) -> usize {
        self.reverse.len()
    }
}
