//! Cache Engine: a weight-bounded, write-TTL cache of rendered configuration
//! payloads, with eviction wired back into the Watch Index.
//!
//! Built on `moka::future::Cache`, with a character-length weigher and an
//! eviction listener instead of a flat entry-count capacity.

use crate::watch_index::WatchIndex;
use moka::future::Cache as MokaCache;
use moka::notification::RemovalCause;
use std::sync::Arc;
use std::time::Duration;

/// Weight-bounded, write-TTL store of `cache key -> rendered payload`.
#[derive(Clone)]
pub struct CacheEngine {
    inner: MokaCache<String, String>,
}

impl CacheEngine {
    /// Builds a cache capped at `max_weight` total UTF-8 characters across
    /// live entries, expiring entries `write_ttl` after insertion. Every
    /// removal, regardless of cause, triggers `watch_index.remove_cache_key`
    /// so the Watch Index never retains an edge to a dead entry.
    pub fn new(max_weight: u64, write_ttl: Duration, watch_index: Arc<WatchIndex>) -> Self {
        let inner = MokaCache::builder()
            .max_capacity(max_weight)
            .weigher(|_key: &String, value: &String| -> u32 {
                value.chars().count().try_into().unwrap_or(u32::MAX)
            })
            .time_to_live(write_ttl)
            .eviction_listener(move |key: Arc<String>, _value, _cause: RemovalCause| {
                watch_index.remove_cache_key(&key);
            })
            .build();

        Self { inner }
    }

    /// Non-blocking lookup; does not refresh TTL.
    pub async fn get_if_present(&self, key: &str) -> Option<String> {
        self.inner.get(key).await
    }

    /// Inserts or replaces `key`. May trigger synchronous evictions on
    /// overflow, each invoking the eviction listener.
    pub async fn put(&self, key: String, value: String) {
        self.inner.insert(key, value).await;
    }

    /// Removes `key` if present, invoking the eviction listener.
    pub async fn invalidate(&self, key: &str) {
        self.inner.invalidate(key).await;
    }

    /// Forces pending maintenance tasks (eviction listener dispatch) to run;
    /// `moka` normally does this lazily, so tests that assert on eviction
    /// side effects call this after a mutation.
    pub async fn run_pending_tasks(&self) {
        self.inner.run_pending_tasks().await;
    }

    /// Current approximate weighted size, for diagnostics and tests.
    pub fn weighted_size(&self) -> u64 {
        self.inner.weighted_size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let idx = Arc::new(WatchIndex::new());
        let cache = CacheEngine::new(1024, Duration::from_secs(60), idx);

        cache.put("k1".into(), "v1".into()).await;
        assert_eq!(cache.get_if_present("k1").await, Some("v1".to_string()));
    }

    #[tokio::test]
    async fn invalidate_removes_entry_and_watch_index_edges() {
        let idx = Arc::new(WatchIndex::new());
        idx.register("k1", &["w1".to_string()].into_iter().collect());
        let cache = CacheEngine::new(1024, Duration::from_secs(60), idx.clone());

        cache.put("k1".into(), "v1".into()).await;
        cache.invalidate("k1").await;
        cache.run_pending_tasks().await;

        assert_eq!(cache.get_if_present("k1").await, None);
        assert!(idx.lookup_cache_keys("w1").is_empty());
    }

    #[tokio::test]
    async fn weight_bound_forces_eviction() {
        let idx = Arc::new(WatchIndex::new());
        for i in 0..5 {
            idx.register(&format!("k{i}"), &[format!("w{i}")].into_iter().collect());
        }
        let cache = CacheEngine::new(100, Duration::from_secs(300), idx.clone());

        for i in 0..5 {
            cache
                .put(format!("k{i}"), "x".repeat(30))
                .await;
        }
        cache.run_pending_tasks().await;

        assert!(cache.weighted_size() <= 100);
        // At least two entries must have been evicted, each cleaning up its
        // Watch Index edge.
        let evicted = (0..5)
            .filter(|i| idx.lookup_cache_keys(&format!("w{i}")).is_empty())
            .count();
        assert!(evicted >= 2);
    }
}
