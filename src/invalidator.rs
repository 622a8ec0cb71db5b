//! Invalidator: consumes release-change messages and invalidates the
//! affected cache entries via the Watch Index.
//!
//! A spawned task owns the broadcast receiver and reacts per delivered
//! message, rather than the caller polling for events.

use crate::cache::CacheEngine;
use crate::message_bus::MessageBus;
use crate::watch_index::WatchIndex;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;

/// Drives invalidation from a single release topic.
pub struct Invalidator {
    cache: CacheEngine,
    watch_index: Arc<WatchIndex>,
    release_topic: String,
}

impl Invalidator {
    pub fn new(cache: CacheEngine, watch_index: Arc<WatchIndex>, release_topic: String) -> Self {
        Self {
            cache,
            watch_index,
            release_topic,
        }
    }

    /// Processes a single message, ignoring anything outside the release
    /// topic or carrying empty content.
    pub async fn handle_message(&self, channel: &str, content: &str) {
        if channel != self.release_topic || content.is_empty() {
            return;
        }

        let affected = self.watch_index.lookup_cache_keys(content);
        if affected.is_empty() {
            return;
        }
        for cache_key in affected {
            self.cache.invalidate(&cache_key).await;
        }
    }

    /// Runs the receive loop until the bus is closed. Intended to be
    /// `tokio::spawn`ed once at startup. Lagged deliveries are logged and
    /// skipped rather than treated as fatal — the bus's at-least-once
    /// contract tolerates missed batches because TTL bounds staleness.
    pub async fn run(self, bus: Arc<dyn MessageBus>) {
        let mut rx = bus.subscribe();
        loop {
            match rx.recv().await {
                Ok(msg) => self.handle_message(&msg.channel, &msg.content).await,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "invalidator lagged behind the release message bus");
                }
                Err(RecvError::Closed) => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn invalidation_removes_entry_with_matching_watch_key() {
        let watch_index = Arc::new(WatchIndex::new());
        let cache = CacheEngine::new(1024, Duration::from_secs(1800), watch_index.clone());

        watch_index.register("k1", &["app1+default+ns1".to_string()].into_iter().collect());
        cache.put("k1".to_string(), "payload".to_string()).await;

        let invalidator = Invalidator::new(cache.clone(), watch_index, "config-release".into());
        invalidator
            .handle_message("config-release", "app1+default+ns1")
            .await;
        cache.run_pending_tasks().await;

        assert_eq!(cache.get_if_present("k1").await, None);
    }

    #[tokio::test]
    async fn messages_on_other_channels_are_ignored() {
        let watch_index = Arc::new(WatchIndex::new());
        let cache = CacheEngine::new(1024, Duration::from_secs(1800), watch_index.clone());
        watch_index.register("k1", &["w1".to_string()].into_iter().collect());
        cache.put("k1".to_string(), "payload".to_string()).await;

        let invalidator = Invalidator::new(cache.clone(), watch_index, "config-release".into());
        invalidator.handle_message("unrelated-topic", "w1").await;

        assert_eq!(cache.get_if_present("k1").await, Some("payload".to_string()));
    }

    #[tokio::test]
    async fn unknown_watch_key_is_a_no_op() {
        let watch_index = Arc::new(WatchIndex::new());
        let cache = CacheEngine::new(1024, Duration::from_secs(1800), watch_index.clone());

        let invalidator = Invalidator::new(cache, watch_index, "config-release".into());
        invalidator.handle_message("config-release", "no-such-watch-key").await;
    }
}
