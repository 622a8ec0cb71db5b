//! Release message bus: the external collaborator the Invalidator consumes.
//!
//! Modeled as a trait so a real deployment can swap in a networked bus;
//! [`BroadcastMessageBus`] is a default in-process implementation built on
//! `tokio::sync::broadcast` for fan-out notifications.

use async_trait::async_trait;
use tokio::sync::broadcast;

/// A single message delivered on a topic: the watch key that changed.
#[derive(Debug, Clone)]
pub struct ReleaseMessage {
    pub channel: String,
    pub content: String,
}

/// Publishes and subscribes to release-change notifications.
#[async_trait]
pub trait MessageBus: Send + Sync {
    /// Publishes a message on `channel`.
    async fn publish(&self, channel: &str, content: &str);

    /// Returns a receiver that yields every message published after this
    /// call, regardless of channel; subscribers filter by `channel`
    /// themselves.
    fn subscribe(&self) -> broadcast::Receiver<ReleaseMessage>;
}

/// In-process broadcast-channel backed message bus.
pub struct BroadcastMessageBus {
    tx: broadcast::Sender<ReleaseMessage>,
}

impl BroadcastMessageBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1024);
        Self { tx }
    }
}

impl Default for BroadcastMessageBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageBus for BroadcastMessageBus {
    async fn publish(&self, channel: &str, content: &str) {
        // No subscribers is not an error: the invalidator may not have
        // started its receive loop yet, or this topic may be unwatched.
        let _ = self.tx.send(ReleaseMessage {
            channel: channel.to_string(),
            content: content.to_string(),
        });
    }

    fn subscribe(&self) -> broadcast::Receiver<ReleaseMessage> {
        self.tx.subscribe()
    }
}
