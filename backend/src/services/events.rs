//! In-process change feed
//!
//! Services publish a [`LedgerEvent`] after each successful write. HTTP
//! subscribers receive them over server-sent events. The feed is
//! best-effort: a slow subscriber that falls more than `capacity` events
//! behind skips ahead and is told how many it missed.

use shared::LedgerEvent;
use tokio::sync::broadcast;

const DEFAULT_CAPACITY: usize = 256;

#[derive(Clone)]
pub struct ChangeFeed {
    sender: broadcast::Sender<LedgerEvent>,
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn publish(&self, event: LedgerEvent) {
        let kind = event.kind();
        // No receivers is the normal case when nobody is watching
        match self.sender.send(event) {
            Ok(receivers) => tracing::trace!(kind, receivers, "Change published"),
            Err(_) => tracing::trace!(kind, "Change dropped, no subscribers"),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LedgerEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
