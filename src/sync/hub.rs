//! Broadcast hub distributing sync events to connected channels.

use tokio::sync::broadcast;
use tracing::debug;

use super::events::SyncEvent;

/// Default broadcast channel capacity.
const DEFAULT_CAPACITY: usize = 1024;

/// Fan-out point for [`SyncEvent`]s, backed by `tokio::sync::broadcast`.
///
/// Fire-and-forget: publishing never blocks, never panics. With no
/// subscribers connected, events are silently dropped.
#[derive(Debug, Clone)]
pub struct SyncHub {
    sender: broadcast::Sender<SyncEvent>,
}

impl SyncHub {
    /// Create a hub with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.sender.subscribe()
    }

    /// Number of connected subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Broadcast an event to every subscriber.
    pub fn publish(&self, event: SyncEvent) {
        let name = event.name();
        match self.sender.send(event) {
            Ok(n) => {
                debug!(event = name, subscribers = n, "sync event published");
            }
            Err(_) => {
                // No subscribers — expected when editing alone.
            }
        }
    }
}

impl Default for SyncHub {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
