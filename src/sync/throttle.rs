//! Drag position throttle.
//!
//! During a drag gesture the moving position is broadcast to observers at
//! a bounded rate, without touching the durable store. Coalesces rapid
//! updates with an mpsc channel + timeout loop: within each window only
//! the last value wins. The durable write happens once, on gesture end,
//! outside this type.

use std::time::Duration;

use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

use crate::model::Position;

use super::events::SyncEvent;
use super::hub::SyncHub;

/// Throttled broadcaster for live drag positions.
///
/// Non-blocking and thread-safe; drop it to stop the background task.
pub struct PositionThrottle {
    tx: mpsc::Sender<(Uuid, Position)>,
}

impl PositionThrottle {
    /// Create a throttle publishing at most one position event per
    /// `window_ms` per burst, stamped with `client_id` as origin.
    ///
    /// Spawns a background tokio task that lives until the throttle is
    /// dropped.
    pub fn new(hub: SyncHub, client_id: Uuid, window_ms: u64) -> Self {
        let (tx, rx) = mpsc::channel(64);
        tokio::spawn(Self::run_loop(hub, client_id, rx, window_ms));
        Self { tx }
    }

    /// Record a drag position. Non-blocking; if the channel is full the
    /// sample is dropped (a newer one is coming).
    pub fn push(&self, node: Uuid, position: Position) {
        let _ = self.tx.try_send((node, position));
    }

    /// Background loop: open a window on the first sample, keep swallowing
    /// newer samples until it closes, then broadcast the latest.
    async fn run_loop(
        hub: SyncHub,
        client_id: Uuid,
        mut rx: mpsc::Receiver<(Uuid, Position)>,
        window_ms: u64,
    ) {
        let window = Duration::from_millis(window_ms);

        while let Some(first) = rx.recv().await {
            let mut latest = first;
            let deadline = tokio::time::Instant::now() + window;
            loop {
                let now = tokio::time::Instant::now();
                if now >= deadline {
                    break;
                }
                match tokio::time::timeout(deadline - now, rx.recv()).await {
                    Ok(Some(sample)) => latest = sample,
                    Ok(None) => {
                        // Throttle dropped mid-window: flush and stop.
                        Self::broadcast(&hub, client_id, latest);
                        return;
                    }
                    Err(_) => break, // window elapsed
                }
            }
            Self::broadcast(&hub, client_id, latest);
        }
        debug!(%client_id, "position throttle stopped");
    }

    fn broadcast(hub: &SyncHub, client_id: Uuid, (node_id, position): (Uuid, Position)) {
        hub.publish(SyncEvent::NodePosition {
            node_id,
            position,
            origin_client_id: client_id,
        });
    }
}
