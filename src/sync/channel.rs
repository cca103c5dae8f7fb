//! Per-client sync channel.
//!
//! A `SyncChannel` is one client's connection to the collaboration hub:
//! it publishes that client's mutations and receives everyone else's.
//! Channels are explicit injected objects with a connect/disconnect
//! lifecycle; nothing here is a process-wide singleton.
//!
//! Echo handling: position events carry the originating client id and are
//! filtered out here; create/delete echoes are left to the session's
//! idempotent id-existence checks.

use tokio::sync::broadcast;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::model::Position;

use super::events::SyncEvent;
use super::hub::SyncHub;

/// One client's connection to the sync hub.
pub struct SyncChannel {
    client_id: Uuid,
    hub: SyncHub,
    receiver: broadcast::Receiver<SyncEvent>,
}

impl SyncChannel {
    /// Connect a new client to the hub with a fresh identity.
    pub fn connect(hub: &SyncHub) -> Self {
        Self::with_client_id(hub, Uuid::new_v4())
    }

    /// Connect with a caller-chosen client id.
    pub fn with_client_id(hub: &SyncHub, client_id: Uuid) -> Self {
        debug!(%client_id, "sync channel connected");
        Self {
            client_id,
            hub: hub.clone(),
            receiver: hub.subscribe(),
        }
    }

    pub fn client_id(&self) -> Uuid {
        self.client_id
    }

    /// Broadcast a mutation to every connected client.
    pub fn publish(&self, event: SyncEvent) {
        self.hub.publish(event);
    }

    /// Build a position event stamped with this client's identity.
    pub fn position_event(&self, node_id: Uuid, position: Position) -> SyncEvent {
        SyncEvent::NodePosition {
            node_id,
            position,
            origin_client_id: self.client_id,
        }
    }

    /// Drain every pending event, dropping this client's own position
    /// echoes. A lagged receiver skips ahead with a warning; the durable
    /// store remains the arbiter for anything missed.
    pub fn drain(&mut self) -> Vec<SyncEvent> {
        let mut events = Vec::new();
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if !self.is_own_position_echo(&event) {
                        events.push(event);
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => break,
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "sync channel lagged, events skipped");
                }
                Err(broadcast::error::TryRecvError::Closed) => break,
            }
        }
        events
    }

    /// Wait for the next event from another client. Returns `None` once
    /// the hub is gone.
    pub async fn recv(&mut self) -> Option<SyncEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => {
                    if !self.is_own_position_echo(&event) {
                        return Some(event);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "sync channel lagged, events skipped");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Tear down the connection.
    pub fn disconnect(self) {
        debug!(client_id = %self.client_id, "sync channel disconnected");
    }

    fn is_own_position_echo(&self, event: &SyncEvent) -> bool {
        matches!(
            event,
            SyncEvent::NodePosition {
                origin_client_id, ..
            } if *origin_client_id == self.client_id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_own_position_echo_filtered() {
        let hub = SyncHub::default();
        let mut channel = SyncChannel::connect(&hub);

        channel.publish(channel.position_event(Uuid::new_v4(), Position::new(1.0, 2.0)));
        assert!(channel.drain().is_empty(), "own position echo suppressed");
    }

    #[test]
    fn test_peer_position_received() {
        let hub = SyncHub::default();
        let mut receiver = SyncChannel::connect(&hub);
        let sender = SyncChannel::connect(&hub);

        sender.publish(sender.position_event(Uuid::new_v4(), Position::new(5.0, 6.0)));
        let events = receiver.drain();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].name(), "node:position");
    }

    #[test]
    fn test_non_position_echo_passes_through() {
        // Create/delete echoes reach the session, which drops them by id.
        let hub = SyncHub::default();
        let mut channel = SyncChannel::connect(&hub);
        channel.publish(SyncEvent::NodeDeleted { id: Uuid::new_v4() });
        assert_eq!(channel.drain().len(), 1);
    }

    #[tokio::test]
    async fn test_recv_skips_own_echo_and_yields_peer_event() {
        let hub = SyncHub::default();
        let mut receiver = SyncChannel::connect(&hub);
        let sender = SyncChannel::connect(&hub);

        receiver.publish(receiver.position_event(Uuid::new_v4(), Position::default()));
        let peer_node = Uuid::new_v4();
        sender.publish(sender.position_event(peer_node, Position::new(9.0, 9.0)));

        let event = receiver.recv().await.expect("peer event");
        match event {
            SyncEvent::NodePosition { node_id, .. } => assert_eq!(node_id, peer_node),
            other => panic!("unexpected event {:?}", other),
        }
    }
}
