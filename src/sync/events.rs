//! Typed sync events for real-time collaboration.
//!
//! Payloads mirror the REST record shapes so remote clients apply exactly
//! what the store accepted. `node:position` is the lightweight exception:
//! it carries only the moved node, its position and the originating
//! client, and is the one event type filtered by origin identity.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::gateway::{EdgeRecord, NodeRecord};
use crate::model::Position;

/// A graph mutation broadcast between clients.
///
/// Must be `Clone` for `tokio::sync::broadcast`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload")]
pub enum SyncEvent {
    #[serde(rename = "node:created")]
    NodeCreated(NodeRecord),
    #[serde(rename = "node:updated")]
    NodeUpdated(NodeRecord),
    #[serde(rename = "node:deleted")]
    NodeDeleted { id: Uuid },
    #[serde(rename = "node:position", rename_all = "camelCase")]
    NodePosition {
        node_id: Uuid,
        position: Position,
        origin_client_id: Uuid,
    },
    #[serde(rename = "edge:created")]
    EdgeCreated(EdgeRecord),
    #[serde(rename = "edge:deleted")]
    EdgeDeleted { id: Uuid },
}

impl SyncEvent {
    /// The wire name of this event.
    pub fn name(&self) -> &'static str {
        match self {
            Self::NodeCreated(_) => "node:created",
            Self::NodeUpdated(_) => "node:updated",
            Self::NodeDeleted { .. } => "node:deleted",
            Self::NodePosition { .. } => "node:position",
            Self::EdgeCreated(_) => "edge:created",
            Self::EdgeDeleted { .. } => "edge:deleted",
        }
    }
}
