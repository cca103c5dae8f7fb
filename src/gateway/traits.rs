//! PersistenceGateway trait definition.
//!
//! Abstract interface over the durable CRUD store. The REST client
//! implements it for production; an in-memory mock backs the tests.
//! Mutations are mirrored here optimistically by the session — the store
//! is the final arbiter between concurrent editors.

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use super::records::{EdgeRecord, NodeRecord};

/// Abstract interface for the durable family-tree store.
#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    /// Fetch every stored node.
    async fn fetch_nodes(&self) -> Result<Vec<NodeRecord>>;

    /// Fetch every stored edge.
    async fn fetch_edges(&self) -> Result<Vec<EdgeRecord>>;

    /// Store a new node.
    async fn create_node(&self, record: &NodeRecord) -> Result<()>;

    /// Replace a node's position and data (last write wins).
    async fn update_node(&self, record: &NodeRecord) -> Result<()>;

    /// Delete a node; the store cascades deletion of its edges.
    async fn delete_node(&self, id: Uuid) -> Result<()>;

    /// Store a new edge.
    async fn create_edge(&self, record: &EdgeRecord) -> Result<()>;

    /// Delete an edge.
    async fn delete_edge(&self, id: Uuid) -> Result<()>;
}
