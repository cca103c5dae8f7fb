//! In-memory mock implementation of PersistenceGateway for testing.
//!
//! Backs every operation with `tokio::sync::RwLock<HashMap<..>>` stores,
//! counts mutation calls, and can be switched into a failing mode to
//! exercise rollback paths.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use anyhow::{bail, Result};
use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::records::{EdgeRecord, NodeRecord};
use super::traits::PersistenceGateway;

/// In-memory mock of the durable store.
#[derive(Default)]
pub struct MockGateway {
    pub nodes: RwLock<HashMap<Uuid, NodeRecord>>,
    pub edges: RwLock<HashMap<Uuid, EdgeRecord>>,
    failing: AtomicBool,
    update_node_calls: AtomicU32,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent mutation fail.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of `update_node` calls seen so far.
    pub fn update_node_call_count(&self) -> u32 {
        self.update_node_calls.load(Ordering::SeqCst)
    }

    fn check_failing(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            bail!("injected store failure");
        }
        Ok(())
    }
}

#[async_trait]
impl PersistenceGateway for MockGateway {
    async fn fetch_nodes(&self) -> Result<Vec<NodeRecord>> {
        Ok(self.nodes.read().await.values().cloned().collect())
    }

    async fn fetch_edges(&self) -> Result<Vec<EdgeRecord>> {
        Ok(self.edges.read().await.values().cloned().collect())
    }

    async fn create_node(&self, record: &NodeRecord) -> Result<()> {
        self.check_failing()?;
        self.nodes.write().await.insert(record.id, record.clone());
        Ok(())
    }

    async fn update_node(&self, record: &NodeRecord) -> Result<()> {
        self.update_node_calls.fetch_add(1, Ordering::SeqCst);
        self.check_failing()?;
        let mut nodes = self.nodes.write().await;
        if !nodes.contains_key(&record.id) {
            bail!("node {} not found", record.id);
        }
        nodes.insert(record.id, record.clone());
        Ok(())
    }

    async fn delete_node(&self, id: Uuid) -> Result<()> {
        self.check_failing()?;
        self.nodes.write().await.remove(&id);
        // The durable store cascades edge deletion.
        self.edges
            .write()
            .await
            .retain(|_, e| e.source != id && e.target != id);
        Ok(())
    }

    async fn create_edge(&self, record: &EdgeRecord) -> Result<()> {
        self.check_failing()?;
        self.edges.write().await.insert(record.id, record.clone());
        Ok(())
    }

    async fn delete_edge(&self, id: Uuid) -> Result<()> {
        self.check_failing()?;
        self.edges.write().await.remove(&id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Node, PersonAttributes, Position};

    #[tokio::test]
    async fn test_mock_cascades_edge_deletion() {
        let gateway = MockGateway::new();
        let a = Node::person(PersonAttributes::named("Ada"), Position::default());
        let b = Node::person(PersonAttributes::named("Bo"), Position::default());
        gateway.create_node(&NodeRecord::from_node(&a)).await.unwrap();
        gateway.create_node(&NodeRecord::from_node(&b)).await.unwrap();
        let edge = crate::model::Edge::new(
            a.id,
            b.id,
            crate::model::Connector::PartnerRight,
            crate::model::Connector::PartnerLeft,
            crate::model::EdgeKind::Partnership,
        );
        gateway.create_edge(&EdgeRecord::from_edge(&edge)).await.unwrap();

        gateway.delete_node(a.id).await.unwrap();
        assert!(gateway.fetch_edges().await.unwrap().is_empty());
        assert_eq!(gateway.fetch_nodes().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_mock_failure_injection() {
        let gateway = MockGateway::new();
        gateway.set_failing(true);
        let node = Node::person(PersonAttributes::named("Ada"), Position::default());
        assert!(gateway
            .create_node(&NodeRecord::from_node(&node))
            .await
            .is_err());
        gateway.set_failing(false);
        assert!(gateway
            .create_node(&NodeRecord::from_node(&node))
            .await
            .is_ok());
    }
}
