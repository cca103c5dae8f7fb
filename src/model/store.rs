//! In-memory graph store.
//!
//! `GraphModel` is the single source of truth for the local session: an
//! arena of nodes and edges addressed by id, with adjacency answered by
//! query rather than embedded back-pointers. Mutation happens only on the
//! owning session (single-writer rule); the store itself carries no locks.

use std::collections::HashMap;

use thiserror::Error;
use uuid::Uuid;

use super::models::{
    Connector, Edge, EdgeKind, FamilySide, Node, NodeAttributes, NodeKind, Position,
};

/// Errors raised by direct store mutation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("node {0} already exists")]
    DuplicateNode(Uuid),
    #[error("node {0} does not exist")]
    UnknownNode(Uuid),
    #[error("edge {0} already exists")]
    DuplicateEdge(Uuid),
    #[error("edge {0} does not exist")]
    UnknownEdge(Uuid),
    #[error("an edge cannot connect two family nodes")]
    FamilyToFamily,
    #[error("descent between two person nodes must route through a family")]
    DirectPersonDescent,
}

/// A node removed together with its cascaded edges, for rollback.
#[derive(Debug, Clone)]
pub struct RemovedNode {
    pub node: Node,
    pub edges: Vec<Edge>,
}

/// In-memory store of the family-tree graph.
///
/// Iteration order over nodes and edges is insertion order, which keeps
/// clustering and layout deterministic across runs.
#[derive(Debug, Default)]
pub struct GraphModel {
    nodes: HashMap<Uuid, Node>,
    edges: HashMap<Uuid, Edge>,
    node_order: Vec<Uuid>,
    edge_order: Vec<Uuid>,
    generation: u64,
}

impl GraphModel {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn node(&self, id: Uuid) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn edge(&self, id: Uuid) -> Option<&Edge> {
        self.edges.get(&id)
    }

    pub fn contains_node(&self, id: Uuid) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn contains_edge(&self, id: Uuid) -> bool {
        self.edges.contains_key(&id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.node_order.iter().filter_map(|id| self.nodes.get(id))
    }

    /// Edges in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edge_order.iter().filter_map(|id| self.edges.get(id))
    }

    /// All edges incident to `node`, in insertion order.
    pub fn edges_of(&self, node: Uuid) -> Vec<&Edge> {
        self.edges().filter(|e| e.touches(node)).collect()
    }

    /// Total edge degree of a node.
    pub fn degree(&self, node: Uuid) -> usize {
        self.edges().filter(|e| e.touches(node)).count()
    }

    /// Neighboring node ids, in insertion order of their edges.
    pub fn neighbors(&self, node: Uuid) -> Vec<Uuid> {
        self.edges()
            .filter_map(|e| e.other_endpoint(node))
            .collect()
    }

    /// Partnership-connected person ids of `person`, plus the person itself.
    ///
    /// This is the "couple group" that duplicate bloodline suppression and
    /// compensation reason about.
    pub fn couple_group(&self, person: Uuid) -> Vec<Uuid> {
        let mut group = vec![person];
        for edge in self.edges() {
            if edge.kind == EdgeKind::Partnership {
                if let Some(other) = edge.other_endpoint(person) {
                    if !group.contains(&other) {
                        group.push(other);
                    }
                }
            }
        }
        group
    }

    /// The hidden edge with exactly these endpoints and connectors, if any.
    pub fn find_hidden_edge(
        &self,
        source: Uuid,
        target: Uuid,
        source_connector: Connector,
        target_connector: Connector,
    ) -> Option<&Edge> {
        self.edges().find(|e| {
            e.kind == EdgeKind::HiddenBloodline
                && e.source == source
                && e.target == target
                && e.source_connector == source_connector
                && e.target_connector == target_connector
        })
    }

    /// Effective (bloodline or hidden-bloodline) edges reaching `family`
    /// on the given side.
    pub fn effective_edges_into(&self, family: Uuid, side: FamilySide) -> Vec<&Edge> {
        self.edges()
            .filter(|e| {
                e.kind.is_effective()
                    && e.connector_on(family)
                        .and_then(|c| c.family_side())
                        .map(|s| s == side)
                        .unwrap_or(false)
            })
            .collect()
    }

    /// Next free per-child connector slot on a family node.
    pub fn next_child_connector(&self, family: Uuid) -> Connector {
        let next = self
            .edges_of(family)
            .iter()
            .filter_map(|e| match e.connector_on(family) {
                Some(Connector::FamilyChild(n)) => Some(n + 1),
                _ => None,
            })
            .max()
            .unwrap_or(0);
        Connector::FamilyChild(next)
    }

    /// Structural generation counter.
    ///
    /// Bumped by every mutation except position updates; layout runs
    /// capture it to detect and discard stale results.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    // ========================================================================
    // Mutation
    // ========================================================================

    /// Insert a node. Fails on duplicate id.
    pub fn insert_node(&mut self, node: Node) -> Result<(), ModelError> {
        if self.nodes.contains_key(&node.id) {
            return Err(ModelError::DuplicateNode(node.id));
        }
        self.node_order.push(node.id);
        self.nodes.insert(node.id, node);
        self.generation += 1;
        Ok(())
    }

    /// Replace a node's attribute payload (last-write-wins).
    pub fn set_attributes(&mut self, id: Uuid, attributes: NodeAttributes) -> Result<(), ModelError> {
        let node = self.nodes.get_mut(&id).ok_or(ModelError::UnknownNode(id))?;
        node.attributes = attributes;
        self.generation += 1;
        Ok(())
    }

    /// Mark a person as partner-only. One-way: promotion back does not
    /// happen through this store.
    pub fn demote_to_partner(&mut self, id: Uuid) -> Result<(), ModelError> {
        let node = self.nodes.get_mut(&id).ok_or(ModelError::UnknownNode(id))?;
        if let NodeAttributes::Person(p) = &mut node.attributes {
            p.on_bloodline = false;
            self.generation += 1;
        }
        Ok(())
    }

    /// Move a node. Does not bump the structural generation.
    pub fn set_position(&mut self, id: Uuid, position: Position) -> Result<(), ModelError> {
        let node = self.nodes.get_mut(&id).ok_or(ModelError::UnknownNode(id))?;
        node.position = position;
        Ok(())
    }

    /// Remove a node, cascading removal of every incident edge.
    pub fn remove_node(&mut self, id: Uuid) -> Result<RemovedNode, ModelError> {
        let node = self.nodes.remove(&id).ok_or(ModelError::UnknownNode(id))?;
        self.node_order.retain(|n| *n != id);

        let cascade: Vec<Uuid> = self
            .edges
            .values()
            .filter(|e| e.touches(id))
            .map(|e| e.id)
            .collect();
        let mut edges = Vec::with_capacity(cascade.len());
        for edge_id in cascade {
            if let Some(edge) = self.edges.remove(&edge_id) {
                edges.push(edge);
            }
        }
        self.edge_order.retain(|e| self.edges.contains_key(e));
        self.generation += 1;
        Ok(RemovedNode { node, edges })
    }

    /// Restore a previously removed node and its cascaded edges.
    pub fn restore_node(&mut self, removed: RemovedNode) -> Result<(), ModelError> {
        self.insert_node(removed.node)?;
        for edge in removed.edges {
            self.insert_edge(edge)?;
        }
        Ok(())
    }

    /// Insert an edge, enforcing the structural invariants: both endpoints
    /// exist, no family-to-family connections, and no direct person-to-person
    /// descent.
    pub fn insert_edge(&mut self, edge: Edge) -> Result<(), ModelError> {
        if self.edges.contains_key(&edge.id) {
            return Err(ModelError::DuplicateEdge(edge.id));
        }
        let source = self
            .nodes
            .get(&edge.source)
            .ok_or(ModelError::UnknownNode(edge.source))?;
        let target = self
            .nodes
            .get(&edge.target)
            .ok_or(ModelError::UnknownNode(edge.target))?;

        if source.kind() == NodeKind::Family && target.kind() == NodeKind::Family {
            return Err(ModelError::FamilyToFamily);
        }
        if source.kind() == NodeKind::Person
            && target.kind() == NodeKind::Person
            && edge.source_connector.is_person_descent()
            && edge.target_connector.is_person_descent()
        {
            return Err(ModelError::DirectPersonDescent);
        }

        self.edge_order.push(edge.id);
        self.edges.insert(edge.id, edge);
        self.generation += 1;
        Ok(())
    }

    /// Remove an edge.
    pub fn remove_edge(&mut self, id: Uuid) -> Result<Edge, ModelError> {
        let edge = self.edges.remove(&id).ok_or(ModelError::UnknownEdge(id))?;
        self.edge_order.retain(|e| *e != id);
        self.generation += 1;
        Ok(edge)
    }

    /// Reclassify an existing edge.
    pub fn set_edge_kind(&mut self, id: Uuid, kind: EdgeKind) -> Result<(), ModelError> {
        let edge = self.edges.get_mut(&id).ok_or(ModelError::UnknownEdge(id))?;
        edge.kind = kind;
        self.generation += 1;
        Ok(())
    }

    /// Drop all content, keeping the generation counter moving forward.
    /// Used when reloading authoritative state from the durable store.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.edges.clear();
        self.node_order.clear();
        self.edge_order.clear();
        self.generation += 1;
    }
}

// ============================================================================
// Tests
// ============================================================================
