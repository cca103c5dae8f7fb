//! Connection validation and classification.
//!
//! `classify` is the single gate every proposed connection passes through.
//! It either rejects the gesture (a value, never a panic — rejection is an
//! expected outcome surfaced to the user) or produces a [`ConnectionPlan`]:
//! the ordered list of mutations that realize the connection, including
//! demotion side effects and compensating hidden edges.
//!
//! The function is pure with respect to the model: it reads, never writes.
//! The owning session applies the plan step by step so that other clients
//! observe the demotion's edge conversions before the compensating hidden
//! edges appear.

use std::collections::HashMap;

use thiserror::Error;
use uuid::Uuid;

use crate::model::{
    Connector, Edge, EdgeKind, GraphModel, ModelError, NodeAttributes, NodeKind,
};

/// Why a proposed connection was refused. No state changes on rejection.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConnectionRejection {
    #[error("node {0} does not exist")]
    UnknownNode(Uuid),
    #[error("a node cannot be connected to itself")]
    SelfConnection,
    #[error("connector {connector} does not exist on node {node}")]
    ConnectorMismatch { node: Uuid, connector: Connector },
    #[error("connector {connector} is disabled on node {node}")]
    ConnectorDisabled { node: Uuid, connector: Connector },
    #[error("a family cannot be connected directly to another family")]
    FamilyToFamily,
    #[error("descent between two people must route through a family")]
    DirectPersonDescent,
}

/// One mutation in a connection plan, in application order.
#[derive(Debug, Clone, PartialEq)]
pub enum PlanStep {
    /// Reclassify an existing edge (demotion converts bloodline to fake).
    ConvertEdge { edge: Uuid, kind: EdgeKind },
    /// Turn a person into a partner-only node. One-way.
    DemoteToPartner { node: Uuid },
    /// Delete an edge (hidden-edge replacement).
    RemoveEdge { edge: Uuid },
    /// Insert a new edge (the gesture's edge, or a compensating hidden one).
    CreateEdge { edge: Edge },
}

/// Undo information captured while applying a [`PlanStep`], so a step whose
/// persistence fails can be rolled back locally.
#[derive(Debug, Clone)]
pub enum StepUndo {
    RevertEdgeKind { edge: Uuid, kind: EdgeKind },
    RestoreBloodline { node: Uuid },
    RestoreEdge { edge: Edge },
    DeleteEdge { edge: Uuid },
}

impl PlanStep {
    /// Apply this step to the local model, returning the matching undo.
    pub fn apply(&self, model: &mut GraphModel) -> Result<StepUndo, ModelError> {
        match self {
            Self::ConvertEdge { edge, kind } => {
                let previous = model
                    .edge(*edge)
                    .ok_or(ModelError::UnknownEdge(*edge))?
                    .kind;
                model.set_edge_kind(*edge, *kind)?;
                Ok(StepUndo::RevertEdgeKind {
                    edge: *edge,
                    kind: previous,
                })
            }
            Self::DemoteToPartner { node } => {
                model.demote_to_partner(*node)?;
                Ok(StepUndo::RestoreBloodline { node: *node })
            }
            Self::RemoveEdge { edge } => {
                let removed = model.remove_edge(*edge)?;
                Ok(StepUndo::RestoreEdge { edge: removed })
            }
            Self::CreateEdge { edge } => {
                model.insert_edge(edge.clone())?;
                Ok(StepUndo::DeleteEdge { edge: edge.id })
            }
        }
    }
}

impl StepUndo {
    /// Revert the step this undo was captured from.
    pub fn revert(self, model: &mut GraphModel) -> Result<(), ModelError> {
        match self {
            Self::RevertEdgeKind { edge, kind } => model.set_edge_kind(edge, kind),
            Self::RestoreBloodline { node } => {
                if let Some(n) = model.node(node) {
                    if let NodeAttributes::Person(p) = &n.attributes {
                        let mut restored = p.clone();
                        restored.on_bloodline = true;
                        return model.set_attributes(node, NodeAttributes::Person(restored));
                    }
                }
                Err(ModelError::UnknownNode(node))
            }
            Self::RestoreEdge { edge } => model.insert_edge(edge),
            Self::DeleteEdge { edge } => model.remove_edge(edge).map(|_| ()),
        }
    }
}

/// The validated outcome of a connection gesture.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionPlan {
    /// Classification of the gesture's own edge.
    pub kind: EdgeKind,
    /// Id of the gesture's edge within the steps.
    pub edge_id: Uuid,
    /// Mutations in the order they must be applied and broadcast.
    pub steps: Vec<PlanStep>,
}

impl ConnectionPlan {
    /// Apply every step to the local model. Used by headless consumers;
    /// the editor session interleaves persistence per step instead.
    pub fn apply(&self, model: &mut GraphModel) -> Result<(), ModelError> {
        for step in &self.steps {
            step.apply(model)?;
        }
        Ok(())
    }
}

/// Validate a proposed connection and derive its plan.
pub fn classify(
    model: &GraphModel,
    source: Uuid,
    target: Uuid,
    source_connector: Connector,
    target_connector: Connector,
) -> Result<ConnectionPlan, ConnectionRejection> {
    if source == target {
        return Err(ConnectionRejection::SelfConnection);
    }
    let source_node = model
        .node(source)
        .ok_or(ConnectionRejection::UnknownNode(source))?;
    let target_node = model
        .node(target)
        .ok_or(ConnectionRejection::UnknownNode(target))?;

    for (node, connector) in [(source_node, source_connector), (target_node, target_connector)] {
        if !connector.belongs_to(node.kind()) {
            return Err(ConnectionRejection::ConnectorMismatch {
                node: node.id,
                connector,
            });
        }
        if let Some(person) = node.as_person() {
            if person.disabled_connectors.contains(&connector) {
                return Err(ConnectionRejection::ConnectorDisabled {
                    node: node.id,
                    connector,
                });
            }
        }
    }

    if source_node.kind() == NodeKind::Family && target_node.kind() == NodeKind::Family {
        return Err(ConnectionRejection::FamilyToFamily);
    }
    if source_node.kind() == NodeKind::Person
        && target_node.kind() == NodeKind::Person
        && source_connector.is_person_descent()
        && target_connector.is_person_descent()
    {
        return Err(ConnectionRejection::DirectPersonDescent);
    }

    let partnership = source_connector.is_partner() || target_connector.is_partner();
    let mut steps = Vec::new();

    // Demotion side effect: partnering two on-bloodline people forces the
    // target off the bloodline. Its bloodline edges become fake, and the
    // remaining partner takes over each affected family with a hidden edge.
    let mut compensations: Vec<Edge> = Vec::new();
    if partnership
        && source_node.kind() == NodeKind::Person
        && target_node.kind() == NodeKind::Person
        && source_node.on_bloodline()
        && target_node.on_bloodline()
    {
        let mut converted: Vec<Uuid> = Vec::new();
        let mut affected: Vec<&Edge> = Vec::new();
        for edge in model.edges_of(target) {
            let other = match edge.other_endpoint(target) {
                Some(o) => o,
                None => continue,
            };
            let other_is_family = model
                .node(other)
                .map(|n| n.kind() == NodeKind::Family)
                .unwrap_or(false);
            if edge.kind == EdgeKind::Bloodline && other_is_family {
                steps.push(PlanStep::ConvertEdge {
                    edge: edge.id,
                    kind: EdgeKind::FakeBloodline,
                });
                converted.push(edge.id);
                affected.push(edge);
            }
        }
        steps.push(PlanStep::DemoteToPartner { node: target });

        // Per-family child connector slots allocated during this plan.
        let mut allocated: HashMap<Uuid, u32> = HashMap::new();
        for edge in affected {
            let family = match edge.other_endpoint(target) {
                Some(f) => f,
                None => continue,
            };
            let family_connector = match edge.connector_on(family) {
                Some(c) => c,
                None => continue,
            };
            let side = match family_connector.family_side() {
                Some(s) => s,
                None => continue,
            };
            // Skip when another effective edge still reaches that side after
            // the conversions: the bloodline path is already intact.
            let occupied = model
                .effective_edges_into(family, side)
                .iter()
                .any(|e| !converted.contains(&e.id));
            let already_planned = compensations
                .iter()
                .any(|e| e.touches(family) && e.connector_on(family).and_then(|c| c.family_side()) == Some(side));
            if occupied || already_planned {
                continue;
            }

            let family_slot = match family_connector {
                Connector::FamilyChild(_) => {
                    let base = match model.next_child_connector(family) {
                        Connector::FamilyChild(n) => n,
                        _ => 0,
                    };
                    let slot = allocated.entry(family).or_insert(base);
                    let connector = Connector::FamilyChild(*slot);
                    *slot += 1;
                    connector
                }
                other => other,
            };
            let person_connector = edge.connector_on(target).unwrap_or(Connector::Child);
            let hidden = if edge.source == target {
                Edge::new(
                    source,
                    family,
                    person_connector,
                    family_slot,
                    EdgeKind::HiddenBloodline,
                )
            } else {
                Edge::new(
                    family,
                    source,
                    family_slot,
                    person_connector,
                    EdgeKind::HiddenBloodline,
                )
            };
            compensations.push(hidden);
        }
    }

    // Hidden-edge replacement: drawing exactly over an existing hidden edge
    // promotes it back to a visible, freshly classified edge.
    let replaced =
        model.find_hidden_edge(source, target, source_connector, target_connector);
    if let Some(hidden) = replaced {
        steps.push(PlanStep::RemoveEdge { edge: hidden.id });
    }

    let mut kind = if partnership {
        EdgeKind::Partnership
    } else {
        // After the rejections above, the only remaining shape is a descent
        // pair between a person and a family node.
        let person = if source_node.kind() == NodeKind::Person {
            source_node
        } else {
            target_node
        };
        if person.on_bloodline() {
            EdgeKind::Bloodline
        } else {
            EdgeKind::FakeBloodline
        }
    };

    // Duplicate suppression: a second effective edge from the same couple
    // group into one family side is created hidden instead.
    if kind == EdgeKind::Bloodline {
        let (person, family, family_connector) = if source_node.kind() == NodeKind::Person {
            (source, target, target_connector)
        } else {
            (target, source, source_connector)
        };
        if let Some(side) = family_connector.family_side() {
            let group = model.couple_group(person);
            let replaced_id = replaced.map(|e| e.id);
            let duplicate = model.effective_edges_into(family, side).iter().any(|e| {
                Some(e.id) != replaced_id
                    && e.other_endpoint(family)
                        .map(|p| group.contains(&p))
                        .unwrap_or(false)
            });
            if duplicate {
                kind = EdgeKind::HiddenBloodline;
            }
        }
    }

    let edge = Edge::new(source, target, source_connector, target_connector, kind);
    let edge_id = edge.id;
    steps.push(PlanStep::CreateEdge { edge });

    // Compensating hidden edges come last: every client must see the
    // conversions before a second bloodline path could transiently exist.
    for hidden in compensations {
        steps.push(PlanStep::CreateEdge { edge: hidden });
    }

    Ok(ConnectionPlan {
        kind,
        edge_id,
        steps,
    })
}

// ============================================================================
// Tests
// ============================================================================
