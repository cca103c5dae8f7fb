//! Layered layout contract types.
//!
//! The layout engine talks to its solver through a small serialized graph
//! shape: sized children with optional boundary ports, and directed edges
//! whose endpoints are child or port ids. The solver returns the same
//! shape with `x`/`y` filled in on every child.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::Position;

/// Errors raised by a layout run. The run aborts and prior node positions
/// stay untouched; nothing here is fatal to the session.
#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("nothing to lay out")]
    EmptyGraph,
    #[error("layout solver failed: {0}")]
    Solver(String),
    #[error("solver output is missing child {0}")]
    MissingChild(String),
    #[error("graph changed while layout was computing")]
    Stale,
}

/// Which boundary of a child a port sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortSide {
    Top,
    Bottom,
}

/// A dedicated attachment point on a child's boundary, routing one
/// specific inter-cluster edge.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutPort {
    pub id: String,
    pub side: PortSide,
    /// Offset of the port along the child's boundary, child-local units.
    pub anchor_point: Position,
}

/// A sized layout node (one per cluster).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutChild {
    pub id: String,
    pub width: f64,
    pub height: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<LayoutPort>,
    /// Horizontal band this child must land in; bands are stacked
    /// top-to-bottom in ascending order. Used to pin generations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partition: Option<usize>,
    /// Soft placement priority; higher values move less during refinement.
    #[serde(default)]
    pub priority: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
}

/// A directed connection between children, endpoints given as child or
/// port ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutEdge {
    pub id: String,
    pub sources: Vec<String>,
    pub targets: Vec<String>,
}

/// The graph handed to (and returned by) the layered solver.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutGraph {
    pub root_id: String,
    pub children: Vec<LayoutChild>,
    pub edges: Vec<LayoutEdge>,
}

impl LayoutGraph {
    pub fn child(&self, id: &str) -> Option<&LayoutChild> {
        self.children.iter().find(|c| c.id == id)
    }
}
