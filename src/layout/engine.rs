//! Layout engine — orchestrates the full arrangement pipeline.
//!
//! 1. **Cluster**: group the model into generation clusters
//! 2. **Port**: allocate a boundary port per inter-cluster bloodline edge
//! 3. **Solve**: hand the sized cluster graph to the layered solver
//! 4. **Map**: convert cluster origins back to absolute node positions
//! 5. **Stragglers**: place nodes no cluster captured
//!
//! A run is always explicit and full-graph. It reads the model and returns
//! positions; it never writes, so a failed run leaves every prior position
//! untouched. The result carries the structural generation it was computed
//! from, letting the session discard a run that raced a mutation.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::cluster::{build_clusters, Cluster, FAMILY_DROP, NODE_HEIGHT, NODE_WIDTH};
use crate::model::{GraphModel, NodeKind, Position};

use super::models::{LayoutChild, LayoutEdge, LayoutError, LayoutGraph, LayoutPort, PortSide};
use super::solver::{LayeredSolver, SolverConfig, SweepSolver};

/// Tuning parameters for the layout pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Padding between a cluster's content and its layout box.
    pub cluster_padding: f64,
    /// Lateral gap between ports sharing a family node.
    pub port_spacing: f64,
    /// Width of the overflow area before wrapping to the next row.
    pub overflow_row_width: f64,
    /// Gap between overflow-placed nodes.
    pub overflow_spacing: f64,
    pub solver: SolverConfig,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            cluster_padding: 24.0,
            port_spacing: 18.0,
            overflow_row_width: 900.0,
            overflow_spacing: 40.0,
            solver: SolverConfig::default(),
        }
    }
}

/// Positions produced by a layout run.
#[derive(Debug, Clone)]
pub struct LayoutResult {
    /// Absolute position for every node in the model.
    pub positions: HashMap<Uuid, Position>,
    /// The structural generation the run was computed from.
    pub generation: u64,
    pub cluster_count: usize,
}

/// Full-graph layout orchestrator.
pub struct LayoutEngine {
    solver: Arc<dyn LayeredSolver>,
    config: LayoutConfig,
}

impl LayoutEngine {
    pub fn new(config: LayoutConfig) -> Self {
        let solver = Arc::new(SweepSolver::new(config.solver.clone()));
        Self { solver, config }
    }

    /// Swap in a different layered solver.
    pub fn with_solver(solver: Arc<dyn LayeredSolver>, config: LayoutConfig) -> Self {
        Self { solver, config }
    }

    /// Compute absolute positions for every node in the model.
    pub fn compute(&self, model: &GraphModel) -> Result<LayoutResult, LayoutError> {
        if model.node_count() == 0 {
            return Err(LayoutError::EmptyGraph);
        }
        let generation = model.generation();
        let clusters = build_clusters(model);
        let mut positions: HashMap<Uuid, Position> = HashMap::new();

        if !clusters.is_empty() {
            let solved = self.solve_clusters(model, &clusters)?;
            for cluster in &clusters {
                let child = solved
                    .child(&cluster.root.to_string())
                    .ok_or_else(|| LayoutError::MissingChild(cluster.root.to_string()))?;
                let (origin_x, origin_y) = match (child.x, child.y) {
                    (Some(x), Some(y)) => (x, y),
                    _ => return Err(LayoutError::MissingChild(cluster.root.to_string())),
                };
                for (node, rel) in &cluster.relative {
                    positions.insert(
                        *node,
                        Position::new(
                            origin_x + rel.x - cluster.bounds.min.x + self.config.cluster_padding,
                            origin_y + rel.y - cluster.bounds.min.y + self.config.cluster_padding,
                        ),
                    );
                }
            }
        }

        self.place_stragglers(model, &mut positions);

        debug!(
            clusters = clusters.len(),
            nodes = positions.len(),
            generation,
            "layout computed"
        );
        Ok(LayoutResult {
            positions,
            generation,
            cluster_count: clusters.len(),
        })
    }

    /// Build the port-annotated cluster graph and run the solver on it.
    fn solve_clusters(
        &self,
        model: &GraphModel,
        clusters: &[Cluster],
    ) -> Result<LayoutGraph, LayoutError> {
        let mut cluster_of: HashMap<Uuid, usize> = HashMap::new();
        for (i, cluster) in clusters.iter().enumerate() {
            for member in cluster.members() {
                cluster_of.insert(member, i);
            }
        }

        // Distinct birth years become the horizontal generation bands.
        let mut years: Vec<i32> = clusters.iter().map(|c| c.birth_year).collect();
        years.sort_unstable();
        years.dedup();

        // One port per inter-cluster effective edge, on the family's side.
        struct PortRequest {
            edge: Uuid,
            family_cluster: usize,
            other_cluster: usize,
            family: Uuid,
            side: PortSide,
        }
        let mut requests: Vec<PortRequest> = Vec::new();
        let mut inter_degree = vec![0usize; clusters.len()];
        for edge in model.edges() {
            if !edge.kind.is_effective() {
                continue;
            }
            let (ca, cb) = match (cluster_of.get(&edge.source), cluster_of.get(&edge.target)) {
                (Some(a), Some(b)) if a != b => (*a, *b),
                _ => continue,
            };
            let family = [edge.source, edge.target].into_iter().find(|id| {
                model
                    .node(*id)
                    .map(|n| n.kind() == NodeKind::Family)
                    .unwrap_or(false)
            });
            let family = match family {
                Some(f) => f,
                None => continue,
            };
            let family_cluster = cluster_of[&family];
            let other_cluster = if family_cluster == ca { cb } else { ca };

            // Earlier generation always points downward at the later one;
            // ties keep the default downward orientation into the family.
            let family_year = clusters[family_cluster].birth_year;
            let other_year = clusters[other_cluster].birth_year;
            let side = if other_year <= family_year {
                PortSide::Top
            } else {
                PortSide::Bottom
            };
            inter_degree[family_cluster] += 1;
            inter_degree[other_cluster] += 1;
            requests.push(PortRequest {
                edge: edge.id,
                family_cluster,
                other_cluster,
                family,
                side,
            });
        }

        // Lateral fan-out for edges sharing one family node.
        let mut shared: HashMap<(usize, Uuid), Vec<usize>> = HashMap::new();
        for (i, req) in requests.iter().enumerate() {
            shared
                .entry((req.family_cluster, req.family))
                .or_default()
                .push(i);
        }
        let mut lateral = vec![0.0f64; requests.len()];
        for slots in shared.values() {
            let count = slots.len() as f64;
            for (j, idx) in slots.iter().enumerate() {
                lateral[*idx] = (j as f64 - (count - 1.0) / 2.0) * self.config.port_spacing;
            }
        }

        let pad = self.config.cluster_padding;
        let mut children: Vec<LayoutChild> = clusters
            .iter()
            .enumerate()
            .map(|(i, c)| LayoutChild {
                id: c.root.to_string(),
                width: c.bounds.width() + 2.0 * pad,
                height: c.bounds.height() + 2.0 * pad,
                ports: Vec::new(),
                partition: years.binary_search(&c.birth_year).ok(),
                // Bloodline connectivity dominates; earlier birth years win ties.
                priority: inter_degree[i] as f64 * 1000.0 - c.birth_year as f64,
                x: None,
                y: None,
            })
            .collect();

        let mut edges: Vec<LayoutEdge> = Vec::new();
        for (i, req) in requests.iter().enumerate() {
            let cluster = &clusters[req.family_cluster];
            let child = &mut children[req.family_cluster];
            let anchor_x =
                cluster.relative[&req.family].x - cluster.bounds.min.x + pad + lateral[i];
            let anchor_y = match req.side {
                PortSide::Top => 0.0,
                PortSide::Bottom => child.height,
            };
            let port_id = format!("port-{}", req.edge);
            child.ports.push(LayoutPort {
                id: port_id.clone(),
                side: req.side,
                anchor_point: Position::new(anchor_x, anchor_y),
            });

            // Downward orientation: top ports receive, bottom ports emit.
            let family_end = port_id;
            let other_end = clusters[req.other_cluster].root.to_string();
            let (sources, targets) = match req.side {
                PortSide::Top => (vec![other_end], vec![family_end]),
                PortSide::Bottom => (vec![family_end], vec![other_end]),
            };
            edges.push(LayoutEdge {
                id: format!("edge-{}", req.edge),
                sources,
                targets,
            });
        }

        let graph = LayoutGraph {
            root_id: "canvas".to_string(),
            children,
            edges,
        };
        self.solver.solve(&graph)
    }

    /// Place nodes no cluster captured: connected families hang below the
    /// mean of their placed neighbors, everything else goes to an overflow
    /// grid right of the main extent.
    fn place_stragglers(&self, model: &GraphModel, positions: &mut HashMap<Uuid, Position>) {
        // Families with placed neighbors, repeated until the chain settles.
        loop {
            let mut progress = false;
            let pending: Vec<Uuid> = model
                .nodes()
                .filter(|n| n.kind() == NodeKind::Family && !positions.contains_key(&n.id))
                .map(|n| n.id)
                .collect();
            for family in pending {
                let placed: Vec<Position> = model
                    .neighbors(family)
                    .iter()
                    .filter_map(|n| positions.get(n))
                    .copied()
                    .collect();
                if placed.is_empty() {
                    continue;
                }
                let mean_x = placed.iter().map(|p| p.x).sum::<f64>() / placed.len() as f64;
                let mean_y = placed.iter().map(|p| p.y).sum::<f64>() / placed.len() as f64;
                positions.insert(family, Position::new(mean_x, mean_y + FAMILY_DROP));
                progress = true;
            }
            if !progress {
                break;
            }
        }

        let remaining: Vec<Uuid> = model
            .nodes()
            .filter(|n| !positions.contains_key(&n.id))
            .map(|n| n.id)
            .collect();
        if remaining.is_empty() {
            return;
        }

        let start_x = positions
            .values()
            .map(|p| p.x + NODE_WIDTH)
            .fold(0.0f64, f64::max)
            + self.config.overflow_spacing;
        let start_y = positions.values().map(|p| p.y).fold(0.0f64, f64::min);
        let column_step = NODE_WIDTH + self.config.overflow_spacing;
        let row_step = NODE_HEIGHT + self.config.overflow_spacing;
        let per_row = ((self.config.overflow_row_width / column_step).floor() as usize).max(1);
        for (i, node) in remaining.iter().enumerate() {
            positions.insert(
                *node,
                Position::new(
                    start_x + (i % per_row) as f64 * column_step,
                    start_y + (i / per_row) as f64 * row_step,
                ),
            );
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
