//! Layered graph solver.
//!
//! Implements the top-down layered arrangement behind the
//! [`LayeredSolver`] trait: rank assignment (partition bands + longest
//! path), crossing minimization by alternating barycenter sweeps, and
//! left-to-right placement that pulls each child toward the mean of its
//! neighbors while preserving ordering and spacing.

use std::collections::HashMap;

use petgraph::graph::DiGraph;
use petgraph::visit::EdgeRef;

use super::models::{LayoutChild, LayoutError, LayoutGraph};

/// Tuning parameters for the layered solver.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Vertical gap between consecutive layers.
    pub layer_spacing: f64,
    /// Horizontal gap between siblings within a layer.
    pub sibling_spacing: f64,
    /// Number of down/up barycenter sweep rounds.
    pub sweeps: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            layer_spacing: 120.0,
            sibling_spacing: 60.0,
            sweeps: 2,
        }
    }
}

/// A layered layout algorithm: consumes a sized-children-with-ports graph
/// and returns the same graph with coordinates assigned.
pub trait LayeredSolver: Send + Sync {
    fn solve(&self, graph: &LayoutGraph) -> Result<LayoutGraph, LayoutError>;
}

/// The default solver: Kahn layering with partition bands, barycenter
/// ordering sweeps, cursor placement with neighbor alignment.
#[derive(Debug, Default)]
pub struct SweepSolver {
    config: SolverConfig,
}

impl SweepSolver {
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }
}

impl LayeredSolver for SweepSolver {
    fn solve(&self, graph: &LayoutGraph) -> Result<LayoutGraph, LayoutError> {
        if graph.children.is_empty() {
            return Err(LayoutError::EmptyGraph);
        }

        let n = graph.children.len();
        let index_of: HashMap<&str, usize> = graph
            .children
            .iter()
            .enumerate()
            .map(|(i, c)| (c.id.as_str(), i))
            .collect();
        // Ports resolve to the child that owns them.
        let mut owner_of: HashMap<&str, usize> = HashMap::new();
        for (i, child) in graph.children.iter().enumerate() {
            for port in &child.ports {
                owner_of.insert(port.id.as_str(), i);
            }
        }
        let resolve = |id: &str| -> Result<usize, LayoutError> {
            index_of
                .get(id)
                .or_else(|| owner_of.get(id))
                .copied()
                .ok_or_else(|| LayoutError::Solver(format!("edge references unknown id {}", id)))
        };

        let mut dag: DiGraph<usize, ()> = DiGraph::with_capacity(n, graph.edges.len());
        let node_indices: Vec<_> = (0..n).map(|i| dag.add_node(i)).collect();
        for edge in &graph.edges {
            for source in &edge.sources {
                for target in &edge.targets {
                    let s = resolve(source)?;
                    let t = resolve(target)?;
                    if s != t {
                        dag.add_edge(node_indices[s], node_indices[t], ());
                    }
                }
            }
        }
        let pairs: Vec<(usize, usize)> = dag
            .edge_references()
            .map(|e| (e.source().index(), e.target().index()))
            .collect();

        let ranks = assign_ranks(&graph.children, &pairs, n);
        let max_rank = ranks.iter().copied().max().unwrap_or(0);

        // Buckets per rank, seeded by descending priority then input order.
        let mut buckets: Vec<Vec<usize>> = vec![Vec::new(); max_rank + 1];
        let mut seed: Vec<usize> = (0..n).collect();
        seed.sort_by(|a, b| {
            graph.children[*b]
                .priority
                .partial_cmp(&graph.children[*a].priority)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.cmp(b))
        });
        for i in seed {
            buckets[ranks[i]].push(i);
        }

        order_buckets(&mut buckets, &pairs, n, self.config.sweeps);

        let (xs, ys) = place(&graph.children, &buckets, &pairs, &self.config);

        let mut out = graph.clone();
        for (i, child) in out.children.iter_mut().enumerate() {
            child.x = Some(xs[i]);
            child.y = Some(ys[i]);
        }
        Ok(out)
    }
}

/// Assign a layer to every child.
///
/// Children carrying a partition band start there; the rest get their
/// longest predecessor path. A bounded relaxation then pushes every edge
/// target below its source.
fn assign_ranks(children: &[LayoutChild], pairs: &[(usize, usize)], n: usize) -> Vec<usize> {
    let mut indegree = vec![0usize; n];
    let mut outgoing: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (s, t) in pairs {
        indegree[*t] += 1;
        outgoing[*s].push(*t);
    }

    // Longest-path base via Kahn's ordering.
    let mut ranks = vec![0usize; n];
    let mut queue: std::collections::VecDeque<usize> = (0..n).filter(|i| indegree[*i] == 0).collect();
    let mut remaining = indegree.clone();
    while let Some(node) = queue.pop_front() {
        for &next in &outgoing[node] {
            ranks[next] = ranks[next].max(ranks[node] + 1);
            remaining[next] -= 1;
            if remaining[next] == 0 {
                queue.push_back(next);
            }
        }
    }

    for (i, child) in children.iter().enumerate() {
        if let Some(partition) = child.partition {
            ranks[i] = partition;
        }
    }

    // Re-satisfy edge direction after partition overrides. Bounded in case
    // the input carries a cycle.
    for _ in 0..n {
        let mut changed = false;
        for (s, t) in pairs {
            if ranks[*t] <= ranks[*s] && children[*t].partition != Some(ranks[*t]) {
                ranks[*t] = ranks[*s] + 1;
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }

    ranks
}

/// Alternating barycenter sweeps over the rank buckets.
fn order_buckets(buckets: &mut [Vec<usize>], pairs: &[(usize, usize)], n: usize, sweeps: usize) {
    let mut preds: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut succs: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (s, t) in pairs {
        preds[*t].push(*s);
        succs[*s].push(*t);
    }

    let mut positions = vec![0usize; n];
    let update_positions = |buckets: &[Vec<usize>], positions: &mut Vec<usize>| {
        for bucket in buckets {
            for (idx, node) in bucket.iter().enumerate() {
                positions[*node] = idx;
            }
        }
    };
    update_positions(buckets, &mut positions);

    let barycenter = |node: usize, neighbors: &[usize], positions: &[usize]| -> f64 {
        if neighbors.is_empty() {
            return positions[node] as f64;
        }
        neighbors.iter().map(|p| positions[*p] as f64).sum::<f64>() / neighbors.len() as f64
    };

    for _ in 0..sweeps {
        for rank in 1..buckets.len() {
            if buckets[rank].len() > 1 {
                let snapshot = positions.clone();
                buckets[rank].sort_by(|a, b| {
                    barycenter(*a, &preds[*a], &snapshot)
                        .partial_cmp(&barycenter(*b, &preds[*b], &snapshot))
                        .unwrap_or(std::cmp::Ordering::Equal)
                        .then(snapshot[*a].cmp(&snapshot[*b]))
                });
                update_positions(buckets, &mut positions);
            }
        }
        for rank in (0..buckets.len().saturating_sub(1)).rev() {
            if buckets[rank].len() > 1 {
                let snapshot = positions.clone();
                buckets[rank].sort_by(|a, b| {
                    barycenter(*a, &succs[*a], &snapshot)
                        .partial_cmp(&barycenter(*b, &succs[*b], &snapshot))
                        .unwrap_or(std::cmp::Ordering::Equal)
                        .then(snapshot[*a].cmp(&snapshot[*b]))
                });
                update_positions(buckets, &mut positions);
            }
        }
    }
}

/// Assign coordinates: layers stacked by cumulative height, children packed
/// left to right, pulled toward the mean center of their upper neighbors.
fn place(
    children: &[LayoutChild],
    buckets: &[Vec<usize>],
    pairs: &[(usize, usize)],
    config: &SolverConfig,
) -> (Vec<f64>, Vec<f64>) {
    let n = children.len();
    let mut preds: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (s, t) in pairs {
        preds[*t].push(*s);
    }

    let mut xs = vec![0.0f64; n];
    let mut ys = vec![0.0f64; n];

    let mut layer_top = 0.0f64;
    for (rank, bucket) in buckets.iter().enumerate() {
        let mut cursor = f64::NEG_INFINITY;
        for &node in bucket {
            let width = children[node].width;
            let desired = if rank == 0 || preds[node].is_empty() {
                // No upper neighbors: continue the packing run.
                if cursor.is_finite() {
                    cursor
                } else {
                    0.0
                }
            } else {
                let mean_center = preds[node]
                    .iter()
                    .map(|p| xs[*p] + children[*p].width / 2.0)
                    .sum::<f64>()
                    / preds[node].len() as f64;
                mean_center - width / 2.0
            };
            let x = if cursor.is_finite() {
                desired.max(cursor)
            } else {
                desired
            };
            xs[node] = x;
            ys[node] = layer_top;
            cursor = x + width + config.sibling_spacing;
        }

        let tallest = bucket
            .iter()
            .map(|i| children[*i].height)
            .fold(0.0f64, f64::max);
        layer_top += tallest + config.layer_spacing;
    }

    (xs, ys)
}

// ============================================================================
// Tests
// ============================================================================
