//! Generation cluster construction.
//!
//! Partitions the graph into layout units: one cluster per bloodline
//! person, holding that person, their partners (left/right of the root by
//! partner connector, higher-degree partners closest), and the family
//! nodes the couple reaches through child-side connectors.
//!
//! Clustering is a single pass over bloodline nodes in stable model order
//! with a visited set, so a node belongs to at most one cluster and the
//! result is deterministic for a given model.

use std::collections::{HashMap, HashSet};

use uuid::Uuid;

use crate::model::{Connector, EdgeKind, GraphModel, NodeKind, Position};

/// Node box extents used for bounding boxes, in canvas units.
pub const NODE_WIDTH: f64 = 160.0;
pub const NODE_HEIGHT: f64 = 70.0;

/// Horizontal increment between the root and successive partners.
pub const PARTNER_SPACING: f64 = 200.0;

/// Vertical drop from the partner row to the family row.
pub const FAMILY_DROP: f64 = 150.0;

/// Axis-aligned bounding box over a cluster's relative coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Bounds {
    pub min: Position,
    pub max: Position,
}

impl Bounds {
    fn extend(&mut self, pos: Position) {
        self.min.x = self.min.x.min(pos.x);
        self.min.y = self.min.y.min(pos.y);
        self.max.x = self.max.x.max(pos.x + NODE_WIDTH);
        self.max.y = self.max.y.max(pos.y + NODE_HEIGHT);
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }
}

/// One layout unit: a bloodline person, their partners and families.
#[derive(Debug, Clone)]
pub struct Cluster {
    pub root: Uuid,
    /// Partners left of the root, closest first.
    pub left_partners: Vec<Uuid>,
    /// Partners right of the root, closest first.
    pub right_partners: Vec<Uuid>,
    /// Family nodes claimed by this cluster, in discovery order.
    pub families: Vec<Uuid>,
    /// Member positions relative to the root.
    pub relative: HashMap<Uuid, Position>,
    pub bounds: Bounds,
    /// Root birth year, used for inter-cluster ordering.
    pub birth_year: i32,
}

impl Cluster {
    /// All member ids: root, partners, families.
    pub fn members(&self) -> impl Iterator<Item = Uuid> + '_ {
        std::iter::once(self.root)
            .chain(self.left_partners.iter().copied())
            .chain(self.right_partners.iter().copied())
            .chain(self.families.iter().copied())
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.relative.contains_key(&id)
    }
}

/// Partition the model into clusters.
pub fn build_clusters(model: &GraphModel) -> Vec<Cluster> {
    let mut visited: HashSet<Uuid> = HashSet::new();
    let mut clusters = Vec::new();

    let roots: Vec<Uuid> = model
        .nodes()
        .filter(|n| n.kind() == NodeKind::Person && n.on_bloodline())
        .map(|n| n.id)
        .collect();

    for root in roots {
        if visited.contains(&root) {
            continue;
        }
        visited.insert(root);

        // Partners, split by which partner connector anchors them to the root.
        let mut left_partners = Vec::new();
        let mut right_partners = Vec::new();
        for edge in model.edges_of(root) {
            if edge.kind != EdgeKind::Partnership {
                continue;
            }
            let partner = match edge.other_endpoint(root) {
                Some(p) => p,
                None => continue,
            };
            if visited.contains(&partner) {
                continue;
            }
            let is_person = model
                .node(partner)
                .map(|n| n.kind() == NodeKind::Person)
                .unwrap_or(false);
            if !is_person {
                continue;
            }
            let goes_left = match edge.connector_on(root) {
                Some(Connector::PartnerLeft) => true,
                Some(Connector::PartnerRight) => false,
                // Fall back to the partner's own connector: their left side
                // facing the root puts them on the root's right.
                _ => !matches!(edge.connector_on(partner), Some(Connector::PartnerLeft)),
            };
            visited.insert(partner);
            if goes_left {
                left_partners.push(partner);
            } else {
                right_partners.push(partner);
            }
        }

        // Higher-degree partners sit closer to the root.
        left_partners.sort_by_key(|p| std::cmp::Reverse(model.degree(*p)));
        right_partners.sort_by_key(|p| std::cmp::Reverse(model.degree(*p)));

        // Families reached from the couple through child-side connectors,
        // first claim wins.
        let mut families = Vec::new();
        let couple: Vec<Uuid> = std::iter::once(root)
            .chain(left_partners.iter().copied())
            .chain(right_partners.iter().copied())
            .collect();
        for person in &couple {
            for edge in model.edges_of(*person) {
                if edge.connector_on(*person) != Some(Connector::Child) {
                    continue;
                }
                let family = match edge.other_endpoint(*person) {
                    Some(f) => f,
                    None => continue,
                };
                if visited.contains(&family) {
                    continue;
                }
                let is_family = model
                    .node(family)
                    .map(|n| n.kind() == NodeKind::Family)
                    .unwrap_or(false);
                if is_family {
                    visited.insert(family);
                    families.push(family);
                }
            }
        }

        // Relative coordinates: root at the origin, partners fanned out in
        // fixed increments, families dropped below.
        let mut relative: HashMap<Uuid, Position> = HashMap::new();
        relative.insert(root, Position::default());
        for (i, partner) in left_partners.iter().enumerate() {
            relative.insert(
                *partner,
                Position::new(-((i + 1) as f64) * PARTNER_SPACING, 0.0),
            );
        }
        for (i, partner) in right_partners.iter().enumerate() {
            relative.insert(
                *partner,
                Position::new(((i + 1) as f64) * PARTNER_SPACING, 0.0),
            );
        }

        let couple_mean_x = couple
            .iter()
            .filter_map(|p| relative.get(p))
            .map(|pos| pos.x)
            .sum::<f64>()
            / couple.len().max(1) as f64;
        for (i, family) in families.iter().enumerate() {
            let feeding: Vec<f64> = model
                .edges_of(*family)
                .iter()
                .filter(|e| e.kind.is_descent_visible())
                .filter_map(|e| e.other_endpoint(*family))
                .filter_map(|p| relative.get(&p))
                .map(|pos| pos.x)
                .collect();
            let x = if !feeding.is_empty() {
                feeding.iter().sum::<f64>() / feeding.len() as f64
            } else if !couple.is_empty() {
                couple_mean_x
            } else {
                i as f64 * PARTNER_SPACING
            };
            relative.insert(*family, Position::new(x, FAMILY_DROP));
        }

        let mut bounds = Bounds::default();
        for pos in relative.values() {
            bounds.extend(*pos);
        }

        let birth_year = model
            .node(root)
            .map(|n| n.birth_year())
            .unwrap_or(crate::model::DEFAULT_BIRTH_YEAR);

        clusters.push(Cluster {
            root,
            left_partners,
            right_partners,
            families,
            relative,
            bounds,
            birth_year,
        });
    }

    clusters
}

// ============================================================================
// Tests
// ============================================================================
