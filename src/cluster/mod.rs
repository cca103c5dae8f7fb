//! Generation clusters: the grouping step between the graph model and layout.

mod builder;

pub use builder::{
    build_clusters, Bounds, Cluster, FAMILY_DROP, NODE_HEIGHT, NODE_WIDTH, PARTNER_SPACING,
};
