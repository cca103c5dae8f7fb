//! In-memory graph model: node/edge types and the arena store.

pub mod models;
pub mod store;

pub use models::{
    parse_year, Address, Connector, Edge, EdgeKind, FamilyAttributes, FamilySide, Node,
    NodeAttributes, NodeKind, PersonAttributes, Position, DEFAULT_BIRTH_YEAR, GENERATION_GAP,
};
pub use store::{GraphModel, ModelError, RemovedNode};
