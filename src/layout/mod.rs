//! Automatic arrangement of the family tree.
//!
//! ```text
//! GraphModel ──► clusters ──► cluster graph with ports
//!                                      │
//!                               layered solver
//!                                      │
//!                          absolute cluster origins
//!                                      │
//!                      node positions (+ straggler placement)
//! ```
//!
//! ## Modules
//!
//! - [`models`] — the solver contract (LayoutGraph, children, ports, edges)
//! - [`solver`] — `LayeredSolver` trait and the default `SweepSolver`
//! - [`engine`] — `LayoutEngine` pipeline orchestrator

pub mod engine;
pub mod models;
pub mod solver;

pub use engine::{LayoutConfig, LayoutEngine, LayoutResult};
pub use models::{LayoutChild, LayoutEdge, LayoutError, LayoutGraph, LayoutPort, PortSide};
pub use solver::{LayeredSolver, SolverConfig, SweepSolver};
