//! Connection rules: validation, classification and side-effect planning.

mod classify;

pub use classify::{classify, ConnectionPlan, ConnectionRejection, PlanStep, StepUndo};
