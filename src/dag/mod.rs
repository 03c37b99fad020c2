// src/dag/mod.rs

//! Client-side task graph model.
//!
//! - [`graph`] holds the [`Graph`] and the builder used to add tasks.
//! - [`task`] describes a single node and its options.
//! - [`edges`] wires predecessors/successors and injects branch conditions.
//! - [`linearize`] orders tasks so predecessors are created first.
//! - [`lower`] turns the graph into backend task definitions.
//! - [`definition`] and [`schedule`] are the value types a graph carries.

pub mod definition;
pub mod edges;
pub mod graph;
pub mod linearize;
pub mod lower;
pub mod schedule;
pub mod task;

pub use definition::{CallTarget, Definition, ProcedureCall};
pub use edges::{TaskArg, branch_check};
pub use graph::{Graph, GraphId, GraphSettings, TaskBuilder, TaskId};
pub use linearize::topological_order;
pub use schedule::Schedule;
pub use task::{DagTask, TaskKind, TaskOptions};
