// src/dag/mod.rs

//! Task definitions and the graph that holds them.
//!
//! - [`task`] defines primitive and composite tasks and their actions.
//! - [`graph`] is the registry that enforces the graph invariants.

pub mod graph;
pub mod task;

pub use graph::TaskGraph;
pub use task::{Action, CompositeTask, PipelineSpec, PrimitiveTask, Task, TaskOptions};
