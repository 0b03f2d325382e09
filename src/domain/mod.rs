//! Domain layer: workflow model and execution result types.
//!
//! Submodules:
//! - [`model`]: Nodes, parameter bindings, repeat configuration, workflows.
//! - [`execution`]: Per-node and per-run outcomes.

pub mod execution;
pub mod model;
