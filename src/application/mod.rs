//! Application layer: use-case orchestration.
//!
//! Coordinates a run request end to end: range bounding, full-graph cycle
//! check, planned call counts, then sequential node execution with repeat
//! loops. It depends on [`graph`](crate::graph) for planning and
//! [`nodes`](crate::nodes) for single invocations.

pub mod workflow_run;

pub use workflow_run::{RunHandle, RunOrchestrator};
