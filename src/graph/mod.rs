//! Reference graph construction and planning.
//!
//! A [`ReferenceGraph`] is derived from node parameter bindings by
//! [`ReferenceGraph::build`]. [`plan_execution`] turns it into a stable
//! topological [`ExecutionPlan`], [`build_schedule`] groups it into repeat
//! blocks, [`would_create_cycle`] guards single edge
//! insertions, and [`planned_call_counts`] estimates invocations per node.

pub mod builder;
pub mod call_count;
pub mod planner;
pub mod schedule;
pub mod types;
pub mod validator;

pub use builder::ReferenceGraph;
pub use call_count::planned_call_counts;
pub use planner::{plan_execution, ExecutionPlan};
pub use schedule::{build_schedule, Step};
pub use types::*;
pub use validator::{validate_acyclic, would_create_cycle};
