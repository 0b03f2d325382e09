//! Workflow model types shared across layers.

mod node;
mod workflow;

pub use node::{
    Node, NodeStatus, ParamBinding, ParamValue, Position, RepeatConfig, SchemaMode, TimeUnit,
    MAX_REPEAT_COUNT, MAX_REPEAT_INTERVAL,
};
pub use workflow::Workflow;
