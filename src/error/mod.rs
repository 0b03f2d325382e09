//! Error types for the workflow runtime.
//!
//! - [`NodeError`]: Errors raised while invoking a single node.
//! - [`WorkflowError`]: Errors raised before a run starts, by workflow
//!   mutations, or by document import.

pub mod node_error;
pub mod workflow_error;

pub use node_error::NodeError;
pub use workflow_error::WorkflowError;

/// Convenience alias for workflow-level results.
pub type WorkflowResult<T> = Result<T, WorkflowError>;
/// Convenience alias for node-level results.
pub type NodeResult<T> = Result<T, NodeError>;
