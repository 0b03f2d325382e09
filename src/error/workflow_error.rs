//! Workflow-level error types.

use crate::dsl::validation::ValidationReport;
use thiserror::Error;

/// Workflow-level errors
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("Node not found: {0}")]
    NodeNotFound(String),
    #[error("Duplicate node id: {0}")]
    DuplicateNode(String),
    #[error("Invalid run range: start={start}, end={end}, node count={len}")]
    InvalidRange { start: isize, end: isize, len: usize },
    #[error("Circular reference detected between nodes {}; no nodes were run", .nodes.join(", "))]
    ReferenceCycle { nodes: Vec<String> },
    #[error("Referencing node {source_id} from node {target_id} would create a circular reference")]
    WouldCreateCycle { source_id: String, target_id: String },
    #[error("A run is in progress")]
    RunInProgress,
    #[error("Transport setup failed: {0}")]
    TransportSetup(String),
    #[error("Method '{0}' is not available")]
    UnknownMethod(String),
    #[error(transparent)]
    ProposalRejected(#[from] crate::assistant::ProposalError),
    #[error("Workflow document is invalid")]
    ValidationFailed(Box<ValidationReport>),
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<serde_json::Error> for WorkflowError {
    fn from(e: serde_json::Error) -> Self {
        WorkflowError::SerializationError(e.to_string())
    }
}
