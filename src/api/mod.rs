//! Public API layer: stable entry points for external consumers.
//!
//! [`WorkflowSession`] is the primary interface: it owns the workflow, applies
//! mutations, runs nodes and exchanges documents.

mod session;

pub use crate::application::RunHandle;
pub use session::{ReferenceCandidate, RunProgress, WorkflowSession, WorkflowSessionBuilder};
