//! Execution outcome types.

mod status;

pub use status::{ExecutionOutcome, PlannedCount, RunFailure, RunOutcome};
