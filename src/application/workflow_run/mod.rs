//! Run orchestration: planning, repeat loops and the background run handle.

mod handle;
mod orchestrator;

pub use handle::RunHandle;
pub use orchestrator::RunOrchestrator;
