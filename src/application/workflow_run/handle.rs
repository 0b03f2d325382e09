//! Handle to a run executing in the background.

use tokio::task::JoinHandle;

use crate::core::cancel::CancelSignal;
use crate::domain::execution::RunOutcome;
use crate::error::{WorkflowError, WorkflowResult};

/// Handle to a running or completed run.
///
/// Allows stopping the run through its cancel signal and waiting for the
/// final [`RunOutcome`].
pub struct RunHandle {
    join: JoinHandle<WorkflowResult<RunOutcome>>,
    cancel: CancelSignal,
}

impl RunHandle {
    pub(crate) fn new(join: JoinHandle<WorkflowResult<RunOutcome>>, cancel: CancelSignal) -> Self {
        Self { join, cancel }
    }

    /// Ask the run to stop. In-flight calls and delays resolve as canceled.
    pub fn stop(&self) {
        self.cancel.trigger();
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Block until the run reaches a terminal state.
    pub async fn wait(self) -> WorkflowResult<RunOutcome> {
        self.join
            .await
            .map_err(|e| WorkflowError::InternalError(format!("Run task failed: {}", e)))?
    }
}
