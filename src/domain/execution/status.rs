//! Execution outcomes: the results reported by the node executor and the
//! run orchestrator.

use serde::{Serialize, Serializer};
use serde_json::Value;
use std::collections::HashMap;

/// Result of one node invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionOutcome {
    Success(Value),
    /// The call failed. `output` holds the error body when one was received.
    Failed {
        message: String,
        output: Option<Value>,
    },
    /// The run's cancel signal fired before or during the call.
    Canceled,
}

impl ExecutionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionOutcome::Success(_))
    }
}

/// Expected number of invocations of a node within one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlannedCount {
    Finite(u64),
    Infinite,
}

impl PlannedCount {
    pub fn as_option(self) -> Option<u64> {
        match self {
            PlannedCount::Finite(n) => Some(n),
            PlannedCount::Infinite => None,
        }
    }

    /// Add finite calls. Infinite absorbs everything.
    pub fn add(self, calls: u64) -> Self {
        match self {
            PlannedCount::Finite(n) => PlannedCount::Finite(n.saturating_add(calls)),
            PlannedCount::Infinite => PlannedCount::Infinite,
        }
    }
}

impl Default for PlannedCount {
    fn default() -> Self {
        PlannedCount::Finite(0)
    }
}

impl Serialize for PlannedCount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.as_option().serialize(serializer)
    }
}

/// The node that stopped a run, and why.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunFailure {
    pub node_id: String,
    pub node_name: String,
    pub message: String,
}

/// Overall result of a run request.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunOutcome {
    pub success: bool,
    pub canceled: bool,
    pub failure: Option<RunFailure>,
    /// Planned calls per included node.
    pub planned: HashMap<String, PlannedCount>,
    /// Invocations actually made per node.
    pub calls: HashMap<String, u64>,
}

impl RunOutcome {
    pub fn message(&self) -> String {
        if self.success {
            "Run completed".to_string()
        } else if self.canceled {
            "Run canceled".to_string()
        } else if let Some(failure) = &self.failure {
            format!("Node \"{}\" failed: {}", failure.node_name, failure.message)
        } else {
            "Run failed".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_planned_count_add() {
        assert_eq!(PlannedCount::Finite(2).add(3), PlannedCount::Finite(5));
        assert_eq!(PlannedCount::Infinite.add(3), PlannedCount::Infinite);
        assert_eq!(PlannedCount::default(), PlannedCount::Finite(0));
    }

    #[test]
    fn test_planned_count_serializes_infinite_as_null() {
        assert_eq!(serde_json::to_value(PlannedCount::Infinite).unwrap(), json!(null));
        assert_eq!(serde_json::to_value(PlannedCount::Finite(6)).unwrap(), json!(6));
    }

    #[test]
    fn test_run_outcome_message() {
        let outcome = RunOutcome {
            failure: Some(RunFailure {
                node_id: "n1".into(),
                node_name: "Get slot".into(),
                message: "HTTP 500".into(),
            }),
            ..RunOutcome::default()
        };
        assert_eq!(outcome.message(), "Node \"Get slot\" failed: HTTP 500");

        let canceled = RunOutcome {
            canceled: true,
            ..RunOutcome::default()
        };
        assert_eq!(canceled.message(), "Run canceled");
    }
}
