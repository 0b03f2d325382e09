use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;

use crate::domain::execution::PlannedCount;
use crate::domain::model::{NodeStatus, Workflow};

/// Mutable session state: the workflow plus the progress bookkeeping of the
/// current or last run.
#[derive(Debug, Clone, Default)]
pub struct WorkflowState {
    pub workflow: Workflow,
    pub selected_node_id: Option<String>,
    /// Live invocation counters, reset at the start of every run.
    pub call_counts: HashMap<String, u64>,
    /// Planned invocation targets published for the current run.
    pub planned_counts: HashMap<String, PlannedCount>,
}

impl WorkflowState {
    pub fn new(workflow: Workflow) -> Self {
        Self {
            workflow,
            ..Self::default()
        }
    }

    /// Recorded outputs of every node that has one.
    pub fn outputs(&self) -> HashMap<String, Value> {
        self.workflow
            .iter()
            .filter_map(|node| node.output.clone().map(|out| (node.id.clone(), out)))
            .collect()
    }
}

/// Handle to [`WorkflowState`] shared between a session and its active run.
///
/// Locks are held only for short synchronous sections, never across an
/// `.await`. Only one run writes at a time; the session's run lock ensures it.
#[derive(Debug, Clone, Default)]
pub struct SharedState {
    inner: Arc<RwLock<WorkflowState>>,
}

impl SharedState {
    pub fn new(state: WorkflowState) -> Self {
        Self {
            inner: Arc::new(RwLock::new(state)),
        }
    }

    pub fn read<R>(&self, f: impl FnOnce(&WorkflowState) -> R) -> R {
        f(&self.inner.read())
    }

    pub fn write<R>(&self, f: impl FnOnce(&mut WorkflowState) -> R) -> R {
        f(&mut self.inner.write())
    }

    /// Mark a node running and bump its live call counter. Returns the new
    /// count, or `None` when the node no longer exists.
    pub fn begin_call(&self, node_id: &str) -> Option<u64> {
        self.write(|state| {
            let node = state.workflow.get_mut(node_id)?;
            node.status = NodeStatus::Running;
            node.error = None;
            let counter = state.call_counts.entry(node_id.to_string()).or_insert(0);
            *counter += 1;
            Some(*counter)
        })
    }

    pub fn record_success(&self, node_id: &str, output: Value) {
        self.write(|state| {
            if let Some(node) = state.workflow.get_mut(node_id) {
                node.status = NodeStatus::Success;
                node.output = Some(output);
                node.error = None;
            }
        });
    }

    /// Record a failure. The error body, when present, replaces the output.
    pub fn record_error(&self, node_id: &str, message: &str, output: Option<Value>) {
        self.write(|state| {
            if let Some(node) = state.workflow.get_mut(node_id) {
                node.status = NodeStatus::Error;
                node.error = Some(message.to_string());
                if output.is_some() {
                    node.output = output;
                }
            }
        });
    }

    /// Reset a node to idle so it can be retried.
    pub fn record_canceled(&self, node_id: &str) {
        self.write(|state| {
            if let Some(node) = state.workflow.get_mut(node_id) {
                node.status = NodeStatus::Idle;
                node.error = None;
            }
        });
    }

    pub fn publish_plan(&self, planned: HashMap<String, PlannedCount>) {
        self.write(|state| {
            state.call_counts = planned.keys().map(|id| (id.clone(), 0)).collect();
            state.planned_counts = planned;
        });
    }

    pub fn call_counts(&self) -> HashMap<String, u64> {
        self.read(|state| state.call_counts.clone())
    }
}
