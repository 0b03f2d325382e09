use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;

use crate::core::cancel::CancelSignal;
use crate::core::event_bus::RunEvent;
use crate::core::runtime_context::RuntimeContext;
use crate::core::workflow_state::SharedState;
use crate::domain::execution::{ExecutionOutcome, RunFailure, RunOutcome};
use crate::domain::model::{Node, RepeatConfig};
use crate::error::{WorkflowError, WorkflowResult};
use crate::graph::{build_schedule, planned_call_counts, validate_acyclic, ReferenceGraph, Step};
use crate::nodes::{NodeExecutor, OutputMap};

/// How a run ended before completing.
enum Halt {
    Failed(RunFailure),
    Canceled,
}

/// Drives one run request over a display-order range.
///
/// Nodes execute strictly one at a time in the planned order. The caller is
/// responsible for making sure only one orchestrator runs against a given
/// [`SharedState`] at a time.
pub struct RunOrchestrator {
    executor: Arc<NodeExecutor>,
    state: SharedState,
    context: RuntimeContext,
}

impl RunOrchestrator {
    pub fn new(executor: Arc<NodeExecutor>, state: SharedState, context: RuntimeContext) -> Self {
        Self {
            executor,
            state,
            context,
        }
    }

    /// Run the nodes at display positions `[start, end)`.
    ///
    /// `end` is bounded to the node count. A negative `start`, or one past the
    /// bounded end, is rejected. A reference cycle anywhere in the workflow
    /// rejects the run before any node executes.
    pub async fn run_range(
        &self,
        start: isize,
        end: isize,
        cancel: &CancelSignal,
    ) -> WorkflowResult<RunOutcome> {
        let (display, nodes) = self
            .state
            .read(|s| (s.workflow.order().to_vec(), s.workflow.nodes().clone()));

        let len = display.len();
        let bounded_end = end.min(len as isize);
        if start < 0 || start > bounded_end {
            return Err(WorkflowError::InvalidRange { start, end, len });
        }

        let full_graph = ReferenceGraph::build(&display, &nodes);
        let plan = validate_acyclic(&full_graph).inspect_err(|e| {
            tracing::warn!(error = %e, "run rejected");
        })?;

        let included = &display[start as usize..bounded_end as usize];
        let order = plan.restrict(included);
        let graph = ReferenceGraph::build(&order, &nodes);

        let planned = planned_call_counts(&order, &graph, &nodes);
        self.state.publish_plan(planned.clone());

        let run_id = self.context.id_generator.next_id();
        tracing::info!(run_id = %run_id, nodes = order.len(), start, end = bounded_end, "run started");
        self.context.emit(RunEvent::RunStarted {
            run_id: run_id.clone(),
            order: order.clone(),
            planned: planned.clone(),
            timestamp: Utc::now(),
        });

        let schedule = build_schedule(&order, &graph, &nodes);
        let mut outputs: OutputMap = self.state.read(|s| s.outputs());
        let halt = self.execute_order(&schedule, &nodes, &mut outputs, cancel).await;

        let mut outcome = RunOutcome {
            planned,
            calls: self.state.call_counts(),
            ..RunOutcome::default()
        };
        match halt {
            None => outcome.success = true,
            Some(Halt::Canceled) => outcome.canceled = true,
            Some(Halt::Failed(failure)) => outcome.failure = Some(failure),
        }

        tracing::info!(run_id = %run_id, result = %outcome.message(), "run finished");
        self.context.emit(RunEvent::RunFinished {
            run_id,
            outcome: outcome.clone(),
            timestamp: Utc::now(),
        });
        Ok(outcome)
    }

    async fn execute_order(
        &self,
        schedule: &[Step],
        nodes: &HashMap<String, Node>,
        outputs: &mut OutputMap,
        cancel: &CancelSignal,
    ) -> Option<Halt> {
        for step in schedule {
            let halt = match step {
                Step::Once(id) => self.execute_once(id, outputs, cancel).await,
                Step::Repeat { id, scope } => {
                    let Some(node) = nodes.get(id) else {
                        continue;
                    };
                    self.execute_repeating(id, &node.repeat, scope, outputs, cancel)
                        .await
                }
            };
            if halt.is_some() {
                return halt;
            }
        }
        None
    }

    /// Loop cycles and repetitions of one node, each repetition followed by
    /// its repeat scope in order.
    async fn execute_repeating(
        &self,
        id: &str,
        repeat: &RepeatConfig,
        downstream: &[String],
        outputs: &mut OutputMap,
        cancel: &CancelSignal,
    ) -> Option<Halt> {
        let repeat = repeat.clone().normalized();
        let delay = repeat.interval_duration();
        let mut first = true;
        let mut cycle: u32 = 0;

        while repeat.loop_count == 0 || cycle < repeat.loop_count {
            for _ in 0..repeat.count {
                if !first {
                    self.context.emit(RunEvent::RepeatWaiting {
                        node_id: id.to_string(),
                        delay_ms: delay.as_millis() as u64,
                        timestamp: Utc::now(),
                    });
                    if cancel.sleep(delay).await.is_err() {
                        self.state.record_canceled(id);
                        self.context.emit(RunEvent::NodeCanceled {
                            node_id: id.to_string(),
                            timestamp: Utc::now(),
                        });
                        return Some(Halt::Canceled);
                    }
                }
                first = false;

                if let Some(halt) = self.execute_once(id, outputs, cancel).await {
                    return Some(halt);
                }
                for dependent in downstream {
                    if let Some(halt) = self.execute_once(dependent, outputs, cancel).await {
                        return Some(halt);
                    }
                }
            }
            cycle = cycle.saturating_add(1);
        }
        None
    }

    async fn execute_once(
        &self,
        id: &str,
        outputs: &mut OutputMap,
        cancel: &CancelSignal,
    ) -> Option<Halt> {
        match self
            .executor
            .execute(id, &self.state, outputs, cancel, &self.context)
            .await
        {
            ExecutionOutcome::Success(_) => None,
            ExecutionOutcome::Canceled => Some(Halt::Canceled),
            ExecutionOutcome::Failed { message, .. } => {
                let node_name = self
                    .state
                    .read(|s| s.workflow.get(id).map(|n| n.name.clone()))
                    .unwrap_or_else(|| id.to_string());
                Some(Halt::Failed(RunFailure {
                    node_id: id.to_string(),
                    node_name,
                    message,
                }))
            }
        }
    }
}
