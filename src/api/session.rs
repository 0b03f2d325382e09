//! Workflow session: the single owner of a workflow and its run state.
//!
//! [`WorkflowSession`] (constructed via [`WorkflowSessionBuilder`]) holds the
//! node collection, the selection, and the progress counters of the current
//! run. Mutations go through it so the reference graph is always rebuilt from
//! current state, and runs go through it so only one is ever active.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;

use crate::application::{RunHandle, RunOrchestrator};
use crate::assistant::{self, Proposal, ProposalReport};
use crate::core::cancel::CancelSignal;
use crate::core::config::EngineConfig;
use crate::core::event_bus::EventSender;
use crate::core::http_client::{HttpTransport, Transport};
use crate::core::path;
use crate::core::runtime_context::{IdGenerator, RuntimeContext};
use crate::core::workflow_state::{SharedState, WorkflowState};
use crate::domain::execution::{PlannedCount, RunOutcome};
use crate::domain::model::{Node, ParamValue, Position, RepeatConfig, Workflow};
use crate::dsl::{parse_document, serialize_document};
use crate::error::{WorkflowError, WorkflowResult};
use crate::graph::{plan_execution, would_create_cycle, ExecutionPlan, ReferenceGraph};
use crate::nodes::{MethodRegistry, NodeExecutor};

/// Paths of one node's output that another node may reference.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReferenceCandidate {
    pub node_id: String,
    pub node_name: String,
    pub paths: Vec<String>,
}

/// Planned and live call counts of the current or last run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunProgress {
    pub running: bool,
    pub planned: HashMap<String, PlannedCount>,
    pub calls: HashMap<String, u64>,
}

/// Builder for a [`WorkflowSession`].
pub struct WorkflowSessionBuilder {
    registry: Arc<dyn MethodRegistry>,
    transport: Option<Arc<dyn Transport>>,
    config: EngineConfig,
    context: RuntimeContext,
    workflow: Workflow,
}

impl WorkflowSessionBuilder {
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Use a custom transport instead of the pooled HTTP client.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn event_sender(mut self, tx: EventSender) -> Self {
        self.context = self.context.with_event_tx(tx);
        self
    }

    pub fn id_generator(mut self, id_generator: Arc<dyn IdGenerator>) -> Self {
        self.context = self.context.with_id_generator(id_generator);
        self
    }

    pub fn workflow(mut self, workflow: Workflow) -> Self {
        self.workflow = workflow;
        self
    }

    pub fn build(self) -> WorkflowResult<WorkflowSession> {
        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(
                HttpTransport::new(&self.config.http)
                    .map_err(|e| WorkflowError::TransportSetup(e.to_string()))?,
            ),
        };
        let config = Arc::new(self.config);
        let executor = Arc::new(NodeExecutor::new(
            Arc::clone(&self.registry),
            transport,
            Arc::clone(&config),
        ));
        Ok(WorkflowSession {
            state: SharedState::new(WorkflowState::new(self.workflow)),
            executor,
            registry: self.registry,
            config,
            context: self.context,
            run_lock: Arc::new(tokio::sync::Mutex::new(())),
            active: Arc::new(parking_lot::Mutex::new(None)),
            run_seq: Arc::new(AtomicU64::new(0)),
        })
    }
}

/// Owned, single-writer workflow state plus the run lock.
///
/// Cloning shares the session, so a clone can stop a run another clone
/// started.
#[derive(Clone)]
pub struct WorkflowSession {
    state: SharedState,
    executor: Arc<NodeExecutor>,
    registry: Arc<dyn MethodRegistry>,
    config: Arc<EngineConfig>,
    context: RuntimeContext,
    run_lock: Arc<tokio::sync::Mutex<()>>,
    /// Cancel signal of the newest run, tagged with its sequence number.
    active: Arc<parking_lot::Mutex<Option<(u64, CancelSignal)>>>,
    run_seq: Arc<AtomicU64>,
}

impl WorkflowSession {
    pub fn builder(registry: Arc<dyn MethodRegistry>) -> WorkflowSessionBuilder {
        WorkflowSessionBuilder {
            registry,
            transport: None,
            config: EngineConfig::default(),
            context: RuntimeContext::default(),
            workflow: Workflow::new(),
        }
    }

    pub fn state(&self) -> &SharedState {
        &self.state
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Snapshot of the current workflow.
    pub fn workflow(&self) -> Workflow {
        self.state.read(|s| s.workflow.clone())
    }

    pub fn node(&self, id: &str) -> Option<Node> {
        self.state.read(|s| s.workflow.get(id).cloned())
    }

    pub fn selected_node_id(&self) -> Option<String> {
        self.state.read(|s| s.selected_node_id.clone())
    }

    // ---- mutations ----

    /// Append a node for `method` with the registry's default bindings and
    /// select it.
    pub fn add_node(&self, method: &str) -> WorkflowResult<String> {
        let len = self.state.read(|s| s.workflow.len());
        self.insert_node(len, method)
    }

    pub fn insert_node(&self, index: usize, method: &str) -> WorkflowResult<String> {
        let spec = self
            .registry
            .lookup(method)
            .ok_or_else(|| WorkflowError::UnknownMethod(method.to_string()))?;
        let id = self.context.id_generator.next_id();
        let node = assistant::node_with_defaults(&id, method, Some(&spec));
        self.state.write(|s| {
            s.workflow.insert_node(index, node)?;
            s.selected_node_id = Some(id.clone());
            Ok::<_, WorkflowError>(())
        })?;
        tracing::debug!(node_id = %id, method, "node added");
        Ok(id)
    }

    /// Remove a node. References to it elsewhere stay in place and fail
    /// when resolved.
    pub fn remove_node(&self, id: &str) -> WorkflowResult<Node> {
        self.state.write(|s| {
            let node = s.workflow.remove_node(id)?;
            if s.selected_node_id.as_deref() == Some(id) {
                s.selected_node_id = None;
            }
            s.call_counts.remove(id);
            s.planned_counts.remove(id);
            Ok(node)
        })
    }

    pub fn move_node(&self, id: &str, to: usize) -> WorkflowResult<()> {
        self.state.write(|s| s.workflow.move_node(id, to))
    }

    pub fn rename_node(&self, id: &str, name: &str) -> WorkflowResult<()> {
        self.state.write(|s| s.workflow.rename_node(id, name))
    }

    /// Bind a literal value.
    pub fn set_literal(&self, id: &str, param: &str, value: serde_json::Value) -> WorkflowResult<()> {
        self.state
            .write(|s| s.workflow.set_param(id, param, ParamValue::literal(value)))
    }

    /// Bind `param` of `target_id` to `path` in the output of `source_id`.
    ///
    /// Rejected when the new edge would close a reference cycle, including
    /// a node referencing itself.
    pub fn connect_reference(
        &self,
        target_id: &str,
        param: &str,
        source_id: &str,
        path: &str,
    ) -> WorkflowResult<()> {
        self.state.write(|s| {
            s.workflow.node(target_id)?;
            s.workflow.node(source_id)?;
            let graph = ReferenceGraph::build(s.workflow.order(), s.workflow.nodes());
            if would_create_cycle(&graph, source_id, target_id) {
                return Err(WorkflowError::WouldCreateCycle {
                    source_id: source_id.to_string(),
                    target_id: target_id.to_string(),
                });
            }
            s.workflow
                .set_param(target_id, param, ParamValue::reference(source_id, path))
        })
    }

    pub fn remove_param(&self, id: &str, param: &str) -> WorkflowResult<Option<ParamValue>> {
        self.state.write(|s| s.workflow.remove_param(id, param))
    }

    pub fn set_raw_params(&self, id: &str, raw: &str) -> WorkflowResult<()> {
        self.state.write(|s| s.workflow.set_raw_params(id, raw))
    }

    /// Replace the repeat settings, clamped to the configured limits.
    pub fn set_repeat(&self, id: &str, mut repeat: RepeatConfig) -> WorkflowResult<()> {
        repeat.count = repeat.count.min(self.config.max_repeat_count.max(1));
        repeat.interval = repeat.interval.min(self.config.max_interval);
        self.state.write(|s| s.workflow.set_repeat(id, repeat))
    }

    pub fn set_position(&self, id: &str, position: Position) -> WorkflowResult<()> {
        self.state.write(|s| s.workflow.set_position(id, position))
    }

    pub fn select_node(&self, id: Option<&str>) -> WorkflowResult<()> {
        self.state.write(|s| {
            if let Some(id) = id {
                s.workflow.node(id)?;
            }
            s.selected_node_id = id.map(str::to_string);
            Ok(())
        })
    }

    // ---- planning views ----

    /// Planned execution order over every node.
    pub fn execution_plan(&self) -> ExecutionPlan {
        self.state.read(|s| {
            plan_execution(&ReferenceGraph::build(
                s.workflow.order(),
                s.workflow.nodes(),
            ))
        })
    }

    /// `#n` execution position per node; empty while a cycle exists.
    pub fn execution_labels(&self) -> HashMap<String, String> {
        self.execution_plan()
            .positions()
            .into_iter()
            .map(|(id, pos)| (id, format!("#{}", pos)))
            .collect()
    }

    /// Outputs `target_id` can reference without closing a cycle, with every
    /// addressable path, in display order.
    pub fn reference_candidates(&self, target_id: &str) -> WorkflowResult<Vec<ReferenceCandidate>> {
        let max_depth = self.config.enumerate_max_depth;
        self.state.read(|s| {
            s.workflow.node(target_id)?;
            let graph = ReferenceGraph::build(s.workflow.order(), s.workflow.nodes());
            Ok(s.workflow
                .iter()
                .filter(|node| !would_create_cycle(&graph, &node.id, target_id))
                .filter_map(|node| {
                    node.output.as_ref().map(|output| ReferenceCandidate {
                        node_id: node.id.clone(),
                        node_name: node.name.clone(),
                        paths: path::enumerate(output, max_depth),
                    })
                })
                .collect())
        })
    }

    // ---- runs ----

    pub async fn run_all(&self) -> WorkflowResult<RunOutcome> {
        let len = self.state.read(|s| s.workflow.len());
        self.run_range(0, len as isize).await
    }

    /// Run a single node against the outputs already recorded.
    pub async fn run_node(&self, id: &str) -> WorkflowResult<RunOutcome> {
        let index = self.index_of(id)? as isize;
        self.run_range(index, index + 1).await
    }

    /// Run `id` and everything after it in display order.
    pub async fn run_from(&self, id: &str) -> WorkflowResult<RunOutcome> {
        let index = self.index_of(id)? as isize;
        let len = self.state.read(|s| s.workflow.len());
        self.run_range(index, len as isize).await
    }

    pub async fn run_range(&self, start: isize, end: isize) -> WorkflowResult<RunOutcome> {
        self.spawn_range(start, end).wait().await
    }

    /// Start a run in the background.
    ///
    /// Any active run is told to stop first; the new run starts once it has
    /// released the run lock.
    pub fn spawn_range(&self, start: isize, end: isize) -> RunHandle {
        let cancel = CancelSignal::new();
        let seq = self.run_seq.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((_, previous)) = self.active.lock().replace((seq, cancel.clone())) {
            previous.trigger();
        }

        let session = self.clone();
        let run_cancel = cancel.clone();
        let join = tokio::spawn(async move {
            let _guard = session.run_lock.lock().await;
            let orchestrator = RunOrchestrator::new(
                Arc::clone(&session.executor),
                session.state.clone(),
                session.context.clone(),
            );
            let result = orchestrator.run_range(start, end, &run_cancel).await;
            let mut active = session.active.lock();
            if active.as_ref().is_some_and(|(current, _)| *current == seq) {
                *active = None;
            }
            result
        });
        RunHandle::new(join, cancel)
    }

    /// Stop the active run, if any.
    pub fn stop(&self) {
        if let Some((_, cancel)) = self.active.lock().as_ref() {
            tracing::info!("stop requested");
            cancel.trigger();
        }
    }

    pub fn is_running(&self) -> bool {
        self.run_lock.try_lock().is_err()
    }

    pub fn progress(&self) -> RunProgress {
        let running = self.is_running();
        self.state.read(|s| RunProgress {
            running,
            planned: s.planned_counts.clone(),
            calls: s.call_counts.clone(),
        })
    }

    // ---- assistant ----

    /// Validate proposals, append them as nodes and run the new nodes.
    ///
    /// Nothing is added when any proposal is rejected.
    pub async fn apply_proposals(&self, proposals: &[Proposal]) -> WorkflowResult<ProposalReport> {
        assistant::validate_proposals(self.registry.as_ref(), proposals)?;
        let nodes = assistant::materialize(
            self.registry.as_ref(),
            proposals,
            self.context.id_generator.as_ref(),
        );
        let created: Vec<String> = nodes.iter().map(|n| n.id.clone()).collect();

        let (start, end) = self.state.write(|s| {
            let start = s.workflow.len();
            for node in nodes {
                s.workflow.push_node(node)?;
            }
            Ok::<_, WorkflowError>((start, s.workflow.len()))
        })?;
        tracing::info!(count = created.len(), "assistant proposals accepted");

        let outcome = self.run_range(start as isize, end as isize).await?;
        Ok(ProposalReport { created, outcome })
    }

    // ---- import / export ----

    pub fn export_json(&self) -> WorkflowResult<String> {
        self.state
            .read(|s| serialize_document(&s.workflow, s.selected_node_id.as_deref()))
    }

    /// Replace the workflow with an imported document. On any error the
    /// session is left as it was.
    pub fn import_json(&self, content: &str) -> WorkflowResult<()> {
        if self.is_running() {
            return Err(WorkflowError::RunInProgress);
        }
        let (workflow, selected) = parse_document(content)?;
        self.state.write(|s| {
            *s = WorkflowState::new(workflow);
            s.selected_node_id = selected;
        });
        Ok(())
    }

    fn index_of(&self, id: &str) -> WorkflowResult<usize> {
        self.state
            .read(|s| s.workflow.index_of(id))
            .ok_or_else(|| WorkflowError::NodeNotFound(id.to_string()))
    }
}
