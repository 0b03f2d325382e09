//! # rpcflow: execution planner and runtime for JSON-RPC/HTTP workflows
//!
//! `rpcflow` is the core of a visual workflow builder. Users compose a
//! sequence of calls to a remote JSON-RPC or HTTP API and wire the output of
//! earlier calls into later ones with path references such as
//! `result.value[0].pubkey`. This crate provides:
//!
//! - **Planning**: a reference graph rebuilt from node bindings, a stable
//!   topological order (Kahn's algorithm, display-order tie-break) and cycle
//!   detection for the whole graph or a single proposed edge.
//! - **Call counts**: planned invocations per node for repeat/loop
//!   configuration, with an infinite sentinel.
//! - **Execution**: sequential node invocation with repeat intervals, loop
//!   cycles, downstream re-execution and cooperative cancellation.
//! - **Documents**: versioned JSON export/import with per-field diagnostics.
//! - **Assistant proposals**: registry-checked node proposals that are
//!   materialized and run as a validation pass.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use rpcflow::nodes::{FieldSpec, MethodSpec, StaticMethodRegistry};
//! use rpcflow::WorkflowSession;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), rpcflow::WorkflowError> {
//!     let registry = StaticMethodRegistry::new()
//!         .with(MethodSpec::jsonrpc("getSlot", vec![]))
//!         .with(MethodSpec::jsonrpc("getBlock", vec![FieldSpec::required("slot", "u64")]));
//!     let session = WorkflowSession::builder(Arc::new(registry)).build()?;
//!
//!     let slot = session.add_node("getSlot")?;
//!     let block = session.add_node("getBlock")?;
//!     session.connect_reference(&block, "slot", &slot, "result")?;
//!
//!     let outcome = session.run_all().await?;
//!     println!("{}", outcome.message());
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod application;
pub mod assistant;
pub mod core;
pub mod domain;
pub mod dsl;
pub mod error;
pub mod graph;
pub mod nodes;

pub use crate::api::{ReferenceCandidate, RunHandle, RunProgress, WorkflowSession, WorkflowSessionBuilder};
pub use crate::assistant::{Proposal, ProposalError, ProposalReport, ProposedParams};
pub use crate::core::{
    CancelSignal, EngineConfig, FakeIdGenerator, HttpPoolConfig, HttpTransport, IdGenerator,
    RealIdGenerator, RunEvent, RuntimeContext, Transport, TransportRequest, TransportResponse,
};
pub use crate::domain::execution::{ExecutionOutcome, PlannedCount, RunFailure, RunOutcome};
pub use crate::domain::model::{
    Node, NodeStatus, ParamBinding, ParamValue, Position, RepeatConfig, SchemaMode, TimeUnit,
    Workflow,
};
pub use crate::dsl::{
    parse_document, serialize_document, Diagnostic, DiagnosticLevel, ValidationReport,
    WorkflowDocument,
};
pub use crate::error::{NodeError, WorkflowError};
pub use crate::graph::{plan_execution, would_create_cycle, ExecutionPlan, ReferenceGraph};
pub use crate::nodes::{MethodRegistry, MethodSpec, NodeExecutor, StaticMethodRegistry};
