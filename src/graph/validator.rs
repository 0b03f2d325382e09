use petgraph::algo::has_path_connecting;

use crate::error::WorkflowError;

use super::builder::ReferenceGraph;
use super::planner::{plan_execution, ExecutionPlan};

/// Would adding the reference edge `source -> target` close a cycle?
///
/// True for a self reference, or when `target` already reaches `source`.
/// Nodes unknown to the graph cannot be part of a cycle.
pub fn would_create_cycle(graph: &ReferenceGraph, source: &str, target: &str) -> bool {
    if source == target {
        return true;
    }
    let (Some(source_idx), Some(target_idx)) = (graph.index_of(source), graph.index_of(target))
    else {
        return false;
    };
    has_path_connecting(graph.graph(), target_idx, source_idx, None)
}

/// Plan the graph, failing when any reference cycle exists.
pub fn validate_acyclic(graph: &ReferenceGraph) -> Result<ExecutionPlan, WorkflowError> {
    let plan = plan_execution(graph);
    if plan.has_cycle {
        return Err(WorkflowError::ReferenceCycle {
            nodes: plan.unresolved,
        });
    }
    Ok(plan)
}
