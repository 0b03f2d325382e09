use std::collections::{BTreeSet, HashMap};

use petgraph::Direction;

use super::builder::ReferenceGraph;

/// A topological execution order over a node subset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionPlan {
    /// Execution order. Equals the display order when `has_cycle` is set.
    pub order: Vec<String>,
    pub has_cycle: bool,
    /// Nodes that could not be ordered (on a cycle or downstream of one),
    /// in display order. Empty when `has_cycle` is false.
    pub unresolved: Vec<String>,
}

impl ExecutionPlan {
    /// Restrict the order to `ids`, keeping the planned sequence.
    pub fn restrict(&self, ids: &[String]) -> Vec<String> {
        self.order
            .iter()
            .filter(|id| ids.contains(id))
            .cloned()
            .collect()
    }

    /// 1-based execution position per node, for `#n` display annotations.
    pub fn positions(&self) -> HashMap<String, usize> {
        if self.has_cycle {
            return HashMap::new();
        }
        self.order
            .iter()
            .enumerate()
            .map(|(idx, id)| (id.clone(), idx + 1))
            .collect()
    }
}

/// Kahn's algorithm with display-order tie-breaking.
///
/// Among ready nodes the one earliest in display order is always taken next,
/// so the result is deterministic and stays as close to display order as the
/// references allow.
pub fn plan_execution(graph: &ReferenceGraph) -> ExecutionPlan {
    let display = graph.display_order();
    let position: HashMap<&str, usize> = display
        .iter()
        .enumerate()
        .map(|(pos, id)| (id.as_str(), pos))
        .collect();

    let mut indegree: Vec<usize> = display
        .iter()
        .map(|id| {
            graph
                .index_of(id)
                .map(|idx| {
                    graph
                        .graph()
                        .neighbors_directed(idx, Direction::Incoming)
                        .count()
                })
                .unwrap_or(0)
        })
        .collect();

    let mut ready: BTreeSet<usize> = indegree
        .iter()
        .enumerate()
        .filter(|(_, degree)| **degree == 0)
        .map(|(pos, _)| pos)
        .collect();

    let mut order = Vec::with_capacity(display.len());
    while let Some(pos) = ready.pop_first() {
        let id = &display[pos];
        order.push(id.clone());
        let Some(idx) = graph.index_of(id) else {
            continue;
        };
        for dependent in graph.graph().neighbors_directed(idx, Direction::Outgoing) {
            let Some(dep_pos) = graph.id_of(dependent).and_then(|d| position.get(d)) else {
                continue;
            };
            let degree = &mut indegree[*dep_pos];
            *degree = degree.saturating_sub(1);
            if *degree == 0 {
                ready.insert(*dep_pos);
            }
        }
    }

    if order.len() < display.len() {
        let resolved: BTreeSet<&str> = order.iter().map(String::as_str).collect();
        let unresolved = display
            .iter()
            .filter(|id| !resolved.contains(id.as_str()))
            .cloned()
            .collect();
        return ExecutionPlan {
            order: display.to_vec(),
            has_cycle: true,
            unresolved,
        };
    }

    ExecutionPlan {
        order,
        has_cycle: false,
        unresolved: Vec::new(),
    }
}
