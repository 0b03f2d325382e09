use std::collections::HashMap;

use crate::domain::execution::PlannedCount;
use crate::domain::model::Node;

use super::builder::ReferenceGraph;
use super::schedule::{build_schedule, Step};

/// Planned invocations per node for a run over `order`.
///
/// `order` is the restricted topological order and `graph` the reference graph
/// over the same subset. Counting follows the run schedule: a repeating node
/// attributes its total calls to every dependent in its repeat scope, and
/// those dependents are not counted again on their own. An endless loop marks
/// every transitive dependent infinite, whether or not it is in scope. Counts
/// only grow; once infinite a count stays infinite.
pub fn planned_call_counts(
    order: &[String],
    graph: &ReferenceGraph,
    nodes: &HashMap<String, Node>,
) -> HashMap<String, PlannedCount> {
    let mut counts: HashMap<String, PlannedCount> = order
        .iter()
        .map(|id| (id.clone(), PlannedCount::default()))
        .collect();

    for step in build_schedule(order, graph, nodes) {
        match step {
            Step::Once(id) => bump(&mut counts, &id, Some(1)),
            Step::Repeat { id, scope } => {
                let Some(node) = nodes.get(&id) else {
                    continue;
                };
                let total = node.repeat.total_calls();
                bump(&mut counts, &id, total);
                for dependent in &scope {
                    bump(&mut counts, dependent, total);
                }
                if total.is_none() {
                    let reachable = graph.downstream(&id);
                    for dependent in order.iter().filter(|other| reachable.contains(*other)) {
                        bump(&mut counts, dependent, None);
                    }
                }
            }
        }
    }

    counts
}

fn bump(counts: &mut HashMap<String, PlannedCount>, id: &str, calls: Option<u64>) {
    let entry = counts.entry(id.to_string()).or_default();
    *entry = match calls {
        Some(calls) => entry.add(calls),
        None => PlannedCount::Infinite,
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{ParamValue, RepeatConfig};
    use crate::graph::plan_execution;

    fn counts_for(list: Vec<Node>) -> HashMap<String, PlannedCount> {
        let ids: Vec<String> = list.iter().map(|n| n.id.clone()).collect();
        let map: HashMap<String, Node> = list.into_iter().map(|n| (n.id.clone(), n)).collect();
        let graph = ReferenceGraph::build(&ids, &map);
        let plan = plan_execution(&graph);
        planned_call_counts(&plan.order, &graph, &map)
    }

    fn repeat(count: u32, loop_count: u32) -> RepeatConfig {
        RepeatConfig {
            enabled: true,
            count,
            loop_count,
            ..RepeatConfig::default()
        }
    }

    #[test]
    fn test_plain_nodes_count_once() {
        let counts = counts_for(vec![Node::new("a", "m"), Node::new("b", "m")]);
        assert_eq!(counts["a"], PlannedCount::Finite(1));
        assert_eq!(counts["b"], PlannedCount::Finite(1));
    }

    #[test]
    fn test_repeat_propagates_to_transitive_dependents() {
        let counts = counts_for(vec![
            Node::new("r", "m").with_repeat(repeat(3, 2)),
            Node::new("s", "m").with_param("x", ParamValue::reference("r", "result")),
            Node::new("t", "m").with_param("x", ParamValue::reference("s", "result")),
            Node::new("u", "m"),
        ]);
        assert_eq!(counts["r"], PlannedCount::Finite(6));
        assert_eq!(counts["s"], PlannedCount::Finite(6));
        assert_eq!(counts["t"], PlannedCount::Finite(6));
        assert_eq!(counts["u"], PlannedCount::Finite(1));
    }

    #[test]
    fn test_infinite_loop_propagates() {
        let counts = counts_for(vec![
            Node::new("r", "m").with_repeat(repeat(2, 0)),
            Node::new("s", "m").with_param("x", ParamValue::reference("r", "result")),
            Node::new("u", "m"),
        ]);
        assert_eq!(counts["r"], PlannedCount::Infinite);
        assert_eq!(counts["s"], PlannedCount::Infinite);
        assert_eq!(counts["u"], PlannedCount::Finite(1));
    }

    #[test]
    fn test_infinite_not_overwritten_by_finite() {
        // Both repeating nodes feed d; the finite contribution from b must not
        // shrink the infinite one from a.
        let counts = counts_for(vec![
            Node::new("a", "m").with_repeat(repeat(1, 0)),
            Node::new("b", "m").with_repeat(repeat(2, 2)),
            Node::new("d", "m")
                .with_param("x", ParamValue::reference("a", "result"))
                .with_param("y", ParamValue::reference("b", "result")),
        ]);
        assert_eq!(counts["a"], PlannedCount::Infinite);
        assert_eq!(counts["b"], PlannedCount::Finite(4));
        assert_eq!(counts["d"], PlannedCount::Infinite);
    }

    #[test]
    fn test_shared_dependent_follows_the_last_repeat() {
        // d needs both a and b, so it only runs inside b's repeat.
        let counts = counts_for(vec![
            Node::new("a", "m").with_repeat(repeat(2, 1)),
            Node::new("b", "m").with_repeat(repeat(3, 1)),
            Node::new("d", "m")
                .with_param("x", ParamValue::reference("a", "result"))
                .with_param("y", ParamValue::reference("b", "result")),
        ]);
        assert_eq!(counts["a"], PlannedCount::Finite(2));
        assert_eq!(counts["d"], PlannedCount::Finite(3));
    }

    #[test]
    fn test_pending_source_counts_once_and_dependent_repeats() {
        let counts = counts_for(vec![
            Node::new("r", "m").with_repeat(repeat(2, 1)),
            Node::new("x", "m"),
            Node::new("d", "m")
                .with_param("a", ParamValue::reference("r", "result"))
                .with_param("b", ParamValue::reference("x", "result")),
        ]);
        assert_eq!(counts["r"], PlannedCount::Finite(2));
        assert_eq!(counts["x"], PlannedCount::Finite(1));
        assert_eq!(counts["d"], PlannedCount::Finite(2));
    }

    #[test]
    fn test_repeating_dependent_is_absorbed() {
        // s repeats itself but sits downstream of r, so it inherits r's count.
        let counts = counts_for(vec![
            Node::new("r", "m").with_repeat(repeat(2, 1)),
            Node::new("s", "m")
                .with_repeat(repeat(5, 5))
                .with_param("x", ParamValue::reference("r", "result")),
        ]);
        assert_eq!(counts["s"], PlannedCount::Finite(2));
    }

    #[test]
    fn test_nodes_missing_from_map_default_to_zero() {
        let ids = vec!["ghost".to_string()];
        let map = HashMap::new();
        let graph = ReferenceGraph::build(&ids, &map);
        let counts = planned_call_counts(&ids, &graph, &map);
        assert_eq!(counts["ghost"], PlannedCount::Finite(0));
    }
}
