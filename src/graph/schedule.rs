//! Run schedule: the restricted order grouped into single calls and repeat
//! blocks.

use std::collections::{HashMap, HashSet};

use crate::domain::model::Node;

use super::builder::ReferenceGraph;

/// One unit of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Execute the node once.
    Once(String),
    /// Execute the node per repeat iteration, each iteration followed by
    /// `scope` in order.
    Repeat { id: String, scope: Vec<String> },
}

/// Group `order` into steps so that no node runs before its in-subset
/// sources have output.
///
/// When a dependent of a repeating node also needs a source that has not run
/// yet, that source (with its own pending sources) is moved ahead of the
/// repeating node, provided none of them repeats. A dependent still waiting
/// on a pending repeating source is left out of the scope and runs at its own
/// place in the order.
pub fn build_schedule(
    order: &[String],
    graph: &ReferenceGraph,
    nodes: &HashMap<String, Node>,
) -> Vec<Step> {
    let mut queue: Vec<String> = order.to_vec();
    let mut done: HashSet<String> = HashSet::new();
    let mut steps = Vec::new();
    let mut i = 0;

    while i < queue.len() {
        let id = queue[i].clone();
        if done.contains(&id) {
            i += 1;
            continue;
        }
        let Some(node) = nodes.get(&id) else {
            i += 1;
            continue;
        };
        if !node.repeat.enabled {
            done.insert(id.clone());
            steps.push(Step::Once(id));
            i += 1;
            continue;
        }

        let reachable = graph.downstream(&id);
        let downstream: Vec<String> = queue[i + 1..]
            .iter()
            .filter(|other| **other != id && reachable.contains(*other) && !done.contains(*other))
            .cloned()
            .collect();

        let pending = pending_sources(&id, &downstream, &reachable, &done, graph);
        let hoist: Vec<String> = queue[i + 1..]
            .iter()
            .filter(|other| pending.contains(*other))
            .filter(|other| {
                let mut chain = pending_ancestors(other, &done, graph);
                chain.insert((*other).clone());
                chain
                    .iter()
                    .all(|n| nodes.get(n).map_or(true, |n| !n.repeat.enabled))
            })
            .cloned()
            .collect();
        if !hoist.is_empty() {
            tracing::debug!(node_id = %id, hoisted = ?hoist, "running pending sources before repeat");
            queue.retain(|n| !hoist.contains(n));
            for (offset, moved) in hoist.into_iter().enumerate() {
                queue.insert(i + offset, moved);
            }
            continue;
        }

        let mut scope: Vec<String> = Vec::new();
        for dependent in &downstream {
            let ready = graph
                .sources(dependent)
                .iter()
                .all(|s| *s == id || done.contains(s) || scope.contains(s));
            if ready {
                scope.push(dependent.clone());
            }
        }

        done.insert(id.clone());
        done.extend(scope.iter().cloned());
        steps.push(Step::Repeat { id, scope });
        i += 1;
    }

    steps
}

/// Sources of `downstream` outside the repeat that have not run yet, plus
/// their own pending ancestors.
fn pending_sources(
    id: &str,
    downstream: &[String],
    reachable: &HashSet<String>,
    done: &HashSet<String>,
    graph: &ReferenceGraph,
) -> HashSet<String> {
    let mut pending = HashSet::new();
    for dependent in downstream {
        for source in graph.sources(dependent) {
            if source != id && !reachable.contains(&source) && !done.contains(&source) {
                pending.extend(pending_ancestors(&source, done, graph));
                pending.insert(source);
            }
        }
    }
    pending
}

fn pending_ancestors(id: &str, done: &HashSet<String>, graph: &ReferenceGraph) -> HashSet<String> {
    let mut found = HashSet::new();
    let mut stack = vec![id.to_string()];
    while let Some(current) = stack.pop() {
        for source in graph.sources(&current) {
            if !done.contains(&source) && found.insert(source.clone()) {
                stack.push(source);
            }
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{ParamValue, RepeatConfig};
    use crate::graph::plan_execution;

    fn schedule_for(list: Vec<Node>) -> Vec<Step> {
        let ids: Vec<String> = list.iter().map(|n| n.id.clone()).collect();
        let map: HashMap<String, Node> = list.into_iter().map(|n| (n.id.clone(), n)).collect();
        let graph = ReferenceGraph::build(&ids, &map);
        let plan = plan_execution(&graph);
        build_schedule(&plan.order, &graph, &map)
    }

    fn repeat(count: u32) -> RepeatConfig {
        RepeatConfig {
            enabled: true,
            count,
            ..RepeatConfig::default()
        }
    }

    fn refs(id: &str, sources: &[&str]) -> Node {
        sources.iter().fold(Node::new(id, "m"), |node, s| {
            node.with_param(format!("from_{}", s), ParamValue::reference(*s, "result"))
        })
    }

    fn once(id: &str) -> Step {
        Step::Once(id.to_string())
    }

    fn rep(id: &str, scope: &[&str]) -> Step {
        Step::Repeat {
            id: id.to_string(),
            scope: scope.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_plain_order_runs_once_each() {
        let steps = schedule_for(vec![Node::new("a", "m"), refs("b", &["a"])]);
        assert_eq!(steps, vec![once("a"), once("b")]);
    }

    #[test]
    fn test_repeat_scope_is_transitive() {
        let steps = schedule_for(vec![
            Node::new("r", "m").with_repeat(repeat(2)),
            refs("s", &["r"]),
            refs("t", &["s"]),
            Node::new("u", "m"),
        ]);
        assert_eq!(steps, vec![rep("r", &["s", "t"]), once("u")]);
    }

    #[test]
    fn test_pending_source_runs_before_repeat() {
        let steps = schedule_for(vec![
            Node::new("r", "m").with_repeat(repeat(2)),
            Node::new("x", "m"),
            refs("d", &["r", "x"]),
        ]);
        assert_eq!(steps, vec![once("x"), rep("r", &["d"])]);
    }

    #[test]
    fn test_pending_source_chain_is_hoisted_in_order() {
        let steps = schedule_for(vec![
            Node::new("r", "m").with_repeat(repeat(2)),
            Node::new("w", "m"),
            refs("x", &["w"]),
            refs("d", &["r", "x"]),
        ]);
        assert_eq!(steps, vec![once("w"), once("x"), rep("r", &["d"])]);
    }

    #[test]
    fn test_dependent_of_two_repeats_waits_for_both() {
        let steps = schedule_for(vec![
            Node::new("a", "m").with_repeat(repeat(2)),
            Node::new("b", "m").with_repeat(repeat(3)),
            refs("d", &["a", "b"]),
            refs("e", &["d"]),
        ]);
        assert_eq!(steps, vec![rep("a", &[]), rep("b", &["d", "e"])]);
    }

    #[test]
    fn test_repeating_dependent_is_absorbed() {
        let steps = schedule_for(vec![
            Node::new("r", "m").with_repeat(repeat(2)),
            refs("s", &["r"]).with_repeat(repeat(5)),
        ]);
        assert_eq!(steps, vec![rep("r", &["s"])]);
    }
}
