use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::Direction;

use crate::domain::model::Node;

use super::types::NodeIndexMap;

/// Directed graph of reference bindings: an edge `source -> dependent` exists
/// when `dependent` has a `ref` binding pointing at `source`.
///
/// Built from scratch for every planning request; never updated in place.
#[derive(Debug, Clone)]
pub struct ReferenceGraph {
    graph: StableDiGraph<String, ()>,
    node_index_map: NodeIndexMap,
    /// Node ids in display order.
    display_order: Vec<String>,
}

impl ReferenceGraph {
    /// Build the graph over `ids` (display order). References to nodes outside
    /// `ids`, or to ids with no node, contribute no edge.
    pub fn build(ids: &[String], nodes: &HashMap<String, Node>) -> Self {
        let mut graph = StableDiGraph::<String, ()>::new();
        let mut node_index_map = NodeIndexMap::with_capacity(ids.len());
        let mut display_order = Vec::with_capacity(ids.len());

        for id in ids {
            if node_index_map.contains_key(id) {
                continue;
            }
            let idx = graph.add_node(id.clone());
            node_index_map.insert(id.clone(), idx);
            display_order.push(id.clone());
        }

        for id in &display_order {
            let Some(node) = nodes.get(id) else {
                continue;
            };
            let target = node_index_map[id];
            for source in node.referenced_nodes() {
                if let Some(&source_idx) = node_index_map.get(source) {
                    graph.update_edge(source_idx, target, ());
                }
            }
        }

        Self {
            graph,
            node_index_map,
            display_order,
        }
    }

    pub fn len(&self) -> usize {
        self.display_order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.display_order.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.node_index_map.contains_key(id)
    }

    pub fn display_order(&self) -> &[String] {
        &self.display_order
    }

    pub(crate) fn graph(&self) -> &StableDiGraph<String, ()> {
        &self.graph
    }

    pub(crate) fn index_of(&self, id: &str) -> Option<NodeIndex> {
        self.node_index_map.get(id).copied()
    }

    pub(crate) fn id_of(&self, idx: NodeIndex) -> Option<&str> {
        self.graph.node_weight(idx).map(String::as_str)
    }

    /// Direct dependents of `id`, in display order.
    pub fn dependents(&self, id: &str) -> Vec<String> {
        self.neighbors(id, Direction::Outgoing)
    }

    /// Direct reference sources of `id`, in display order.
    pub fn sources(&self, id: &str) -> Vec<String> {
        self.neighbors(id, Direction::Incoming)
    }

    fn neighbors(&self, id: &str, direction: Direction) -> Vec<String> {
        let Some(idx) = self.index_of(id) else {
            return Vec::new();
        };
        let found: HashSet<NodeIndex> = self.graph.neighbors_directed(idx, direction).collect();
        self.display_order
            .iter()
            .filter(|candidate| {
                self.node_index_map
                    .get(candidate.as_str())
                    .is_some_and(|i| found.contains(i))
            })
            .cloned()
            .collect()
    }

    /// Source id -> set of dependent ids.
    pub fn adjacency(&self) -> HashMap<String, BTreeSet<String>> {
        self.display_order
            .iter()
            .map(|id| (id.clone(), self.dependents(id).into_iter().collect()))
            .collect()
    }

    /// Every node transitively reachable from `id` over outgoing edges.
    /// `id` itself is included only when it sits on a cycle.
    pub fn downstream(&self, id: &str) -> HashSet<String> {
        let mut reached = HashSet::new();
        let Some(start) = self.index_of(id) else {
            return reached;
        };
        let mut queue: VecDeque<NodeIndex> = self
            .graph
            .neighbors_directed(start, Direction::Outgoing)
            .collect();
        while let Some(idx) = queue.pop_front() {
            let Some(node_id) = self.id_of(idx) else {
                continue;
            };
            if reached.insert(node_id.to_string()) {
                queue.extend(self.graph.neighbors_directed(idx, Direction::Outgoing));
            }
        }
        reached
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::ParamValue;

    fn nodes(list: Vec<Node>) -> (Vec<String>, HashMap<String, Node>) {
        let ids = list.iter().map(|n| n.id.clone()).collect();
        let map = list.into_iter().map(|n| (n.id.clone(), n)).collect();
        (ids, map)
    }

    #[test]
    fn test_build_linear_chain() {
        let (ids, map) = nodes(vec![
            Node::new("a", "m"),
            Node::new("b", "m").with_param("x", ParamValue::reference("a", "result.value")),
            Node::new("c", "m").with_param("y", ParamValue::reference("b", "result")),
        ]);
        let graph = ReferenceGraph::build(&ids, &map);
        assert_eq!(graph.len(), 3);
        assert_eq!(graph.edge_count(), 2);
        assert_eq!(graph.dependents("a"), vec!["b"]);
        assert_eq!(graph.sources("c"), vec!["b"]);
        let adjacency = graph.adjacency();
        assert!(adjacency["a"].contains("b"));
        assert!(adjacency["c"].is_empty());
    }

    #[test]
    fn test_duplicate_refs_collapse() {
        let (ids, map) = nodes(vec![
            Node::new("a", "m"),
            Node::new("b", "m")
                .with_param("x", ParamValue::reference("a", "result"))
                .with_param("y", ParamValue::reference("a", "id")),
        ]);
        let graph = ReferenceGraph::build(&ids, &map);
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn test_out_of_subset_refs_ignored() {
        let (_, map) = nodes(vec![
            Node::new("a", "m"),
            Node::new("b", "m").with_param("x", ParamValue::reference("a", "result")),
            Node::new("c", "m").with_param("x", ParamValue::reference("gone", "result")),
        ]);
        let subset = vec!["b".to_string(), "c".to_string()];
        let graph = ReferenceGraph::build(&subset, &map);
        assert_eq!(graph.edge_count(), 0);
        assert!(!graph.contains("a"));
    }

    #[test]
    fn test_self_reference_is_self_loop() {
        let (ids, map) = nodes(vec![
            Node::new("a", "m").with_param("x", ParamValue::reference("a", "result"))
        ]);
        let graph = ReferenceGraph::build(&ids, &map);
        assert_eq!(graph.edge_count(), 1);
        assert!(graph.downstream("a").contains("a"));
    }

    #[test]
    fn test_downstream_transitive() {
        let (ids, map) = nodes(vec![
            Node::new("r", "m"),
            Node::new("s", "m").with_param("x", ParamValue::reference("r", "result")),
            Node::new("t", "m").with_param("x", ParamValue::reference("s", "result")),
            Node::new("u", "m"),
        ]);
        let graph = ReferenceGraph::build(&ids, &map);
        let downstream = graph.downstream("r");
        assert_eq!(downstream.len(), 2);
        assert!(downstream.contains("s") && downstream.contains("t"));
        assert!(graph.downstream("u").is_empty());
        assert!(graph.downstream("missing").is_empty());
    }
}
