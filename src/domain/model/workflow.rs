use std::collections::HashMap;

use crate::error::{WorkflowError, WorkflowResult};

use super::node::{Node, ParamValue, Position, RepeatConfig, SchemaMode};

/// Display-ordered node collection.
///
/// `order` is the insertion/display order, not the execution order. Every id
/// in `order` has an entry in `nodes` and vice versa; all mutations keep the
/// two in step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Workflow {
    order: Vec<String>,
    nodes: HashMap<String, Node>,
}

impl Workflow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from parts, rejecting any mismatch between `order` and `nodes`.
    pub fn from_parts(order: Vec<String>, nodes: Vec<Node>) -> WorkflowResult<Self> {
        let mut map = HashMap::with_capacity(nodes.len());
        for node in nodes {
            let id = node.id.clone();
            if map.insert(id.clone(), node).is_some() {
                return Err(WorkflowError::DuplicateNode(id));
            }
        }
        let workflow = Self { order, nodes: map };
        workflow.check_consistency()?;
        Ok(workflow)
    }

    pub fn order(&self) -> &[String] {
        &self.order
    }

    pub fn nodes(&self) -> &HashMap<String, Node> {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    pub fn node(&self, id: &str) -> WorkflowResult<&Node> {
        self.nodes
            .get(id)
            .ok_or_else(|| WorkflowError::NodeNotFound(id.to_string()))
    }

    pub fn node_mut(&mut self, id: &str) -> WorkflowResult<&mut Node> {
        self.nodes
            .get_mut(id)
            .ok_or_else(|| WorkflowError::NodeNotFound(id.to_string()))
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.order.iter().position(|candidate| candidate == id)
    }

    /// Nodes in display order.
    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.order.iter().filter_map(|id| self.nodes.get(id))
    }

    pub fn push_node(&mut self, node: Node) -> WorkflowResult<()> {
        let at = self.order.len();
        self.insert_node(at, node)
    }

    /// Insert a node at a display position (clamped to the end).
    pub fn insert_node(&mut self, index: usize, node: Node) -> WorkflowResult<()> {
        if self.nodes.contains_key(&node.id) {
            return Err(WorkflowError::DuplicateNode(node.id));
        }
        let index = index.min(self.order.len());
        self.order.insert(index, node.id.clone());
        self.nodes.insert(node.id.clone(), node);
        Ok(())
    }

    /// Remove a node. `ref` bindings elsewhere that point at it are left as
    /// they are and fail when resolved.
    pub fn remove_node(&mut self, id: &str) -> WorkflowResult<Node> {
        let node = self
            .nodes
            .remove(id)
            .ok_or_else(|| WorkflowError::NodeNotFound(id.to_string()))?;
        self.order.retain(|candidate| candidate != id);
        Ok(node)
    }

    /// Move a node to a new display position.
    pub fn move_node(&mut self, id: &str, to: usize) -> WorkflowResult<()> {
        let from = self
            .index_of(id)
            .ok_or_else(|| WorkflowError::NodeNotFound(id.to_string()))?;
        let id = self.order.remove(from);
        let to = to.min(self.order.len());
        self.order.insert(to, id);
        Ok(())
    }

    pub fn rename_node(&mut self, id: &str, name: impl Into<String>) -> WorkflowResult<()> {
        self.node_mut(id)?.name = name.into();
        Ok(())
    }

    pub fn set_param(
        &mut self,
        id: &str,
        name: impl Into<String>,
        value: ParamValue,
    ) -> WorkflowResult<()> {
        self.node_mut(id)?.set_param(name, value);
        Ok(())
    }

    pub fn remove_param(&mut self, id: &str, name: &str) -> WorkflowResult<Option<ParamValue>> {
        Ok(self.node_mut(id)?.remove_param(name))
    }

    pub fn set_raw_params(&mut self, id: &str, raw: impl Into<String>) -> WorkflowResult<()> {
        let node = self.node_mut(id)?;
        node.schema_mode = SchemaMode::Unknown;
        node.raw_params_json = raw.into();
        Ok(())
    }

    pub fn set_repeat(&mut self, id: &str, repeat: RepeatConfig) -> WorkflowResult<()> {
        self.node_mut(id)?.repeat = repeat.normalized();
        Ok(())
    }

    pub fn set_position(&mut self, id: &str, position: Position) -> WorkflowResult<()> {
        self.node_mut(id)?.position = position;
        Ok(())
    }

    /// Verify the `order`/`nodes` invariant.
    pub fn check_consistency(&self) -> WorkflowResult<()> {
        let mut seen = std::collections::HashSet::with_capacity(self.order.len());
        for id in &self.order {
            if !seen.insert(id.as_str()) {
                return Err(WorkflowError::DuplicateNode(id.clone()));
            }
            if !self.nodes.contains_key(id) {
                return Err(WorkflowError::NodeNotFound(id.clone()));
            }
        }
        if let Some(orphan) = self.nodes.keys().find(|id| !seen.contains(id.as_str())) {
            return Err(WorkflowError::InternalError(format!(
                "Node {} is missing from display order",
                orphan
            )));
        }
        Ok(())
    }
}
