//! Portable workflow document.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::model::{
    Node, NodeStatus, ParamBinding, Position, RepeatConfig, SchemaMode, Workflow,
};
use crate::error::WorkflowResult;

/// Document versions this build can import.
pub const SUPPORTED_DOCUMENT_VERSIONS: &[u32] = &[1];

/// Version written by export.
pub const CURRENT_DOCUMENT_VERSION: u32 = 1;

/// Top-level export document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowDocument {
    pub version: u32,
    /// Display order of node ids.
    pub order: Vec<String>,
    pub nodes: Vec<NodeDocument>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_node_id: Option<String>,
}

/// One node as stored in a [`WorkflowDocument`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDocument {
    pub id: String,
    pub name: String,
    pub method: String,
    #[serde(default)]
    pub schema_mode: SchemaMode,
    #[serde(default)]
    pub params: Vec<ParamBinding>,
    #[serde(default)]
    pub raw_params_json: String,
    #[serde(default)]
    pub repeat: RepeatConfig,
    #[serde(default)]
    pub position: Position,
    /// Last recorded output. Informational only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
}

impl From<&Node> for NodeDocument {
    fn from(node: &Node) -> Self {
        NodeDocument {
            id: node.id.clone(),
            name: node.name.clone(),
            method: node.method.clone(),
            schema_mode: node.schema_mode,
            params: node.params.clone(),
            raw_params_json: node.raw_params_json.clone(),
            repeat: node.repeat.clone(),
            position: node.position,
            output: node.output.clone(),
        }
    }
}

impl NodeDocument {
    /// Restored nodes start idle; a stored output counts as a prior success.
    pub fn into_node(self) -> Node {
        let status = if self.output.is_some() {
            NodeStatus::Success
        } else {
            NodeStatus::Idle
        };
        Node {
            id: self.id,
            name: self.name,
            method: self.method,
            schema_mode: self.schema_mode,
            params: self.params,
            raw_params_json: self.raw_params_json,
            repeat: self.repeat.normalized(),
            position: self.position,
            status,
            output: self.output,
            error: None,
        }
    }
}

impl WorkflowDocument {
    pub fn from_workflow(workflow: &Workflow, selected_node_id: Option<&str>) -> Self {
        WorkflowDocument {
            version: CURRENT_DOCUMENT_VERSION,
            order: workflow.order().to_vec(),
            nodes: workflow.iter().map(NodeDocument::from).collect(),
            selected_node_id: selected_node_id.map(str::to_string),
        }
    }

    /// Rebuild the workflow. The selection is dropped when it names no node.
    pub fn into_workflow(self) -> WorkflowResult<(Workflow, Option<String>)> {
        let nodes = self.nodes.into_iter().map(NodeDocument::into_node).collect();
        let workflow = Workflow::from_parts(self.order, nodes)?;
        let selected = self
            .selected_node_id
            .filter(|id| workflow.get(id).is_some());
        Ok((workflow, selected))
    }
}
