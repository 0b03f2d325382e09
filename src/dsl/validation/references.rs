use std::collections::{HashMap, HashSet};

use crate::domain::model::{ParamValue, SchemaMode};
use crate::dsl::schema::WorkflowDocument;

use super::types::Diagnostic;

/// Cross-field checks on a structurally valid document: unique ids, `order`
/// and `nodes` naming the same set, and reference targets.
pub fn validate(doc: &WorkflowDocument) -> Vec<Diagnostic> {
    let mut diags = Vec::new();

    let mut node_index: HashMap<&str, usize> = HashMap::new();
    for (idx, node) in doc.nodes.iter().enumerate() {
        if node_index.insert(node.id.as_str(), idx).is_some() {
            diags.push(
                Diagnostic::error(
                    "E101",
                    format!("Duplicate node id: {}", node.id),
                    format!("nodes[{}].id", idx),
                )
                .for_node(&node.id),
            );
        }
    }

    let mut in_order: HashSet<&str> = HashSet::new();
    for (idx, id) in doc.order.iter().enumerate() {
        if !in_order.insert(id.as_str()) {
            diags.push(Diagnostic::error(
                "E104",
                format!("Node {} appears more than once in order", id),
                format!("order[{}]", idx),
            ));
        } else if !node_index.contains_key(id.as_str()) {
            diags.push(Diagnostic::error(
                "E102",
                format!("order names unknown node: {}", id),
                format!("order[{}]", idx),
            ));
        }
    }

    for (idx, node) in doc.nodes.iter().enumerate() {
        if !in_order.contains(node.id.as_str()) {
            diags.push(
                Diagnostic::error(
                    "E103",
                    format!("Node {} is missing from order", node.id),
                    format!("nodes[{}].id", idx),
                )
                .for_node(&node.id),
            );
        }

        for (pidx, binding) in node.params.iter().enumerate() {
            if let ParamValue::Ref { node_id, .. } = &binding.value {
                // Dangling references are allowed; they fail when resolved.
                if !node_index.contains_key(node_id.as_str()) {
                    diags.push(
                        Diagnostic::warning(
                            "W101",
                            format!("Param {} references missing node {}", binding.name, node_id),
                            format!("nodes[{}].params[{}].value.nodeId", idx, pidx),
                        )
                        .for_node(&node.id),
                    );
                }
            }
        }

        if node.schema_mode == SchemaMode::Unknown
            && !node.raw_params_json.trim().is_empty()
            && serde_json::from_str::<serde_json::Value>(&node.raw_params_json).is_err()
        {
            diags.push(
                Diagnostic::warning(
                    "W103",
                    "rawParamsJson is not valid JSON",
                    format!("nodes[{}].rawParamsJson", idx),
                )
                .for_node(&node.id),
            );
        }
    }

    if let Some(selected) = &doc.selected_node_id {
        if !node_index.contains_key(selected.as_str()) {
            diags.push(Diagnostic::warning(
                "W102",
                format!("Selected node {} does not exist", selected),
                "selectedNodeId",
            ));
        }
    }

    diags
}
