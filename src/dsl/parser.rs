//! Document parser: converts workflow JSON text to and from a [`Workflow`].

use super::schema::WorkflowDocument;
use super::validation::validate_document_text;
use crate::domain::model::Workflow;
use crate::error::{WorkflowError, WorkflowResult};

/// Parse and validate document text into a workflow plus its selected node.
///
/// Nothing is produced unless the whole document is valid; the diagnostics
/// are returned in [`WorkflowError::ValidationFailed`].
pub fn parse_document(content: &str) -> WorkflowResult<(Workflow, Option<String>)> {
    let doc = validate_document_text(content)
        .map_err(|report| WorkflowError::ValidationFailed(Box::new(report)))?;
    doc.into_workflow()
}

/// Serialize a workflow as pretty-printed document JSON.
pub fn serialize_document(
    workflow: &Workflow,
    selected_node_id: Option<&str>,
) -> WorkflowResult<String> {
    let doc = WorkflowDocument::from_workflow(workflow, selected_node_id);
    Ok(serde_json::to_string_pretty(&doc)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{Node, ParamValue, RepeatConfig, TimeUnit};
    use serde_json::json;

    #[test]
    fn test_round_trip() {
        let mut wf = Workflow::new();
        wf.push_node(Node::new("a", "getSlot").with_name("Slot").with_repeat(RepeatConfig {
            enabled: true,
            count: 2,
            interval: 5,
            unit: TimeUnit::Seconds,
            loop_count: 0,
        }))
        .unwrap();
        wf.push_node(
            Node::new("b", "getBlock")
                .with_param("slot", ParamValue::reference("a", "result"))
                .with_param("opts", ParamValue::literal(json!({"full": true}))),
        )
        .unwrap();
        wf.push_node(Node::new("c", "custom_rpc").with_raw_params("[1, 2]"))
            .unwrap();

        let text = serialize_document(&wf, Some("b")).unwrap();
        let (restored, selected) = parse_document(&text).unwrap();
        assert_eq!(restored.order(), wf.order());
        for node in wf.iter() {
            let other = restored.get(&node.id).unwrap();
            assert_eq!(other.name, node.name);
            assert_eq!(other.params, node.params);
            assert_eq!(other.repeat, node.repeat);
            assert_eq!(other.raw_params_json, node.raw_params_json);
            assert_eq!(other.schema_mode, node.schema_mode);
        }
        assert_eq!(selected.as_deref(), Some("b"));
    }

    #[test]
    fn test_invalid_document_reports_fields() {
        let err = parse_document(r#"{"version":2,"order":[],"nodes":[]}"#).unwrap_err();
        match err {
            WorkflowError::ValidationFailed(report) => {
                assert!(report.has_field("version"));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }
}
