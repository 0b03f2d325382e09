//! Parameter binding resolution.

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::core::path;
use crate::domain::model::{Node, ParamValue, SchemaMode, Workflow};
use crate::error::{NodeError, NodeResult};

use super::registry::{MethodSpec, ParamsShape};

/// Outputs recorded so far in a run, keyed by node id.
pub type OutputMap = HashMap<String, Value>;

/// Resolve one binding against `outputs`.
///
/// A reference to a deleted node, to a node without output, or to a path that
/// is not present in that output is an error.
pub fn resolve_value(
    value: &ParamValue,
    outputs: &OutputMap,
    workflow: &Workflow,
) -> NodeResult<Value> {
    match value {
        ParamValue::Literal { value } => Ok(value.clone()),
        ParamValue::Ref {
            node_id,
            path: ref_path,
        } => {
            let source_name = match workflow.get(node_id) {
                Some(source) => source.name.clone(),
                None => return Err(NodeError::DanglingReference(node_id.clone())),
            };
            let output = outputs
                .get(node_id)
                .ok_or_else(|| NodeError::MissingOutput(source_name.clone()))?;
            path::get(output, ref_path)
                .cloned()
                .ok_or_else(|| NodeError::PathNotFound {
                    source_name,
                    path: ref_path.clone(),
                })
        }
    }
}

/// Resolve every binding of `node`, in binding order.
pub fn resolve_bindings(
    node: &Node,
    outputs: &OutputMap,
    workflow: &Workflow,
) -> NodeResult<Vec<(String, Value)>> {
    node.params
        .iter()
        .map(|binding| {
            resolve_value(&binding.value, outputs, workflow).map(|v| (binding.name.clone(), v))
        })
        .collect()
}

/// Build the `params` payload for a JSON-RPC call.
///
/// Unknown-schema nodes send their raw JSON text (empty text sends nothing).
/// Known-schema nodes send named or positional params per the registry;
/// `null` values are left out of named params, and trailing `null`s are
/// trimmed from positional ones.
pub fn build_rpc_params(
    node: &Node,
    resolved: &[(String, Value)],
    spec: Option<&MethodSpec>,
) -> NodeResult<Option<Value>> {
    if node.schema_mode == SchemaMode::Unknown {
        return parse_raw_params(&node.raw_params_json);
    }

    let shape = spec.map(|s| s.params_shape).unwrap_or_default();
    match shape {
        ParamsShape::Named => {
            let map: Map<String, Value> = resolved
                .iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            if map.is_empty() {
                Ok(None)
            } else {
                Ok(Some(Value::Object(map)))
            }
        }
        ParamsShape::Positional => {
            let lookup: HashMap<&str, &Value> =
                resolved.iter().map(|(k, v)| (k.as_str(), v)).collect();
            let mut items: Vec<Value> = match spec.and_then(|s| s.fields.as_ref()) {
                Some(fields) => fields
                    .iter()
                    .map(|field| {
                        lookup
                            .get(field.name.as_str())
                            .map(|v| (*v).clone())
                            .unwrap_or(Value::Null)
                    })
                    .collect(),
                None => resolved.iter().map(|(_, v)| v.clone()).collect(),
            };
            while items.last().is_some_and(Value::is_null) {
                items.pop();
            }
            Ok(Some(Value::Array(items)))
        }
    }
}

fn parse_raw_params(raw: &str) -> NodeResult<Option<Value>> {
    if raw.trim().is_empty() {
        return Ok(None);
    }
    serde_json::from_str(raw)
        .map(Some)
        .map_err(|e| NodeError::InvalidRawParams(e.to_string()))
}

/// Render a parameter as text for URLs: strings verbatim, everything else as
/// JSON.
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::registry::FieldSpec;
    use serde_json::json;

    fn workflow() -> Workflow {
        let mut wf = Workflow::new();
        wf.push_node(Node::new("a", "getAccounts").with_name("Accounts"))
            .unwrap();
        wf.push_node(
            Node::new("b", "getBalance")
                .with_param("pubkey", ParamValue::reference("a", "result.value[0].pubkey"))
                .with_param("commitment", ParamValue::literal(json!("finalized"))),
        )
        .unwrap();
        wf
    }

    fn outputs() -> OutputMap {
        HashMap::from([(
            "a".to_string(),
            json!({"result": {"value": [{"pubkey": "abc"}]}}),
        )])
    }

    #[test]
    fn test_resolve_ref_and_literal() {
        let wf = workflow();
        let resolved = resolve_bindings(wf.get("b").unwrap(), &outputs(), &wf).unwrap();
        assert_eq!(
            resolved,
            vec![
                ("pubkey".to_string(), json!("abc")),
                ("commitment".to_string(), json!("finalized"))
            ]
        );
    }

    #[test]
    fn test_missing_output_is_error() {
        let wf = workflow();
        let err = resolve_bindings(wf.get("b").unwrap(), &OutputMap::new(), &wf).unwrap_err();
        assert!(matches!(err, NodeError::MissingOutput(name) if name == "Accounts"));
    }

    #[test]
    fn test_missing_path_is_error() {
        let wf = workflow();
        let outputs = HashMap::from([("a".to_string(), json!({"result": {"value": []}}))]);
        let err = resolve_bindings(wf.get("b").unwrap(), &outputs, &wf).unwrap_err();
        assert!(matches!(err, NodeError::PathNotFound { ref path, .. } if path == "result.value[0].pubkey"));
        assert!(err.is_parameter_error());
    }

    #[test]
    fn test_dangling_reference_after_delete() {
        let mut wf = workflow();
        wf.remove_node("a").unwrap();
        let err = resolve_bindings(wf.get("b").unwrap(), &outputs(), &wf).unwrap_err();
        assert!(matches!(err, NodeError::DanglingReference(id) if id == "a"));
    }

    #[test]
    fn test_named_params_skip_nulls() {
        let node = Node::new("n", "m");
        let resolved = vec![
            ("a".to_string(), json!(1)),
            ("b".to_string(), Value::Null),
        ];
        let params = build_rpc_params(&node, &resolved, None).unwrap();
        assert_eq!(params, Some(json!({"a": 1})));
        assert_eq!(build_rpc_params(&node, &[], None).unwrap(), None);
    }

    #[test]
    fn test_named_params_keep_binding_order() {
        let node = Node::new("n", "m");
        let resolved = vec![
            ("pubkey".to_string(), json!("abc")),
            ("commitment".to_string(), json!("finalized")),
        ];
        let params = build_rpc_params(&node, &resolved, None).unwrap().unwrap();
        assert_eq!(
            params.to_string(),
            r#"{"pubkey":"abc","commitment":"finalized"}"#
        );
    }

    #[test]
    fn test_positional_params_follow_declared_order() {
        let spec = MethodSpec::jsonrpc(
            "getBalance",
            vec![
                FieldSpec::required("pubkey", "string"),
                FieldSpec::optional("config", "object"),
                FieldSpec::optional("extra", "object"),
            ],
        )
        .positional();
        let node = Node::new("n", "getBalance");
        let resolved = vec![
            ("config".to_string(), json!({"commitment": "finalized"})),
            ("pubkey".to_string(), json!("abc")),
        ];
        let params = build_rpc_params(&node, &resolved, Some(&spec)).unwrap();
        assert_eq!(params, Some(json!(["abc", {"commitment": "finalized"}])));
    }

    #[test]
    fn test_raw_params() {
        let node = Node::new("n", "m").with_raw_params("[1, {\"a\": true}]");
        assert_eq!(
            build_rpc_params(&node, &[], None).unwrap(),
            Some(json!([1, {"a": true}]))
        );

        let empty = Node::new("n", "m").with_raw_params("  ");
        assert_eq!(build_rpc_params(&empty, &[], None).unwrap(), None);

        let broken = Node::new("n", "m").with_raw_params("[1,");
        assert!(matches!(
            build_rpc_params(&broken, &[], None),
            Err(NodeError::InvalidRawParams(_))
        ));
    }

    #[test]
    fn test_value_to_text() {
        assert_eq!(value_to_text(&json!("abc")), "abc");
        assert_eq!(value_to_text(&json!(12)), "12");
        assert_eq!(value_to_text(&json!(true)), "true");
    }
}
