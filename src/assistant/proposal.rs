use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::core::runtime_context::IdGenerator;
use crate::domain::execution::RunOutcome;
use crate::domain::model::{Node, ParamBinding, ParamValue, SchemaMode};
use crate::nodes::{MethodRegistry, MethodSpec};

/// Why a batch of proposals was turned down. The display strings are shown
/// to the assistant verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProposalError {
    #[error("Method '{0}' is not available")]
    MethodNotAvailable(String),
    #[error("Method '{method}' is missing required field '{field}'")]
    MissingRequiredField { method: String, field: String },
    #[error("Proposal list is empty")]
    Empty,
}

/// Parameters of a proposed node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProposedParams {
    /// Bindings by field name. A `ref` may name another proposal's local id.
    ByField(Vec<ParamBinding>),
    /// Raw JSON params text.
    Raw(String),
}

/// One candidate node from the assistant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Proposal {
    pub method: String,
    pub params: ProposedParams,
    #[serde(default)]
    pub local_id: Option<String>,
}

impl Proposal {
    pub fn by_field(method: impl Into<String>, params: Vec<ParamBinding>) -> Self {
        Self {
            method: method.into(),
            params: ProposedParams::ByField(params),
            local_id: None,
        }
    }

    pub fn raw(method: impl Into<String>, raw: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            params: ProposedParams::Raw(raw.into()),
            local_id: None,
        }
    }

    pub fn with_local_id(mut self, local_id: impl Into<String>) -> Self {
        self.local_id = Some(local_id.into());
        self
    }
}

/// What happened to an accepted batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProposalReport {
    /// Ids of the created nodes, in proposal order.
    pub created: Vec<String>,
    pub outcome: RunOutcome,
}

impl ProposalReport {
    pub fn success(&self) -> bool {
        self.outcome.success
    }
}

/// Reject the batch on the first proposal naming an unknown method or
/// leaving out a required field.
pub fn validate_proposals(
    registry: &dyn MethodRegistry,
    proposals: &[Proposal],
) -> Result<(), ProposalError> {
    if proposals.is_empty() {
        return Err(ProposalError::Empty);
    }
    for proposal in proposals {
        let spec = registry
            .lookup(&proposal.method)
            .ok_or_else(|| ProposalError::MethodNotAvailable(proposal.method.clone()))?;
        if let ProposedParams::ByField(bindings) = &proposal.params {
            if let Some(missing) = spec
                .required_fields()
                .find(|field| !bindings.iter().any(|b| b.name == field.name))
            {
                return Err(ProposalError::MissingRequiredField {
                    method: proposal.method.clone(),
                    field: missing.name.clone(),
                });
            }
        }
    }
    Ok(())
}

/// Build nodes for validated proposals. References to a proposal's local id
/// are rewritten to the id of the node created for it.
pub fn materialize(
    registry: &dyn MethodRegistry,
    proposals: &[Proposal],
    ids: &dyn IdGenerator,
) -> Vec<Node> {
    let new_ids: Vec<String> = proposals.iter().map(|_| ids.next_id()).collect();
    let remap: HashMap<&str, &str> = proposals
        .iter()
        .zip(&new_ids)
        .filter_map(|(p, id)| p.local_id.as_deref().map(|local| (local, id.as_str())))
        .collect();

    proposals
        .iter()
        .zip(new_ids.iter())
        .map(|(proposal, id)| {
            let spec = registry.lookup(&proposal.method);
            let mut node = node_with_defaults(id, &proposal.method, spec.as_ref());
            match &proposal.params {
                ProposedParams::Raw(raw) => {
                    node.params.clear();
                    node.schema_mode = SchemaMode::Unknown;
                    node.raw_params_json = raw.clone();
                }
                ProposedParams::ByField(bindings) => {
                    for binding in bindings {
                        let value = match &binding.value {
                            ParamValue::Ref { node_id, path } => ParamValue::Ref {
                                node_id: remap
                                    .get(node_id.as_str())
                                    .map(|id| id.to_string())
                                    .unwrap_or_else(|| node_id.clone()),
                                path: path.clone(),
                            },
                            literal => literal.clone(),
                        };
                        node.set_param(binding.name.clone(), value);
                    }
                }
            }
            node
        })
        .collect()
}

/// A fresh node for `method`: one `null` literal per declared field, or raw
/// params when the registry has no schema for it.
pub fn node_with_defaults(id: &str, method: &str, spec: Option<&MethodSpec>) -> Node {
    let mut node = Node::new(id, method);
    match spec.and_then(|s| s.fields.as_ref()) {
        Some(fields) => {
            for field in fields {
                node.set_param(field.name.clone(), ParamValue::literal(Value::Null));
            }
        }
        None => node.schema_mode = SchemaMode::Unknown,
    }
    node
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::runtime_context::FakeIdGenerator;
    use crate::nodes::{FieldSpec, StaticMethodRegistry};
    use serde_json::json;

    fn registry() -> StaticMethodRegistry {
        StaticMethodRegistry::new()
            .with(MethodSpec::jsonrpc("getSlot", vec![]))
            .with(MethodSpec::jsonrpc(
                "getBlock",
                vec![
                    FieldSpec::required("slot", "u64"),
                    FieldSpec::optional("encoding", "string"),
                ],
            ))
            .with(MethodSpec::raw("custom_rpc"))
    }

    fn binding(name: &str, value: ParamValue) -> ParamBinding {
        ParamBinding {
            name: name.to_string(),
            value,
        }
    }

    #[test]
    fn test_unknown_method_rejected() {
        let err = validate_proposals(&registry(), &[Proposal::by_field("getFoo", vec![])]).unwrap_err();
        assert_eq!(err.to_string(), "Method 'getFoo' is not available");
    }

    #[test]
    fn test_missing_required_field_rejected() {
        let err =
            validate_proposals(&registry(), &[Proposal::by_field("getBlock", vec![])]).unwrap_err();
        assert_eq!(err.to_string(), "Method 'getBlock' is missing required field 'slot'");
    }

    #[test]
    fn test_empty_batch_rejected() {
        assert_eq!(validate_proposals(&registry(), &[]), Err(ProposalError::Empty));
    }

    #[test]
    fn test_materialize_remaps_local_ids() {
        let proposals = vec![
            Proposal::by_field("getSlot", vec![]).with_local_id("slot"),
            Proposal::by_field(
                "getBlock",
                vec![binding("slot", ParamValue::reference("slot", "result"))],
            ),
            Proposal::raw("custom_rpc", "[1]"),
        ];
        validate_proposals(&registry(), &proposals).unwrap();
        let nodes = materialize(&registry(), &proposals, &FakeIdGenerator::new("node"));
        assert_eq!(nodes.len(), 3);
        assert_eq!(nodes[0].id, "node-0");
        assert_eq!(
            nodes[1].param("slot"),
            Some(&ParamValue::reference("node-0", "result"))
        );
        // Declared optional field keeps its null default.
        assert_eq!(nodes[1].param("encoding"), Some(&ParamValue::literal(json!(null))));
        assert_eq!(nodes[2].schema_mode, SchemaMode::Unknown);
        assert_eq!(nodes[2].raw_params_json, "[1]");
    }

    #[test]
    fn test_proposal_json_shape() {
        let proposal: Proposal = serde_json::from_value(json!({
            "method": "getBlock",
            "params": {"byField": [{"name": "slot", "value": {"kind": "literal", "value": 5}}]},
            "localId": "b"
        }))
        .unwrap();
        assert_eq!(proposal.local_id.as_deref(), Some("b"));
        assert!(matches!(proposal.params, ProposedParams::ByField(ref b) if b.len() == 1));
    }
}
