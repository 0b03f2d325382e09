use std::collections::HashSet;

use serde_json::{Map, Value};

use crate::domain::model::{MAX_REPEAT_COUNT, MAX_REPEAT_INTERVAL};
use crate::dsl::schema::SUPPORTED_DOCUMENT_VERSIONS;

use super::types::Diagnostic;

const SCHEMA_MODES: &[&str] = &["known", "unknown"];
const TIME_UNITS: &[&str] = &["milliseconds", "seconds", "minutes"];

/// Shape checks on the raw JSON: field presence, types and ranges.
pub fn validate(doc: &Value) -> Vec<Diagnostic> {
    let mut diags = Vec::new();

    let Some(root) = doc.as_object() else {
        diags.push(Diagnostic::error("E001", "Document must be a JSON object", ""));
        return diags;
    };

    match root.get("version").and_then(Value::as_u64) {
        Some(v) if SUPPORTED_DOCUMENT_VERSIONS.iter().any(|s| u64::from(*s) == v) => {}
        Some(v) => diags.push(Diagnostic::error(
            "E002",
            format!(
                "Unsupported document version: {}, supported versions: {}",
                v,
                SUPPORTED_DOCUMENT_VERSIONS
                    .iter()
                    .map(u32::to_string)
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            "version",
        )),
        None => diags.push(Diagnostic::error(
            "E002",
            "Document version is missing or not an integer",
            "version",
        )),
    }

    match root.get("order") {
        Some(Value::Array(items)) => {
            for (idx, item) in items.iter().enumerate() {
                if !item.is_string() {
                    diags.push(Diagnostic::error(
                        "E003",
                        "Order entries must be node id strings",
                        format!("order[{}]", idx),
                    ));
                }
            }
        }
        _ => diags.push(Diagnostic::error("E003", "order must be an array", "order")),
    }

    match root.get("nodes") {
        Some(Value::Array(nodes)) => {
            for (idx, node) in nodes.iter().enumerate() {
                validate_node(node, &format!("nodes[{}]", idx), &mut diags);
            }
        }
        _ => diags.push(Diagnostic::error("E003", "nodes must be an array", "nodes")),
    }

    match root.get("selectedNodeId") {
        None | Some(Value::Null) | Some(Value::String(_)) => {}
        Some(_) => diags.push(Diagnostic::error(
            "E003",
            "selectedNodeId must be a string",
            "selectedNodeId",
        )),
    }

    diags
}

fn validate_node(node: &Value, path: &str, diags: &mut Vec<Diagnostic>) {
    let Some(obj) = node.as_object() else {
        diags.push(Diagnostic::error("E003", "Node must be an object", path));
        return;
    };
    let node_id = obj.get("id").and_then(Value::as_str).unwrap_or_default();
    let mut push = |diag: Diagnostic| {
        diags.push(if node_id.is_empty() {
            diag
        } else {
            diag.for_node(node_id)
        })
    };

    match obj.get("id") {
        Some(Value::String(id)) if !id.trim().is_empty() => {}
        _ => push(Diagnostic::error(
            "E004",
            "Node id must be a non-empty string",
            format!("{}.id", path),
        )),
    }
    if !obj.get("name").is_some_and(Value::is_string) {
        push(Diagnostic::error(
            "E003",
            "Node name must be a string",
            format!("{}.name", path),
        ));
    }
    match obj.get("method") {
        Some(Value::String(m)) if !m.trim().is_empty() => {}
        _ => push(Diagnostic::error(
            "E005",
            "Node method must be a non-empty string",
            format!("{}.method", path),
        )),
    }

    if let Some(mode) = obj.get("schemaMode") {
        if !mode.as_str().is_some_and(|m| SCHEMA_MODES.contains(&m)) {
            push(Diagnostic::error(
                "E006",
                format!("schemaMode must be one of: {}", SCHEMA_MODES.join(", ")),
                format!("{}.schemaMode", path),
            ));
        }
    }

    if let Some(raw) = obj.get("rawParamsJson") {
        if !raw.is_string() {
            push(Diagnostic::error(
                "E003",
                "rawParamsJson must be a string",
                format!("{}.rawParamsJson", path),
            ));
        }
    }

    match obj.get("params") {
        None => {}
        Some(Value::Array(params)) => {
            let mut names = HashSet::new();
            for (idx, param) in params.iter().enumerate() {
                let param_path = format!("{}.params[{}]", path, idx);
                for diag in validate_param(param, &param_path, &mut names) {
                    push(diag);
                }
            }
        }
        Some(_) => push(Diagnostic::error(
            "E003",
            "params must be an array",
            format!("{}.params", path),
        )),
    }

    match obj.get("repeat") {
        None => {}
        Some(Value::Object(repeat)) => {
            for diag in validate_repeat(repeat, &format!("{}.repeat", path)) {
                push(diag);
            }
        }
        Some(_) => push(Diagnostic::error(
            "E003",
            "repeat must be an object",
            format!("{}.repeat", path),
        )),
    }

    match obj.get("position") {
        None => {}
        Some(Value::Object(pos)) if pos.get("x").is_some_and(Value::is_number)
            && pos.get("y").is_some_and(Value::is_number) => {}
        Some(_) => push(Diagnostic::error(
            "E003",
            "position must be an object with numeric x and y",
            format!("{}.position", path),
        )),
    }
}

fn validate_param(param: &Value, path: &str, names: &mut HashSet<String>) -> Vec<Diagnostic> {
    let mut diags = Vec::new();
    let Some(obj) = param.as_object() else {
        diags.push(Diagnostic::error("E007", "Param binding must be an object", path));
        return diags;
    };

    match obj.get("name").and_then(Value::as_str) {
        Some(name) if !name.is_empty() => {
            if !names.insert(name.to_string()) {
                diags.push(Diagnostic::error(
                    "E008",
                    format!("Duplicate param name: {}", name),
                    format!("{}.name", path),
                ));
            }
        }
        _ => diags.push(Diagnostic::error(
            "E007",
            "Param name must be a non-empty string",
            format!("{}.name", path),
        )),
    }

    let value_path = format!("{}.value", path);
    let Some(value) = obj.get("value").and_then(Value::as_object) else {
        diags.push(Diagnostic::error("E007", "Param value must be an object", value_path));
        return diags;
    };
    match value.get("kind").and_then(Value::as_str) {
        Some("literal") => {
            if !value.contains_key("value") {
                diags.push(Diagnostic::error(
                    "E007",
                    "Literal param is missing its value",
                    format!("{}.value", value_path),
                ));
            }
        }
        Some("ref") => {
            if !value.get("nodeId").is_some_and(Value::is_string) {
                diags.push(Diagnostic::error(
                    "E007",
                    "Reference nodeId must be a string",
                    format!("{}.nodeId", value_path),
                ));
            }
            if !value.get("path").is_some_and(Value::is_string) {
                diags.push(Diagnostic::error(
                    "E007",
                    "Reference path must be a string",
                    format!("{}.path", value_path),
                ));
            }
        }
        _ => diags.push(Diagnostic::error(
            "E007",
            "Param kind must be \"literal\" or \"ref\"",
            format!("{}.kind", value_path),
        )),
    }
    diags
}

fn validate_repeat(repeat: &Map<String, Value>, path: &str) -> Vec<Diagnostic> {
    let mut diags = Vec::new();

    if let Some(enabled) = repeat.get("enabled") {
        if !enabled.is_boolean() {
            diags.push(Diagnostic::error(
                "E009",
                "repeat.enabled must be a boolean",
                format!("{}.enabled", path),
            ));
        }
    }
    if let Some(count) = repeat.get("count") {
        if !count
            .as_u64()
            .is_some_and(|c| (1..=u64::from(MAX_REPEAT_COUNT)).contains(&c))
        {
            diags.push(Diagnostic::error(
                "E009",
                format!("repeat.count must be an integer between 1 and {}", MAX_REPEAT_COUNT),
                format!("{}.count", path),
            ));
        }
    }
    if let Some(interval) = repeat.get("interval") {
        if !interval.as_u64().is_some_and(|i| i <= MAX_REPEAT_INTERVAL) {
            diags.push(Diagnostic::error(
                "E009",
                format!(
                    "repeat.interval must be an integer between 0 and {}",
                    MAX_REPEAT_INTERVAL
                ),
                format!("{}.interval", path),
            ));
        }
    }
    if let Some(unit) = repeat.get("unit") {
        if !unit.as_str().is_some_and(|u| TIME_UNITS.contains(&u)) {
            diags.push(Diagnostic::error(
                "E009",
                format!("repeat.unit must be one of: {}", TIME_UNITS.join(", ")),
                format!("{}.unit", path),
            ));
        }
    }
    if let Some(loop_count) = repeat.get("loopCount") {
        if !loop_count.as_u64().is_some_and(|l| l <= u64::from(u32::MAX)) {
            diags.push(Diagnostic::error(
                "E009",
                "repeat.loopCount must be a non-negative integer (0 = infinite)",
                format!("{}.loopCount", path),
            ));
        }
    }
    diags
}
