use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Upper bound for [`RepeatConfig::count`].
pub const MAX_REPEAT_COUNT: u32 = 1000;
/// Upper bound for [`RepeatConfig::interval`], in the configured unit.
pub const MAX_REPEAT_INTERVAL: u64 = 86_400_000;

/// Whether a node's parameters come from registry-declared fields or raw JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaMode {
    #[default]
    Known,
    Unknown,
}

/// Execution status of a single node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    #[default]
    Idle,
    Running,
    Success,
    Error,
}

/// Value bound to a node parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ParamValue {
    /// An embedded JSON value (including `null`).
    Literal { value: Value },
    /// The value found at `path` inside the recorded output of `node_id`.
    Ref {
        #[serde(rename = "nodeId")]
        node_id: String,
        path: String,
    },
}

impl ParamValue {
    pub fn literal(value: Value) -> Self {
        ParamValue::Literal { value }
    }

    pub fn reference(node_id: impl Into<String>, path: impl Into<String>) -> Self {
        ParamValue::Ref {
            node_id: node_id.into(),
            path: path.into(),
        }
    }

    /// Source node id when this value is a reference.
    pub fn ref_source(&self) -> Option<&str> {
        match self {
            ParamValue::Ref { node_id, .. } => Some(node_id),
            ParamValue::Literal { .. } => None,
        }
    }
}

/// A named parameter binding. Names are unique within a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamBinding {
    pub name: String,
    pub value: ParamValue,
}

/// Unit for [`RepeatConfig::interval`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    #[default]
    Milliseconds,
    Seconds,
    Minutes,
}

impl TimeUnit {
    pub fn to_duration(self, amount: u64) -> Duration {
        match self {
            TimeUnit::Milliseconds => Duration::from_millis(amount),
            TimeUnit::Seconds => Duration::from_secs(amount),
            TimeUnit::Minutes => Duration::from_secs(amount.saturating_mul(60)),
        }
    }
}

/// Per-node repeat/loop configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RepeatConfig {
    pub enabled: bool,
    /// Repetitions per loop cycle.
    pub count: u32,
    /// Delay between repetitions, in `unit`.
    pub interval: u64,
    pub unit: TimeUnit,
    /// Number of loop cycles; `0` repeats forever.
    pub loop_count: u32,
}

impl Default for RepeatConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            count: 1,
            interval: 0,
            unit: TimeUnit::Milliseconds,
            loop_count: 1,
        }
    }
}

impl RepeatConfig {
    /// Clamp `count` and `interval` into their valid ranges.
    pub fn normalized(mut self) -> Self {
        self.count = self.count.clamp(1, MAX_REPEAT_COUNT);
        self.interval = self.interval.min(MAX_REPEAT_INTERVAL);
        self
    }

    pub fn is_infinite(&self) -> bool {
        self.enabled && self.loop_count == 0
    }

    pub fn interval_duration(&self) -> Duration {
        self.unit.to_duration(self.interval)
    }

    /// Calls per run, or `None` when the loop never ends.
    pub fn total_calls(&self) -> Option<u64> {
        if !self.enabled {
            return Some(1);
        }
        if self.loop_count == 0 {
            return None;
        }
        Some(u64::from(self.count.max(1)) * u64::from(self.loop_count))
    }
}

/// Canvas position. Layout only.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// One configured step of a workflow.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: String,
    pub name: String,
    pub method: String,
    pub schema_mode: SchemaMode,
    pub params: Vec<ParamBinding>,
    pub raw_params_json: String,
    pub repeat: RepeatConfig,
    pub position: Position,
    pub status: NodeStatus,
    pub output: Option<Value>,
    pub error: Option<String>,
}

impl Node {
    pub fn new(id: impl Into<String>, method: impl Into<String>) -> Self {
        let method = method.into();
        Self {
            id: id.into(),
            name: method.clone(),
            method,
            schema_mode: SchemaMode::Known,
            params: Vec::new(),
            raw_params_json: String::new(),
            repeat: RepeatConfig::default(),
            position: Position::default(),
            status: NodeStatus::Idle,
            output: None,
            error: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_param(mut self, name: impl Into<String>, value: ParamValue) -> Self {
        self.set_param(name, value);
        self
    }

    pub fn with_repeat(mut self, repeat: RepeatConfig) -> Self {
        self.repeat = repeat.normalized();
        self
    }

    pub fn with_raw_params(mut self, raw: impl Into<String>) -> Self {
        self.schema_mode = SchemaMode::Unknown;
        self.raw_params_json = raw.into();
        self
    }

    pub fn param(&self, name: &str) -> Option<&ParamValue> {
        self.params
            .iter()
            .find(|binding| binding.name == name)
            .map(|binding| &binding.value)
    }

    /// Insert or replace a binding, keeping its original position.
    pub fn set_param(&mut self, name: impl Into<String>, value: ParamValue) {
        let name = name.into();
        match self.params.iter_mut().find(|binding| binding.name == name) {
            Some(binding) => binding.value = value,
            None => self.params.push(ParamBinding { name, value }),
        }
    }

    pub fn remove_param(&mut self, name: &str) -> Option<ParamValue> {
        let idx = self.params.iter().position(|binding| binding.name == name)?;
        Some(self.params.remove(idx).value)
    }

    /// Ids of nodes referenced by this node's bindings, first-seen order.
    pub fn referenced_nodes(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for source in self.params.iter().filter_map(|b| b.value.ref_source()) {
            if !seen.contains(&source) {
                seen.push(source);
            }
        }
        seen
    }

    /// Reset execution fields without touching configuration.
    pub fn reset_execution(&mut self) {
        self.status = NodeStatus::Idle;
        self.output = None;
        self.error = None;
    }
}
