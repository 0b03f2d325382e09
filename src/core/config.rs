use serde::{Deserialize, Serialize};

use crate::core::http_client::HttpPoolConfig;
use crate::core::path::DEFAULT_MAX_DEPTH;
use crate::domain::model::{MAX_REPEAT_COUNT, MAX_REPEAT_INTERVAL};
use crate::error::WorkflowError;

/// Engine configuration. Every field has a default, so partial JSON documents
/// are accepted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// JSON-RPC endpoint for `jsonrpc` methods.
    pub rpc_endpoint: String,
    /// Network name used to pick an HTTP base URL from the method registry.
    pub network: String,
    /// Depth bound for output path discovery.
    pub enumerate_max_depth: usize,
    pub max_repeat_count: u32,
    pub max_interval: u64,
    pub http: HttpPoolConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            rpc_endpoint: "http://127.0.0.1:8899".to_string(),
            network: "mainnet".to_string(),
            enumerate_max_depth: DEFAULT_MAX_DEPTH,
            max_repeat_count: MAX_REPEAT_COUNT,
            max_interval: MAX_REPEAT_INTERVAL,
            http: HttpPoolConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_json(text: &str) -> Result<Self, WorkflowError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn with_rpc_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.rpc_endpoint = endpoint.into();
        self
    }

    pub fn with_network(mut self, network: impl Into<String>) -> Self {
        self.network = network.into();
        self
    }
}
