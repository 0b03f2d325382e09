use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::NodeError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpPoolConfig {
    pub pool_max_idle_per_host: usize,
    pub pool_idle_timeout_secs: u64,
    pub default_timeout_secs: u64,
    pub tcp_keepalive_secs: Option<u64>,
    pub http2_enabled: bool,
}

impl Default for HttpPoolConfig {
    fn default() -> Self {
        Self {
            pool_max_idle_per_host: 10,
            pool_idle_timeout_secs: 90,
            default_timeout_secs: 30,
            tcp_keepalive_secs: Some(60),
            http2_enabled: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
}

/// One outbound call.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportRequest {
    /// POST a JSON-RPC envelope to `endpoint`.
    JsonRpc { endpoint: String, envelope: Value },
    Http {
        method: HttpMethod,
        url: String,
        query: Vec<(String, String)>,
        body: Option<Value>,
    },
}

/// Raw response: status code plus the decoded body. Bodies that are not JSON
/// are carried as a string, empty bodies as `null`.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Value,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Outbound call boundary. Implementations only move bytes; classification
/// of the response happens in the node executor.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, NodeError>;
}

/// [`Transport`] backed by a pooled `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(config: &HttpPoolConfig) -> Result<Self, NodeError> {
        Ok(Self {
            client: Self::build_client(config)?,
        })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    fn build_client(config: &HttpPoolConfig) -> Result<reqwest::Client, NodeError> {
        let mut builder = reqwest::Client::builder()
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .pool_idle_timeout(Duration::from_secs(config.pool_idle_timeout_secs))
            .tcp_keepalive(config.tcp_keepalive_secs.map(Duration::from_secs))
            .timeout(Duration::from_secs(config.default_timeout_secs));

        if !config.http2_enabled {
            builder = builder.http1_only();
        }

        builder
            .build()
            .map_err(|e| NodeError::HttpError(e.to_string()))
    }

    fn decode_body(text: &str) -> Value {
        if text.trim().is_empty() {
            return Value::Null;
        }
        serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, NodeError> {
        let req_builder = match request {
            TransportRequest::JsonRpc { endpoint, envelope } => {
                self.client.post(&endpoint).json(&envelope)
            }
            TransportRequest::Http {
                method,
                url,
                query,
                body,
            } => {
                let builder = match method {
                    HttpMethod::Get => self.client.get(&url),
                    HttpMethod::Post => self.client.post(&url),
                };
                let builder = if query.is_empty() {
                    builder
                } else {
                    builder.query(&query)
                };
                match body {
                    Some(body) => builder.json(&body),
                    None => builder,
                }
            }
        };

        let resp = req_builder
            .send()
            .await
            .map_err(|e| NodeError::HttpError(e.to_string()))?;
        let status = resp.status().as_u16();
        let text = resp
            .text()
            .await
            .map_err(|e| NodeError::HttpError(e.to_string()))?;

        Ok(TransportResponse {
            status,
            body: Self::decode_body(&text),
        })
    }
}
