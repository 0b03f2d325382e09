use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use serde_json::{json, Map, Value};

use crate::core::cancel::CancelSignal;
use crate::core::config::EngineConfig;
use crate::core::event_bus::RunEvent;
use crate::core::http_client::{HttpMethod, Transport, TransportRequest, TransportResponse};
use crate::core::runtime_context::RuntimeContext;
use crate::core::workflow_state::SharedState;
use crate::domain::execution::ExecutionOutcome;
use crate::domain::model::Node;
use crate::error::{NodeError, NodeResult};

use super::params::{build_rpc_params, resolve_bindings, value_to_text, OutputMap};
use super::registry::{HttpEndpoint, MethodRegistry, MethodSpec, TransportKind};

/// Performs single node invocations.
///
/// Every call updates the node's status, output and error in shared state
/// before returning, and on success adds the output to the run's
/// [`OutputMap`] so later nodes can reference it.
pub struct NodeExecutor {
    registry: Arc<dyn MethodRegistry>,
    transport: Arc<dyn Transport>,
    config: Arc<EngineConfig>,
    next_request_id: AtomicU64,
}

/// A prepared call: either a local value or an outbound request.
#[derive(Debug, Clone, PartialEq)]
enum Dispatch {
    Local(Value),
    Remote(TransportRequest),
}

impl NodeExecutor {
    pub fn new(
        registry: Arc<dyn MethodRegistry>,
        transport: Arc<dyn Transport>,
        config: Arc<EngineConfig>,
    ) -> Self {
        Self {
            registry,
            transport,
            config,
            next_request_id: AtomicU64::new(1),
        }
    }

    pub fn registry(&self) -> &Arc<dyn MethodRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Invoke `node_id` once.
    pub async fn execute(
        &self,
        node_id: &str,
        state: &SharedState,
        outputs: &mut OutputMap,
        cancel: &CancelSignal,
        context: &RuntimeContext,
    ) -> ExecutionOutcome {
        if cancel.is_triggered() {
            return self.canceled(node_id, state, context);
        }

        let Some(call) = state.begin_call(node_id) else {
            return ExecutionOutcome::Failed {
                message: format!("Node not found: {}", node_id),
                output: None,
            };
        };
        context.emit(RunEvent::NodeStarted {
            node_id: node_id.to_string(),
            call,
            timestamp: Utc::now(),
        });

        let prepared = state.read(|s| {
            let node = s
                .workflow
                .get(node_id)
                .ok_or_else(|| NodeError::ConfigError(format!("Node not found: {}", node_id)))?;
            let spec = self.registry.lookup(&node.method);
            let resolved = resolve_bindings(node, outputs, &s.workflow)?;
            self.prepare(node, spec.as_ref(), &resolved)
        });

        let dispatch = match prepared {
            Ok(dispatch) => dispatch,
            Err(err) => return self.failed(node_id, err, state, context),
        };

        let result = match dispatch {
            Dispatch::Local(value) => Ok(value),
            Dispatch::Remote(request) => {
                tracing::debug!(node_id, call, "dispatching node request");
                match cancel.race(self.transport.send(request)).await {
                    Err(_) => return self.canceled(node_id, state, context),
                    Ok(Err(err)) => Err(err),
                    Ok(Ok(response)) => classify_response(response),
                }
            }
        };

        match result {
            Ok(output) => {
                state.record_success(node_id, output.clone());
                outputs.insert(node_id.to_string(), output.clone());
                context.emit(RunEvent::NodeSucceeded {
                    node_id: node_id.to_string(),
                    output: output.clone(),
                    timestamp: Utc::now(),
                });
                ExecutionOutcome::Success(output)
            }
            Err(err) => self.failed(node_id, err, state, context),
        }
    }

    fn prepare(
        &self,
        node: &Node,
        spec: Option<&MethodSpec>,
        resolved: &[(String, Value)],
    ) -> NodeResult<Dispatch> {
        let kind = spec.map(|s| s.transport).unwrap_or_default();
        match kind {
            TransportKind::Custom => {
                let value = resolved
                    .iter()
                    .find(|(name, _)| name == "value")
                    .map(|(_, v)| v.clone())
                    .unwrap_or(Value::Null);
                Ok(Dispatch::Local(value))
            }
            TransportKind::Http => {
                let endpoint = spec.and_then(|s| s.http.as_ref()).ok_or_else(|| {
                    NodeError::ConfigError(format!("Method {} has no HTTP route", node.method))
                })?;
                build_http_request(endpoint, &self.config.network, resolved).map(Dispatch::Remote)
            }
            TransportKind::JsonRpc => {
                let params = build_rpc_params(node, resolved, spec)?;
                let id = self.next_request_id.fetch_add(1, Ordering::Relaxed);
                let mut envelope = json!({
                    "jsonrpc": "2.0",
                    "id": id,
                    "method": node.method,
                });
                if let Some(params) = params {
                    envelope["params"] = params;
                }
                Ok(Dispatch::Remote(TransportRequest::JsonRpc {
                    endpoint: self.config.rpc_endpoint.clone(),
                    envelope,
                }))
            }
        }
    }

    fn failed(
        &self,
        node_id: &str,
        err: NodeError,
        state: &SharedState,
        context: &RuntimeContext,
    ) -> ExecutionOutcome {
        let message = err.to_string();
        tracing::warn!(node_id, error = %message, "node execution failed");
        let output = err.into_body();
        state.record_error(node_id, &message, output.clone());
        context.emit(RunEvent::NodeFailed {
            node_id: node_id.to_string(),
            error: message.clone(),
            timestamp: Utc::now(),
        });
        ExecutionOutcome::Failed { message, output }
    }

    fn canceled(
        &self,
        node_id: &str,
        state: &SharedState,
        context: &RuntimeContext,
    ) -> ExecutionOutcome {
        tracing::debug!(node_id, "node execution canceled");
        state.record_canceled(node_id);
        context.emit(RunEvent::NodeCanceled {
            node_id: node_id.to_string(),
            timestamp: Utc::now(),
        });
        ExecutionOutcome::Canceled
    }
}

/// Split a transport response into success or error.
///
/// Non-2xx statuses are errors; so are 2xx bodies carrying a non-null `error`
/// field.
pub fn classify_response(response: TransportResponse) -> NodeResult<Value> {
    let TransportResponse { status, body } = response;
    if !(200..300).contains(&status) {
        let message = error_message(&body).unwrap_or_else(|| format!("HTTP {}", status));
        return Err(NodeError::HttpStatus {
            status,
            message,
            body,
        });
    }
    if body.get("error").is_some_and(|e| !e.is_null()) {
        let message = error_message(&body).unwrap_or_else(|| "Unknown RPC error".to_string());
        return Err(NodeError::RpcError { message, body });
    }
    Ok(body)
}

fn error_message(body: &Value) -> Option<String> {
    match body.get("error") {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Object(err)) => Some(match err.get("message").and_then(Value::as_str) {
            Some(msg) => match err.get("code") {
                Some(code) if !code.is_null() => format!("{} (code {})", msg, code),
                _ => msg.to_string(),
            },
            None => Value::Object(err.clone()).to_string(),
        }),
        Some(Value::Null) | None => body
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string),
        Some(other) => Some(other.to_string()),
    }
}

/// Fill the path template from `resolved`, sending the remaining non-null
/// params as query (GET) or JSON body (POST).
pub fn build_http_request(
    endpoint: &HttpEndpoint,
    network: &str,
    resolved: &[(String, Value)],
) -> NodeResult<TransportRequest> {
    let base = endpoint.base_url(network).ok_or_else(|| {
        NodeError::ConfigError(format!("No base URL configured for network {}", network))
    })?;
    let mut url = url::Url::parse(base)
        .map_err(|e| NodeError::ConfigError(format!("Invalid base URL {}: {}", base, e)))?;

    let tokens = endpoint.path_tokens();
    let lookup = |name: &str| {
        resolved
            .iter()
            .find(|(k, v)| k == name && !v.is_null())
            .map(|(_, v)| value_to_text(v))
    };

    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|_| NodeError::ConfigError(format!("Base URL cannot take a path: {}", base)))?;
        segments.pop_if_empty();
        for segment in endpoint.path_template.split('/').filter(|s| !s.is_empty()) {
            let mut rendered = String::new();
            let mut rest = segment;
            while let Some(open) = rest.find('{') {
                let Some(close) = rest[open..].find('}').map(|c| open + c) else {
                    break;
                };
                let token = &rest[open + 1..close];
                let value =
                    lookup(token).ok_or_else(|| NodeError::MissingPathToken(token.to_string()))?;
                rendered.push_str(&rest[..open]);
                rendered.push_str(&value);
                rest = &rest[close + 1..];
            }
            rendered.push_str(rest);
            segments.push(&rendered);
        }
    }

    let remaining = resolved
        .iter()
        .filter(|(name, value)| !tokens.contains(&name.as_str()) && !value.is_null());

    Ok(match endpoint.method {
        HttpMethod::Get => TransportRequest::Http {
            method: HttpMethod::Get,
            url: url.to_string(),
            query: remaining
                .map(|(name, value)| (name.clone(), value_to_text(value)))
                .collect(),
            body: None,
        },
        HttpMethod::Post => TransportRequest::Http {
            method: HttpMethod::Post,
            url: url.to_string(),
            query: Vec::new(),
            body: Some(Value::Object(
                remaining
                    .map(|(name, value)| (name.clone(), value.clone()))
                    .collect::<Map<String, Value>>(),
            )),
        },
    })
}
