#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};

use rpcflow::nodes::{FieldSpec, MethodSpec, StaticMethodRegistry};
use rpcflow::{
    FakeIdGenerator, NodeError, Transport, TransportRequest, TransportResponse, WorkflowSession,
};

/// Scripted JSON-RPC transport.
///
/// Records every method called, in order. Each call answers with
/// `{"jsonrpc": "2.0", "result": {"method": m, "call": n, "params": p}}`
/// unless a canned response or a delay was configured for the method.
#[derive(Default)]
pub struct ScriptedTransport {
    pub calls: Mutex<Vec<String>>,
    responses: Mutex<HashMap<String, TransportResponse>>,
    delays: Mutex<HashMap<String, Duration>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, method: &str, status: u16, body: Value) {
        self.responses
            .lock()
            .insert(method.to_string(), TransportResponse { status, body });
    }

    pub fn delay(&self, method: &str, delay: Duration) {
        self.delays.lock().insert(method.to_string(), delay);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, NodeError> {
        let TransportRequest::JsonRpc { envelope, .. } = request else {
            return Err(NodeError::HttpError("only JSON-RPC is scripted".into()));
        };
        let method = envelope["method"].as_str().unwrap_or_default().to_string();
        let call = {
            let mut calls = self.calls.lock();
            calls.push(method.clone());
            calls.iter().filter(|m| **m == method).count()
        };
        let delay = self.delays.lock().get(&method).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(response) = self.responses.lock().get(&method).cloned() {
            return Ok(response);
        }
        Ok(TransportResponse {
            status: 200,
            body: json!({
                "jsonrpc": "2.0",
                "id": envelope["id"].clone(),
                "result": {"method": method, "call": call, "params": envelope.get("params").cloned()}
            }),
        })
    }
}

pub fn registry() -> StaticMethodRegistry {
    StaticMethodRegistry::new()
        .with(MethodSpec::jsonrpc("getSlot", vec![]))
        .with(MethodSpec::jsonrpc("getAccounts", vec![]))
        .with(MethodSpec::jsonrpc(
            "getBalance",
            vec![
                FieldSpec::required("pubkey", "string"),
                FieldSpec::optional("commitment", "string"),
            ],
        ))
        .with(MethodSpec::jsonrpc(
            "getBlock",
            vec![FieldSpec::required("slot", "u64")],
        ))
        .with(MethodSpec::jsonrpc(
            "merge",
            vec![FieldSpec::optional("left", "any"), FieldSpec::optional("right", "any")],
        ))
        .with(MethodSpec::custom("constant"))
        .with(MethodSpec::raw("custom_rpc"))
}

pub fn session_with(transport: Arc<ScriptedTransport>) -> WorkflowSession {
    WorkflowSession::builder(Arc::new(registry()))
        .transport(transport)
        .id_generator(Arc::new(FakeIdGenerator::new("node")))
        .build()
        .expect("session builds")
}
