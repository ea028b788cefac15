//! Router-level test suites: requests are driven straight through
//! [`BridgeRouter::handle`] with in-memory bodies.

pub mod auth_tests;

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::{Method, Request, Response};
use relay_mcp_core::{
    CoreFactory, EchoTool, RegistryCoreFactory, ServerInfo, ToolError, ToolHandler, ToolRegistry,
};
use relay_mcp_json_rpc::SessionContext;
use relay_mcp_session::SessionRegistry;
use serde_json::Value;
use tokio::sync::Notify;

use crate::{AllowedKeys, AuthGate, BridgeBody, BridgeRouter, ServerConfig};

pub const KEY: &str = "abc";

/// Blocks until released; lets a test hold one request open while others run.
pub struct WaitTool {
    pub release: Arc<Notify>,
}

#[async_trait]
impl ToolHandler for WaitTool {
    fn name(&self) -> &str {
        "wait"
    }

    fn description(&self) -> &str {
        "Wait for the test to release it"
    }

    async fn call(&self, _: Value, _: Option<&SessionContext>) -> Result<Value, ToolError> {
        self.release.notified().await;
        Ok(Value::String("released".to_string()))
    }
}

pub fn tool_factory(release: Arc<Notify>) -> RegistryCoreFactory {
    RegistryCoreFactory::new(
        ServerInfo::new("relay-test", "0.0.0"),
        ToolRegistry::default()
            .with_tool(EchoTool)
            .with_tool(WaitTool { release }),
    )
}

pub fn router_with(
    config: ServerConfig,
    keys: AllowedKeys,
    factory: Arc<dyn CoreFactory>,
) -> Arc<BridgeRouter> {
    Arc::new(BridgeRouter::new(
        Arc::new(config),
        AuthGate::new(keys),
        Arc::new(SessionRegistry::new()),
        factory,
    ))
}

pub fn router() -> Arc<BridgeRouter> {
    router_with(
        ServerConfig::default(),
        AllowedKeys::from_csv(KEY),
        Arc::new(tool_factory(Arc::new(Notify::new()))),
    )
}

pub fn unauthenticated(method: Method, uri: &str, body: &str) -> Request<Full<Bytes>> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap()
}

pub fn authed(method: Method, uri: &str, body: &str) -> Request<Full<Bytes>> {
    let mut req = unauthenticated(method, uri, body);
    req.headers_mut()
        .insert("authorization", format!("Bearer {}", KEY).parse().unwrap());
    req
}

pub fn rpc(id: i64, method: &str, params: Value) -> String {
    serde_json::json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": method,
        "params": params,
    })
    .to_string()
}

pub fn echo_call(id: i64, text: &str) -> String {
    rpc(
        id,
        "tools/call",
        serde_json::json!({"name": "echo", "arguments": {"text": text}}),
    )
}

pub async fn body_json(response: Response<BridgeBody>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Next data chunk of a streaming body, `None` once the stream ended.
pub async fn next_chunk(body: &mut BridgeBody) -> Option<String> {
    loop {
        let frame = body.frame().await?.unwrap();
        if let Ok(data) = frame.into_data() {
            return Some(String::from_utf8(data.to_vec()).unwrap());
        }
    }
}

/// Like [`next_chunk`] but skips keep-alive comments.
pub async fn next_event(body: &mut BridgeBody) -> Option<String> {
    loop {
        let chunk = next_chunk(body).await?;
        if !chunk.starts_with(':') {
            return Some(chunk);
        }
    }
}

/// JSON payload of an `event: message` chunk
pub fn event_data(chunk: &str) -> Value {
    let data = chunk
        .lines()
        .find_map(|line| line.strip_prefix("data: "))
        .unwrap();
    serde_json::from_str(data).unwrap()
}
