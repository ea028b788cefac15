use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use relay_mcp_json_rpc::{
    JsonRpcDispatcher, JsonRpcHandler, JsonRpcMessage, JsonRpcReply, RequestParams,
    SessionContext,
};
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::error::CoreError;
use crate::tool::ToolRegistry;
use crate::version::McpVersion;

/// Something that answers JSON-RPC messages on behalf of connected clients.
///
/// `close` must be idempotent; after it returns every further call to
/// `handle_message` fails with [`CoreError::Closed`].
#[async_trait]
pub trait ToolCore: Send + Sync {
    async fn handle_message(
        &self,
        message: JsonRpcMessage,
        session: Option<SessionContext>,
    ) -> Result<Option<JsonRpcReply>, CoreError>;

    fn close(&self);

    fn is_closed(&self) -> bool;
}

/// Produces the core a transport connects to.
pub trait CoreFactory: Send + Sync {
    fn create(&self) -> Result<Arc<dyn ToolCore>, CoreError>;
}

impl<F> CoreFactory for F
where
    F: Fn() -> Result<Arc<dyn ToolCore>, CoreError> + Send + Sync,
{
    fn create(&self) -> Result<Arc<dyn ToolCore>, CoreError> {
        (self)()
    }
}

/// Name and version reported in the `initialize` result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

impl ServerInfo {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

impl Default for ServerInfo {
    fn default() -> Self {
        Self::new("relay-mcp", env!("CARGO_PKG_VERSION"))
    }
}

struct ProtocolHandler {
    info: ServerInfo,
    tools: Arc<ToolRegistry>,
}

impl ProtocolHandler {
    fn initialize(&self, params: Option<RequestParams>) -> Value {
        let requested = params
            .as_ref()
            .and_then(|p| p.get("protocolVersion"))
            .and_then(Value::as_str);
        let version = McpVersion::negotiate(requested);
        debug!(requested = ?requested, negotiated = %version, "initialize");

        json!({
            "protocolVersion": version.as_str(),
            "capabilities": {
                "tools": { "listChanged": false }
            },
            "serverInfo": {
                "name": self.info.name,
                "version": self.info.version,
            }
        })
    }

    async fn call_tool(
        &self,
        params: Option<RequestParams>,
        session: Option<SessionContext>,
    ) -> Result<Value, CoreError> {
        let params = params
            .ok_or_else(|| CoreError::InvalidParams("Missing params".to_string()))?
            .into_value();
        let name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| CoreError::InvalidParams("Missing tool name".to_string()))?;
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| CoreError::UnknownTool(name.to_string()))?;
        let arguments = params.get("arguments").cloned().unwrap_or_else(|| json!({}));

        // Tool failures are results, not protocol errors: the model gets to see them.
        match tool.call(arguments, session.as_ref()).await {
            Ok(output) => Ok(json!({
                "content": [{ "type": "text", "text": render_text(output) }],
                "isError": false,
            })),
            Err(err) => {
                warn!(tool = name, error = %err, "tool call failed");
                Ok(json!({
                    "content": [{ "type": "text", "text": err.to_string() }],
                    "isError": true,
                }))
            }
        }
    }
}

fn render_text(output: Value) -> String {
    match output {
        Value::String(text) => text,
        other => other.to_string(),
    }
}

#[async_trait]
impl JsonRpcHandler for ProtocolHandler {
    type Error = CoreError;

    async fn handle(
        &self,
        method: &str,
        params: Option<RequestParams>,
        session_context: Option<SessionContext>,
    ) -> Result<Value, Self::Error> {
        match method {
            "initialize" => Ok(self.initialize(params)),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(json!({ "tools": self.tools.descriptors() })),
            "tools/call" => self.call_tool(params, session_context).await,
            other => Err(CoreError::MethodNotFound(other.to_string())),
        }
    }

    async fn handle_notification(
        &self,
        method: &str,
        _params: Option<RequestParams>,
        session_context: Option<SessionContext>,
    ) -> Result<(), Self::Error> {
        debug!(
            method,
            session_id = session_context.as_ref().map(|c| c.session_id.as_str()),
            "notification"
        );
        Ok(())
    }

    fn supported_methods(&self) -> Vec<String> {
        ["initialize", "ping", "tools/list", "tools/call"]
            .into_iter()
            .map(String::from)
            .collect()
    }
}

/// MCP method dispatcher over a fixed tool registry
pub struct McpCore {
    dispatcher: JsonRpcDispatcher<CoreError>,
    closed: AtomicBool,
}

impl McpCore {
    pub fn new(info: ServerInfo, tools: Arc<ToolRegistry>) -> Self {
        let mut dispatcher = JsonRpcDispatcher::new();
        dispatcher.register(ProtocolHandler { info, tools });
        Self {
            dispatcher,
            closed: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl ToolCore for McpCore {
    async fn handle_message(
        &self,
        message: JsonRpcMessage,
        session: Option<SessionContext>,
    ) -> Result<Option<JsonRpcReply>, CoreError> {
        if self.is_closed() {
            return Err(CoreError::Closed);
        }
        self.dispatcher.handle_message(message, session).await
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            debug!("tool-invocation core closed");
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

/// Builds a fresh [`McpCore`] per call, all sharing one immutable registry.
#[derive(Debug, Clone)]
pub struct RegistryCoreFactory {
    info: ServerInfo,
    tools: Arc<ToolRegistry>,
}

impl RegistryCoreFactory {
    pub fn new(info: ServerInfo, tools: ToolRegistry) -> Self {
        Self {
            info,
            tools: Arc::new(tools),
        }
    }
}

impl CoreFactory for RegistryCoreFactory {
    fn create(&self) -> Result<Arc<dyn ToolCore>, CoreError> {
        Ok(Arc::new(McpCore::new(self.info.clone(), self.tools.clone())))
    }
}

/// Borrowed handle on a shared core.
///
/// Closing a lease only retires the lease; the shared core keeps serving
/// everyone else.
pub struct CoreLease {
    inner: Arc<dyn ToolCore>,
    released: AtomicBool,
}

impl CoreLease {
    pub fn new(inner: Arc<dyn ToolCore>) -> Self {
        Self {
            inner,
            released: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl ToolCore for CoreLease {
    async fn handle_message(
        &self,
        message: JsonRpcMessage,
        session: Option<SessionContext>,
    ) -> Result<Option<JsonRpcReply>, CoreError> {
        if self.released.load(Ordering::Acquire) {
            return Err(CoreError::Closed);
        }
        self.inner.handle_message(message, session).await
    }

    fn close(&self) {
        self.released.store(true, Ordering::Release);
    }

    fn is_closed(&self) -> bool {
        self.released.load(Ordering::Acquire) || self.inner.is_closed()
    }
}

/// Hands out [`CoreLease`]s on one long-lived core.
#[derive(Clone)]
pub struct SharedCoreFactory {
    core: Arc<dyn ToolCore>,
}

impl SharedCoreFactory {
    pub fn new(core: Arc<dyn ToolCore>) -> Self {
        Self { core }
    }

    pub fn core(&self) -> &Arc<dyn ToolCore> {
        &self.core
    }
}

impl CoreFactory for SharedCoreFactory {
    fn create(&self) -> Result<Arc<dyn ToolCore>, CoreError> {
        if self.core.is_closed() {
            return Err(CoreError::Closed);
        }
        Ok(Arc::new(CoreLease::new(self.core.clone())))
    }
}
