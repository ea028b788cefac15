use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::{
    dispatch::JsonRpcMessage,
    error::{JsonRpcError, JsonRpcErrorObject},
    notification::JsonRpcNotification,
    request::{JsonRpcRequest, RequestParams},
    response::JsonRpcReply,
};

/// Per-call context handed to handlers.
///
/// Stateless exchanges carry no session; SSE sessions pass their id.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionContext {
    pub session_id: String,
    pub metadata: HashMap<String, Value>,
    /// Unix milliseconds at which the message was received
    pub timestamp: u64,
}

impl SessionContext {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            metadata: HashMap::new(),
            timestamp: std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_millis() as u64)
                .unwrap_or_default(),
        }
    }
}

/// Handles the methods it is registered for
#[async_trait]
pub trait JsonRpcHandler: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    async fn handle(
        &self,
        method: &str,
        params: Option<RequestParams>,
        session_context: Option<SessionContext>,
    ) -> Result<Value, Self::Error>;

    /// Notifications are ignored unless a handler opts in.
    async fn handle_notification(
        &self,
        method: &str,
        params: Option<RequestParams>,
        session_context: Option<SessionContext>,
    ) -> Result<(), Self::Error> {
        let _ = (method, params, session_context);
        Ok(())
    }

    fn supported_methods(&self) -> Vec<String> {
        vec![]
    }
}

/// Domain errors that know their JSON-RPC rendering
pub trait ToJsonRpcError: std::error::Error + Send + Sync + 'static {
    fn to_error_object(&self) -> JsonRpcErrorObject;
}

/// Routes method names to handlers and renders domain errors
pub struct JsonRpcDispatcher<E>
where
    E: ToJsonRpcError,
{
    handlers: HashMap<String, Arc<dyn JsonRpcHandler<Error = E>>>,
}

impl<E> JsonRpcDispatcher<E>
where
    E: ToJsonRpcError,
{
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register one handler for every method it reports as supported.
    pub fn register<H>(&mut self, handler: H)
    where
        H: JsonRpcHandler<Error = E> + 'static,
    {
        let handler: Arc<dyn JsonRpcHandler<Error = E>> = Arc::new(handler);
        for method in handler.supported_methods() {
            self.handlers.insert(method, handler.clone());
        }
    }

    pub async fn handle_request(
        &self,
        request: JsonRpcRequest,
        session_context: Option<SessionContext>,
    ) -> JsonRpcReply {
        let Some(handler) = self.handlers.get(&request.method) else {
            return JsonRpcError::method_not_found(request.id, &request.method).into();
        };

        match handler
            .handle(&request.method, request.params, session_context)
            .await
        {
            Ok(result) => JsonRpcReply::success(request.id, result),
            Err(domain_error) => {
                JsonRpcError::new(Some(request.id), domain_error.to_error_object()).into()
            }
        }
    }

    /// Unknown notification methods are dropped silently.
    pub async fn handle_notification(
        &self,
        notification: JsonRpcNotification,
        session_context: Option<SessionContext>,
    ) -> Result<(), E> {
        let Some(handler) = self.handlers.get(&notification.method) else {
            return Ok(());
        };
        handler
            .handle_notification(&notification.method, notification.params, session_context)
            .await
    }

    /// Dispatch either message kind; notifications never produce a reply.
    pub async fn handle_message(
        &self,
        message: JsonRpcMessage,
        session_context: Option<SessionContext>,
    ) -> Result<Option<JsonRpcReply>, E> {
        match message {
            JsonRpcMessage::Request(request) => {
                Ok(Some(self.handle_request(request, session_context).await))
            }
            JsonRpcMessage::Notification(notification) => {
                self.handle_notification(notification, session_context)
                    .await
                    .map(|_| None)
            }
        }
    }

    pub fn registered_methods(&self) -> Vec<String> {
        let mut methods: Vec<String> = self.handlers.keys().cloned().collect();
        methods.sort();
        methods
    }
}

impl<E> Default for JsonRpcDispatcher<E>
where
    E: ToJsonRpcError,
{
    fn default() -> Self {
        Self::new()
    }
}
