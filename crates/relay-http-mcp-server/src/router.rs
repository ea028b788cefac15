use std::sync::Arc;

use bytes::Bytes;
use http_body::Body;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::header::HeaderValue;
use hyper::{Method, Request, Response};
use relay_mcp_core::CoreFactory;
use relay_mcp_json_rpc::{JsonRpcError, JsonRpcMessage, parse_json_rpc_message};
use relay_mcp_session::{SessionRegistry, TransportKind};
use tracing::{debug, error, info, warn};

use crate::auth::AuthGate;
use crate::config::ServerConfig;
use crate::cors::CorsLayer;
use crate::error::BridgeError;
use crate::isolator::StatelessIsolator;
use crate::protocol::{MCP_SESSION_ID_HEADER, ResponseMode, extract_session_id, query_session_id};
use crate::response::{
    BridgeBody, accepted_response, health_response, preflight_response, sse_response,
};
use crate::transport::{McpTransport, SseTransport};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Handler a request is dispatched to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Streamable,
    SseStream,
    SseMessage,
}

impl Route {
    /// Match path first, then method. Known path with the wrong method is
    /// "method not allowed", anything else is "not found".
    pub fn resolve(config: &ServerConfig, method: &Method, path: &str) -> Result<Route, BridgeError> {
        let (route, allowed, allow) = if config.streamable_paths.iter().any(|p| p == path) {
            (Route::Streamable, Method::POST, "POST")
        } else if config.sse_path == path {
            (Route::SseStream, Method::GET, "GET")
        } else if config.message_paths.iter().any(|p| p == path) {
            (Route::SseMessage, Method::POST, "POST")
        } else {
            return Err(BridgeError::RouteNotFound);
        };

        if *method == allowed {
            Ok(route)
        } else {
            Err(BridgeError::MethodNotAllowed { allow })
        }
    }
}

/// Auth gate, route table and both transports behind one entry point
pub struct BridgeRouter {
    config: Arc<ServerConfig>,
    gate: AuthGate,
    registry: Arc<SessionRegistry<McpTransport>>,
    factory: Arc<dyn CoreFactory>,
    isolator: StatelessIsolator,
}

impl BridgeRouter {
    pub fn new(
        config: Arc<ServerConfig>,
        gate: AuthGate,
        registry: Arc<SessionRegistry<McpTransport>>,
        factory: Arc<dyn CoreFactory>,
    ) -> Self {
        let isolator = StatelessIsolator::new(factory.clone());
        Self {
            config,
            gate,
            registry,
            factory,
            isolator,
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<SessionRegistry<McpTransport>> {
        &self.registry
    }

    /// Serve one request. Never fails: every rejection is a JSON-RPC envelope.
    pub async fn handle<B>(&self, req: Request<B>) -> Response<BridgeBody>
    where
        B: Body + Send + 'static,
        B::Data: Send,
        B::Error: Into<BoxError>,
    {
        let mut response = self.route(req).await;
        if self.config.enable_cors {
            CorsLayer::apply_cors_headers(response.headers_mut());
        }
        response
    }

    async fn route<B>(&self, req: Request<B>) -> Response<BridgeBody>
    where
        B: Body + Send + 'static,
        B::Data: Send,
        B::Error: Into<BoxError>,
    {
        let method = req.method().clone();
        let path = req.uri().path().to_string();
        debug!("Handling {} {}", method, path);

        // Browsers send preflights without credentials.
        if method == Method::OPTIONS && self.config.enable_cors {
            return preflight_response();
        }

        if self.config.is_public_path(&path) {
            return if method == Method::GET {
                health_response()
            } else {
                BridgeError::MethodNotAllowed { allow: "GET" }.into_response()
            };
        }

        if let Err(rejection) = self.gate.check(req.headers()) {
            warn!(path = %path, reason = %rejection, "request rejected by auth gate");
            return rejection.into_response();
        }

        let result = match Route::resolve(&self.config, &method, &path) {
            Ok(Route::Streamable) => self.handle_streamable(req).await,
            Ok(Route::SseStream) => self.open_sse_session().await,
            Ok(Route::SseMessage) => self.handle_sse_message(req).await,
            Err(e) => Err(e),
        };

        result.unwrap_or_else(|e| {
            debug!(path = %path, error = %e, "request rejected");
            e.into_response()
        })
    }

    async fn handle_streamable<B>(&self, req: Request<B>) -> Result<Response<BridgeBody>, BridgeError>
    where
        B: Body + Send + 'static,
        B::Data: Send,
        B::Error: Into<BoxError>,
    {
        // A session id naming a live SSE session means the client mixed transports.
        if let Some(session_id) = extract_session_id(req.headers()) {
            if let Some(kind) = self.registry.kind_of(&session_id).await {
                if kind != TransportKind::StreamableHttp {
                    warn!(session_id = %session_id, %kind, "streamable request for SSE session");
                    return Err(BridgeError::TransportMismatch);
                }
            }
        }

        let mode = ResponseMode::negotiate(req.headers());
        let message = self.read_message(req.into_body()).await?;
        Ok(self.isolator.handle(message, mode).await)
    }

    async fn open_sse_session(&self) -> Result<Response<BridgeBody>, BridgeError> {
        let core = self.factory.create().map_err(|e| {
            error!(error = %e, "could not build tool-invocation core for SSE session");
            BridgeError::Internal
        })?;

        let session_id = SessionRegistry::<McpTransport>::new_session_id();
        let endpoint = format!(
            "{}?sessionId={}",
            self.config.advertised_message_path(),
            session_id
        );
        let (transport, body) =
            SseTransport::open(session_id.clone(), endpoint, core, &self.config.sse);
        let transport = Arc::new(McpTransport::Sse(transport));

        if let Err(e) = self.registry.insert(&session_id, transport.clone()).await {
            transport.close();
            error!(error = %e, "could not register SSE session");
            return Err(BridgeError::Internal);
        }

        // Client disconnect closes the session through the same path as the reaper.
        let registry = self.registry.clone();
        let watched = transport.clone();
        let watched_id = session_id.clone();
        tokio::spawn(async move {
            if let Some(sse) = watched.as_sse() {
                sse.disconnected().await;
            }
            registry.close(&watched_id).await;
        });

        info!(session_id = %session_id, "SSE session opened");
        let mut response = sse_response(body);
        if let Ok(value) = HeaderValue::from_str(&session_id) {
            response.headers_mut().insert(MCP_SESSION_ID_HEADER, value);
        }
        Ok(response)
    }

    async fn handle_sse_message<B>(&self, req: Request<B>) -> Result<Response<BridgeBody>, BridgeError>
    where
        B: Body + Send + 'static,
        B::Data: Send,
        B::Error: Into<BoxError>,
    {
        let session_id = query_session_id(req.uri()).ok_or(BridgeError::SessionNotFound)?;
        let transport = self
            .registry
            .touch(&session_id)
            .await
            .ok_or(BridgeError::SessionNotFound)?;
        if transport.kind() != TransportKind::Sse {
            return Err(BridgeError::TransportMismatch);
        }

        let message = self.read_message(req.into_body()).await?;
        debug!(session_id = %session_id, method = message.method(), "SSE message accepted");

        // Closed between lookup and delivery: the session is gone for good.
        transport
            .accept(message)
            .await
            .map_err(|_| BridgeError::SessionNotFound)?;
        Ok(accepted_response())
    }

    async fn read_message<B>(&self, body: B) -> Result<JsonRpcMessage, BridgeError>
    where
        B: Body + Send + 'static,
        B::Data: Send,
        B::Error: Into<BoxError>,
    {
        let collected = Limited::new(body, self.config.max_body_size)
            .collect()
            .await
            .map_err(|e| {
                if e.downcast_ref::<LengthLimitError>().is_some() {
                    BridgeError::PayloadTooLarge
                } else {
                    debug!(error = %e, "failed to read request body");
                    BridgeError::Malformed(JsonRpcError::parse_error())
                }
            })?;

        let bytes: Bytes = collected.to_bytes();
        let text = std::str::from_utf8(&bytes)
            .map_err(|_| BridgeError::Malformed(JsonRpcError::parse_error()))?;
        parse_json_rpc_message(text).map_err(BridgeError::Malformed)
    }
}
