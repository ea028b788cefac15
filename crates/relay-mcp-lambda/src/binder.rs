//! Binds the edge runtime's requests to one lazily built tool-invocation core.

use std::sync::Arc;

use hyper::body::Body;
use hyper::{Method, Request, Response};
use lambda_http::Request as LambdaRequest;
use relay_http_mcp_server::response::{health_response, preflight_response};
use relay_http_mcp_server::{
    AuthGate, BridgeBody, BridgeError, BridgeRouter, CorsLayer, McpTransport, ServerConfig,
    extract_token,
};
use relay_mcp_core::{
    ApiClient, CoreError, McpCore, ServerInfo, SharedCoreFactory, ToolCore, ToolHandler,
    ToolRegistry,
};
use relay_mcp_session::{Reaper, ReaperConfig, SessionRegistry};
use tokio::sync::OnceCell;
use tracing::{debug, error, info, warn};

use crate::adapter::{hyper_to_lambda_streaming, lambda_to_hyper_request};
use crate::error::{LambdaError, Result};
use crate::settings::{ConfigError, EdgeSettings};

type BoxError = Box<dyn std::error::Error + Send + Sync>;
type SettingsSource = Box<dyn Fn() -> std::result::Result<EdgeSettings, ConfigError> + Send + Sync>;

/// Route table of an edge deployment: the server routes plus `GET /health`
/// and the `/sse/message` alias for message posts.
pub fn edge_server_config() -> ServerConfig {
    ServerConfig {
        message_paths: vec!["/sse/message".to_string(), "/messages".to_string()],
        health_path: Some("/health".to_string()),
        ..ServerConfig::default()
    }
}

/// Deployment-specific construction of the core's collaborators.
pub trait EdgeCoreBuilder: Send + Sync + 'static {
    fn server_info(&self) -> ServerInfo {
        ServerInfo::default()
    }

    /// Outbound API client shared by every tool; `None` when tools need no backend.
    fn api_client(
        &self,
        _settings: &EdgeSettings,
    ) -> std::result::Result<Option<Arc<dyn ApiClient>>, CoreError> {
        Ok(None)
    }

    /// Handlers of every enabled module, registered before the first request is served.
    fn tools(
        &self,
        settings: &EdgeSettings,
        client: Option<Arc<dyn ApiClient>>,
    ) -> Vec<Arc<dyn ToolHandler>>;
}

struct BoundCore {
    core: Arc<dyn ToolCore>,
    router: BridgeRouter,
    // Held for its task; sweeps run while the runtime is thawed.
    _reaper: Reaper,
}

/// One core per runtime instance, built on first use and shared by every
/// request and SSE session through leases.
///
/// Initialization failures are not cached: the next request tries again.
pub struct EdgeSessionBinder<B: EdgeCoreBuilder> {
    builder: B,
    settings: SettingsSource,
    config: Arc<ServerConfig>,
    reaper: ReaperConfig,
    bound: OnceCell<BoundCore>,
}

impl<B: EdgeCoreBuilder> EdgeSessionBinder<B> {
    pub fn new(builder: B) -> Self {
        Self::with_settings_source(builder, EdgeSettings::from_env)
    }

    /// Read settings from `source` instead of the process environment.
    pub fn with_settings_source<F>(builder: B, source: F) -> Self
    where
        F: Fn() -> std::result::Result<EdgeSettings, ConfigError> + Send + Sync + 'static,
    {
        Self {
            builder,
            settings: Box::new(source),
            config: Arc::new(edge_server_config()),
            reaper: ReaperConfig::default(),
            bound: OnceCell::new(),
        }
    }

    pub fn with_config(mut self, config: ServerConfig) -> Self {
        self.config = Arc::new(config);
        self
    }

    pub fn with_reaper(mut self, reaper: ReaperConfig) -> Self {
        self.reaper = reaper;
        self
    }

    pub fn is_bound(&self) -> bool {
        self.bound.initialized()
    }

    /// Live SSE sessions, `None` before the core is bound.
    pub fn registry(&self) -> Option<&Arc<SessionRegistry<McpTransport>>> {
        self.bound.get().map(|bound| bound.router.registry())
    }

    /// The shared core, `None` before the first protected request.
    pub fn core(&self) -> Option<Arc<dyn ToolCore>> {
        self.bound.get().map(|bound| bound.core.clone())
    }

    /// Entry point for `lambda_http::run_with_streaming_response`.
    pub async fn handle_lambda(
        &self,
        req: LambdaRequest,
    ) -> std::result::Result<lambda_http::Response<BridgeBody>, BoxError> {
        let response = self.handle(lambda_to_hyper_request(req)).await;
        Ok(hyper_to_lambda_streaming(response))
    }

    pub async fn handle<Req>(&self, req: Request<Req>) -> Response<BridgeBody>
    where
        Req: Body + Send + 'static,
        Req::Data: Send,
        Req::Error: Into<BoxError>,
    {
        if let Some(bound) = self.bound.get() {
            return bound.router.handle(req).await;
        }

        let path = req.uri().path().to_string();

        // Preflight and health answer even when the environment is broken.
        if *req.method() == Method::OPTIONS && self.config.enable_cors {
            return self.with_cors(preflight_response());
        }
        if self.config.is_public_path(&path) {
            let response = if req.method() == Method::GET {
                health_response()
            } else {
                BridgeError::MethodNotAllowed { allow: "GET" }.into_response()
            };
            return self.with_cors(response);
        }

        let settings = match self.load_settings() {
            Ok(settings) => settings,
            Err(e) if extract_token(req.headers()).is_none() => {
                debug!(path = %path, error = %e, "unauthenticated request before bind");
                return self.with_cors(BridgeError::Unauthorized.into_response());
            }
            Err(e) => {
                error!(path = %path, error = %e, "edge settings unavailable");
                return self.with_cors(BridgeError::Internal.into_response());
            }
        };

        // Rejected callers never reach core construction.
        if let Err(rejection) = AuthGate::new(settings.api_keys.clone()).check(req.headers()) {
            warn!(path = %path, reason = %rejection, "request rejected before bind");
            return self.with_cors(rejection.into_response());
        }

        match self.bind(settings).await {
            Ok(bound) => bound.router.handle(req).await,
            Err(e) => {
                error!(path = %path, error = %e, "edge core initialization failed");
                self.with_cors(BridgeError::Internal.into_response())
            }
        }
    }

    fn load_settings(&self) -> Result<EdgeSettings> {
        Ok((self.settings)()?)
    }

    async fn bind(&self, settings: EdgeSettings) -> Result<&BoundCore> {
        self.bound
            .get_or_try_init(|| async move {
                debug!(settings = ?settings, "binding edge core");

                let client = self.builder.api_client(&settings)?;
                let tools = ToolRegistry::new(self.builder.tools(&settings, client));
                info!(tools = ?tools.names(), "edge core bound");

                let core: Arc<dyn ToolCore> =
                    Arc::new(McpCore::new(self.builder.server_info(), Arc::new(tools)));
                let registry = Arc::new(SessionRegistry::new());
                let reaper = Reaper::spawn(registry.clone(), self.reaper)?;
                let router = BridgeRouter::new(
                    self.config.clone(),
                    AuthGate::new(settings.api_keys),
                    registry,
                    Arc::new(SharedCoreFactory::new(core.clone())),
                );

                Ok::<_, LambdaError>(BoundCore {
                    core,
                    router,
                    _reaper: reaper,
                })
            })
            .await
    }

    fn with_cors(&self, mut response: Response<BridgeBody>) -> Response<BridgeBody> {
        if self.config.enable_cors {
            CorsLayer::apply_cors_headers(response.headers_mut());
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http_body_util::{BodyExt, Full};
    use lambda_http::Body as LambdaBody;
    use relay_http_mcp_server::AllowedKeys;
    use relay_mcp_core::EchoTool;
    use serde_json::{Value, json};
    use std::sync::atomic::{AtomicUsize, Ordering};

    const KEY: &str = "edge-key";

    struct Modules {
        built: Arc<AtomicUsize>,
    }

    impl EdgeCoreBuilder for Modules {
        fn tools(
            &self,
            settings: &EdgeSettings,
            _client: Option<Arc<dyn ApiClient>>,
        ) -> Vec<Arc<dyn ToolHandler>> {
            self.built.fetch_add(1, Ordering::SeqCst);
            let mut tools: Vec<Arc<dyn ToolHandler>> = Vec::new();
            if settings.module_enabled("echo") {
                tools.push(Arc::new(EchoTool));
            }
            tools
        }
    }

    fn binder_with(keys: &'static str, modules: &'static str) -> (EdgeSessionBinder<Modules>, Arc<AtomicUsize>) {
        let built = Arc::new(AtomicUsize::new(0));
        let binder = EdgeSessionBinder::with_settings_source(
            Modules {
                built: built.clone(),
            },
            move || {
                Ok(EdgeSettings {
                    api_keys: AllowedKeys::from_csv(keys),
                    enabled_modules: modules
                        .split(',')
                        .filter(|m| !m.is_empty())
                        .map(str::to_string)
                        .collect(),
                    ..EdgeSettings::default()
                })
            },
        );
        (binder, built)
    }

    fn request(method: Method, uri: &str, token: Option<&str>, body: &str) -> Request<Full<Bytes>> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        builder.body(Full::new(Bytes::from(body.to_string()))).unwrap()
    }

    fn rpc(id: i64, method: &str, params: Value) -> String {
        json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params}).to_string()
    }

    async fn body_json(response: Response<BridgeBody>) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn next_chunk(body: &mut BridgeBody) -> Option<String> {
        loop {
            let frame = body.frame().await?.unwrap();
            if let Ok(data) = frame.into_data() {
                let chunk = String::from_utf8(data.to_vec()).unwrap();
                if !chunk.starts_with(':') {
                    return Some(chunk);
                }
            }
        }
    }

    #[tokio::test]
    async fn test_health_is_public_and_does_not_bind() {
        let (binder, built) = binder_with(KEY, "");

        let response = binder.handle(request(Method::GET, "/health", None, "")).await;
        assert_eq!(response.status(), 200);
        assert_eq!(body_json(response).await, json!({"status": "ok"}));

        let response = binder.handle(request(Method::POST, "/health", None, "")).await;
        assert_eq!(response.status(), 405);

        assert!(!binder.is_bound());
        assert_eq!(built.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_health_survives_broken_environment() {
        let binder = EdgeSessionBinder::with_settings_source(
            Modules {
                built: Arc::new(AtomicUsize::new(0)),
            },
            || Err(ConfigError::Incomplete("MCP_API_TOKEN", "MCP_API_BASE_URL")),
        );

        let response = binder.handle(request(Method::GET, "/health", None, "")).await;
        assert_eq!(response.status(), 200);

        let response = binder
            .handle(request(Method::POST, "/mcp", Some(KEY), &rpc(1, "ping", json!({}))))
            .await;
        assert_eq!(response.status(), 500);
        assert_eq!(body_json(response).await["error"]["code"], -32603);
    }

    #[tokio::test]
    async fn test_missing_credentials_rejected_with_broken_environment() {
        let built = Arc::new(AtomicUsize::new(0));
        let binder = EdgeSessionBinder::with_settings_source(
            Modules {
                built: built.clone(),
            },
            || Err(ConfigError::Incomplete("MCP_API_TOKEN", "MCP_API_BASE_URL")),
        );

        for (method, uri) in [(Method::POST, "/mcp"), (Method::GET, "/sse")] {
            let response = binder.handle(request(method, uri, None, "")).await;
            assert_eq!(response.status(), 401, "{}", uri);
            let body = body_json(response).await;
            assert_eq!(body["error"]["code"], -32001);
            assert_eq!(body["error"]["message"], "Unauthorized");
        }
        assert!(!binder.is_bound());
        assert_eq!(built.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_wrong_token_leaves_core_unbuilt() {
        let (binder, built) = binder_with(KEY, "echo");

        let response = binder
            .handle(request(Method::POST, "/mcp", Some("wrong-token"), &rpc(1, "ping", json!({}))))
            .await;
        assert_eq!(response.status(), 401);
        assert!(response.headers().contains_key("access-control-allow-origin"));
        assert_eq!(body_json(response).await["error"]["code"], -32001);

        assert!(!binder.is_bound());
        assert!(binder.core().is_none());
        assert_eq!(built.load(Ordering::SeqCst), 0);

        let response = binder
            .handle(request(Method::POST, "/mcp", Some(KEY), &rpc(2, "ping", json!({}))))
            .await;
        assert_eq!(response.status(), 200);
        assert_eq!(built.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_preflight_answered_before_bind() {
        let (binder, built) = binder_with(KEY, "");

        let response = binder.handle(request(Method::OPTIONS, "/mcp", None, "")).await;
        assert_eq!(response.status(), 204);
        assert!(response.headers().contains_key("access-control-allow-methods"));
        assert!(!binder.is_bound());
        assert_eq!(built.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failed_initialization_is_retried() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();
        let binder = EdgeSessionBinder::with_settings_source(
            Modules {
                built: Arc::new(AtomicUsize::new(0)),
            },
            move || {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(ConfigError::InvalidUrl {
                        name: "MCP_API_BASE_URL",
                        value: "nope".to_string(),
                    })
                } else {
                    Ok(EdgeSettings {
                        api_keys: AllowedKeys::from_csv(KEY),
                        ..EdgeSettings::default()
                    })
                }
            },
        );

        let ping = rpc(1, "ping", json!({}));
        let response = binder.handle(request(Method::POST, "/mcp", Some(KEY), &ping)).await;
        assert_eq!(response.status(), 500);
        assert!(!binder.is_bound());

        let response = binder.handle(request(Method::POST, "/mcp", Some(KEY), &ping)).await;
        assert_eq!(response.status(), 200);
        assert!(binder.is_bound());
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_missing_keys_rejected_at_request_time() {
        let (binder, _) = binder_with("", "");

        let response = binder
            .handle(request(Method::POST, "/mcp", Some(KEY), &rpc(1, "ping", json!({}))))
            .await;
        assert_eq!(response.status(), 401);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], -32001);
        assert_eq!(body["error"]["message"], "Authentication not configured");
    }

    #[tokio::test]
    async fn test_protected_paths_require_token() {
        let (binder, _) = binder_with(KEY, "");

        for (method, uri) in [
            (Method::POST, "/mcp"),
            (Method::POST, "/http"),
            (Method::GET, "/sse"),
            (Method::POST, "/messages?sessionId=x"),
            (Method::POST, "/sse/message?sessionId=x"),
            (Method::GET, "/elsewhere"),
        ] {
            let response = binder.handle(request(method, uri, None, "")).await;
            assert_eq!(response.status(), 401, "{}", uri);
        }

        let response = binder
            .handle(request(Method::GET, "/elsewhere", Some(KEY), ""))
            .await;
        assert_eq!(response.status(), 404);
    }

    #[tokio::test]
    async fn test_core_built_once_with_enabled_modules() {
        let (binder, built) = binder_with(KEY, "echo");

        for id in 1..=3 {
            let response = binder
                .handle(request(Method::POST, "/mcp", Some(KEY), &rpc(id, "tools/list", json!({}))))
                .await;
            let body = body_json(response).await;
            assert_eq!(body["result"]["tools"][0]["name"], "echo");
        }
        assert_eq!(built.load(Ordering::SeqCst), 1);

        // Per-request teardown only retires the lease.
        assert!(!binder.core().unwrap().is_closed());
    }

    #[tokio::test]
    async fn test_disabled_module_is_not_registered() {
        let (binder, _) = binder_with(KEY, "billing");

        let response = binder
            .handle(request(Method::POST, "/mcp", Some(KEY), &rpc(1, "tools/list", json!({}))))
            .await;
        assert_eq!(body_json(response).await["result"]["tools"], json!([]));
    }

    #[tokio::test]
    async fn test_sse_session_over_message_alias() {
        let (binder, _) = binder_with(KEY, "");

        let response = binder.handle(request(Method::GET, "/sse", Some(KEY), "")).await;
        assert_eq!(response.status(), 200);
        let mut events = response.into_body();
        let endpoint = next_chunk(&mut events).await.unwrap();
        let uri = endpoint
            .lines()
            .find_map(|line| line.strip_prefix("data: "))
            .unwrap()
            .to_string();
        assert!(uri.starts_with("/sse/message?sessionId="));
        assert_eq!(binder.registry().unwrap().len().await, 1);

        let response = binder
            .handle(request(Method::POST, &uri, Some(KEY), &rpc(4, "ping", json!({}))))
            .await;
        assert_eq!(response.status(), 202);

        let chunk = next_chunk(&mut events).await.unwrap();
        assert!(chunk.contains("\"id\":4"));

        // The legacy path reaches the same session.
        let legacy = uri.replace("/sse/message", "/messages");
        let response = binder
            .handle(request(Method::POST, &legacy, Some(KEY), &rpc(5, "ping", json!({}))))
            .await;
        assert_eq!(response.status(), 202);
        assert!(next_chunk(&mut events).await.unwrap().contains("\"id\":5"));

        drop(events);
        assert!(!binder.core().unwrap().is_closed());
    }

    #[tokio::test]
    async fn test_lambda_request_round_trip() {
        let (binder, _) = binder_with(KEY, "echo");
        let body = rpc(
            2,
            "tools/call",
            json!({"name": "echo", "arguments": {"text": "from lambda"}}),
        );
        let req = http::Request::builder()
            .method("POST")
            .uri("/mcp")
            .header("x-api-key", KEY)
            .header("content-type", "application/json")
            .body(LambdaBody::from(body))
            .unwrap();

        let response = binder.handle_lambda(req).await.unwrap();
        assert_eq!(response.status(), 200);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let reply: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(reply["result"]["content"][0]["text"], "from lambda");
    }
}
