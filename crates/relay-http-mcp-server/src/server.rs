//! Listener, accept loop and lifecycle of the bridge

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use relay_mcp_core::{CoreFactory, RegistryCoreFactory, ServerInfo, ToolRegistry};
use relay_mcp_session::{Reaper, ReaperConfig, SessionRegistry};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::auth::{AllowedKeys, AuthGate};
use crate::config::ServerConfig;
use crate::router::BridgeRouter;
use crate::transport::{McpTransport, SseSettings};
use crate::{HttpBridgeError, Result};

pub struct BridgeServerBuilder {
    config: ServerConfig,
    reaper: ReaperConfig,
    keys: AllowedKeys,
    factory: Option<Arc<dyn CoreFactory>>,
}

impl BridgeServerBuilder {
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
            reaper: ReaperConfig::default(),
            keys: AllowedKeys::not_configured(),
            factory: None,
        }
    }

    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn bind_address(mut self, addr: SocketAddr) -> Self {
        self.config.bind_address = addr;
        self
    }

    pub fn cors(mut self, enable: bool) -> Self {
        self.config.enable_cors = enable;
        self
    }

    pub fn max_body_size(mut self, size: usize) -> Self {
        self.config.max_body_size = size;
        self
    }

    pub fn sse_settings(mut self, settings: SseSettings) -> Self {
        self.config.sse = settings;
        self
    }

    pub fn allowed_keys(mut self, keys: AllowedKeys) -> Self {
        self.keys = keys;
        self
    }

    pub fn idle_threshold(mut self, threshold: Duration) -> Self {
        self.reaper.idle_threshold = threshold;
        self
    }

    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.reaper.sweep_interval = interval;
        self
    }

    pub fn core_factory<F: CoreFactory + 'static>(mut self, factory: F) -> Self {
        self.factory = Some(Arc::new(factory));
        self
    }

    /// Serve a fixed set of tools, one fresh core per request or session.
    pub fn tools(self, info: ServerInfo, tools: ToolRegistry) -> Self {
        self.core_factory(RegistryCoreFactory::new(info, tools))
    }

    /// Refuses to build without credentials: a server that rejects every
    /// request is a misconfiguration, not a deployment.
    pub fn build(self) -> Result<BridgeServer> {
        if !self.keys.is_configured() {
            return Err(HttpBridgeError::Config(
                "no API keys configured; refusing to start".to_string(),
            ));
        }
        let factory = self.factory.ok_or_else(|| {
            HttpBridgeError::Config("no tool-invocation core configured".to_string())
        })?;
        self.reaper.validate()?;

        let config = Arc::new(self.config);
        let registry = Arc::new(SessionRegistry::new());
        let router = Arc::new(BridgeRouter::new(
            config.clone(),
            AuthGate::new(self.keys),
            registry.clone(),
            factory,
        ));

        Ok(BridgeServer {
            config,
            reaper: self.reaper,
            registry,
            router,
        })
    }
}

impl Default for BridgeServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone)]
pub struct BridgeServer {
    config: Arc<ServerConfig>,
    reaper: ReaperConfig,
    registry: Arc<SessionRegistry<McpTransport>>,
    router: Arc<BridgeRouter>,
}

impl BridgeServer {
    pub fn builder() -> BridgeServerBuilder {
        BridgeServerBuilder::new()
    }

    pub fn router(&self) -> Arc<BridgeRouter> {
        self.router.clone()
    }

    pub fn registry(&self) -> Arc<SessionRegistry<McpTransport>> {
        self.registry.clone()
    }

    /// Run until the process is killed.
    pub async fn run(&self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let listener = TcpListener::bind(self.config.bind_address).await?;
        self.serve(listener, shutdown).await
    }

    /// Accept connections on `listener` until `shutdown` resolves, then stop
    /// the reaper and close every session.
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let local_addr = listener.local_addr()?;
        info!("MCP bridge listening on {}", local_addr);
        info!(
            "Streamable HTTP: {:?}, SSE: {} + {:?}",
            self.config.streamable_paths, self.config.sse_path, self.config.message_paths
        );

        let cancel = CancellationToken::new();
        let reaper = Reaper::spawn_with_token(self.registry.clone(), self.reaper, cancel.child_token())?;

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested");
                    break;
                }
                accepted = listener.accept() => {
                    let (stream, peer_addr) = match accepted {
                        Ok(conn) => conn,
                        Err(e) => {
                            warn!("Failed to accept connection: {}", e);
                            continue;
                        }
                    };
                    debug!("New connection from {}", peer_addr);

                    let router = self.router.clone();
                    tokio::spawn(async move {
                        let io = TokioIo::new(stream);
                        let service = service_fn(move |req| {
                            let router = router.clone();
                            async move { Ok::<_, Infallible>(router.handle(req).await) }
                        });

                        if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                            if err.is_incomplete_message() || err.is_canceled() {
                                debug!("Client disconnected: {}", err);
                            } else {
                                error!("Error serving connection: {}", err);
                            }
                        }
                    });
                }
            }
        }

        cancel.cancel();
        reaper.shutdown().await;
        let closed = self.registry.close_all().await;
        info!(sessions = closed, "MCP bridge stopped");
        Ok(())
    }

    pub async fn stats(&self) -> ServerStats {
        ServerStats {
            sessions: self.registry.len().await,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerStats {
    pub sessions: usize,
}
