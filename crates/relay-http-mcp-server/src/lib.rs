//! # HTTP front end of the relay MCP bridge
//!
//! Serves two MCP transports from one listener:
//! - **Streamable HTTP** (`POST /mcp`, `POST /http`): stateless. Every request
//!   gets its own tool-invocation core and transport, torn down when the
//!   request finishes or the client goes away.
//! - **HTTP+SSE** (`GET /sse` + `POST /messages?sessionId=..`): one long-lived
//!   session per event stream, tracked in a [`SessionRegistry`] and reaped
//!   when idle.
//!
//! Every request passes the [`AuthGate`] before routing. Rejections are
//! JSON-RPC error envelopes with `id: null`.

pub mod auth;
pub mod config;
pub mod cors;
pub mod error;
pub mod isolator;
pub mod protocol;
pub mod response;
pub mod router;
pub mod server;
pub mod transport;

#[cfg(test)]
mod tests;

pub use auth::{AllowedKeys, AuthGate, extract_token};
pub use config::ServerConfig;
pub use cors::CorsLayer;
pub use error::BridgeError;
pub use isolator::{RequestScope, StatelessIsolator};
pub use protocol::{ResponseMode, extract_session_id, query_session_id};
pub use response::BridgeBody;
pub use router::{BridgeRouter, Route};
pub use server::{BridgeServer, BridgeServerBuilder, ServerStats};
pub use transport::{
    McpTransport, SseFrame, SseSettings, SseTransport, StreamableHttpTransport, TransportError,
};

pub use relay_mcp_session::{ReaperConfig, SessionRegistry, TransportKind};

/// Result type for server setup and the accept loop
pub type Result<T> = std::result::Result<T, HttpBridgeError>;

#[derive(Debug, thiserror::Error)]
pub enum HttpBridgeError {
    #[error("HTTP error: {0}")]
    Http(#[from] hyper::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Session registry error: {0}")]
    Registry(#[from] relay_mcp_session::RegistryError),

    #[error("Configuration error: {0}")]
    Config(String),
}
