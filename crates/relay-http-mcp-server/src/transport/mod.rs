//! The two MCP transports behind one capability set.
//!
//! Both variants accept inbound messages, push outbound replies and close
//! idempotently. Framing, handshake and correlation stay inside each variant.

mod sse;
mod streamable;

pub use sse::{SseFrame, SseSettings, SseTransport};
pub use streamable::StreamableHttpTransport;

use relay_mcp_core::CoreError;
use relay_mcp_json_rpc::{JsonRpcMessage, JsonRpcReply};
use relay_mcp_session::{SessionTransport, TransportKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Transport is closed")]
    Closed,

    #[error(transparent)]
    Core(#[from] CoreError),
}

pub enum McpTransport {
    StreamableHttp(StreamableHttpTransport),
    Sse(SseTransport),
}

impl McpTransport {
    pub fn kind(&self) -> TransportKind {
        match self {
            McpTransport::StreamableHttp(_) => TransportKind::StreamableHttp,
            McpTransport::Sse(_) => TransportKind::Sse,
        }
    }

    /// Hand an inbound message to the connected core.
    ///
    /// Streamable HTTP processes it before returning; SSE queues it for the
    /// session worker and returns once it is queued.
    pub async fn accept(&self, message: JsonRpcMessage) -> Result<(), TransportError> {
        match self {
            McpTransport::StreamableHttp(t) => t.accept(message).await,
            McpTransport::Sse(t) => t.accept(message).await,
        }
    }

    /// Push an outbound reply towards the client.
    pub async fn send(&self, reply: JsonRpcReply) -> Result<(), TransportError> {
        match self {
            McpTransport::StreamableHttp(t) => t.send(reply).await,
            McpTransport::Sse(t) => t.send(reply).await,
        }
    }

    pub fn close(&self) {
        match self {
            McpTransport::StreamableHttp(t) => t.close(),
            McpTransport::Sse(t) => t.close(),
        }
    }

    pub fn is_closed(&self) -> bool {
        match self {
            McpTransport::StreamableHttp(t) => t.is_closed(),
            McpTransport::Sse(t) => t.is_closed(),
        }
    }

    pub fn as_sse(&self) -> Option<&SseTransport> {
        match self {
            McpTransport::Sse(t) => Some(t),
            McpTransport::StreamableHttp(_) => None,
        }
    }
}

impl SessionTransport for McpTransport {
    fn kind(&self) -> TransportKind {
        McpTransport::kind(self)
    }

    fn close(&self) {
        McpTransport::close(self)
    }

    fn is_closed(&self) -> bool {
        McpTransport::is_closed(self)
    }
}
