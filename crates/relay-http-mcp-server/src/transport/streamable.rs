use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use relay_mcp_core::ToolCore;
use relay_mcp_json_rpc::{JsonRpcMessage, JsonRpcReply};
use tokio::sync::mpsc;
use tracing::debug;

use super::TransportError;

/// Request/response transport for a single streamable-HTTP exchange.
///
/// Replies go into a channel owned by whoever writes the HTTP response.
pub struct StreamableHttpTransport {
    core: Arc<dyn ToolCore>,
    replies: mpsc::Sender<JsonRpcReply>,
    closed: AtomicBool,
}

impl StreamableHttpTransport {
    pub fn connect(core: Arc<dyn ToolCore>) -> (Self, mpsc::Receiver<JsonRpcReply>) {
        // One exchange per transport: a request yields at most one reply.
        let (replies, receiver) = mpsc::channel(1);
        let transport = Self {
            core,
            replies,
            closed: AtomicBool::new(false),
        };
        (transport, receiver)
    }

    pub async fn accept(&self, message: JsonRpcMessage) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }

        debug!(method = message.method(), "streamable exchange");
        if let Some(reply) = self.core.handle_message(message, None).await? {
            self.send(reply).await?;
        }
        Ok(())
    }

    pub async fn send(&self, reply: JsonRpcReply) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        self.replies
            .send(reply)
            .await
            .map_err(|_| TransportError::Closed)
    }

    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}
