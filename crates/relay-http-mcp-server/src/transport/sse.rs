use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use bytes::Bytes;
use relay_mcp_core::ToolCore;
use relay_mcp_json_rpc::{JsonRpcMessage, JsonRpcReply, SessionContext};
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::TransportError;
use crate::response::{BridgeBody, stream_body};

/// One event on the legacy SSE stream
#[derive(Debug, Clone, PartialEq)]
pub enum SseFrame {
    /// First event: where the client must POST its messages
    Endpoint(String),
    Message(JsonRpcReply),
    KeepAlive,
}

impl SseFrame {
    pub fn format(&self) -> String {
        match self {
            SseFrame::Endpoint(uri) => format!("event: endpoint\ndata: {}\n\n", uri),
            SseFrame::Message(reply) => {
                format!("event: message\ndata: {}\n\n", reply.to_json_string())
            }
            // Comment line, ignored by EventSource clients
            SseFrame::KeepAlive => ": keepalive\n\n".to_string(),
        }
    }

    fn into_bytes(self) -> Bytes {
        Bytes::from(self.format())
    }
}

#[derive(Debug, Clone)]
pub struct SseSettings {
    pub keepalive_interval: Duration,
    /// Replies buffered ahead of a slow client
    pub outbound_capacity: usize,
    /// Posted messages queued ahead of the session worker
    pub inbound_capacity: usize,
}

impl Default for SseSettings {
    fn default() -> Self {
        Self {
            keepalive_interval: Duration::from_secs(30),
            outbound_capacity: 64,
            inbound_capacity: 64,
        }
    }
}

/// Long-lived outbound event stream plus a queue fed by message posts.
///
/// A single worker task per session drains the queue, so messages of one
/// session are handled in the order they were accepted.
pub struct SseTransport {
    session_id: String,
    outbound: mpsc::Sender<SseFrame>,
    inbound: mpsc::Sender<JsonRpcMessage>,
    cancel: CancellationToken,
    closed: AtomicBool,
}

impl SseTransport {
    /// Connect a fresh core to a new event stream.
    ///
    /// Returns the transport and the response body the client will read.
    pub fn open(
        session_id: String,
        endpoint: String,
        core: Arc<dyn ToolCore>,
        settings: &SseSettings,
    ) -> (Self, BridgeBody) {
        let (outbound, outbound_rx) = mpsc::channel(settings.outbound_capacity.max(1));
        let (inbound, inbound_rx) = mpsc::channel(settings.inbound_capacity.max(1));
        let cancel = CancellationToken::new();

        tokio::spawn(run_session_worker(
            session_id.clone(),
            core,
            inbound_rx,
            outbound.clone(),
            cancel.clone(),
        ));

        let body = event_stream(
            endpoint,
            outbound_rx,
            cancel.clone(),
            settings.keepalive_interval,
        );

        let transport = Self {
            session_id,
            outbound,
            inbound,
            cancel,
            closed: AtomicBool::new(false),
        };
        (transport, body)
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub async fn accept(&self, message: JsonRpcMessage) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        self.inbound
            .send(message)
            .await
            .map_err(|_| TransportError::Closed)
    }

    pub async fn send(&self, reply: JsonRpcReply) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        self.outbound
            .send(SseFrame::Message(reply))
            .await
            .map_err(|_| TransportError::Closed)
    }

    /// Ends the event stream and stops the worker, which then closes the core.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            self.cancel.cancel();
            info!(session_id = %self.session_id, "SSE transport closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Resolves once the client dropped the event stream or the transport
    /// was closed from our side.
    pub async fn disconnected(&self) {
        tokio::select! {
            _ = self.outbound.closed() => {
                debug!(session_id = %self.session_id, "SSE client went away");
            }
            _ = self.cancel.cancelled() => {}
        }
    }
}

async fn run_session_worker(
    session_id: String,
    core: Arc<dyn ToolCore>,
    mut inbound: mpsc::Receiver<JsonRpcMessage>,
    outbound: mpsc::Sender<SseFrame>,
    cancel: CancellationToken,
) {
    loop {
        let message = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            message = inbound.recv() => match message {
                Some(message) => message,
                None => break,
            },
        };

        let context = SessionContext::new(session_id.as_str());
        match core.handle_message(message, Some(context)).await {
            Ok(Some(reply)) => {
                if outbound.send(SseFrame::Message(reply)).await.is_err() {
                    debug!(session_id = %session_id, "event stream gone, dropping reply");
                    break;
                }
            }
            Ok(None) => {}
            Err(e) => {
                error!(session_id = %session_id, error = %e, "SSE message processing failed");
            }
        }
    }

    core.close();
    debug!(session_id = %session_id, "SSE session worker stopped");
}

fn event_stream(
    endpoint: String,
    mut frames: mpsc::Receiver<SseFrame>,
    cancel: CancellationToken,
    keepalive: Duration,
) -> BridgeBody {
    let keepalive = keepalive.max(Duration::from_secs(1));
    let stream = async_stream::stream! {
        yield SseFrame::Endpoint(endpoint).into_bytes();

        let mut keepalive_interval = tokio::time::interval_at(Instant::now() + keepalive, keepalive);
        keepalive_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                frame = frames.recv() => match frame {
                    Some(frame) => yield frame.into_bytes(),
                    None => break,
                },
                _ = keepalive_interval.tick() => yield SseFrame::KeepAlive.into_bytes(),
            }
        }
    };

    stream_body(stream)
}
