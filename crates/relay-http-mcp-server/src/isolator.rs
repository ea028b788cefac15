//! Stateless handling of streamable-HTTP requests.
//!
//! Every request gets a brand-new core and transport, wrapped in a
//! [`RequestScope`]. The scope tears both down exactly once: explicitly when
//! the exchange finishes, or from `Drop` when hyper abandons the request
//! future or response body because the client disconnected.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::Bytes;
use hyper::{Response, StatusCode};
use relay_mcp_core::{CoreError, CoreFactory, ToolCore};
use relay_mcp_json_rpc::{JsonRpcMessage, JsonRpcReply};
use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::error::BridgeError;
use crate::protocol::ResponseMode;
use crate::response::{BridgeBody, accepted_response, json_response, sse_response, stream_body};
use crate::transport::{SseFrame, StreamableHttpTransport, TransportError};

/// One core and one transport, alive for exactly one exchange
pub struct RequestScope {
    core: Arc<dyn ToolCore>,
    transport: StreamableHttpTransport,
    replies: mpsc::Receiver<JsonRpcReply>,
    torn_down: AtomicBool,
}

impl RequestScope {
    pub fn open(factory: &dyn CoreFactory) -> Result<Self, CoreError> {
        let core = factory.create()?;
        let (transport, replies) = StreamableHttpTransport::connect(core.clone());
        Ok(Self {
            core,
            transport,
            replies,
            torn_down: AtomicBool::new(false),
        })
    }

    /// Forward the single message and collect its reply, if it has one.
    pub async fn exchange(
        &mut self,
        message: JsonRpcMessage,
    ) -> Result<Option<JsonRpcReply>, TransportError> {
        self.transport.accept(message).await?;
        Ok(self.replies.try_recv().ok())
    }

    pub fn teardown(&self) {
        if !self.torn_down.swap(true, Ordering::AcqRel) {
            self.transport.close();
            self.core.close();
            debug!("request scope torn down");
        }
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down.load(Ordering::Acquire)
    }
}

impl Drop for RequestScope {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Serves streamable-HTTP exchanges in isolation from each other
#[derive(Clone)]
pub struct StatelessIsolator {
    factory: Arc<dyn CoreFactory>,
}

impl StatelessIsolator {
    pub fn new(factory: Arc<dyn CoreFactory>) -> Self {
        Self { factory }
    }

    pub async fn handle(&self, message: JsonRpcMessage, mode: ResponseMode) -> Response<BridgeBody> {
        let mut scope = match RequestScope::open(self.factory.as_ref()) {
            Ok(scope) => scope,
            Err(e) => {
                error!(error = %e, "could not build tool-invocation core for request");
                return BridgeError::Internal.into_response();
            }
        };

        if mode == ResponseMode::Json || message.is_notification() {
            let response = match scope.exchange(message).await {
                Ok(Some(reply)) => json_response(StatusCode::OK, &reply),
                Ok(None) => accepted_response(),
                Err(e) => {
                    error!(error = %e, "streamable exchange failed");
                    BridgeError::Internal.into_response()
                }
            };
            scope.teardown();
            return response;
        }

        // Headers go out before the core runs; later failures can only be logged.
        let stream = async_stream::stream! {
            match scope.exchange(message).await {
                Ok(Some(reply)) => yield Bytes::from(SseFrame::Message(reply).format()),
                Ok(None) => {}
                Err(e) => error!(error = %e, "streamable exchange failed after response started"),
            }
            scope.teardown();
        };
        sse_response(stream_body(stream))
    }
}
