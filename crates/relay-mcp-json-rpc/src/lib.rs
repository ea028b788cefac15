//! # JSON-RPC 2.0 layer for the relay bridge
//!
//! Transport-agnostic JSON-RPC types shared by the tool-invocation core and
//! the HTTP/SSE transports. Nothing in here knows about sessions or sockets.
//!
//! - [`parse_json_rpc_message`] turns a request body into a [`JsonRpcMessage`]
//! - [`JsonRpcReply`] is what travels back (a result or an error)
//! - [`JsonRpcError::envelope`] builds the `id: null` error body used for
//!   transport-level rejections

pub mod dispatch;
pub mod error;
pub mod notification;
pub mod request;
pub mod response;
pub mod types;

#[cfg(feature = "async")]
pub mod r#async;

pub use dispatch::{JsonRpcMessage, parse_json_rpc_message};
pub use error::{JsonRpcError, JsonRpcErrorObject};
pub use notification::JsonRpcNotification;
pub use request::{JsonRpcRequest, RequestParams};
pub use response::{JsonRpcReply, JsonRpcResponse};
pub use types::{JsonRpcVersion, RequestId};

#[cfg(feature = "async")]
pub use r#async::{JsonRpcDispatcher, JsonRpcHandler, SessionContext, ToJsonRpcError};

/// JSON-RPC 2.0 version constant
pub const JSONRPC_VERSION: &str = "2.0";

/// Standard JSON-RPC 2.0 error codes plus the server-range codes the bridge emits
pub mod error_codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;

    /// Generic transport rejection (method not allowed, transport mismatch, unknown session)
    pub const TRANSPORT_ERROR: i64 = -32000;
    /// Missing, invalid, or unconfigured credentials
    pub const UNAUTHENTICATED: i64 = -32001;
}
