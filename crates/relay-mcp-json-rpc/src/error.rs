use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::error_codes::{
    INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST, METHOD_NOT_FOUND, PARSE_ERROR,
};
use crate::types::{JsonRpcVersion, RequestId};

/// The `error` member of an error reply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcErrorObject {
    pub fn with_code(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Attach structured detail to an existing error.
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn parse_error() -> Self {
        Self::with_code(PARSE_ERROR, "Parse error")
    }

    pub fn invalid_request() -> Self {
        Self::with_code(INVALID_REQUEST, "Invalid Request")
    }

    pub fn method_not_found(method: &str) -> Self {
        Self::with_code(METHOD_NOT_FOUND, format!("Method '{method}' not found"))
    }

    pub fn invalid_params(message: &str) -> Self {
        Self::with_code(INVALID_PARAMS, message)
    }

    /// Falls back to the generic "Internal error" text when no detail is given.
    pub fn internal_error(message: Option<String>) -> Self {
        Self::with_code(
            INTERNAL_ERROR,
            message.unwrap_or_else(|| "Internal error".to_owned()),
        )
    }
}

/// A JSON-RPC error reply.
///
/// Serializes as `{"jsonrpc":"2.0","error":{...},"id":...}` with `id` rendered
/// as `null` when the failing request could not be identified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    #[serde(rename = "jsonrpc")]
    pub version: JsonRpcVersion,
    pub error: JsonRpcErrorObject,
    pub id: Option<RequestId>,
}

impl JsonRpcError {
    pub fn new(id: Option<RequestId>, error: JsonRpcErrorObject) -> Self {
        Self {
            version: JsonRpcVersion::V2_0,
            error,
            id,
        }
    }

    /// Transport-level rejection body: no request id, code and message only.
    pub fn envelope(code: i64, message: impl Into<String>) -> Self {
        Self::new(None, JsonRpcErrorObject::with_code(code, message))
    }

    pub fn parse_error() -> Self {
        Self::new(None, JsonRpcErrorObject::parse_error())
    }

    pub fn invalid_request(id: Option<RequestId>) -> Self {
        Self::new(id, JsonRpcErrorObject::invalid_request())
    }

    pub fn method_not_found(id: RequestId, method: &str) -> Self {
        Self::new(Some(id), JsonRpcErrorObject::method_not_found(method))
    }

    pub fn invalid_params(id: RequestId, message: &str) -> Self {
        Self::new(Some(id), JsonRpcErrorObject::invalid_params(message))
    }

    pub fn internal_error(id: Option<RequestId>, message: Option<String>) -> Self {
        Self::new(id, JsonRpcErrorObject::internal_error(message))
    }
}

impl fmt::Display for JsonRpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.id {
            Some(id) => write!(f, "request {id} failed ({}): {}", self.error.code, self.error.message),
            None => write!(f, "rejected ({}): {}", self.error.code, self.error.message),
        }
    }
}

impl std::error::Error for JsonRpcError {}
