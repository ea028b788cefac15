//! Client-facing rejections.
//!
//! Each variant maps to one HTTP status and one JSON-RPC error code; the
//! body is always the `{"jsonrpc":"2.0","error":{..},"id":null}` envelope.

use hyper::{Response, StatusCode, header};
use relay_mcp_json_rpc::{JsonRpcError, error_codes};
use thiserror::Error;

use crate::response::{BridgeBody, json_response};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BridgeError {
    #[error("Authentication not configured")]
    AuthNotConfigured,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Bad Request: Session exists but uses a different transport protocol")]
    TransportMismatch,

    #[error("No transport found for sessionId")]
    SessionNotFound,

    #[error("Method not allowed.")]
    MethodNotAllowed { allow: &'static str },

    #[error("Not found")]
    RouteNotFound,

    #[error("Payload too large")]
    PayloadTooLarge,

    /// Body was not a usable JSON-RPC message; carries the reply to send.
    #[error("{0}")]
    Malformed(JsonRpcError),

    #[error("Internal server error")]
    Internal,
}

impl BridgeError {
    pub fn status(&self) -> StatusCode {
        match self {
            BridgeError::AuthNotConfigured | BridgeError::Unauthorized => StatusCode::UNAUTHORIZED,
            BridgeError::TransportMismatch
            | BridgeError::SessionNotFound
            | BridgeError::Malformed(_) => StatusCode::BAD_REQUEST,
            BridgeError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            BridgeError::RouteNotFound => StatusCode::NOT_FOUND,
            BridgeError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            BridgeError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> i64 {
        match self {
            BridgeError::AuthNotConfigured | BridgeError::Unauthorized => {
                error_codes::UNAUTHENTICATED
            }
            BridgeError::TransportMismatch
            | BridgeError::SessionNotFound
            | BridgeError::MethodNotAllowed { .. }
            | BridgeError::RouteNotFound
            | BridgeError::PayloadTooLarge => error_codes::TRANSPORT_ERROR,
            BridgeError::Malformed(err) => err.error.code,
            BridgeError::Internal => error_codes::INTERNAL_ERROR,
        }
    }

    pub fn envelope(&self) -> JsonRpcError {
        match self {
            BridgeError::Malformed(err) => err.clone(),
            other => JsonRpcError::envelope(other.code(), other.to_string()),
        }
    }

    pub fn into_response(self) -> Response<BridgeBody> {
        let mut response = json_response(self.status(), &self.envelope());
        if let BridgeError::MethodNotAllowed { allow } = self {
            response
                .headers_mut()
                .insert(header::ALLOW, header::HeaderValue::from_static(allow));
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_and_code_table() {
        let cases = [
            (BridgeError::AuthNotConfigured, 401, -32001),
            (BridgeError::Unauthorized, 401, -32001),
            (BridgeError::TransportMismatch, 400, -32000),
            (BridgeError::SessionNotFound, 400, -32000),
            (BridgeError::MethodNotAllowed { allow: "POST" }, 405, -32000),
            (BridgeError::RouteNotFound, 404, -32000),
            (BridgeError::Internal, 500, -32603),
        ];

        for (error, status, code) in cases {
            assert_eq!(error.status().as_u16(), status, "{}", error);
            assert_eq!(error.code(), code, "{}", error);
            assert_eq!(error.envelope().id, None);
        }
    }

    #[test]
    fn test_malformed_passes_reply_through() {
        let error = BridgeError::Malformed(JsonRpcError::parse_error());
        assert_eq!(error.code(), error_codes::PARSE_ERROR);
        assert_eq!(error.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_method_not_allowed_sets_allow_header() {
        let response = BridgeError::MethodNotAllowed { allow: "POST" }.into_response();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers().get(header::ALLOW).unwrap(), "POST");
    }
}
