//! Interface of the outbound API client that tool handlers call.
//!
//! The bridge ships no implementation: whoever wires up the tools provides
//! one. What lives here is the request shape and the error translation that
//! every implementation shares, so a 401 from the upstream API always
//! surfaces as [`ApiError::AuthenticationFailed`].

use async_trait::async_trait;
use http::{Method, StatusCode};
use serde_json::Value;
use thiserror::Error;

const MAX_BODY_EXCERPT: usize = 200;

#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    /// Path relative to the API base URL, e.g. `/v1/items`
    pub endpoint: String,
    pub method: Method,
    pub body: Option<Value>,
    /// Return the whole decoded body instead of the API's `data` member
    pub full_response: bool,
}

impl ApiRequest {
    pub fn new(method: Method, endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            method,
            body: None,
            full_response: false,
        }
    }

    pub fn get(endpoint: impl Into<String>) -> Self {
        Self::new(Method::GET, endpoint)
    }

    pub fn post(endpoint: impl Into<String>, body: Value) -> Self {
        Self::new(Method::POST, endpoint).with_body(body)
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn full_response(mut self) -> Self {
        self.full_response = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiError {
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("API request failed with status {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Invalid API response: {0}")]
    InvalidResponse(String),

    #[error("API request could not be sent: {0}")]
    Transport(String),
}

impl ApiError {
    /// Translate a non-success upstream response into a typed error.
    pub fn from_response(status: u16, body: &str) -> Self {
        let message = extract_error_message(body).unwrap_or_else(|| {
            StatusCode::from_u16(status)
                .ok()
                .and_then(|code| code.canonical_reason())
                .unwrap_or("Unknown error")
                .to_string()
        });

        if status == StatusCode::UNAUTHORIZED.as_u16() {
            ApiError::AuthenticationFailed(message)
        } else {
            ApiError::Http { status, message }
        }
    }

    pub fn is_authentication_failure(&self) -> bool {
        matches!(self, ApiError::AuthenticationFailed(_))
    }
}

/// Pull a human-readable message out of an error body.
///
/// Looks at the usual `message` / `error` / `error_description` / `detail`
/// members first and falls back to a short excerpt of a non-JSON body.
pub fn extract_error_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }

    match serde_json::from_str::<Value>(trimmed) {
        Ok(value) => ["message", "error", "error_description", "detail"]
            .iter()
            .find_map(|key| match value.get(*key) {
                Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
                Some(Value::Object(nested)) => nested
                    .get("message")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                _ => None,
            }),
        Err(_) => Some(trimmed.chars().take(MAX_BODY_EXCERPT).collect()),
    }
}

/// Authenticated client for the third-party API behind the tools
#[async_trait]
pub trait ApiClient: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<Value, ApiError>;
}
