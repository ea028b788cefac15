//! Header and query helpers for MCP over HTTP.

use hyper::header::ACCEPT;
use hyper::{HeaderMap, Uri};

pub const MCP_SESSION_ID_HEADER: &str = "mcp-session-id";
pub const SESSION_ID_QUERY_PARAM: &str = "sessionId";

/// Session id a client declared via `Mcp-Session-Id`
pub fn extract_session_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get(MCP_SESSION_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// `sessionId` from the query string of an SSE message post
pub fn query_session_id(uri: &Uri) -> Option<String> {
    uri.query()?
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == SESSION_ID_QUERY_PARAM)
        .and_then(|(_, value)| urlencoding::decode(value).ok())
        .map(|value| value.into_owned())
        .filter(|value| !value.is_empty())
}

/// How a streamable-HTTP reply is framed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseMode {
    /// Single `application/json` body
    Json,
    /// One-shot `text/event-stream` carrying the reply as a `message` event
    EventStream,
}

impl ResponseMode {
    /// JSON unless the client only accepts an event stream.
    pub fn negotiate(headers: &HeaderMap) -> Self {
        let Some(accept) = headers.get(ACCEPT).and_then(|h| h.to_str().ok()) else {
            return ResponseMode::Json;
        };

        let accepts = |media: &str| {
            accept
                .split(',')
                .map(|part| part.split(';').next().unwrap_or("").trim())
                .any(|part| part.eq_ignore_ascii_case(media))
        };

        if accepts("application/json") || accepts("*/*") {
            ResponseMode::Json
        } else if accepts("text/event-stream") {
            ResponseMode::EventStream
        } else {
            ResponseMode::Json
        }
    }
}
