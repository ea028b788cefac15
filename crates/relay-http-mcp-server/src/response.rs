//! Response builders shared by every route.

use bytes::Bytes;
use futures::{Stream, StreamExt};
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Full, StreamBody};
use hyper::body::Frame;
use hyper::header::{self, HeaderValue};
use hyper::{Response, StatusCode};
use serde::Serialize;
use tracing::error;

/// Body type of every response the bridge produces
pub type BridgeBody = UnsyncBoxBody<Bytes, hyper::Error>;

pub fn full_body(bytes: impl Into<Bytes>) -> BridgeBody {
    Full::new(bytes.into())
        .map_err(|never| match never {})
        .boxed_unsync()
}

pub fn empty_body() -> BridgeBody {
    full_body(Bytes::new())
}

/// Wrap a stream of already-formatted SSE chunks.
pub fn stream_body<S>(chunks: S) -> BridgeBody
where
    S: Stream<Item = Bytes> + Send + 'static,
{
    StreamBody::new(chunks.map(|chunk| Ok::<_, hyper::Error>(Frame::data(chunk)))).boxed_unsync()
}

pub fn json_response<T: Serialize>(status: StatusCode, value: &T) -> Response<BridgeBody> {
    let bytes = serde_json::to_vec(value).unwrap_or_else(|e| {
        error!("Failed to serialize response body: {}", e);
        b"{}".to_vec()
    });

    let mut response = Response::new(full_body(bytes));
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    response
}

/// `202 Accepted`, used for notifications and SSE message posts.
pub fn accepted_response() -> Response<BridgeBody> {
    let mut response = Response::new(empty_body());
    *response.status_mut() = StatusCode::ACCEPTED;
    response
}

pub fn sse_response(body: BridgeBody) -> Response<BridgeBody> {
    let mut response = Response::new(body);
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/event-stream"),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    response
}

/// CORS preflight answer; the CORS layer adds the actual headers.
pub fn preflight_response() -> Response<BridgeBody> {
    let mut response = Response::new(empty_body());
    *response.status_mut() = StatusCode::NO_CONTENT;
    response
}

pub fn health_response() -> Response<BridgeBody> {
    json_response(StatusCode::OK, &serde_json::json!({ "status": "ok" }))
}
