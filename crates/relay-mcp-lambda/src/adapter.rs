//! Conversion between `lambda_http` and hyper types.

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Request, Response};
use lambda_http::{Body as LambdaBody, Request as LambdaRequest};
use relay_http_mcp_server::BridgeBody;
use tracing::debug;

/// Lambda request to a hyper request the router can serve. Headers, method
/// and URI (including the query string) are carried over unchanged.
pub fn lambda_to_hyper_request(lambda_req: LambdaRequest) -> Request<Full<Bytes>> {
    let (parts, lambda_body) = lambda_req.into_parts();

    let body = match lambda_body {
        LambdaBody::Empty => Bytes::new(),
        LambdaBody::Text(s) => Bytes::from(s),
        LambdaBody::Binary(b) => Bytes::from(b),
        _ => Bytes::new(),
    };

    let req = Request::from_parts(parts, Full::new(body));
    debug!("Converted Lambda request: {} {}", req.method(), req.uri());
    req
}

/// Pass the body through untouched so SSE frames stream out as produced.
pub fn hyper_to_lambda_streaming(resp: Response<BridgeBody>) -> lambda_http::Response<BridgeBody> {
    let (parts, body) = resp.into_parts();
    lambda_http::Response::from_parts(parts, body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[tokio::test]
    async fn test_text_body_and_query_survive() {
        let lambda_req = http::Request::builder()
            .method("POST")
            .uri("/messages?sessionId=abc")
            .header("x-api-key", "k")
            .body(LambdaBody::from("{\"jsonrpc\":\"2.0\"}"))
            .unwrap();

        let req = lambda_to_hyper_request(lambda_req);
        assert_eq!(req.uri().query(), Some("sessionId=abc"));
        assert_eq!(req.headers().get("x-api-key").unwrap(), "k");

        let body = req.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"{\"jsonrpc\":\"2.0\"}");
    }

    #[tokio::test]
    async fn test_empty_and_binary_bodies() {
        let empty = http::Request::builder()
            .uri("/sse")
            .body(LambdaBody::Empty)
            .unwrap();
        let body = lambda_to_hyper_request(empty)
            .into_body()
            .collect()
            .await
            .unwrap()
            .to_bytes();
        assert!(body.is_empty());

        let binary = http::Request::builder()
            .method("POST")
            .uri("/mcp")
            .body(LambdaBody::Binary(vec![0xff, 0x00]))
            .unwrap();
        let body = lambda_to_hyper_request(binary)
            .into_body()
            .collect()
            .await
            .unwrap()
            .to_bytes();
        assert_eq!(&body[..], &[0xff, 0x00]);
    }
}
