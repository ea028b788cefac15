use std::sync::Arc;

use hyper::{Method, StatusCode};
use serde_json::json;
use tokio::sync::Notify;

use super::*;
use crate::ServerConfig;

#[tokio::test]
async fn test_wrong_bearer_token_gets_unauthorized_envelope() {
    let router = router();
    let mut req = unauthenticated(Method::POST, "/mcp", &rpc(1, "ping", json!({})));
    req.headers_mut()
        .insert("authorization", "Bearer wrong-token".parse().unwrap());

    let response = router.handle(req).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        body_json(response).await,
        json!({
            "jsonrpc": "2.0",
            "error": { "code": -32001, "message": "Unauthorized" },
            "id": null
        })
    );
}

#[tokio::test]
async fn test_missing_credentials_rejected_on_every_path() {
    let router = router();
    let cases = [
        (Method::POST, "/mcp"),
        (Method::POST, "/http"),
        (Method::GET, "/mcp"),
        (Method::GET, "/sse"),
        (Method::POST, "/messages?sessionId=whatever"),
        (Method::GET, "/does-not-exist"),
    ];

    for (method, uri) in cases {
        let response = router
            .handle(unauthenticated(method.clone(), uri, ""))
            .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{} {}", method, uri);
        assert_eq!(body_json(response).await["error"]["code"], -32001);
    }

    // Nothing was opened on the way.
    assert!(router.registry().is_empty().await);
}

#[tokio::test]
async fn test_api_key_header_accepted() {
    let router = router();
    let mut req = unauthenticated(Method::POST, "/mcp", &rpc(3, "ping", json!({})));
    req.headers_mut().insert("x-api-key", KEY.parse().unwrap());

    let response = router.handle(req).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["id"], 3);
}

#[tokio::test]
async fn test_unconfigured_keys_fail_closed() {
    let router = router_with(
        ServerConfig::default(),
        AllowedKeys::not_configured(),
        Arc::new(tool_factory(Arc::new(Notify::new()))),
    );

    let response = router
        .handle(authed(Method::POST, "/mcp", &rpc(1, "ping", json!({}))))
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], -32001);
    assert_eq!(body["error"]["message"], "Authentication not configured");
}

#[tokio::test]
async fn test_preflight_skips_auth() {
    let router = router();
    let response = router
        .handle(unauthenticated(Method::OPTIONS, "/mcp", ""))
        .await;

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .unwrap(),
        "*"
    );
}

#[tokio::test]
async fn test_preflight_needs_auth_when_cors_disabled() {
    let config = ServerConfig {
        enable_cors: false,
        ..ServerConfig::default()
    };
    let router = router_with(
        config,
        AllowedKeys::from_csv(KEY),
        Arc::new(tool_factory(Arc::new(Notify::new()))),
    );

    let response = router
        .handle(unauthenticated(Method::OPTIONS, "/mcp", ""))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().get("access-control-allow-origin").is_none());
}

#[tokio::test]
async fn test_health_path_is_public_only_when_configured() {
    let response = router()
        .handle(unauthenticated(Method::GET, "/health", ""))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let config = ServerConfig {
        health_path: Some("/health".to_string()),
        ..ServerConfig::default()
    };
    let router = router_with(
        config,
        AllowedKeys::from_csv(KEY),
        Arc::new(tool_factory(Arc::new(Notify::new()))),
    );
    let response = router
        .handle(unauthenticated(Method::GET, "/health", ""))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"status": "ok"}));
}
