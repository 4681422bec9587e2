//! Router-level behavior that needs no database: probes, guards and
//! response headers.

mod common;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
};
use common::{body_json, json_request, offline_app, request};
use serde_json::json;
use tower::ServiceExt;

fn get(uri: &str) -> Request<Body> {
    request(Method::GET, uri, None).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_liveness_probe() {
    let response = offline_app(&[]).oneshot(get("/api/health/live")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "alive");
}

#[tokio::test]
async fn test_readiness_without_database() {
    let response = offline_app(&[]).oneshot(get("/api/health/ready")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let response = offline_app(&[]).oneshot(get("/admin/nope")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_security_headers_and_request_id() {
    let response = offline_app(&[]).oneshot(get("/api/health/live")).await.unwrap();
    let headers = response.headers();
    assert_eq!(headers["x-frame-options"], "SAMEORIGIN");
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert!(headers.contains_key("x-request-id"));
    assert!(!headers.contains_key("strict-transport-security"));
}

#[tokio::test]
async fn test_admin_pages_require_login() {
    for uri in ["/admin/galleries", "/admin/settings", "/admin/security/logs", "/api/workers/status"] {
        let response = offline_app(&[]).oneshot(get(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{}", uri);
        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], "unauthorized");
    }
}

#[tokio::test]
async fn test_admin_write_without_session_is_unauthorized() {
    let response = offline_app(&[])
        .oneshot(json_request(Method::POST, "/admin/galleries", &json!({ "name": "x" }), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_without_csrf_token_is_forbidden() {
    let response = offline_app(&[])
        .oneshot(json_request(
            Method::POST,
            "/admin/login",
            &json!({ "username": "admin", "password": "secret" }),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["code"], "forbidden");
}

#[tokio::test]
async fn test_heartbeat_disabled_without_token() {
    let response = offline_app(&[])
        .oneshot(json_request(Method::POST, "/api/workers/1/heartbeat", &json!({}), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_heartbeat_rejects_wrong_token() {
    let app = offline_app(&[("workers.api_token", "worker-secret")]);
    let response = app
        .oneshot(
            request(Method::POST, "/api/workers/1/heartbeat", None)
                .header("content-type", "application/json")
                .header("X-Worker-Token", "guess")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_hsts_when_enabled() {
    let response = offline_app(&[("security.hsts_enabled", "true")])
        .oneshot(get("/api/health/live"))
        .await
        .unwrap();
    assert!(response.headers().contains_key("strict-transport-security"));
}
