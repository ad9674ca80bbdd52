//! Routing smoke tests: banner, health, request IDs, CORS.
//!
//! No database is needed; the pool is created lazily and never used.

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};

use dengo_integration_tests::TestApp;

#[tokio::test]
async fn test_root_banner() {
    let app = TestApp::lazy();
    let resp = app.get("/").await;

    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body["message"], "API Dengo");
    assert_eq!(resp.body["version"], "1.0.0");
    assert_eq!(resp.body["status"], "online");
}

#[tokio::test]
async fn test_liveness() {
    let app = TestApp::lazy();
    let resp = app.get("/health").await;

    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.text, "ok");
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let app = TestApp::lazy();
    let resp = app.get("/api/no-existe").await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_request_id_is_minted() {
    let app = TestApp::lazy();
    let resp = app.get("/health").await;

    let id = resp.headers.get("x-request-id").unwrap().to_str().unwrap();
    assert!(uuid::Uuid::parse_str(id).is_ok());
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let app = TestApp::lazy();
    let request = Request::builder()
        .uri("/health")
        .header("x-request-id", "caja-3-000123")
        .body(Body::empty())
        .unwrap();
    let resp = app.send(request).await;

    assert_eq!(resp.headers.get("x-request-id").unwrap(), "caja-3-000123");
}

#[tokio::test]
async fn test_cors_allows_any_origin_by_default() {
    let app = TestApp::lazy();
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/productos")
        .header("origin", "http://localhost:8081")
        .header("access-control-request-method", "GET")
        .body(Body::empty())
        .unwrap();
    let resp = app.send(request).await;

    assert!(resp.status.is_success());
    assert_eq!(resp.headers.get("access-control-allow-origin").unwrap(), "*");
}
