//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{Method, Request};
use axum::response::Response;
use axum::Router;
use site_gate::config::SiteConfig;
use site_gate::http::{build_router, AppState};
use tempfile::TempDir;
use tower::ServiceExt;

pub const NOT_FOUND_PAGE: &str = "<html><body>custom fallback</body></html>";
pub const VIDEO_BYTES: &[u8] = b"0123456789abcdef";

/// A content root with a page, a stylesheet, a video and a 404 document.
pub fn site_dir() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    std::fs::write(root.join("index.html"), "<h1>home</h1>").unwrap();
    std::fs::write(root.join("404.html"), NOT_FOUND_PAGE).unwrap();
    std::fs::write(root.join("style.css"), "body { margin: 0 }").unwrap();
    std::fs::create_dir(root.join("media")).unwrap();
    std::fs::write(root.join("media").join("clip.mp4"), VIDEO_BYTES).unwrap();
    dir
}

/// Config serving `root` with the given rate-limit window and quota.
pub fn site_config(root: &Path, window: Duration, max_requests: usize) -> SiteConfig {
    let mut config = SiteConfig::default();
    config.content.root = root.to_path_buf();
    config.content.data_dir = root.join("data");
    config.rate_limit.window_ms = window.as_millis() as u64;
    config.rate_limit.max_requests = max_requests;
    config.rate_limit.sweep_interval_secs = 0;
    config
}

/// Fully layered router with fresh state.
pub async fn app(config: &SiteConfig) -> Router {
    let state = AppState::from_config(config).await;
    build_router(config, state)
}

pub fn peer(n: u8) -> SocketAddr {
    SocketAddr::from(([10, 0, 0, n], 40_000 + u16::from(n)))
}

pub fn request(method: Method, path: &str, from: SocketAddr) -> Request<Body> {
    let mut request = Request::builder()
        .method(method)
        .uri(path)
        .body(Body::empty())
        .unwrap();
    request.extensions_mut().insert(ConnectInfo(from));
    request
}

/// Send one request through the router as `from`.
pub async fn send(router: &Router, request: Request<Body>) -> Response {
    router.clone().oneshot(request).await.unwrap()
}

pub async fn get(router: &Router, path: &str, from: SocketAddr) -> Response {
    send(router, request(Method::GET, path, from)).await
}

pub async fn body_bytes(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

/// Assert the fixed security and CORS headers are present.
pub fn assert_security_headers(response: &Response) {
    let headers = response.headers();
    let csp = headers
        .get("content-security-policy")
        .expect("missing content-security-policy")
        .to_str()
        .unwrap();
    assert!(csp.contains("default-src 'self'"));
    assert!(csp.contains("object-src 'none'"));
    assert_eq!(headers["access-control-allow-origin"], "*");
    assert_eq!(headers["x-content-type-options"], "nosniff");
}
