//! Failure injection: faults inside the pipeline become opaque 500s and the
//! server keeps serving.

use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use serde_json::json;
use site_gate::error::AppError;
use site_gate::http::{with_policies, AppState};

mod common;

use common::{assert_security_headers, body_bytes, body_json, peer, site_config, site_dir};

async fn deliberate_panic() -> &'static str {
    panic!("deliberate fault at /srv/site/secret.key");
}

async fn deliberate_error(State(state): State<AppState>) -> Response {
    state.errors.respond(
        "/fault",
        AppError::Internal("disk on fire: /var/lib/site/blocks".into()),
    )
}

async fn faulty_app() -> Router {
    let dir = site_dir();
    let config = site_config(dir.path(), Duration::from_secs(60), 60);
    let state = AppState::from_config(&config).await;

    let routes = Router::new()
        .route("/panic", get(deliberate_panic))
        .route("/fault", get(deliberate_error))
        .route("/ok", get(|| async { "still here" }))
        .with_state(state.clone());

    with_policies(routes, &config, &state)
}

#[tokio::test]
async fn panic_becomes_generic_500_and_serving_continues() {
    let router = faulty_app().await;

    let response = common::get(&router, "/panic", peer(1)).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_security_headers(&response);
    assert_eq!(
        body_json(response).await,
        json!({ "error": "Internal server error" })
    );

    let response = common::get(&router, "/ok", peer(1)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, b"still here");
}

#[tokio::test]
async fn internal_error_leaks_nothing() {
    let router = faulty_app().await;

    let response = common::get(&router, "/fault", peer(2)).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_security_headers(&response);

    let body = body_bytes(response).await;
    let text = String::from_utf8(body).unwrap();
    assert!(!text.contains("/var/lib"));
    assert!(!text.contains("disk on fire"));
    assert_eq!(
        serde_json::from_str::<serde_json::Value>(&text).unwrap(),
        json!({ "error": "Internal server error" })
    );
}

#[tokio::test]
async fn repeated_panics_do_not_poison_the_limiter() {
    let router = faulty_app().await;

    for _ in 0..5 {
        let response = common::get(&router, "/panic", peer(3)).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
    let response = common::get(&router, "/ok", peer(3)).await;
    assert_eq!(response.status(), StatusCode::OK);
}
