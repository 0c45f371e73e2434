mod common;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::Duration;
use common::{build, mint_token, mint_with, TestApp};
use jsonwebtoken::Algorithm;
use serde_json::json;

async fn assert_rejected(app: &TestApp, request: axum::http::Request<axum::body::Body>) {
    let (status, body) = app.request(request).await;
    assert_eq!(status, 401);
    assert_eq!(body, json!({ "error": "Unauthorized" }));
}

#[tokio::test]
async fn missing_header_is_rejected() {
    let app = TestApp::spawn().await;
    assert_rejected(&app, build(axum::http::Method::GET, "/api/v1/items", None, None)).await;
    assert_eq!(app.remote_calls().await, 0);
}

#[tokio::test]
async fn basic_scheme_is_rejected_before_any_remote_call() {
    let app = TestApp::spawn().await;
    let request = axum::http::Request::builder()
        .uri("/api/v1/items")
        .header("authorization", "Basic xyz")
        .body(axum::body::Body::empty())
        .unwrap();

    assert_rejected(&app, request).await;
    assert_eq!(app.remote_calls().await, 0);
}

#[tokio::test]
async fn expired_token_is_rejected() {
    let app = TestApp::spawn().await;
    let token = mint_token("u1", -Duration::hours(1));

    let (status, body) = app.get("/api/v1/items", Some(token.as_str())).await;
    assert_eq!(status, 401);
    assert_eq!(body["error"], "Unauthorized");
    assert_eq!(app.remote_calls().await, 0);
}

#[tokio::test]
async fn token_expired_seconds_ago_is_rejected() {
    let app = TestApp::spawn().await;
    let token = mint_token("u1", -Duration::seconds(30));

    let (status, _) = app.get("/api/v1/items", Some(token.as_str())).await;
    assert_eq!(status, 401);
    assert_eq!(app.remote_calls().await, 0);
}

#[tokio::test]
async fn non_ascii_header_is_rejected() {
    let app = TestApp::spawn().await;
    let request = axum::http::Request::builder()
        .uri("/api/v1/items")
        .header(
            "authorization",
            axum::http::HeaderValue::from_bytes(b"Bearer \xfftoken").unwrap(),
        )
        .body(axum::body::Body::empty())
        .unwrap();

    assert_rejected(&app, request).await;
    assert_eq!(app.remote_calls().await, 0);
}

#[tokio::test]
async fn token_signed_with_another_secret_is_rejected() {
    let app = TestApp::spawn().await;
    let token = mint_with(
        Algorithm::HS256,
        "some-other-secret-that-is-long-enough",
        "u1",
        Duration::hours(1),
    );

    let (status, _) = app.get("/api/v1/items", Some(token.as_str())).await;
    assert_eq!(status, 401);
}

#[tokio::test]
async fn non_hmac_algorithm_is_rejected() {
    let app = TestApp::spawn().await;
    let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"RS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(
        json!({
            "sub": "u1",
            "exp": (chrono::Utc::now() + Duration::hours(1)).timestamp(),
        })
        .to_string(),
    );
    let token = format!("{}.{}.c2lnbmF0dXJl", header, payload);

    let (status, body) = app.get("/api/v1/items", Some(token.as_str())).await;
    assert_eq!(status, 401);
    assert_eq!(body["error"], "Unauthorized");
}

#[tokio::test]
async fn public_routes_skip_the_gate() {
    let app = TestApp::spawn().await;
    let (status, body) = app.get("/health", None).await;

    assert_eq!(status, 200);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "items-service");
}
