#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Request, Response},
    Router,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Value};
use service_core::config::Config;
use std::collections::HashMap;
use tower::ServiceExt;
use wiremock::MockServer;

use items_service::{
    build_router,
    config::ItemsConfig,
    supabase::{SupabaseClient, SupabaseSettings, DEFAULT_TIMEOUT},
    AppState,
};

pub const SERVICE_KEY: &str = "service-key";
pub const JWT_SECRET: &str = "super-secret-jwt-token-with-at-least-32-characters";

pub struct TestApp {
    pub server: MockServer,
    pub router: Router,
}

impl TestApp {
    pub async fn spawn() -> Self {
        let server = MockServer::start().await;

        let vars: HashMap<&str, String> = HashMap::from([
            ("SUPABASE_URL", server.uri()),
            ("SUPABASE_KEY", SERVICE_KEY.to_string()),
            ("SUPABASE_JWT_SECRET", JWT_SECRET.to_string()),
        ]);
        let config = ItemsConfig::from_lookup(Config::default(), |k| vars.get(k).cloned())
            .expect("test config");
        let state = AppState::new(config).expect("test state");

        Self {
            server,
            router: build_router(state),
        }
    }

    pub async fn request(&self, request: Request<Body>) -> (u16, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        read(response).await
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (u16, Value) {
        self.request(build(axum::http::Method::GET, uri, token, None))
            .await
    }

    pub async fn send_json(
        &self,
        method: axum::http::Method,
        uri: &str,
        token: Option<&str>,
        body: Value,
    ) -> (u16, Value) {
        self.request(build(method, uri, token, Some(body))).await
    }

    pub async fn remote_calls(&self) -> usize {
        self.server
            .received_requests()
            .await
            .map(|r| r.len())
            .unwrap_or(0)
    }
}

pub fn build(
    method: axum::http::Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn read(response: Response<Body>) -> (u16, Value) {
    let status = response.status().as_u16();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    (status, body)
}

/// A client pointed at the mock server, for exercising the core directly.
pub fn client_for(server: &MockServer) -> SupabaseClient {
    client_with_timeout(server, DEFAULT_TIMEOUT)
}

pub fn client_with_timeout(server: &MockServer, timeout: std::time::Duration) -> SupabaseClient {
    SupabaseClient::new(SupabaseSettings {
        url: server.uri(),
        service_key: secrecy::Secret::new(SERVICE_KEY.to_string()),
        timeout,
    })
    .unwrap()
}

pub fn mint_token(sub: &str, exp_offset: Duration) -> String {
    mint_with(Algorithm::HS256, JWT_SECRET, sub, exp_offset)
}

pub fn mint_with(alg: Algorithm, secret: &str, sub: &str, exp_offset: Duration) -> String {
    let claims = json!({
        "sub": sub,
        "email": format!("{}@example.com", sub),
        "role": "authenticated",
        "aud": "authenticated",
        "exp": (Utc::now() + exp_offset).timestamp(),
    });
    encode(
        &Header::new(alg),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

pub fn item_row(id: &str, user_id: &str, title: &str, created_at: &str) -> Value {
    json!({
        "id": id,
        "user_id": user_id,
        "title": title,
        "description": null,
        "completed": false,
        "created_at": created_at,
        "updated_at": null,
    })
}
