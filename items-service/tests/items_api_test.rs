mod common;

use axum::http::Method;
use chrono::Duration;
use common::{item_row, mint_token, TestApp, SERVICE_KEY};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

fn not_found_single() -> ResponseTemplate {
    ResponseTemplate::new(406).set_body_json(json!({
        "code": "PGRST116",
        "details": "The result contains 0 rows",
        "hint": null,
        "message": "JSON object requested, multiple (or no) rows returned",
    }))
}

#[tokio::test]
async fn lists_callers_items_with_their_token() {
    let app = TestApp::spawn().await;
    let token = mint_token("u1", Duration::hours(1));

    Mock::given(method("GET"))
        .and(path("/rest/v1/items"))
        .and(query_param("user_id", "eq.u1"))
        .and(query_param("order", "created_at.desc"))
        .and(header("apikey", SERVICE_KEY))
        .and(header("authorization", format!("Bearer {}", token).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            item_row("2", "u1", "newer", "2024-02-01T00:00:00Z"),
            item_row("1", "u1", "older", "2024-01-01T00:00:00Z"),
        ])))
        .expect(1)
        .mount(&app.server)
        .await;

    let (status, body) = app.get("/api/v1/items", Some(token.as_str())).await;

    assert_eq!(status, 200);
    let items = body.as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["title"], "newer");
    assert!(items[0].get("user_id").is_none());
}

#[tokio::test]
async fn creates_item_for_caller() {
    let app = TestApp::spawn().await;
    let token = mint_token("u1", Duration::hours(1));

    Mock::given(method("POST"))
        .and(path("/rest/v1/items"))
        .and(header("prefer", "return=representation"))
        .and(body_partial_json(json!({
            "user_id": "u1",
            "title": "Buy milk",
            "completed": false,
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([item_row(
            "item-1",
            "u1",
            "Buy milk",
            "2024-05-01T10:00:00Z"
        )])))
        .expect(1)
        .mount(&app.server)
        .await;

    let (status, body) = app
        .send_json(
            Method::POST,
            "/api/v1/items",
            Some(token.as_str()),
            json!({ "title": "Buy milk" }),
        )
        .await;

    assert_eq!(status, 201);
    assert_eq!(body["id"], "item-1");
    assert_eq!(body["completed"], false);
}

#[tokio::test]
async fn blank_title_fails_validation() {
    let app = TestApp::spawn().await;
    let token = mint_token("u1", Duration::hours(1));

    let (status, body) = app
        .send_json(Method::POST, "/api/v1/items", Some(token.as_str()), json!({ "title": "" }))
        .await;

    assert_eq!(status, 422);
    assert_eq!(body["error"], "Validation error");
    assert_eq!(app.remote_calls().await, 0);
}

#[tokio::test]
async fn missing_item_is_404() {
    let app = TestApp::spawn().await;
    let token = mint_token("u1", Duration::hours(1));

    Mock::given(method("GET"))
        .and(query_param("id", "eq.nope"))
        .respond_with(not_found_single())
        .mount(&app.server)
        .await;

    let (status, body) = app.get("/api/v1/items/nope", Some(token.as_str())).await;
    assert_eq!(status, 404);
    assert_eq!(body["error"], "Item not found");
}

#[tokio::test]
async fn another_users_item_is_403_and_untouched() {
    let app = TestApp::spawn().await;
    let token = mint_token("u1", Duration::hours(1));

    Mock::given(method("GET"))
        .and(query_param("id", "eq.item-9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(item_row(
            "item-9",
            "u2",
            "not yours",
            "2024-01-01T00:00:00Z",
        )))
        .mount(&app.server)
        .await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&app.server)
        .await;

    let (status, _) = app.get("/api/v1/items/item-9", Some(token.as_str())).await;
    assert_eq!(status, 403);

    let (status, _) = app
        .request(common::build(
            Method::DELETE,
            "/api/v1/items/item-9",
            Some(token.as_str()),
            None,
        ))
        .await;
    assert_eq!(status, 403);
}

#[tokio::test]
async fn partial_update_stamps_updated_at() {
    let app = TestApp::spawn().await;
    let token = mint_token("u1", Duration::hours(1));

    Mock::given(method("GET"))
        .and(query_param("id", "eq.item-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(item_row(
            "item-1",
            "u1",
            "Buy milk",
            "2024-05-01T10:00:00Z",
        )))
        .mount(&app.server)
        .await;

    let mut updated = item_row("item-1", "u1", "Buy milk", "2024-05-01T10:00:00Z");
    updated["completed"] = json!(true);
    updated["updated_at"] = json!("2024-05-02T10:00:00Z");

    Mock::given(method("PATCH"))
        .and(query_param("id", "eq.item-1"))
        .and(body_partial_json(json!({ "completed": true })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([updated])))
        .expect(1)
        .mount(&app.server)
        .await;

    let (status, body) = app
        .send_json(
            Method::PATCH,
            "/api/v1/items/item-1",
            Some(token.as_str()),
            json!({ "completed": true }),
        )
        .await;

    assert_eq!(status, 200);
    assert_eq!(body["completed"], true);
    assert_eq!(body["updated_at"], "2024-05-02T10:00:00Z");

    let requests = app.server.received_requests().await.unwrap();
    let patch = requests
        .iter()
        .find(|r| r.method.to_string() == "PATCH")
        .unwrap();
    let sent: serde_json::Value = serde_json::from_slice(&patch.body).unwrap();
    assert!(sent.get("updated_at").is_some());
    assert!(sent.get("title").is_none());
}

#[tokio::test]
async fn null_description_is_sent_as_null() {
    let app = TestApp::spawn().await;
    let token = mint_token("u1", Duration::hours(1));

    let mut existing = item_row("item-1", "u1", "Buy milk", "2024-05-01T10:00:00Z");
    existing["description"] = json!("2 litres");

    Mock::given(method("GET"))
        .and(query_param("id", "eq.item-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(existing))
        .mount(&app.server)
        .await;

    Mock::given(method("PATCH"))
        .and(query_param("id", "eq.item-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([item_row(
            "item-1",
            "u1",
            "Buy milk",
            "2024-05-01T10:00:00Z",
        )])))
        .expect(1)
        .mount(&app.server)
        .await;

    let (status, body) = app
        .send_json(
            Method::PATCH,
            "/api/v1/items/item-1",
            Some(token.as_str()),
            json!({ "description": null }),
        )
        .await;

    assert_eq!(status, 200);
    assert!(body.get("description").is_none());

    let requests = app.server.received_requests().await.unwrap();
    let patch = requests
        .iter()
        .find(|r| r.method.to_string() == "PATCH")
        .unwrap();
    let sent: serde_json::Value = serde_json::from_slice(&patch.body).unwrap();
    assert_eq!(sent.get("description"), Some(&serde_json::Value::Null));
    assert!(sent.get("completed").is_none());
}

#[tokio::test]
async fn deletes_owned_item() {
    let app = TestApp::spawn().await;
    let token = mint_token("u1", Duration::hours(1));

    Mock::given(method("GET"))
        .and(query_param("id", "eq.item-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(item_row(
            "item-1",
            "u1",
            "Buy milk",
            "2024-05-01T10:00:00Z",
        )))
        .mount(&app.server)
        .await;
    Mock::given(method("DELETE"))
        .and(query_param("id", "eq.item-1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&app.server)
        .await;

    let (status, _) = app
        .request(common::build(
            Method::DELETE,
            "/api/v1/items/item-1",
            Some(token.as_str()),
            None,
        ))
        .await;
    assert_eq!(status, 204);
}

#[tokio::test]
async fn remote_failure_is_opaque_to_clients() {
    let app = TestApp::spawn().await;
    let token = mint_token("u1", Duration::hours(1));

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500).set_body_string("database is down"))
        .mount(&app.server)
        .await;

    let (status, body) = app.get("/api/v1/items", Some(token.as_str())).await;
    assert_eq!(status, 500);
    assert_eq!(body["error"], "Internal server error");
}
