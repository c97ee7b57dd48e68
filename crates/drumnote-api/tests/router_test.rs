//! Router tests that never reach the database.

mod helpers;

use axum::http::StatusCode;
use helpers::{api_path, lazy_server};
use serde_json::{json, Value};

#[tokio::test]
async fn health_is_public() {
    let (server, _dir) = lazy_server().await;
    let response = server.get("/health").await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["status"], "ok");
}

#[tokio::test]
async fn openapi_document_is_served() {
    let (server, _dir) = lazy_server().await;
    let response = server.get("/api/openapi.json").await;
    response.assert_status_ok();
    let doc = response.json::<Value>();
    assert!(doc["paths"]["/api/v1/notations/{id}/export"].is_object());
}

#[tokio::test]
async fn protected_route_requires_bearer_token() {
    let (server, _dir) = lazy_server().await;
    let response = server.get(&api_path("/videos")).await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(response.header("www-authenticate"), "Bearer");
    assert_eq!(response.json::<Value>()["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn malformed_token_is_rejected() {
    let (server, _dir) = lazy_server().await;
    let response = server
        .get(&api_path("/notations"))
        .authorization_bearer("not-a-jwt")
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(response.header("www-authenticate"), "Bearer");
}

#[tokio::test]
async fn register_rejects_invalid_email() {
    let (server, _dir) = lazy_server().await;
    let response = server
        .post(&api_path("/auth/register"))
        .json(&json!({ "email": "not-an-email", "password": "drum-pass-123" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body = response.json::<Value>();
    assert!(body["error"].as_str().unwrap().contains("Invalid email address"));
}

#[tokio::test]
async fn register_rejects_short_password() {
    let (server, _dir) = lazy_server().await;
    let response = server
        .post(&api_path("/auth/register"))
        .json(&json!({ "email": "drummer@example.com", "password": "abc" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn malformed_json_body_is_bad_request() {
    let (server, _dir) = lazy_server().await;
    let response = server
        .post(&api_path("/auth/login"))
        .content_type("application/json")
        .bytes("{\"email\": ".into())
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body = response.json::<Value>();
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("Invalid request body"));
}

#[tokio::test]
async fn oversized_json_body_is_rejected() {
    let (server, _dir) = lazy_server().await;
    let padding = "x".repeat(drumnote_api::constants::MAX_JSON_BODY_BYTES);
    let response = server
        .post(&api_path("/auth/login"))
        .json(&json!({ "email": "drummer@example.com", "password": padding }))
        .await;
    response.assert_status(StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(response.json::<Value>()["code"], "PAYLOAD_TOO_LARGE");
}

#[tokio::test]
async fn login_requires_email() {
    let (server, _dir) = lazy_server().await;
    let response = server
        .post(&api_path("/auth/login"))
        .json(&json!({ "email": "", "password": "drum-pass-123" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}
