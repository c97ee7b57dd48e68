//! Accounts and roles against a real database.
//!
//! Run with: cargo test -p drumnote-api --test accounts_test -- --ignored
//! Requires Docker.

mod helpers;

use axum::http::StatusCode;
use helpers::{api_path, register_and_login, setup_test_app, ADMIN_EMAIL, TEST_PASSWORD};
use serde_json::{json, Value};

#[tokio::test]
#[ignore]
async fn register_login_and_read_profile() {
    let app = setup_test_app().await;
    let (user_id, token) = register_and_login(&app.server, "drummer@example.com").await;

    let me = app
        .server
        .get(&api_path("/users/me"))
        .authorization_bearer(&token)
        .await;
    me.assert_status_ok();
    let body = me.json::<Value>();
    assert_eq!(body["id"], user_id.as_str());
    assert_eq!(body["email"], "drummer@example.com");
    assert_eq!(body["is_active"], true);
    assert_eq!(body["roles"].as_array().unwrap().len(), 0);
}

#[tokio::test]
#[ignore]
async fn duplicate_email_is_rejected() {
    let app = setup_test_app().await;
    register_and_login(&app.server, "twice@example.com").await;

    let response = app
        .server
        .post(&api_path("/auth/register"))
        .json(&json!({ "email": "twice@example.com", "password": TEST_PASSWORD }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error"], "Email already registered");
}

#[tokio::test]
#[ignore]
async fn concurrent_duplicate_registration_is_bad_request() {
    let app = setup_test_app().await;
    let register = || {
        app.server
            .post(&api_path("/auth/register"))
            .json(&json!({ "email": "racing@example.com", "password": TEST_PASSWORD }))
    };

    let (a, b) = tokio::join!(async { register().await }, async { register().await });
    let mut statuses = [a.status_code(), b.status_code()];
    statuses.sort();
    assert_eq!(statuses, [StatusCode::CREATED, StatusCode::BAD_REQUEST]);

    let loser = if a.status_code() == StatusCode::BAD_REQUEST { a } else { b };
    assert_eq!(loser.json::<Value>()["error"], "Email already registered");
}

#[tokio::test]
#[ignore]
async fn wrong_password_is_unauthorized() {
    let app = setup_test_app().await;
    register_and_login(&app.server, "locked@example.com").await;

    let response = app
        .server
        .post(&api_path("/auth/login"))
        .json(&json!({ "email": "locked@example.com", "password": "wrong-password" }))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(response.header("www-authenticate"), "Bearer");
}

#[tokio::test]
#[ignore]
async fn admin_email_is_bootstrapped_with_admin_role() {
    let app = setup_test_app().await;
    let (_, admin_token) = register_and_login(&app.server, ADMIN_EMAIL).await;

    let me = app
        .server
        .get(&api_path("/users/me"))
        .authorization_bearer(&admin_token)
        .await
        .json::<Value>();
    let roles: Vec<&str> = me["roles"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|r| r["name"].as_str())
        .collect();
    assert_eq!(roles, vec!["admin"]);

    app.server
        .get(&api_path("/users"))
        .authorization_bearer(&admin_token)
        .await
        .assert_status_ok();
}

#[tokio::test]
#[ignore]
async fn non_admin_cannot_list_users_or_read_others() {
    let app = setup_test_app().await;
    let (_, token) = register_and_login(&app.server, "member@example.com").await;
    let (other_id, _) = register_and_login(&app.server, "other@example.com").await;

    app.server
        .get(&api_path("/users"))
        .authorization_bearer(&token)
        .await
        .assert_status(StatusCode::FORBIDDEN);

    app.server
        .get(&api_path(&format!("/users/{}", other_id)))
        .authorization_bearer(&token)
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore]
async fn role_assignment_round_trip() {
    let app = setup_test_app().await;
    let (_, admin_token) = register_and_login(&app.server, ADMIN_EMAIL).await;
    let (user_id, user_token) = register_and_login(&app.server, "instructor@example.com").await;

    let created = app
        .server
        .post(&api_path("/roles"))
        .authorization_bearer(&admin_token)
        .json(&json!({ "name": "instructor", "description": "Can review notations" }))
        .await;
    created.assert_status(StatusCode::CREATED);
    let role_id = created.json::<Value>()["id"].as_str().unwrap().to_string();

    // Only admins create roles
    app.server
        .post(&api_path("/roles"))
        .authorization_bearer(&user_token)
        .json(&json!({ "name": "student" }))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    app.server
        .post(&api_path(&format!("/roles/{}/users/{}", role_id, user_id)))
        .authorization_bearer(&admin_token)
        .await
        .assert_status_ok();

    let check = app
        .server
        .get(&api_path(&format!("/roles/users/{}/check/instructor", user_id)))
        .authorization_bearer(&user_token)
        .await;
    check.assert_status_ok();
    assert_eq!(check.json::<Value>()["has_role"], true);

    app.server
        .delete(&api_path(&format!("/roles/{}/users/{}", role_id, user_id)))
        .authorization_bearer(&admin_token)
        .await
        .assert_status_ok();

    let check = app
        .server
        .get(&api_path(&format!("/roles/users/{}/check/instructor", user_id)))
        .authorization_bearer(&user_token)
        .await
        .json::<Value>();
    assert_eq!(check["has_role"], false);
}

#[tokio::test]
#[ignore]
async fn soft_deleted_user_can_no_longer_authenticate() {
    let app = setup_test_app().await;
    let (_, admin_token) = register_and_login(&app.server, ADMIN_EMAIL).await;
    let (user_id, user_token) = register_and_login(&app.server, "leaving@example.com").await;

    app.server
        .delete(&api_path(&format!("/users/{}", user_id)))
        .authorization_bearer(&admin_token)
        .await
        .assert_status_ok();

    app.server
        .get(&api_path("/users/me"))
        .authorization_bearer(&user_token)
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    app.server
        .post(&api_path(&format!("/users/{}/restore", user_id)))
        .authorization_bearer(&admin_token)
        .await
        .assert_status_ok();

    app.server
        .get(&api_path("/users/me"))
        .authorization_bearer(&user_token)
        .await
        .assert_status_ok();
}
