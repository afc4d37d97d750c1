//! Authentication API tests
//!
//! Registration, login, token rotation and logout through the router.


use axum::http::StatusCode;
use crate::common::*;
use pretty_assertions::assert_eq;
use roomline::shared::auth::{TokenPair, UserProfile, UserResponse};
use serde_json::{json, Value};

#[tokio::test]
async fn test_register_returns_user_and_tokens() {
    let server = test_server().await;
    let alice = register(&server, "alice").await;

    assert_eq!(alice.username, "alice");
    assert_eq!(alice.tokens.token_type, "Bearer");
    assert!(alice.tokens.access_expires_at < alice.tokens.refresh_expires_at);
}

#[tokio::test]
async fn test_register_duplicate_username_conflicts() {
    let server = test_server().await;
    register(&server, "alice").await;

    let response = server
        .post("/api/auth/register")
        .json(&json!({
            "username": "alice",
            "email": "other@example.com",
            "password": TEST_PASSWORD,
        }))
        .await;
    response.assert_status(StatusCode::CONFLICT);
    let body: Value = response.json();
    assert_eq!(body["error"], "Username or email already registered");
}

#[tokio::test]
async fn test_register_validates_input() {
    let server = test_server().await;

    let cases = [
        json!({ "username": "1abc", "email": "a@example.com", "password": TEST_PASSWORD }),
        json!({ "username": "alice", "email": "not-an-email", "password": TEST_PASSWORD }),
        json!({ "username": "alice", "email": "a@example.com", "password": "short" }),
    ];
    for body in cases {
        server
            .post("/api/auth/register")
            .json(&body)
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn test_login_by_username_or_email() {
    let server = test_server().await;
    let alice = register(&server, "alice").await;

    for login in ["alice", "alice@example.com"] {
        let response = server
            .post("/api/auth/login")
            .json(&json!({ "username": login, "password": TEST_PASSWORD }))
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["user"]["id"], alice.id.to_string());
    }
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let server = test_server().await;
    register(&server, "alice").await;

    let wrong_password = server
        .post("/api/auth/login")
        .json(&json!({ "username": "alice", "password": "wrong password" }))
        .await;
    let unknown_user = server
        .post("/api/auth/login")
        .json(&json!({ "username": "nobody", "password": TEST_PASSWORD }))
        .await;

    wrong_password.assert_status(StatusCode::UNAUTHORIZED);
    unknown_user.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password.json::<Value>(), unknown_user.json::<Value>());
}

#[tokio::test]
async fn test_me_requires_access_token() {
    let server = test_server().await;
    let alice = register(&server, "alice").await;

    server.get("/api/auth/me").await.assert_status(StatusCode::UNAUTHORIZED);

    // A refresh token is not an access token
    server
        .get("/api/auth/me")
        .authorization_bearer(&alice.tokens.refresh_token)
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    let me: UserResponse = server
        .get("/api/auth/me")
        .authorization_bearer(alice.token())
        .await
        .json();
    assert_eq!(me.id, alice.id);
    assert_eq!(me.email, "alice@example.com");
}

#[tokio::test]
async fn test_refresh_rotates_and_tolerates_concurrent_reuse() {
    let server = test_server().await;
    let alice = register(&server, "alice").await;

    let first = server
        .post("/api/auth/refresh")
        .json(&json!({ "refresh_token": alice.tokens.refresh_token }))
        .await;
    first.assert_status_ok();
    let first: TokenPair = first.json();
    assert_ne!(first.refresh_token, alice.tokens.refresh_token);

    // Same token again inside the grace window: same pair, not a new one
    let second: TokenPair = server
        .post("/api/auth/refresh")
        .json(&json!({ "refresh_token": alice.tokens.refresh_token }))
        .await
        .json();
    assert_eq!(second, first);

    server
        .get("/api/auth/me")
        .authorization_bearer(&first.access_token)
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn test_refresh_reuse_after_grace_revokes_sessions() {
    let server = server_with(test_config().refresh_grace_secs(1)).await;
    let alice = register(&server, "alice").await;

    let rotated: TokenPair = server
        .post("/api/auth/refresh")
        .json(&json!({ "refresh_token": alice.tokens.refresh_token }))
        .await
        .json();

    tokio::time::sleep(std::time::Duration::from_millis(1100)).await;

    server
        .post("/api/auth/refresh")
        .json(&json!({ "refresh_token": alice.tokens.refresh_token }))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    // The descendant of the replayed token is gone as well
    server
        .post("/api/auth/refresh")
        .json(&json!({ "refresh_token": rotated.refresh_token }))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_revokes_both_tokens() {
    let server = test_server().await;
    let alice = register(&server, "alice").await;

    server
        .post("/api/auth/logout")
        .authorization_bearer(alice.token())
        .json(&json!({ "refresh_token": alice.tokens.refresh_token }))
        .await
        .assert_status(StatusCode::NO_CONTENT);

    server
        .get("/api/auth/me")
        .authorization_bearer(alice.token())
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
    server
        .post("/api/auth/refresh")
        .json(&json!({ "refresh_token": alice.tokens.refresh_token }))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_all_ends_every_session() {
    let server = test_server().await;
    let alice = register(&server, "alice").await;
    let second: Value = server
        .post("/api/auth/login")
        .json(&json!({ "username": "alice", "password": TEST_PASSWORD }))
        .await
        .json();

    let response = server
        .post("/api/auth/logout-all")
        .authorization_bearer(alice.token())
        .await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["revoked_sessions"], 2);

    server
        .post("/api/auth/refresh")
        .json(&json!({ "refresh_token": second["tokens"]["refresh_token"] }))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_user_search_excludes_caller() {
    let server = test_server().await;
    let alice = register(&server, "alice").await;
    let alfred = register(&server, "alfred").await;
    register(&server, "bob").await;

    let found: Vec<UserProfile> = server
        .get("/api/users")
        .add_query_param("search", "al")
        .authorization_bearer(alice.token())
        .await
        .json();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, alfred.id);

    let empty: Vec<UserProfile> = server
        .get("/api/users")
        .authorization_bearer(alice.token())
        .await
        .json();
    assert!(empty.is_empty());

    let profile: UserProfile = server
        .get(&format!("/api/users/{}", alfred.id))
        .authorization_bearer(alice.token())
        .await
        .json();
    assert_eq!(profile.username, "alfred");
    assert!(!profile.online);
}

#[tokio::test]
async fn test_unknown_route_is_json_404() {
    let server = test_server().await;
    let response = server.get("/api/nope").await;
    response.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(response.json::<Value>()["status"], 404);
}
