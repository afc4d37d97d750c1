//! Client session tests against a mocked server
//!
//! Covers the single-flight refresh: concurrent callers holding the same
//! stale token must cause exactly one `/api/auth/refresh` call.

use assert_matches::assert_matches;
use chrono::{Duration, Utc};
use roomline::client::{AuthSession, ChatClient, ClientConfig, ClientError};
use roomline::shared::auth::TokenPair;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn pair(access: &str, refresh: &str) -> TokenPair {
    let now = Utc::now();
    TokenPair {
        access_token: access.to_string(),
        refresh_token: refresh.to_string(),
        token_type: "Bearer".to_string(),
        access_expires_at: now + Duration::minutes(15),
        refresh_expires_at: now + Duration::days(30),
    }
}

async fn session_for(server: &MockServer) -> AuthSession {
    let session = AuthSession::new(ClientConfig::new(server.uri()).expect("mock server url"));
    session.set_tokens(pair("old-access", "old-refresh")).await;
    session
}

async fn mount_refresh(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .and(body_json(json!({ "refresh_token": "old-refresh" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(pair("new-access", "new-refresh")))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_concurrent_refreshes_share_one_request() {
    let server = MockServer::start().await;
    mount_refresh(&server).await;
    let session = session_for(&server).await;

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let session = session.clone();
            tokio::spawn(async move { session.refresh("old-access").await })
        })
        .collect();

    for handle in handles {
        let refreshed = handle.await.expect("task").expect("refresh");
        assert_eq!(refreshed.access_token, "new-access");
    }
    assert_eq!(session.access_token().await.unwrap(), "new-access");
}

#[tokio::test]
async fn test_api_call_retries_once_after_401() {
    let server = MockServer::start().await;
    mount_refresh(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/rooms"))
        .and(header("authorization", "Bearer old-access"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "error": "Token expired", "status": 401 })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/rooms"))
        .and(header("authorization", "Bearer new-access"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(4)
        .mount(&server)
        .await;

    let client = ChatClient::new(session_for(&server).await);
    let calls = (0..4).map(|_| {
        let client = client.clone();
        tokio::spawn(async move { client.list_rooms().await })
    });
    for call in calls {
        let rooms = call.await.expect("task").expect("rooms");
        assert!(rooms.is_empty());
    }
}

#[tokio::test]
async fn test_query_requests_keep_parameters_on_retry() {
    let server = MockServer::start().await;
    mount_refresh(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/users"))
        .and(header("authorization", "Bearer old-access"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/users"))
        .and(query_param("search", "bo"))
        .and(header("authorization", "Bearer new-access"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let client = ChatClient::new(session_for(&server).await);
    let users = client.search_users("bo").await.expect("search after refresh");
    assert!(users.is_empty());
}

#[tokio::test]
async fn test_rejected_refresh_ends_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "error": "Refresh token has already been used", "status": 401 })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let session = session_for(&server).await;
    let client = ChatClient::new(session.clone());

    assert_matches!(client.me().await, Err(ClientError::SessionExpired));
    assert!(!session.is_authenticated().await);
    assert_matches!(client.me().await, Err(ClientError::NotAuthenticated));
}

#[tokio::test]
async fn test_api_errors_carry_server_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/rooms/00000000-0000-0000-0000-000000000000"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({ "error": "Not a member of this room", "status": 403 })))
        .mount(&server)
        .await;

    let client = ChatClient::new(session_for(&server).await);
    let err = client.get_room(uuid::Uuid::nil()).await.unwrap_err();
    assert_eq!(err.status(), Some(403));
    assert_matches!(err, ClientError::Api { message, .. } if message == "Not a member of this room");
}

#[tokio::test]
async fn test_ensure_fresh_refreshes_near_expiry() {
    let server = MockServer::start().await;
    mount_refresh(&server).await;
    let session = session_for(&server).await;

    // Fifteen minutes left: nothing to do
    let token = session.ensure_fresh(Duration::seconds(30)).await.unwrap();
    assert_eq!(token, "old-access");

    let token = session.ensure_fresh(Duration::minutes(20)).await.unwrap();
    assert_eq!(token, "new-access");
}

#[tokio::test]
async fn test_logout_clears_tokens() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/logout"))
        .and(header("authorization", "Bearer old-access"))
        .and(body_json(json!({ "refresh_token": "old-refresh" })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let session = session_for(&server).await;
    session.logout().await.unwrap();
    assert!(session.tokens().await.is_none());
}
