//! Authentication test helpers

use std::net::SocketAddr;

use axum::http::StatusCode;
use axum_test::TestServer;
use roomline::shared::auth::{AuthResponse, TokenPair};
use serde_json::json;
use uuid::Uuid;

pub const TEST_PASSWORD: &str = "correct horse battery";

/// Registered test user
#[derive(Debug, Clone)]
pub struct TestUser {
    pub id: Uuid,
    pub username: String,
    pub tokens: TokenPair,
}

impl TestUser {
    pub fn token(&self) -> &str {
        &self.tokens.access_token
    }

    fn from_auth(auth: AuthResponse) -> Self {
        Self {
            id: auth.user.id,
            username: auth.user.username,
            tokens: auth.tokens,
        }
    }
}

/// Register a user through the API
pub async fn register(server: &TestServer, username: &str) -> TestUser {
    let response = server
        .post("/api/auth/register")
        .json(&json!({
            "username": username,
            "email": format!("{}@example.com", username),
            "password": TEST_PASSWORD,
        }))
        .await;
    response.assert_status(StatusCode::CREATED);
    TestUser::from_auth(response.json())
}

/// Register a user against a real listener
pub async fn register_http(addr: SocketAddr, username: &str) -> TestUser {
    let auth: AuthResponse = reqwest::Client::new()
        .post(format!("http://{}/api/auth/register", addr))
        .json(&json!({
            "username": username,
            "email": format!("{}@example.com", username),
            "password": TEST_PASSWORD,
        }))
        .send()
        .await
        .expect("register request")
        .error_for_status()
        .expect("register succeeds")
        .json()
        .await
        .expect("register body");
    TestUser::from_auth(auth)
}

/// Create a group room owned by `owner` with `members`
pub async fn create_group(server: &TestServer, owner: &TestUser, name: &str, members: &[&TestUser]) -> Uuid {
    let response = server
        .post("/api/rooms")
        .authorization_bearer(owner.token())
        .json(&json!({
            "name": name,
            "member_ids": members.iter().map(|m| m.id).collect::<Vec<_>>(),
        }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let body: serde_json::Value = response.json();
    body["room"]["id"]
        .as_str()
        .and_then(|id| Uuid::parse_str(id).ok())
        .expect("room id")
}

/// Send a text message and return its id
pub async fn send_message(server: &TestServer, user: &TestUser, room_id: Uuid, content: &str) -> Uuid {
    let response = server
        .post(&format!("/api/rooms/{}/messages", room_id))
        .authorization_bearer(user.token())
        .json(&json!({ "content": content }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let body: serde_json::Value = response.json();
    body["id"]
        .as_str()
        .and_then(|id| Uuid::parse_str(id).ok())
        .expect("message id")
}
