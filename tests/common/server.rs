//! Server fixtures
//!
//! Every fixture gets its own `sqlite::memory:` database, so tests never
//! share state.

use std::net::SocketAddr;

use axum_test::TestServer;
use roomline::backend::server::config::{ServerConfig, ServerConfigBuilder};
use roomline::backend::server::create_app;

/// Baseline configuration for tests: in-memory database, cheap bcrypt, no
/// practical rate limit.
pub fn test_config() -> ServerConfigBuilder {
    ServerConfig::builder()
        .database_url("sqlite::memory:")
        .jwt_secret("integration-test-secret")
        .bcrypt_cost(4)
        .message_rate_limit(1000, 10)
}

pub async fn test_server() -> TestServer {
    server_with(test_config()).await
}

pub async fn server_with(builder: ServerConfigBuilder) -> TestServer {
    let config = builder.build().expect("valid test config");
    let app = create_app(config).await.expect("app starts");
    TestServer::new(app).expect("test server starts")
}

/// Serve the app on a random local port; returns its address
pub async fn spawn_server(builder: ServerConfigBuilder) -> SocketAddr {
    let config = builder.build().expect("valid test config");
    let app = create_app(config).await.expect("app starts");
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("listener address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server runs");
    });
    addr
}
