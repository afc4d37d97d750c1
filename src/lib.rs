//! Roomline - Main Library
//!
//! Roomline is a real-time chat backend built with Rust: rooms, messages,
//! reactions, notifications and read receipts over a REST API, plus a
//! WebSocket gateway that pushes events to connected clients.
//!
//! # Module Structure
//!
//! - **`shared`** - Types shared between server and client
//!   - REST request/response bodies and validation rules
//!   - Gateway event protocol (`ClientEvent`, `ServerEvent`)
//!   - Error types
//!
//! - **`backend`** - Server-side code (only compiled with the `server` feature)
//!   - Axum HTTP server and WebSocket gateway
//!   - JWT authentication with refresh-token rotation
//!   - SQLite persistence through sqlx
//!   - In-process cache and connection hub
//!
//! - **`client`** - Rust client for the REST API and the gateway
//!   - Single-flight token refresh shared by REST and socket
//!
//! # Feature Flags
//!
//! - **`server`** (default) - enables the backend modules and the
//!   `roomline-server` binary
//!
//! # Usage
//!
//! ```rust,no_run
//! use roomline::backend::server::{config::ServerConfig, init::create_app};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ServerConfig::from_env()?;
//! let app = create_app(config).await?;
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Thread Safety
//!
//! - **Server**: hub state lives behind `tokio::sync::RwLock`, the cache is a
//!   `DashMap`, and the database is reached through the sqlx pool
//! - **Client**: `AuthSession` is `Clone` and coordinates refreshes through a
//!   `tokio::sync::Mutex`

/// Shared types and data structures
pub mod shared;

/// Backend server-side code
#[cfg(feature = "server")]
pub mod backend;

/// REST and gateway client
pub mod client;
