//! Client Module
//!
//! Rust client for the REST API and the WebSocket gateway.
//!
//! - **`config`** - server URL and derived endpoints
//! - **`session`** - token pair storage and single-flight refresh
//! - **`api`** - typed REST calls, retried once after a 401
//! - **`gateway`** - WebSocket connection with in-band token refresh
//!
//! REST and gateway share one [`AuthSession`], so a refresh triggered by
//! either side is reused by the other.

pub mod api;
pub mod config;
pub mod error;
pub mod gateway;
pub mod session;

pub use api::ChatClient;
pub use config::ClientConfig;
pub use error::ClientError;
pub use gateway::GatewayClient;
pub use session::AuthSession;
