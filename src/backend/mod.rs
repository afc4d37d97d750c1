//! Backend Module
//!
//! All server-side code: the Axum router, the WebSocket gateway, the chat
//! services and their persistence.
//!
//! This module is only compiled when the `server` feature is enabled.
//!
//! # Architecture
//!
//! - **`server`** - Configuration, application state, initialization
//! - **`routes`** - Router assembly
//! - **`error`** - `BackendError` and its HTTP conversion
//! - **`cache`** - In-process key/value store with TTLs
//! - **`auth`** - Users, JWT sessions, refresh rotation, auth handlers
//! - **`middleware`** - Bearer-token extractor
//! - **`rooms`** - Direct and group rooms, membership
//! - **`messages`** - Message pipeline, history, read receipts
//! - **`reactions`** - Emoji reactions
//! - **`notifications`** - Per-user notifications
//! - **`realtime`** - Connection hub and presence
//! - **`gateway`** - WebSocket upgrade, connection loop, event dispatch
//!
//! # Module Structure
//!
//! ```text
//! backend/
//! ├── mod.rs
//! ├── server/         - config, state, init
//! ├── routes/         - router, api routes, gateway route
//! ├── error/          - error types
//! ├── cache/          - TTL store
//! ├── auth/           - users, sessions, handlers
//! ├── middleware/     - AuthUser extractor
//! ├── rooms/          - db, service, handlers
//! ├── messages/       - db, service, receipts, handlers
//! ├── reactions/      - db, service, handlers
//! ├── notifications/  - db, service, handlers
//! ├── realtime/       - hub, presence
//! └── gateway/        - upgrade, connection, dispatch
//! ```
//!
//! # Request Flow
//!
//! REST: `AuthUser` extractor → handler → service → sqlx → hub fan-out.
//! Gateway: upgrade → connection loop → dispatch → same services.

pub mod server;
pub mod routes;
pub mod error;
pub mod cache;
pub mod auth;
pub mod middleware;
pub mod rooms;
pub mod messages;
pub mod reactions;
pub mod notifications;
pub mod realtime;
pub mod gateway;

pub use error::BackendError;
pub use server::{create_app, AppState};
