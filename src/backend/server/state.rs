/**
 * Application State Management
 *
 * This module defines the application state structure and implements
 * the `FromRef` traits for Axum state extraction.
 *
 * # Architecture
 *
 * `AppState` is cheap to clone: every field is a pool, an `Arc`, or a
 * handle wrapping one. Services take `&AppState` so the REST handlers and
 * the gateway share one code path.
 *
 * # Example
 *
 * ```rust,no_run
 * use roomline::backend::server::state::AppState;
 * use axum::extract::State;
 *
 * async fn handler(State(state): State<AppState>) {
 *     let online = state.hub.connection_count().await;
 * }
 * ```
 */

use std::sync::Arc;

use axum::extract::FromRef;
use sqlx::SqlitePool;

use crate::backend::auth::sessions::SessionManager;
use crate::backend::cache::CacheStore;
use crate::backend::realtime::RealtimeHub;
use crate::backend::server::config::ServerConfig;

/// Application state shared by all handlers and gateway connections
#[derive(Clone)]
pub struct AppState {
    /// SQLite connection pool
    pub db_pool: SqlitePool,

    /// Loaded configuration
    pub config: Arc<ServerConfig>,

    /// Token issuing, verification and rotation
    pub sessions: SessionManager,

    /// Short-lived key/value state (sessions, presence, rate limits)
    pub cache: Arc<CacheStore>,

    /// Live gateway connections and room subscriptions
    pub hub: RealtimeHub,
}

impl FromRef<AppState> for SqlitePool {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.db_pool.clone()
    }
}

impl FromRef<AppState> for Arc<ServerConfig> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.config.clone()
    }
}

impl FromRef<AppState> for SessionManager {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.sessions.clone()
    }
}

impl FromRef<AppState> for RealtimeHub {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.hub.clone()
    }
}
