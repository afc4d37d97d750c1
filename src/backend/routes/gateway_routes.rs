//! Health check and WebSocket gateway routes

use axum::{extract::State, response::Json, routing::get, Router};
use serde_json::{json, Value};

use crate::backend::gateway::ws_handler;
use crate::backend::server::state::AppState;

/// Configure gateway routes
///
/// - `GET /health` - liveness plus live connection count
/// - `GET /ws` - WebSocket gateway (`?token=` or bearer header)
pub fn configure_gateway_routes(router: Router<AppState>) -> Router<AppState> {
    router
        .route("/health", get(health))
        .route("/ws", get(ws_handler))
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "connections": state.hub.connection_count().await,
    }))
}
