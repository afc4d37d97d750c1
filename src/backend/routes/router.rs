/**
 * Router Configuration
 *
 * This module provides the main router creation function that combines
 * all route configurations into a single Axum router.
 *
 * # Route Order
 *
 * 1. Gateway routes (health, WebSocket)
 * 2. API routes (auth, users, rooms, messages, notifications)
 * 3. Static frontend directory, when configured
 * 4. Fallback handler (JSON 404)
 */

use axum::{handler::HandlerWithoutStateExt, http::StatusCode, response::Json, Router};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::backend::routes::api_routes::configure_api_routes;
use crate::backend::routes::gateway_routes::configure_gateway_routes;
use crate::backend::server::state::AppState;

/// Create the Axum router with all routes configured
///
/// # Arguments
///
/// * `app_state` - Shared pool, config, sessions, cache and hub
///
/// # Returns
///
/// Configured Axum Router ready to serve requests
pub fn create_router(app_state: AppState) -> Router<()> {
    let router = configure_gateway_routes(Router::new());
    let router = configure_api_routes(router);

    // Static frontend, with the JSON 404 for anything it does not have
    let router = match app_state.config.static_dir.clone() {
        Some(dir) => {
            tracing::info!("[Router] Serving static files from {}", dir.display());
            router.fallback_service(ServeDir::new(dir).not_found_service(not_found.into_service()))
        }
        None => router.fallback(not_found),
    };

    router
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(app_state)
}

async fn not_found() -> (StatusCode, Json<Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "Not found", "status": 404 })),
    )
}
