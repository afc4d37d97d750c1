//! Gateway upgrade handler

use axum::{
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, WebSocketUpgrade},
        Query, State,
    },
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use super::connection;
use crate::backend::auth::Claims;
use crate::backend::error::{BackendError, BackendResult};
use crate::backend::middleware::bearer_token;
use crate::backend::server::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct GatewayQuery {
    #[serde(default)]
    pub token: Option<String>,
}

/// Handle `GET /ws?token=<access>`
///
/// The token may also come as `Authorization: Bearer`. It is checked before
/// the upgrade so a bad token is a plain 401 response.
pub async fn ws_handler(
    State(state): State<AppState>,
    Query(query): Query<GatewayQuery>,
    headers: HeaderMap,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let claims = match authenticate(&state, &query, &headers) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::debug!("[Gateway] Upgrade refused: {}", e);
            return e.into_response();
        }
    };

    let ws = match upgrade {
        Ok(ws) => ws,
        Err(rejection) => return rejection.into_response(),
    };

    tracing::info!("[Gateway] Upgrading connection for {}", claims.username);
    ws.on_upgrade(move |socket| connection::serve(socket, state, claims))
}

fn authenticate(state: &AppState, query: &GatewayQuery, headers: &HeaderMap) -> BackendResult<Claims> {
    let token = query
        .token
        .as_deref()
        .filter(|t| !t.is_empty())
        .or_else(|| bearer_token(headers))
        .ok_or_else(|| BackendError::unauthorized("Missing access token"))?;
    state.sessions.verify_access(token)
}
