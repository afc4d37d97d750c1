//! Per-connection loops
//!
//! Each socket gets a writer task draining the connection's outbound queue
//! and a reader loop that handles client frames and watches the access
//! token deadline. Everything the server sends, replies included, goes
//! through the hub so frames leave in the order they were queued.

use std::time::Duration;

use axum::extract::ws::{CloseFrame, Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

use super::{dispatch, CLOSE_TOKEN_EXPIRED};
use crate::backend::auth::Claims;
use crate::backend::middleware::AuthUser;
use crate::backend::realtime::{presence, ConnectedClient, Outbound};
use crate::backend::server::state::AppState;
use crate::shared::event::{AuthExpiredPayload, ConnectedPayload, ExpiryPayload, ServerEvent};

/// How long the writer gets to flush after the reader stops
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// State of one authenticated socket
#[derive(Debug)]
pub struct GatewaySession {
    pub conn_id: Uuid,
    pub user: AuthUser,
    expires_at: Instant,
    warned: bool,
    warning: Duration,
}

impl GatewaySession {
    pub fn new(conn_id: Uuid, claims: Claims, warning: Duration) -> Self {
        let expires_at = Instant::now() + claims.remaining();
        Self {
            conn_id,
            user: AuthUser {
                user_id: claims.sub,
                username: claims.username.clone(),
                claims,
            },
            expires_at,
            warned: false,
            warning,
        }
    }

    /// Swap in a fresh access token and push the deadline out
    pub fn extend(&mut self, claims: Claims) {
        self.expires_at = Instant::now() + claims.remaining();
        self.warned = false;
        self.user.username = claims.username.clone();
        self.user.claims = claims;
    }

    /// Next instant the reader loop has to wake up for
    fn next_deadline(&self) -> Instant {
        if self.warned {
            self.expires_at
        } else {
            self.expires_at.checked_sub(self.warning).unwrap_or(self.expires_at)
        }
    }
}

/// Run a socket until either side closes it
pub async fn serve(socket: WebSocket, state: AppState, claims: Claims) {
    let conn_id = Uuid::new_v4();
    let span = tracing::info_span!("ws", conn_id = %conn_id, user_id = %claims.sub);
    run(socket, state, claims, conn_id).instrument(span).await;
}

async fn run(socket: WebSocket, state: AppState, claims: Claims, conn_id: Uuid) {
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Outbound>();

    let mut writer = tokio::spawn(
        async move {
            while let Some(outbound) = rx.recv().await {
                let result = match outbound {
                    Outbound::Text(text) => sink.send(Message::Text(text.into())).await,
                    Outbound::Close(code, reason) => {
                        let frame = CloseFrame {
                            code,
                            reason: reason.into(),
                        };
                        let _ = sink.send(Message::Close(Some(frame))).await;
                        break;
                    }
                };
                if result.is_err() {
                    break;
                }
            }
        }
        .in_current_span(),
    );

    let mut session = GatewaySession::new(conn_id, claims, state.config.token_expiry_warning());
    let user_id = session.user.user_id;
    let expires_at = session.user.claims.expires_at();

    let first = state
        .hub
        .register(ConnectedClient::new(conn_id, user_id, session.user.username.clone(), tx))
        .await;
    if first {
        presence::mark_online(&state, user_id).await;
    }
    state
        .hub
        .emit_to_connection(
            conn_id,
            &ServerEvent::Connected(ConnectedPayload {
                connection_id: conn_id,
                user_id,
                expires_at,
            }),
        )
        .await;
    tracing::info!("[Gateway] Connected");

    loop {
        tokio::select! {
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    dispatch::handle_text(&state, &mut session, text.as_str()).await;
                }
                Some(Ok(Message::Close(_))) | None => {
                    tracing::debug!("[Gateway] Client closed");
                    break;
                }
                Some(Ok(Message::Binary(_))) => {
                    state
                        .hub
                        .emit_to_connection(
                            conn_id,
                            &ServerEvent::error(None, "bad_request", "Binary frames are not supported"),
                        )
                        .await;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::debug!("[Gateway] Read error: {}", e);
                    break;
                }
            },
            _ = tokio::time::sleep_until(session.next_deadline()) => {
                if !session.warned {
                    session.warned = true;
                    let expires_at = session.user.claims.expires_at();
                    state
                        .hub
                        .emit_to_connection(conn_id, &ServerEvent::AuthExpiring(ExpiryPayload { expires_at }))
                        .await;
                    tracing::debug!("[Gateway] Token expiring at {}", expires_at);
                } else {
                    tracing::info!("[Gateway] Access token expired, closing");
                    state
                        .hub
                        .emit_to_connection(
                            conn_id,
                            &ServerEvent::AuthExpired(AuthExpiredPayload {
                                reason: "Access token expired".to_string(),
                            }),
                        )
                        .await;
                    state
                        .hub
                        .close_connection(conn_id, CLOSE_TOKEN_EXPIRED, "token expired")
                        .await;
                    break;
                }
            },
            _ = &mut writer => {
                tracing::debug!("[Gateway] Writer stopped");
                break;
            }
        }
    }

    // Dropping the hub's sender lets the writer drain and exit
    if let Some(gone) = state.hub.unregister(conn_id).await {
        if gone.last_connection {
            presence::mark_offline(&state, gone.user_id).await;
        }
    }
    if !writer.is_finished() && tokio::time::timeout(WRITER_DRAIN_TIMEOUT, &mut writer).await.is_err() {
        writer.abort();
    }
    tracing::info!("[Gateway] Disconnected");
}
