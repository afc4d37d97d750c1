//! Gateway Client
//!
//! WebSocket connection to `/ws`. Server events are decoded and forwarded
//! to a channel. On `auth:expiring` the client refreshes through the shared
//! [`AuthSession`] and hands the new access token to the server in-band with
//! `auth:refresh`, so the socket survives token rotation.

use std::sync::{Arc, Mutex};

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use super::error::ClientError;
use super::session::AuthSession;
use crate::shared::event::{AuthRefreshPayload, ClientEvent, ClientFrame, ServerEvent};

/// Live gateway connection
#[derive(Debug)]
pub struct GatewayClient {
    outgoing: mpsc::UnboundedSender<Message>,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl GatewayClient {
    /// Connect with the session's current access token
    ///
    /// Returns the client and the stream of server events. The stream ends
    /// when the socket closes.
    pub async fn connect(
        session: AuthSession,
    ) -> Result<(Self, mpsc::UnboundedReceiver<ServerEvent>), ClientError> {
        let token = session.access_token().await?;
        let url = session.config().ws_url(&token);
        let (socket, _) = connect_async(url).await?;
        let (mut sink, mut stream) = socket.split();

        let (outgoing, mut outgoing_rx) = mpsc::unbounded_channel::<Message>();
        let (events_tx, events_rx) = mpsc::unbounded_channel::<ServerEvent>();

        let writer = tokio::spawn(async move {
            while let Some(message) = outgoing_rx.recv().await {
                let closing = matches!(message, Message::Close(_));
                if sink.send(message).await.is_err() || closing {
                    break;
                }
            }
        });

        // Access token this socket is currently authenticated with
        let socket_token = Arc::new(Mutex::new(token));
        let refresh_out = outgoing.clone();
        let reader = tokio::spawn(async move {
            while let Some(frame) = stream.next().await {
                let text = match frame {
                    Ok(Message::Text(text)) => text,
                    Ok(Message::Close(frame)) => {
                        tracing::debug!("[Gateway] Server closed: {:?}", frame);
                        break;
                    }
                    Ok(_) => continue,
                    Err(e) => {
                        tracing::debug!("[Gateway] Read error: {}", e);
                        break;
                    }
                };

                let event = match ServerEvent::from_text(text.as_str()) {
                    Ok(event) => event,
                    Err(e) => {
                        tracing::warn!("[Gateway] Undecodable server frame: {}", e);
                        continue;
                    }
                };

                if matches!(event, ServerEvent::AuthExpiring(_)) {
                    tokio::spawn(refresh_in_band(
                        session.clone(),
                        socket_token.clone(),
                        refresh_out.clone(),
                    ));
                }
                if events_tx.send(event).is_err() {
                    break;
                }
            }
        });

        Ok((
            Self {
                outgoing,
                reader,
                writer,
            },
            events_rx,
        ))
    }

    /// Send a client event, optionally with a correlation id for the ack
    pub fn send(&self, event: &ClientEvent, id: Option<String>) -> Result<(), ClientError> {
        let text = ClientFrame::from_event(event, id)?.to_text()?;
        self.outgoing
            .send(Message::text(text))
            .map_err(|_| ClientError::Gateway("Connection closed".to_string()))
    }

    pub fn is_closed(&self) -> bool {
        self.reader.is_finished()
    }

    /// Close the socket and wait for both tasks to stop
    pub async fn close(self) {
        let _ = self.outgoing.send(Message::Close(None));
        let _ = self.writer.await;
        self.reader.abort();
    }
}

/// Refresh (or reuse a refresh already done over REST) and re-authenticate the socket
async fn refresh_in_band(
    session: AuthSession,
    socket_token: Arc<Mutex<String>>,
    outgoing: mpsc::UnboundedSender<Message>,
) {
    let stale = match socket_token.lock() {
        Ok(token) => token.clone(),
        Err(_) => return,
    };
    let pair = match session.refresh(&stale).await {
        Ok(pair) => pair,
        Err(e) => {
            tracing::warn!("[Gateway] Token refresh failed: {}", e);
            return;
        }
    };

    if let Ok(mut token) = socket_token.lock() {
        *token = pair.access_token.clone();
    }
    let event = ClientEvent::AuthRefresh(AuthRefreshPayload {
        access_token: pair.access_token,
    });
    match ClientFrame::from_event(&event, None).and_then(|frame| frame.to_text()) {
        Ok(text) => {
            let _ = outgoing.send(Message::text(text));
        }
        Err(e) => tracing::warn!("[Gateway] Failed to encode auth:refresh: {}", e),
    }
}
