//! WebSocket gateway tests
//!
//! These run the app on a real listener and talk to it with
//! `tokio-tungstenite`, the same way `GatewayClient` does.


use std::time::Duration;

use assert_matches::assert_matches;
use crate::common::ws::{self, next_event, send, send_raw, wait_for, wait_for_reply};
use crate::common::*;
use futures_util::StreamExt;
use roomline::client::{AuthSession, ClientConfig, GatewayClient};
use roomline::shared::event::{
    AuthRefreshPayload, ClientEvent, ReadPayload, RoomRef, SendMessagePayload, ServerEvent, TypingPayload,
};
use roomline::shared::messaging::{ChatMessage, ListNotificationsResponse, NotificationKind};
use tokio_tungstenite::tungstenite::{self, protocol::frame::coding::CloseCode, Message};
use uuid::Uuid;

/// Create a group room over REST on a real listener
async fn create_group_http(addr: std::net::SocketAddr, owner: &TestUser, members: &[&TestUser]) -> Uuid {
    let body: serde_json::Value = reqwest::Client::new()
        .post(format!("http://{}/api/rooms", addr))
        .bearer_auth(owner.token())
        .json(&serde_json::json!({
            "name": "general",
            "member_ids": members.iter().map(|m| m.id).collect::<Vec<_>>(),
        }))
        .send()
        .await
        .expect("create room request")
        .json()
        .await
        .expect("create room body");
    body["room"]["id"]
        .as_str()
        .and_then(|id| Uuid::parse_str(id).ok())
        .expect("room id")
}

/// Post a message over REST on a real listener
async fn send_message_http(addr: std::net::SocketAddr, sender: &TestUser, room_id: Uuid, content: &str) -> ChatMessage {
    reqwest::Client::new()
        .post(format!("http://{}/api/rooms/{}/messages", addr, room_id))
        .bearer_auth(sender.token())
        .json(&serde_json::json!({ "content": content }))
        .send()
        .await
        .expect("send message request")
        .json()
        .await
        .expect("message body")
}

/// Message notifications a user has received so far
async fn message_notifications(addr: std::net::SocketAddr, user: &TestUser) -> Vec<Uuid> {
    let list: ListNotificationsResponse = reqwest::Client::new()
        .get(format!("http://{}/api/notifications", addr))
        .bearer_auth(user.token())
        .send()
        .await
        .expect("notifications request")
        .json()
        .await
        .expect("notifications body");
    list.notifications
        .into_iter()
        .filter(|n| n.kind == NotificationKind::Message)
        .filter_map(|n| n.message_id)
        .collect()
}

/// Drain events up to the pong for a ping, returning their names
async fn events_until_pong(socket: &mut ws::Socket) -> Vec<&'static str> {
    send(socket, &ClientEvent::Ping, None).await;
    let mut names = Vec::new();
    loop {
        let event = next_event(socket).await;
        if matches!(event, ServerEvent::Pong) {
            return names;
        }
        names.push(event.name());
    }
}

async fn join(socket: &mut ws::Socket, room_id: Uuid) {
    send(socket, &ClientEvent::RoomJoin(RoomRef { room_id }), Some("join")).await;
    assert_matches!(wait_for_reply(socket, "join").await, ServerEvent::Ack(_));
}

#[tokio::test]
async fn test_upgrade_requires_valid_token() {
    let addr = spawn_server(test_config()).await;

    let result = tokio_tungstenite::connect_async(format!("ws://{}/ws?token=garbage", addr)).await;
    match result {
        Err(tungstenite::Error::Http(response)) => assert_eq!(response.status(), 401),
        other => panic!("expected HTTP 401, got {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn test_connected_is_first_frame() {
    let addr = spawn_server(test_config()).await;
    let alice = register_http(addr, "alice").await;

    let mut socket = ws::connect(addr, alice.token()).await;
    let connected = assert_matches!(next_event(&mut socket).await, ServerEvent::Connected(c) => c);
    assert_eq!(connected.user_id, alice.id);

    send(&mut socket, &ClientEvent::Ping, None).await;
    assert_matches!(next_event(&mut socket).await, ServerEvent::Pong);
}

#[tokio::test]
async fn test_message_send_reaches_room_subscribers() {
    let addr = spawn_server(test_config()).await;
    let alice = register_http(addr, "alice").await;
    let bob = register_http(addr, "bob").await;
    let room_id = create_group_http(addr, &alice, &[&bob]).await;

    let mut alice_ws = ws::connect(addr, alice.token()).await;
    let mut bob_ws = ws::connect(addr, bob.token()).await;
    join(&mut alice_ws, room_id).await;
    join(&mut bob_ws, room_id).await;

    let payload = SendMessagePayload {
        room_id,
        content: "hello over the socket".to_string(),
        reply_to: None,
        client_id: Some("c-1".to_string()),
    };
    send(&mut alice_ws, &ClientEvent::MessageSend(payload), Some("m1")).await;

    let ack = assert_matches!(wait_for_reply(&mut alice_ws, "m1").await, ServerEvent::Ack(ack) => ack);
    assert_eq!(ack.result["content"], "hello over the socket");

    let message = assert_matches!(wait_for(&mut bob_ws, "message:new").await, ServerEvent::MessageNew(m) => m);
    assert_eq!(message.sender_id, alice.id);
    let unread = assert_matches!(wait_for(&mut bob_ws, "unread:update").await, ServerEvent::UnreadUpdate(u) => u);
    assert_eq!(unread.unread_count, 1);

    // Bob reads; alice sees the receipt
    send(
        &mut bob_ws,
        &ClientEvent::MessageRead(ReadPayload { room_id, message_id: None }),
        Some("r1"),
    )
    .await;
    assert_matches!(wait_for_reply(&mut bob_ws, "r1").await, ServerEvent::Ack(_));
    let receipt = assert_matches!(wait_for(&mut alice_ws, "message:read").await, ServerEvent::MessageRead(r) => r);
    assert_eq!(receipt.user_id, bob.id);
    assert_eq!(receipt.message_id, Some(message.id));
}

#[tokio::test]
async fn test_join_requires_membership() {
    let addr = spawn_server(test_config()).await;
    let alice = register_http(addr, "alice").await;
    let mallory = register_http(addr, "mallory").await;
    let room_id = create_group_http(addr, &alice, &[]).await;

    let mut socket = ws::connect(addr, mallory.token()).await;
    send(&mut socket, &ClientEvent::RoomJoin(RoomRef { room_id }), Some("j")).await;
    let error = assert_matches!(wait_for_reply(&mut socket, "j").await, ServerEvent::Error(e) => e);
    assert_eq!(error.code, "forbidden");
}

#[tokio::test]
async fn test_malformed_frames_get_error_replies() {
    let addr = spawn_server(test_config()).await;
    let alice = register_http(addr, "alice").await;
    let mut socket = ws::connect(addr, alice.token()).await;

    send_raw(&mut socket, "not json").await;
    let error = assert_matches!(wait_for(&mut socket, "error").await, ServerEvent::Error(e) => e);
    assert_eq!(error.code, "bad_request");
    assert_eq!(error.id, None);

    send_raw(&mut socket, r#"{"event":"room:join","data":{"room":"x"},"id":"7"}"#).await;
    let error = assert_matches!(wait_for_reply(&mut socket, "7").await, ServerEvent::Error(e) => e);
    assert_eq!(error.code, "bad_request");

    send_raw(&mut socket, r#"{"event":"no:such","id":"8"}"#).await;
    assert_matches!(wait_for_reply(&mut socket, "8").await, ServerEvent::Error(_));

    // The connection survives bad frames
    send(&mut socket, &ClientEvent::Ping, None).await;
    assert_matches!(wait_for(&mut socket, "pong").await, ServerEvent::Pong);
}

#[tokio::test]
async fn test_typing_is_throttled_and_not_echoed() {
    let addr = spawn_server(test_config()).await;
    let alice = register_http(addr, "alice").await;
    let bob = register_http(addr, "bob").await;
    let room_id = create_group_http(addr, &alice, &[&bob]).await;

    let mut alice_ws = ws::connect(addr, alice.token()).await;
    let mut bob_ws = ws::connect(addr, bob.token()).await;
    join(&mut alice_ws, room_id).await;
    join(&mut bob_ws, room_id).await;

    let typing = ClientEvent::Typing(TypingPayload { room_id, is_typing: true });
    send(&mut alice_ws, &typing, Some("t1")).await;
    let first = assert_matches!(wait_for_reply(&mut alice_ws, "t1").await, ServerEvent::Ack(a) => a);
    assert_eq!(first.result["broadcast"], true);

    send(&mut alice_ws, &typing, Some("t2")).await;
    let second = assert_matches!(wait_for_reply(&mut alice_ws, "t2").await, ServerEvent::Ack(a) => a);
    assert_eq!(second.result["broadcast"], false);

    let event = assert_matches!(wait_for(&mut bob_ws, "typing").await, ServerEvent::Typing(t) => t);
    assert_eq!(event.user_id, alice.id);
    assert!(event.is_typing);

    // Stopping always goes out
    let stop = ClientEvent::Typing(TypingPayload { room_id, is_typing: false });
    send(&mut alice_ws, &stop, Some("t3")).await;
    assert_matches!(wait_for_reply(&mut alice_ws, "t3").await, ServerEvent::Ack(_));
    let event = assert_matches!(wait_for(&mut bob_ws, "typing").await, ServerEvent::Typing(t) => t);
    assert!(!event.is_typing);
}

#[tokio::test]
async fn test_token_expiry_closes_socket() {
    let addr = spawn_server(test_config().access_token_ttl_secs(3).token_expiry_warning_secs(2)).await;
    let alice = register_http(addr, "alice").await;
    let mut socket = ws::connect(addr, alice.token()).await;

    assert_matches!(wait_for(&mut socket, "auth:expiring").await, ServerEvent::AuthExpiring(_));
    assert_matches!(wait_for(&mut socket, "auth:expired").await, ServerEvent::AuthExpired(_));

    let close = tokio::time::timeout(ws::FRAME_TIMEOUT, socket.next())
        .await
        .expect("close before timeout");
    match close {
        Some(Ok(Message::Close(Some(frame)))) => assert_eq!(frame.code, CloseCode::from(4001)),
        other => panic!("expected close frame, got {:?}", other),
    }
}

#[tokio::test]
async fn test_in_band_refresh_extends_session() {
    let addr = spawn_server(test_config().access_token_ttl_secs(3).token_expiry_warning_secs(2)).await;
    let alice = register_http(addr, "alice").await;
    let mut socket = ws::connect(addr, alice.token()).await;

    let expiring = assert_matches!(
        wait_for(&mut socket, "auth:expiring").await,
        ServerEvent::AuthExpiring(e) => e
    );

    let pair: roomline::shared::auth::TokenPair = reqwest::Client::new()
        .post(format!("http://{}/api/auth/refresh", addr))
        .json(&serde_json::json!({ "refresh_token": alice.tokens.refresh_token }))
        .send()
        .await
        .expect("refresh request")
        .json()
        .await
        .expect("refresh body");

    let refresh = ClientEvent::AuthRefresh(AuthRefreshPayload {
        access_token: pair.access_token,
    });
    send(&mut socket, &refresh, Some("a1")).await;
    let refreshed = assert_matches!(
        wait_for(&mut socket, "auth:refreshed").await,
        ServerEvent::AuthRefreshed(e) => e
    );
    assert!(refreshed.expires_at >= expiring.expires_at);
    assert_matches!(wait_for_reply(&mut socket, "a1").await, ServerEvent::Ack(_));
}

#[tokio::test]
async fn test_refresh_with_foreign_token_is_refused() {
    let addr = spawn_server(test_config()).await;
    let alice = register_http(addr, "alice").await;
    let bob = register_http(addr, "bob").await;
    let mut socket = ws::connect(addr, alice.token()).await;

    let refresh = ClientEvent::AuthRefresh(AuthRefreshPayload {
        access_token: bob.tokens.access_token.clone(),
    });
    send(&mut socket, &refresh, Some("a1")).await;
    let error = assert_matches!(wait_for_reply(&mut socket, "a1").await, ServerEvent::Error(e) => e);
    assert_eq!(error.code, "forbidden");
}

#[tokio::test]
async fn test_gateway_client_refreshes_in_band() {
    let addr = spawn_server(test_config().access_token_ttl_secs(3).token_expiry_warning_secs(2)).await;
    register_http(addr, "alice").await;

    let session = AuthSession::new(ClientConfig::new(format!("http://{}", addr)).expect("valid url"));
    session.login("alice", TEST_PASSWORD).await.expect("login");
    let original = session.access_token().await.expect("token");

    let (client, mut events) = GatewayClient::connect(session.clone()).await.expect("connect");

    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    let mut saw_expiring = false;
    loop {
        let event = tokio::time::timeout_at(deadline, events.recv())
            .await
            .expect("auth:refreshed before deadline")
            .expect("event stream open");
        match event {
            ServerEvent::AuthExpiring(_) => saw_expiring = true,
            ServerEvent::AuthRefreshed(_) => break,
            ServerEvent::AuthExpired(_) => panic!("socket expired instead of refreshing"),
            _ => {}
        }
    }

    assert!(saw_expiring);
    assert_ne!(session.access_token().await.expect("token"), original);
    assert!(!client.is_closed());
    client.close().await;
}

#[tokio::test]
async fn test_viewers_get_no_message_notification() {
    let addr = spawn_server(test_config()).await;
    let alice = register_http(addr, "alice").await;
    let bob = register_http(addr, "bob").await;
    let carol = register_http(addr, "carol").await;
    let room_id = create_group_http(addr, &alice, &[&bob, &carol]).await;

    // Bob has the room open, carol is connected elsewhere
    let mut bob_ws = ws::connect(addr, bob.token()).await;
    join(&mut bob_ws, room_id).await;
    let mut carol_ws = ws::connect(addr, carol.token()).await;
    assert_matches!(next_event(&mut carol_ws).await, ServerEvent::Connected(_));

    let message = send_message_http(addr, &alice, room_id, "who is here?").await;

    let pushed = assert_matches!(
        wait_for(&mut carol_ws, "notification:new").await,
        ServerEvent::NotificationNew(n) => n
    );
    assert_eq!(pushed.message_id, Some(message.id));
    assert_eq!(pushed.kind, NotificationKind::Message);

    assert_eq!(message_notifications(addr, &carol).await, vec![message.id]);
    assert!(message_notifications(addr, &bob).await.is_empty());
    assert!(!events_until_pong(&mut bob_ws).await.contains(&"notification:new"));
}

#[tokio::test]
async fn test_presence_follows_first_and_last_connection() {
    let addr = spawn_server(test_config()).await;
    let alice = register_http(addr, "alice").await;
    let bob = register_http(addr, "bob").await;
    create_group_http(addr, &alice, &[&bob]).await;

    let mut alice_ws = ws::connect(addr, alice.token()).await;
    assert_matches!(next_event(&mut alice_ws).await, ServerEvent::Connected(_));

    let mut bob_first = ws::connect(addr, bob.token()).await;
    let online = assert_matches!(wait_for(&mut alice_ws, "presence").await, ServerEvent::Presence(p) => p);
    assert_eq!(online.user_id, bob.id);
    assert!(online.online);

    // A second tab is not a transition
    let mut bob_second = ws::connect(addr, bob.token()).await;
    assert_matches!(next_event(&mut bob_second).await, ServerEvent::Connected(_));
    bob_first.close(None).await.expect("close first socket");
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!events_until_pong(&mut alice_ws).await.contains(&"presence"));

    bob_second.close(None).await.expect("close second socket");
    let offline = assert_matches!(wait_for(&mut alice_ws, "presence").await, ServerEvent::Presence(p) => p);
    assert_eq!(offline.user_id, bob.id);
    assert!(!offline.online);
    assert!(offline.last_seen.is_some());
}

#[tokio::test]
async fn test_removed_member_socket_is_evicted() {
    let addr = spawn_server(test_config()).await;
    let alice = register_http(addr, "alice").await;
    let carol = register_http(addr, "carol").await;
    let room_id = create_group_http(addr, &alice, &[&carol]).await;

    let mut carol_ws = ws::connect(addr, carol.token()).await;
    join(&mut carol_ws, room_id).await;

    let status = reqwest::Client::new()
        .delete(format!("http://{}/api/rooms/{}/members/{}", addr, room_id, carol.id))
        .bearer_auth(alice.token())
        .send()
        .await
        .expect("remove member request")
        .status();
    assert!(status.is_success());

    let removed = assert_matches!(wait_for(&mut carol_ws, "room:removed").await, ServerEvent::RoomRemoved(r) => r);
    assert_eq!(removed.room_id, room_id);

    send_message_http(addr, &alice, room_id, "after carol left").await;
    assert!(!events_until_pong(&mut carol_ws).await.contains(&"message:new"));

    // Rejoining is refused now that the membership is gone
    send(&mut carol_ws, &ClientEvent::RoomJoin(RoomRef { room_id }), Some("rejoin")).await;
    let error = assert_matches!(wait_for_reply(&mut carol_ws, "rejoin").await, ServerEvent::Error(e) => e);
    assert_eq!(error.code, "forbidden");
}
