//! Message, read receipt, reaction and notification API tests


use axum::http::StatusCode;
use crate::common::*;
use pretty_assertions::assert_eq;
use roomline::shared::messaging::{
    ChatMessage, ListMessagesResponse, ListNotificationsResponse, NotificationCount, NotificationKind,
    ReactionSummary, ReactionUpdate, ReadReceipt, UnreadCount,
};
use serde_json::{json, Value};
use uuid::Uuid;

async fn history(server: &axum_test::TestServer, user: &TestUser, room_id: Uuid, query: &str) -> ListMessagesResponse {
    server
        .get(&format!("/api/rooms/{}/messages{}", room_id, query))
        .authorization_bearer(user.token())
        .await
        .json()
}

async fn unread(server: &axum_test::TestServer, user: &TestUser, room_id: Uuid) -> u32 {
    let count: UnreadCount = server
        .get(&format!("/api/rooms/{}/unread", room_id))
        .authorization_bearer(user.token())
        .await
        .json();
    count.unread_count
}

#[tokio::test]
async fn test_history_pages_backwards() {
    let server = test_server().await;
    let alice = register(&server, "alice").await;
    let room_id = create_group(&server, &alice, "general", &[]).await;

    let mut ids = Vec::new();
    for i in 0..5 {
        ids.push(send_message(&server, &alice, room_id, &format!("m{}", i)).await);
    }

    let page = history(&server, &alice, room_id, "?limit=2").await;
    assert!(page.has_more);
    let texts: Vec<&str> = page.messages.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(texts, vec!["m3", "m4"]);

    let page = history(&server, &alice, room_id, &format!("?limit=2&before={}", ids[3])).await;
    assert!(page.has_more);
    assert_eq!(page.messages[0].id, ids[1]);
    assert_eq!(page.messages[1].id, ids[2]);

    let page = history(&server, &alice, room_id, &format!("?limit=2&before={}", ids[1])).await;
    assert!(!page.has_more);
    assert_eq!(page.messages.len(), 1);
    assert_eq!(page.messages[0].id, ids[0]);

    // An anchor from another room is rejected
    let other = create_group(&server, &alice, "other", &[]).await;
    server
        .get(&format!("/api/rooms/{}/messages?before={}", other, ids[0]))
        .authorization_bearer(alice.token())
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_send_requires_membership_and_valid_content() {
    let server = server_with(test_config().max_message_len(20)).await;
    let alice = register(&server, "alice").await;
    let mallory = register(&server, "mallory").await;
    let room_id = create_group(&server, &alice, "general", &[]).await;
    let path = format!("/api/rooms/{}/messages", room_id);

    server
        .post(&path)
        .authorization_bearer(mallory.token())
        .json(&json!({ "content": "hi" }))
        .await
        .assert_status(StatusCode::FORBIDDEN);
    server
        .get(&path)
        .authorization_bearer(mallory.token())
        .await
        .assert_status(StatusCode::FORBIDDEN);

    for content in ["   ", "this message is far too long"] {
        server
            .post(&path)
            .authorization_bearer(alice.token())
            .json(&json!({ "content": content }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    let message: ChatMessage = server
        .post(&path)
        .authorization_bearer(alice.token())
        .json(&json!({ "content": "  trimmed  " }))
        .await
        .json();
    assert_eq!(message.content, "trimmed");
    assert_eq!(message.sender_username, "alice");
}

#[tokio::test]
async fn test_client_id_deduplicates_retries() {
    let server = test_server().await;
    let alice = register(&server, "alice").await;
    let room_id = create_group(&server, &alice, "general", &[]).await;
    let path = format!("/api/rooms/{}/messages", room_id);
    let body = json!({ "content": "once", "client_id": "c-1" });

    let first: ChatMessage = server.post(&path).authorization_bearer(alice.token()).json(&body).await.json();
    let retry: ChatMessage = server.post(&path).authorization_bearer(alice.token()).json(&body).await.json();

    assert_eq!(first.id, retry.id);
    assert_eq!(history(&server, &alice, room_id, "").await.messages.len(), 1);
}

#[tokio::test]
async fn test_concurrent_client_id_retries_store_once() {
    let server = test_server().await;
    let alice = register(&server, "alice").await;
    let room_id = create_group(&server, &alice, "general", &[]).await;
    let path = format!("/api/rooms/{}/messages", room_id);
    let body = json!({ "content": "once", "client_id": "c-1" });

    let (first, retry) = tokio::join!(
        async { server.post(&path).authorization_bearer(alice.token()).json(&body).await },
        async { server.post(&path).authorization_bearer(alice.token()).json(&body).await },
    );
    let first: ChatMessage = first.json();
    let retry: ChatMessage = retry.json();

    assert_eq!(first.id, retry.id);
    assert_eq!(history(&server, &alice, room_id, "").await.messages.len(), 1);
}

#[tokio::test]
async fn test_failed_send_releases_client_id() {
    let server = test_server().await;
    let alice = register(&server, "alice").await;
    let room_id = create_group(&server, &alice, "general", &[]).await;
    let path = format!("/api/rooms/{}/messages", room_id);

    server
        .post(&path)
        .authorization_bearer(alice.token())
        .json(&json!({ "content": "bad reply", "client_id": "c-2", "reply_to": Uuid::new_v4() }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    let message: ChatMessage = server
        .post(&path)
        .authorization_bearer(alice.token())
        .json(&json!({ "content": "good", "client_id": "c-2" }))
        .await
        .json();
    assert_eq!(message.content, "good");
}

#[tokio::test]
async fn test_rate_limit() {
    let server = server_with(test_config().message_rate_limit(3, 60)).await;
    let alice = register(&server, "alice").await;
    let room_id = create_group(&server, &alice, "general", &[]).await;

    for i in 0..3 {
        send_message(&server, &alice, room_id, &format!("m{}", i)).await;
    }
    server
        .post(&format!("/api/rooms/{}/messages", room_id))
        .authorization_bearer(alice.token())
        .json(&json!({ "content": "one too many" }))
        .await
        .assert_status(StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_reply_must_stay_in_room() {
    let server = test_server().await;
    let alice = register(&server, "alice").await;
    let general = create_group(&server, &alice, "general", &[]).await;
    let random = create_group(&server, &alice, "random", &[]).await;
    let parent = send_message(&server, &alice, general, "parent").await;

    server
        .post(&format!("/api/rooms/{}/messages", random))
        .authorization_bearer(alice.token())
        .json(&json!({ "content": "reply", "reply_to": parent }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    let reply: ChatMessage = server
        .post(&format!("/api/rooms/{}/messages", general))
        .authorization_bearer(alice.token())
        .json(&json!({ "content": "reply", "reply_to": parent }))
        .await
        .json();
    assert_eq!(reply.reply_to, Some(parent));
}

#[tokio::test]
async fn test_edit_and_delete_permissions() {
    let server = test_server().await;
    let alice = register(&server, "alice").await;
    let bob = register(&server, "bob").await;
    let room_id = create_group(&server, &alice, "general", &[&bob]).await;
    let bobs = send_message(&server, &bob, room_id, "original").await;

    server
        .patch(&format!("/api/messages/{}", bobs))
        .authorization_bearer(alice.token())
        .json(&json!({ "content": "not mine" }))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let edited: ChatMessage = server
        .patch(&format!("/api/messages/{}", bobs))
        .authorization_bearer(bob.token())
        .json(&json!({ "content": "edited" }))
        .await
        .json();
    assert_eq!(edited.content, "edited");
    assert!(edited.edited_at.is_some());

    // The owner may delete anyone's message, bob may not delete alice's
    let alices = send_message(&server, &alice, room_id, "from alice").await;
    server
        .delete(&format!("/api/messages/{}", alices))
        .authorization_bearer(bob.token())
        .await
        .assert_status(StatusCode::FORBIDDEN);
    server
        .delete(&format!("/api/messages/{}", bobs))
        .authorization_bearer(alice.token())
        .await
        .assert_status(StatusCode::NO_CONTENT);
    server
        .delete(&format!("/api/messages/{}", bobs))
        .authorization_bearer(alice.token())
        .await
        .assert_status(StatusCode::NO_CONTENT);

    let page = history(&server, &alice, room_id, "").await;
    let tombstone = page.messages.iter().find(|m| m.id == bobs).unwrap();
    assert!(tombstone.deleted);
    assert_eq!(tombstone.content, "");

    server
        .patch(&format!("/api/messages/{}", bobs))
        .authorization_bearer(bob.token())
        .json(&json!({ "content": "revive" }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
    server
        .delete(&format!("/api/messages/{}", Uuid::new_v4()))
        .authorization_bearer(alice.token())
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_read_pointer_only_moves_forward() {
    let server = test_server().await;
    let alice = register(&server, "alice").await;
    let bob = register(&server, "bob").await;
    let room_id = create_group(&server, &alice, "general", &[&bob]).await;

    let first = send_message(&server, &alice, room_id, "one").await;
    send_message(&server, &alice, room_id, "two").await;
    let third = send_message(&server, &alice, room_id, "three").await;
    assert_eq!(unread(&server, &bob, room_id).await, 3);

    let receipt: ReadReceipt = server
        .post(&format!("/api/rooms/{}/read", room_id))
        .authorization_bearer(bob.token())
        .json(&json!({ "message_id": first }))
        .await
        .json();
    assert_eq!(receipt.unread_count, 2);
    assert_eq!(receipt.last_read_message_id, Some(first));

    let receipt: ReadReceipt = server
        .post(&format!("/api/rooms/{}/read", room_id))
        .authorization_bearer(bob.token())
        .json(&json!({}))
        .await
        .json();
    assert_eq!(receipt.unread_count, 0);
    assert_eq!(receipt.last_read_message_id, Some(third));

    // Going back is a no-op
    let receipt: ReadReceipt = server
        .post(&format!("/api/rooms/{}/read", room_id))
        .authorization_bearer(bob.token())
        .json(&json!({ "message_id": first }))
        .await
        .json();
    assert_eq!(receipt.last_read_message_id, Some(third));
    assert_eq!(unread(&server, &bob, room_id).await, 0);

    server
        .post(&format!("/api/rooms/{}/read", room_id))
        .authorization_bearer(bob.token())
        .json(&json!({ "message_id": Uuid::new_v4() }))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_deleted_messages_stop_counting_as_unread() {
    let server = test_server().await;
    let alice = register(&server, "alice").await;
    let bob = register(&server, "bob").await;
    let room_id = create_group(&server, &alice, "general", &[&bob]).await;

    let oops = send_message(&server, &alice, room_id, "oops").await;
    send_message(&server, &alice, room_id, "fine").await;
    server
        .delete(&format!("/api/messages/{}", oops))
        .authorization_bearer(alice.token())
        .await
        .assert_status(StatusCode::NO_CONTENT);

    assert_eq!(unread(&server, &bob, room_id).await, 1);
}

#[tokio::test]
async fn test_message_notifications() {
    let server = test_server().await;
    let alice = register(&server, "alice").await;
    let bob = register(&server, "bob").await;
    let room_id = create_group(&server, &alice, "general", &[&bob]).await;
    send_message(&server, &alice, room_id, "hello bob").await;

    let list: ListNotificationsResponse = server
        .get("/api/notifications")
        .authorization_bearer(bob.token())
        .await
        .json();
    assert_eq!(list.unread_count, 2);
    // Newest first: the message, then the invite
    assert_eq!(list.notifications[0].kind, NotificationKind::Message);
    assert_eq!(list.notifications[0].body, "alice: hello bob");
    assert_eq!(list.notifications[1].kind, NotificationKind::RoomInvite);
    assert_eq!(list.notifications[1].body, "alice added you to general");

    // Another user's notification looks like a missing one
    let invite = list.notifications[1].id;
    server
        .patch(&format!("/api/notifications/{}/read", invite))
        .authorization_bearer(alice.token())
        .await
        .assert_status(StatusCode::NOT_FOUND);
    server
        .patch(&format!("/api/notifications/{}/read", invite))
        .authorization_bearer(bob.token())
        .await
        .assert_status(StatusCode::NO_CONTENT);

    // Reading the room clears its message notifications
    server
        .post(&format!("/api/rooms/{}/read", room_id))
        .authorization_bearer(bob.token())
        .await
        .assert_status_ok();
    let count: NotificationCount = server
        .get("/api/notifications/unread-count")
        .authorization_bearer(bob.token())
        .await
        .json();
    assert_eq!(count.unread_count, 0);

    let unread_only: ListNotificationsResponse = server
        .get("/api/notifications")
        .add_query_param("unread_only", true)
        .authorization_bearer(bob.token())
        .await
        .json();
    assert!(unread_only.notifications.is_empty());
}

#[tokio::test]
async fn test_mark_all_notifications_read() {
    let server = test_server().await;
    let alice = register(&server, "alice").await;
    let bob = register(&server, "bob").await;
    let room_id = create_group(&server, &alice, "general", &[&bob]).await;
    send_message(&server, &alice, room_id, "one").await;
    send_message(&server, &alice, room_id, "two").await;

    let response = server
        .post("/api/notifications/read-all")
        .authorization_bearer(bob.token())
        .await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["updated"], 3);

    let count: NotificationCount = server
        .get("/api/notifications/unread-count")
        .authorization_bearer(bob.token())
        .await
        .json();
    assert_eq!(count.unread_count, 0);
}

#[tokio::test]
async fn test_reaction_toggle() {
    let server = test_server().await;
    let alice = register(&server, "alice").await;
    let bob = register(&server, "bob").await;
    let room_id = create_group(&server, &alice, "general", &[&bob]).await;
    let message_id = send_message(&server, &alice, room_id, "react to me").await;
    let path = format!("/api/messages/{}/reactions", message_id);

    let update: ReactionUpdate = server
        .post(&path)
        .authorization_bearer(bob.token())
        .json(&json!({ "emoji": " 👍 " }))
        .await
        .json();
    assert!(update.added);
    assert_eq!(update.emoji, "👍");
    assert_eq!(update.reactions.len(), 1);
    assert_eq!(update.reactions[0].user_ids, vec![bob.id]);

    server
        .post(&path)
        .authorization_bearer(alice.token())
        .json(&json!({ "emoji": "👍" }))
        .await
        .assert_status_ok();
    let summary: Vec<ReactionSummary> = server.get(&path).authorization_bearer(alice.token()).await.json();
    assert_eq!(summary[0].count, 2);

    // Toggling again removes it
    let update: ReactionUpdate = server
        .post(&path)
        .authorization_bearer(bob.token())
        .json(&json!({ "emoji": "👍" }))
        .await
        .json();
    assert!(!update.added);
    assert_eq!(update.reactions[0].user_ids, vec![alice.id]);

    // History carries the aggregated reactions
    let page = history(&server, &alice, room_id, "").await;
    assert_eq!(page.messages[0].reactions[0].count, 1);

    // Only bob's reaction notified alice; her own did not
    let list: ListNotificationsResponse = server
        .get("/api/notifications")
        .authorization_bearer(alice.token())
        .await
        .json();
    let reactions: Vec<_> = list
        .notifications
        .iter()
        .filter(|n| n.kind == NotificationKind::Reaction)
        .collect();
    assert_eq!(reactions.len(), 1);
    assert_eq!(reactions[0].actor_id, Some(bob.id));

    server
        .post(&path)
        .authorization_bearer(bob.token())
        .json(&json!({ "emoji": "two words" }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}
