//! REST API Client
//!
//! Typed wrappers over `/api/*`. Every call carries the session's access
//! token; a 401 triggers one coordinated refresh and a single retry.

use reqwest::{Method, RequestBuilder, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use uuid::Uuid;

use super::error::ClientError;
use super::session::{check, parse, AuthSession};
use crate::shared::auth::{UserProfile, UserResponse};
use crate::shared::messaging::{
    AddMemberRequest, ChatMessage, CreateRoomRequest, EditMessageRequest, ListMessagesResponse,
    ListNotificationsResponse, MarkReadRequest, NotificationCount, OpenDirectRequest, ReactionSummary,
    ReactionUpdate, ReadReceipt, RenameRoomRequest, Room, RoomDetail, RoomMember, RoomSummary,
    SendMessageRequest, ToggleReactionRequest, UnreadCount,
};

/// REST API client
#[derive(Debug, Clone)]
pub struct ChatClient {
    session: AuthSession,
}

impl ChatClient {
    pub fn new(session: AuthSession) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &AuthSession {
        &self.session
    }

    fn request(&self, method: Method, path: &str, query: &[(&str, String)], token: &str) -> RequestBuilder {
        self.session
            .http()
            .request(method, self.session.config().api_url(path))
            .query(query)
            .bearer_auth(token)
    }

    /// Send an authorized request, refreshing and retrying once on 401
    async fn send<B>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&B>,
    ) -> Result<reqwest::Response, ClientError>
    where
        B: Serialize + ?Sized,
    {
        let token = self.session.access_token().await?;
        let mut builder = self.request(method.clone(), path, query, &token);
        if let Some(body) = body {
            builder = builder.json(body);
        }
        let response = builder.send().await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return check(response).await;
        }

        tracing::debug!("[Client] {} {} got 401, refreshing", method, path);
        let pair = self.session.refresh(&token).await?;
        let mut builder = self.request(method, path, query, &pair.access_token);
        if let Some(body) = body {
            builder = builder.json(body);
        }
        check(builder.send().await?).await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        self.get_with_query(path, &[]).await
    }

    async fn get_with_query<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T, ClientError> {
        parse(self.send::<()>(Method::GET, path, query, None).await?).await
    }

    async fn with_body<B, T>(&self, method: Method, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        parse(self.send(method, path, &[], Some(body)).await?).await
    }

    async fn no_content(&self, method: Method, path: &str) -> Result<(), ClientError> {
        self.send::<()>(method, path, &[], None).await.map(|_| ())
    }

    pub async fn me(&self) -> Result<UserResponse, ClientError> {
        self.get("/api/auth/me").await
    }

    pub async fn search_users(&self, prefix: &str) -> Result<Vec<UserProfile>, ClientError> {
        self.get_with_query("/api/users", &[("search", prefix.to_string())])
            .await
    }

    pub async fn list_rooms(&self) -> Result<Vec<RoomSummary>, ClientError> {
        self.get("/api/rooms").await
    }

    pub async fn create_room(&self, name: &str, member_ids: Vec<Uuid>) -> Result<RoomDetail, ClientError> {
        let request = CreateRoomRequest {
            name: name.to_string(),
            member_ids,
        };
        self.with_body(Method::POST, "/api/rooms", &request).await
    }

    pub async fn open_direct(&self, user_id: Uuid) -> Result<Room, ClientError> {
        self.with_body(Method::POST, "/api/rooms/direct", &OpenDirectRequest { user_id })
            .await
    }

    pub async fn get_room(&self, room_id: Uuid) -> Result<RoomDetail, ClientError> {
        self.get(&format!("/api/rooms/{}", room_id)).await
    }

    pub async fn rename_room(&self, room_id: Uuid, name: &str) -> Result<Room, ClientError> {
        let request = RenameRoomRequest { name: name.to_string() };
        self.with_body(Method::PATCH, &format!("/api/rooms/{}", room_id), &request)
            .await
    }

    pub async fn add_member(&self, room_id: Uuid, user_id: Uuid) -> Result<RoomMember, ClientError> {
        self.with_body(
            Method::POST,
            &format!("/api/rooms/{}/members", room_id),
            &AddMemberRequest { user_id },
        )
        .await
    }

    pub async fn remove_member(&self, room_id: Uuid, user_id: Uuid) -> Result<(), ClientError> {
        self.no_content(Method::DELETE, &format!("/api/rooms/{}/members/{}", room_id, user_id))
            .await
    }

    /// One page of history, chronological; `before` pages further back
    pub async fn history(
        &self,
        room_id: Uuid,
        before: Option<Uuid>,
        limit: Option<u32>,
    ) -> Result<ListMessagesResponse, ClientError> {
        let mut query = Vec::new();
        if let Some(before) = before {
            query.push(("before", before.to_string()));
        }
        if let Some(limit) = limit {
            query.push(("limit", limit.to_string()));
        }
        self.get_with_query(&format!("/api/rooms/{}/messages", room_id), &query)
            .await
    }

    pub async fn send_message(&self, room_id: Uuid, request: &SendMessageRequest) -> Result<ChatMessage, ClientError> {
        self.with_body(Method::POST, &format!("/api/rooms/{}/messages", room_id), request)
            .await
    }

    pub async fn edit_message(&self, message_id: Uuid, content: &str) -> Result<ChatMessage, ClientError> {
        let request = EditMessageRequest {
            content: content.to_string(),
        };
        self.with_body(Method::PATCH, &format!("/api/messages/{}", message_id), &request)
            .await
    }

    pub async fn delete_message(&self, message_id: Uuid) -> Result<(), ClientError> {
        self.no_content(Method::DELETE, &format!("/api/messages/{}", message_id))
            .await
    }

    pub async fn mark_read(&self, room_id: Uuid, message_id: Option<Uuid>) -> Result<ReadReceipt, ClientError> {
        self.with_body(
            Method::POST,
            &format!("/api/rooms/{}/read", room_id),
            &MarkReadRequest { message_id },
        )
        .await
    }

    pub async fn unread_count(&self, room_id: Uuid) -> Result<UnreadCount, ClientError> {
        self.get(&format!("/api/rooms/{}/unread", room_id)).await
    }

    pub async fn toggle_reaction(&self, message_id: Uuid, emoji: &str) -> Result<ReactionUpdate, ClientError> {
        let request = ToggleReactionRequest {
            emoji: emoji.to_string(),
        };
        self.with_body(Method::POST, &format!("/api/messages/{}/reactions", message_id), &request)
            .await
    }

    pub async fn reactions(&self, message_id: Uuid) -> Result<Vec<ReactionSummary>, ClientError> {
        self.get(&format!("/api/messages/{}/reactions", message_id)).await
    }

    pub async fn notifications(&self, unread_only: bool) -> Result<ListNotificationsResponse, ClientError> {
        self.get_with_query("/api/notifications", &[("unread_only", unread_only.to_string())])
            .await
    }

    pub async fn notification_count(&self) -> Result<NotificationCount, ClientError> {
        self.get("/api/notifications/unread-count").await
    }

    pub async fn mark_notification_read(&self, notification_id: Uuid) -> Result<(), ClientError> {
        self.no_content(Method::PATCH, &format!("/api/notifications/{}/read", notification_id))
            .await
    }

    pub async fn mark_all_notifications_read(&self) -> Result<(), ClientError> {
        self.no_content(Method::POST, "/api/notifications/read-all").await
    }
}
