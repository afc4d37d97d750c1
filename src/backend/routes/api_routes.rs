/**
 * API Route Handlers
 *
 * # Routes
 *
 * ## Authentication
 * - `POST /api/auth/register` - User registration
 * - `POST /api/auth/login` - User login
 * - `POST /api/auth/refresh` - Rotate a refresh token
 * - `POST /api/auth/logout` - End the current session
 * - `POST /api/auth/logout-all` - End every session
 * - `GET /api/auth/me` - Current user
 *
 * ## Users
 * - `GET /api/users?search=` - Username prefix search
 * - `GET /api/users/{user_id}` - Public profile
 *
 * ## Rooms
 * - `GET|POST /api/rooms`, `POST /api/rooms/direct`
 * - `GET|PATCH /api/rooms/{room_id}`
 * - `GET|POST /api/rooms/{room_id}/members`, `DELETE /api/rooms/{room_id}/members/{user_id}`
 * - `GET|POST /api/rooms/{room_id}/messages`
 * - `POST /api/rooms/{room_id}/read`, `GET /api/rooms/{room_id}/unread`
 *
 * ## Messages
 * - `PATCH|DELETE /api/messages/{message_id}`
 * - `GET|POST /api/messages/{message_id}/reactions`
 *
 * ## Notifications
 * - `GET /api/notifications`, `GET /api/notifications/unread-count`
 * - `PATCH /api/notifications/{notification_id}/read`, `POST /api/notifications/read-all`
 *
 * Everything except register, login and refresh requires a bearer access
 * token, checked by the `AuthUser` extractor.
 */

use axum::{
    routing::{delete, get, patch, post},
    Router,
};

use crate::backend::auth::handlers::{
    get_me, get_user, login, logout, logout_all, refresh, register, search_users,
};
use crate::backend::messages::handlers as messages;
use crate::backend::notifications::handlers as notifications;
use crate::backend::reactions::handlers as reactions;
use crate::backend::rooms::handlers as rooms;
use crate::backend::server::state::AppState;

/// Configure API routes
pub fn configure_api_routes(router: Router<AppState>) -> Router<AppState> {
    router
        // Authentication endpoints
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/refresh", post(refresh))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/logout-all", post(logout_all))
        .route("/api/auth/me", get(get_me))
        // User directory
        .route("/api/users", get(search_users))
        .route("/api/users/{user_id}", get(get_user))
        // Rooms
        .route("/api/rooms", get(rooms::list_rooms).post(rooms::create_room))
        .route("/api/rooms/direct", post(rooms::open_direct))
        .route("/api/rooms/{room_id}", get(rooms::get_room).patch(rooms::rename_room))
        .route(
            "/api/rooms/{room_id}/members",
            get(rooms::list_members).post(rooms::add_member),
        )
        .route(
            "/api/rooms/{room_id}/members/{user_id}",
            delete(rooms::remove_member),
        )
        // Messages and receipts
        .route(
            "/api/rooms/{room_id}/messages",
            get(messages::list_messages).post(messages::send_message),
        )
        .route("/api/rooms/{room_id}/read", post(messages::mark_read))
        .route("/api/rooms/{room_id}/unread", get(messages::unread_count))
        .route(
            "/api/messages/{message_id}",
            patch(messages::edit_message).delete(messages::delete_message),
        )
        .route(
            "/api/messages/{message_id}/reactions",
            get(reactions::list_reactions).post(reactions::toggle_reaction),
        )
        // Notifications
        .route("/api/notifications", get(notifications::list_notifications))
        .route("/api/notifications/unread-count", get(notifications::unread_count))
        .route("/api/notifications/read-all", post(notifications::mark_all_read))
        .route(
            "/api/notifications/{notification_id}/read",
            patch(notifications::mark_read),
        )
}
