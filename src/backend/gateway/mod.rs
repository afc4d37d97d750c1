//! WebSocket Gateway
//!
//! Authenticated, long-lived sockets at `GET /ws`.
//!
//! - **`upgrade`** - token check and HTTP upgrade
//! - **`connection`** - per-socket reader/writer loops and the token deadline
//! - **`dispatch`** - client events routed to the room, message and reaction services
//!
//! Errors raised while handling a frame are answered with an `error` frame;
//! only token expiry closes the socket from the server side.

pub mod connection;
pub mod dispatch;
pub mod upgrade;

pub use connection::GatewaySession;
pub use upgrade::ws_handler;

/// Close code sent when the access token behind a socket expires
pub const CLOSE_TOKEN_EXPIRED: u16 = 4001;
