//! Real-time Module
//!
//! Server-side fan-out for the WebSocket gateway.
//!
//! # Architecture
//!
//! - **`hub`** - registry of live connections and their room subscriptions;
//!   every service pushes events through it
//! - **`presence`** - online/last-seen tracking on top of the cache
//!
//! # Delivery
//!
//! Events reach a connection only through its outbound queue. Room events go
//! to connections that joined the room; user events (notifications, unread
//! counters, presence) go to all of a user's connections whether or not
//! they joined anything.

pub mod hub;
pub mod presence;

pub use hub::{ConnectedClient, Outbound, RealtimeHub, Unregistered};
