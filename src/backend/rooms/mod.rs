//! Rooms Module
//!
//! Direct and group rooms, their membership and the membership gate.
//!
//! - **`db`** - `rooms` / `room_members` tables
//! - **`service`** - room operations and [`ensure_member`]
//! - **`handlers`** - `/api/rooms*`

pub mod db;
pub mod handlers;
pub mod service;

pub use service::ensure_member;
