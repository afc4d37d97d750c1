//! Notifications Module
//!
//! Per-user notifications for messages in rooms the user is not viewing,
//! reactions to their messages, and room invites.
//!
//! - **`db`** - persistence
//! - **`service`** - `notify` (persist + push `notification:new`) and the read operations
//! - **`handlers`** - `/api/notifications*`

pub mod db;
pub mod handlers;
pub mod service;

pub use service::notify;
