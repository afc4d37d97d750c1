//! Shared Module
//!
//! Types shared between the server and the client library: REST request and
//! response bodies, the gateway event protocol, and validation rules that
//! both sides apply.
//!
//! # Overview
//!
//! Nothing here touches the network or the database, so the module compiles
//! with or without the `server` feature.

/// Authentication DTOs and input rules
pub mod auth;

/// Gateway event protocol
pub mod event;

/// Shared error types
pub mod error;

/// Rooms, messages, reactions and notifications
pub mod messaging;

pub use error::SharedError;
pub use event::{ClientEvent, ClientFrame, ServerEvent};
