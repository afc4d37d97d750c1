//! Messages Module
//!
//! - **`db`** - message storage, paging and read pointers
//! - **`service`** - send / history / edit / delete
//! - **`receipts`** - read pointers and unread counts
//! - **`handlers`** - `/api/rooms/{id}/messages`, `/api/messages/{id}`, read endpoints

pub mod db;
pub mod handlers;
pub mod receipts;
pub mod service;
