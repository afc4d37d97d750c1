//! Reactions Module
//!
//! Emoji reactions on messages, aggregated per emoji in first-use order.

pub mod db;
pub mod handlers;
pub mod service;
