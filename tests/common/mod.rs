//! Common test utilities and helpers
//!
//! - In-memory server fixtures (`axum-test` and a real listener)
//! - User registration helpers
//! - Gateway frame helpers

#![allow(dead_code)]

pub mod auth_helpers;
pub mod server;

pub use auth_helpers::*;
pub use server::*;
