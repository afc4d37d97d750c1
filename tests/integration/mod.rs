//! Integration tests
//!
//! REST endpoints through `axum-test`, the gateway over a real socket, and
//! the client library against mocked servers.

mod client;
