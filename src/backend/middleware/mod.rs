//! Middleware Module
//!
//! Request-processing pieces shared by the routes.
//!
//! - **`auth`** - `AuthUser` extractor guarding every `/api` route except
//!   register, login and refresh
//!
//! # Example
//!
//! ```rust,ignore
//! use roomline::backend::middleware::AuthUser;
//!
//! async fn me(user: AuthUser) -> String {
//!     user.username
//! }
//! ```

pub mod auth;

pub use auth::{bearer_token, AuthUser};
