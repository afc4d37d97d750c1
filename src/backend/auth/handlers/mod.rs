//! Authentication Handlers Module
//!
//! # Handlers
//!
//! - **`register`** - POST /api/auth/register
//! - **`login`** - POST /api/auth/login
//! - **`refresh`** - POST /api/auth/refresh
//! - **`logout`** - POST /api/auth/logout
//! - **`logout_all`** - POST /api/auth/logout-all
//! - **`get_me`** - GET /api/auth/me
//! - **`search_users`** - GET /api/users?search=
//! - **`get_user`** - GET /api/users/{id}

/// Registration handler
pub mod register;

/// Login handler
pub mod login;

/// Token rotation handler
pub mod refresh;

/// Logout handlers
pub mod logout;

/// Get current user handler
pub mod me;

/// User directory handlers
pub mod users;

pub use login::login;
pub use logout::{logout, logout_all};
pub use me::get_me;
pub use refresh::refresh;
pub use register::register;
pub use users::{get_user, search_users};
