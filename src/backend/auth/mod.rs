//! Authentication Module
//!
//! This module handles user registration, login and the token session
//! lifecycle (issue, rotate, revoke).
//!
//! # Architecture
//!
//! - **`users`** - User data model and database operations
//! - **`sessions`** - JWT issue/verify and refresh-token rotation
//! - **`handlers`** - HTTP handlers for `/api/auth/*` and `/api/users*`
//!
//! # Module Structure
//!
//! ```text
//! auth/
//! ├── mod.rs          - Module exports and documentation
//! ├── users.rs        - User model and database operations
//! ├── sessions.rs     - Token pairs, rotation, revocation
//! └── handlers/       - HTTP handlers
//!     ├── mod.rs      - Handler exports
//!     ├── register.rs - User registration handler
//!     ├── login.rs    - User authentication handler
//!     ├── refresh.rs  - Token rotation handler
//!     ├── logout.rs   - Logout / logout-all handlers
//!     ├── me.rs       - Get current user handler
//!     └── users.rs    - User search and profiles
//! ```
//!
//! # Token Lifecycle
//!
//! 1. **Register/Login**: credentials verified → access + refresh pair returned
//! 2. **Refresh**: refresh token exchanged exactly once for a new pair; a
//!    replay inside the grace window returns the same pair, a later replay
//!    revokes every session of the user
//! 3. **Logout**: refresh session dropped and the access token's id revoked
//!    until it would have expired
//!
//! # Security
//!
//! - Passwords are hashed using bcrypt on the blocking pool
//! - Invalid credentials return 401 (no information leakage)
//! - Access tokens live 15 minutes, refresh tokens 7 days by default

/// User data model and database operations
pub mod users;

/// Token pairs, rotation and revocation
pub mod sessions;

/// HTTP handlers for authentication endpoints
pub mod handlers;

pub use sessions::{Claims, SessionManager, TokenKind};
