//! Server Module
//!
//! Everything needed to stand the backend up.
//!
//! # Architecture
//!
//! - **`config`** - `ServerConfig` loading (defaults, TOML, environment) and its builder
//! - **`state`** - `AppState` and `FromRef` implementations
//! - **`init`** - database connection, migrations, state and router creation
//!
//! # Initialization Flow
//!
//! 1. **Configuration**: `ServerConfig::from_env()` in the binary, the builder in tests
//! 2. **Database**: pool + embedded migrations
//! 3. **State**: cache, session manager, connection hub
//! 4. **Background Tasks**: cache purge loop
//! 5. **Router**: routes, fallback, CORS and trace layers

/// Server configuration loading
pub mod config;

/// Application state management
pub mod state;

/// Server initialization
pub mod init;

pub use config::{ConfigError, ServerConfig};
pub use init::{build_state, create_app};
pub use state::AppState;
