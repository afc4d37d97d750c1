//! Route Configuration Module
//!
//! This module configures all HTTP routes for the backend server.
//!
//! # Module Structure
//!
//! ```text
//! routes/
//! ├── mod.rs            - Module exports and documentation
//! ├── router.rs         - Main router creation and layers
//! ├── gateway_routes.rs - Health check and WebSocket gateway
//! └── api_routes.rs     - REST endpoints
//! ```
//!
//! # Route Organization
//!
//! 1. **Gateway Routes** - `/health`, `/ws`
//! 2. **API Routes** - `/api/auth/*`, `/api/users*`, `/api/rooms*`,
//!    `/api/messages*`, `/api/notifications*`
//! 3. **Static Files** - optional frontend directory
//! 4. **Fallback Handler** - JSON 404

/// Main router creation
pub mod router;

/// Health check and WebSocket gateway
pub mod gateway_routes;

/// REST endpoints
pub mod api_routes;

pub use router::create_router;
