//! Backend Error Module
//!
//! Error types used by HTTP handlers, services and the gateway.
//!
//! # Architecture
//!
//! - **`types`** - `BackendError` definition, constructors, status and code mapping
//! - **`conversion`** - `IntoResponse` implementation
//!
//! # Error Types
//!
//! - `HandlerError` - Errors carrying an explicit HTTP status
//! - `StateError` - Errors related to application state management
//! - `ProtocolError` - Malformed gateway frames
//! - `SharedError` - Validation errors from the shared module
//! - `DatabaseError`, `TokenError`, `PasswordError` - wrapped library errors
//!
//! # HTTP Response Conversion
//!
//! All backend errors implement `IntoResponse`, so handlers return
//! `Result<Json<T>, BackendError>` and propagate with `?`.

/// Error type definitions
pub mod types;

/// Error conversion implementations
pub mod conversion;

pub use types::BackendError;

/// Result alias used across the backend
pub type BackendResult<T> = Result<T, BackendError>;
