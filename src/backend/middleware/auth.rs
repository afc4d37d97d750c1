/**
 * Authentication Extractor
 *
 * Protects routes that require a signed-in user. The bearer token is read
 * from the `Authorization` header and verified as an access token that has
 * not been revoked; any failure rejects the request with 401.
 */

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use uuid::Uuid;

use crate::backend::auth::sessions::Claims;
use crate::backend::error::BackendError;
use crate::backend::server::state::AppState;

/// Extract the token from `Authorization: Bearer <token>`
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Axum extractor for the authenticated user
///
/// ```rust,ignore
/// async fn handler(user: AuthUser) -> String {
///     user.username
/// }
/// ```
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub username: String,
    /// Verified claims of the presented access token
    pub claims: Claims,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = BackendError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).ok_or_else(|| {
            tracing::debug!("[Auth] Missing or malformed Authorization header");
            BackendError::unauthorized("Missing bearer token")
        })?;

        let claims = state.sessions.verify_access(token)?;

        Ok(AuthUser {
            user_id: claims.sub,
            username: claims.username.clone(),
            claims,
        })
    }
}
