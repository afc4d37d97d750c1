/**
 * Session Management and JWT Tokens
 *
 * This module issues and verifies the access/refresh token pair and keeps
 * the server side of refresh coordination:
 *
 * - A refresh token is live only while `refresh:{user}:{jti}` is cached.
 * - Rotation consumes that key and caches the new pair under
 *   `rotated:{jti}` for the grace window, so a second tab presenting the
 *   same token gets the same pair back.
 * - Presenting a rotated token after the grace window counts as reuse and
 *   revokes every refresh session of the user.
 * - Logged-out access tokens are remembered under `revoked:{jti}` until
 *   they would have expired anyway.
 */

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::backend::cache::CacheStore;
use crate::backend::error::{BackendError, BackendResult};
use crate::backend::server::config::ServerConfig;
use crate::shared::auth::TokenPair;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    /// User ID
    pub sub: Uuid,
    pub username: String,
    pub kind: TokenKind,
    /// Unique token id, used for revocation and rotation
    pub jti: Uuid,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl Claims {
    pub fn new(user_id: Uuid, username: &str, kind: TokenKind, ttl: Duration) -> Self {
        let now = Utc::now().timestamp();
        Self {
            sub: user_id,
            username: username.to_string(),
            kind,
            jti: Uuid::new_v4(),
            iat: now,
            exp: now + ttl.as_secs() as i64,
        }
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(self.exp, 0).unwrap_or_else(Utc::now)
    }

    /// Time left before expiry, zero once expired
    pub fn remaining(&self) -> Duration {
        let secs = self.exp - Utc::now().timestamp();
        Duration::from_secs(secs.max(0) as u64)
    }
}

pub fn refresh_key(user_id: Uuid, jti: Uuid) -> String {
    format!("refresh:{}:{}", user_id, jti)
}

fn refresh_prefix(user_id: Uuid) -> String {
    format!("refresh:{}:", user_id)
}

fn rotated_key(jti: Uuid) -> String {
    format!("rotated:{}", jti)
}

fn revoked_key(jti: Uuid) -> String {
    format!("revoked:{}", jti)
}

struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

/// Issues, verifies, rotates and revokes tokens
#[derive(Clone)]
pub struct SessionManager {
    keys: Arc<JwtKeys>,
    cache: Arc<CacheStore>,
    access_ttl: Duration,
    refresh_ttl: Duration,
    grace: Duration,
    /// Serializes rotations so consume-then-remember is atomic
    rotation_lock: Arc<Mutex<()>>,
}

impl SessionManager {
    pub fn new(config: &ServerConfig, cache: Arc<CacheStore>) -> Self {
        let secret = config.jwt_secret.as_bytes();
        Self {
            keys: Arc::new(JwtKeys {
                encoding: EncodingKey::from_secret(secret),
                decoding: DecodingKey::from_secret(secret),
                validation: Validation::new(Algorithm::HS256),
            }),
            cache,
            access_ttl: config.access_token_ttl(),
            refresh_ttl: config.refresh_token_ttl(),
            grace: config.refresh_grace(),
            rotation_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    /// Sign arbitrary claims with the server key
    pub fn encode_claims(&self, claims: &Claims) -> BackendResult<String> {
        Ok(encode(&Header::new(Algorithm::HS256), claims, &self.keys.encoding)?)
    }

    /// Verify signature and expiry; any failure is a 401
    pub fn decode(&self, token: &str) -> BackendResult<Claims> {
        decode::<Claims>(token, &self.keys.decoding, &self.keys.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!("[Auth] Token rejected: {}", e);
                BackendError::unauthorized("Invalid or expired token")
            })
    }

    /// Issue a fresh access/refresh pair and register the refresh session
    pub fn issue_pair(&self, user_id: Uuid, username: &str) -> BackendResult<TokenPair> {
        let access = Claims::new(user_id, username, TokenKind::Access, self.access_ttl);
        let refresh = Claims::new(user_id, username, TokenKind::Refresh, self.refresh_ttl);

        let pair = TokenPair {
            access_token: self.encode_claims(&access)?,
            refresh_token: self.encode_claims(&refresh)?,
            token_type: "Bearer".to_string(),
            access_expires_at: access.expires_at(),
            refresh_expires_at: refresh.expires_at(),
        };

        self.cache
            .set(refresh_key(user_id, refresh.jti), username, Some(self.refresh_ttl));
        Ok(pair)
    }

    /// Verify a bearer token for API and gateway use
    pub fn verify_access(&self, token: &str) -> BackendResult<Claims> {
        let claims = self.decode(token)?;
        if claims.kind != TokenKind::Access {
            return Err(BackendError::unauthorized("Expected an access token"));
        }
        if self.is_revoked(claims.jti) {
            return Err(BackendError::unauthorized("Token has been revoked"));
        }
        Ok(claims)
    }

    /// Exchange a refresh token for a new pair
    pub fn rotate(&self, refresh_token: &str) -> BackendResult<TokenPair> {
        let claims = self.decode(refresh_token)?;
        if claims.kind != TokenKind::Refresh {
            return Err(BackendError::unauthorized("Expected a refresh token"));
        }

        let _guard = self
            .rotation_lock
            .lock()
            .map_err(|_| BackendError::state("Rotation lock poisoned"))?;

        if self.cache.take(&refresh_key(claims.sub, claims.jti)).is_some() {
            let pair = self.issue_pair(claims.sub, &claims.username)?;
            self.cache
                .set_json(rotated_key(claims.jti), &pair, Some(self.grace))?;
            tracing::info!("[Auth] Rotated refresh token for {}", claims.username);
            return Ok(pair);
        }

        if let Some(pair) = self.cache.get_json::<TokenPair>(&rotated_key(claims.jti))? {
            tracing::debug!("[Auth] Refresh token reused within grace window for {}", claims.username);
            return Ok(pair);
        }

        if self.is_revoked(claims.jti) {
            return Err(BackendError::unauthorized("Session has been logged out"));
        }

        let revoked = self.revoke_all(claims.sub);
        tracing::warn!(
            "[Auth] Refresh token reuse detected for {}; revoked {} session(s)",
            claims.username,
            revoked
        );
        Err(BackendError::unauthorized("Refresh token has already been used"))
    }

    /// Remember `claims.jti` as revoked until the token would expire
    pub fn revoke(&self, claims: &Claims) {
        let remaining = claims.remaining();
        if !remaining.is_zero() {
            self.cache.set(revoked_key(claims.jti), "1", Some(remaining));
        }
    }

    /// End the refresh session behind `refresh_token`, if it belongs to `user_id`
    pub fn revoke_refresh(&self, refresh_token: &str, user_id: Uuid) -> BackendResult<()> {
        let claims = self.decode(refresh_token)?;
        if claims.kind != TokenKind::Refresh || claims.sub != user_id {
            return Err(BackendError::bad_request("Refresh token does not belong to this session"));
        }
        self.cache.delete(&refresh_key(claims.sub, claims.jti));
        self.revoke(&claims);
        Ok(())
    }

    /// Drop every refresh session of the user; returns how many were live
    pub fn revoke_all(&self, user_id: Uuid) -> usize {
        self.cache.delete_prefix(&refresh_prefix(user_id))
    }

    pub fn is_revoked(&self, jti: Uuid) -> bool {
        self.cache.exists(&revoked_key(jti))
    }

    /// Number of live refresh sessions for a user
    pub fn session_count(&self, user_id: Uuid) -> usize {
        self.cache.keys_with_prefix(&refresh_prefix(user_id)).len()
    }
}
