/**
 * User Model and Database Operations
 *
 * This module handles user records, password hashing and the user lookups
 * the rest of the backend needs.
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::backend::error::{BackendError, BackendResult};
use crate::shared::auth::{UserProfile, UserResponse};

/// Maximum number of results returned by user search
pub const SEARCH_LIMIT: i64 = 20;

/// User struct representing a user in the database
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Unique user ID (UUID)
    pub id: Uuid,
    /// Username (unique, 3-30 chars, alphanumeric + underscore)
    pub username: String,
    /// User email address
    pub email: String,
    /// Hashed password (bcrypt)
    pub password_hash: String,
    pub display_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn to_response(&self) -> UserResponse {
        UserResponse {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            display_name: self.display_name.clone(),
            created_at: self.created_at,
        }
    }

    pub fn to_profile(&self, online: bool) -> UserProfile {
        UserProfile {
            id: self.id,
            username: self.username.clone(),
            display_name: self.display_name.clone(),
            online,
        }
    }
}

/// Create a new user
///
/// Duplicate usernames or emails surface as a unique-violation
/// `sqlx::Error`, which `BackendError` maps to 409.
pub async fn create_user(
    pool: &SqlitePool,
    username: &str,
    email: &str,
    password_hash: &str,
    display_name: Option<&str>,
) -> Result<User, sqlx::Error> {
    let id = Uuid::new_v4();
    let now = Utc::now();

    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (id, username, email, password_hash, display_name, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        RETURNING id, username, email, password_hash, display_name, created_at, updated_at
        "#,
    )
    .bind(id)
    .bind(username)
    .bind(email)
    .bind(password_hash)
    .bind(display_name)
    .bind(now)
    .bind(now)
    .fetch_one(pool)
    .await?;

    Ok(user)
}

/// Get user by ID
pub async fn get_user_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        r#"
        SELECT id, username, email, password_hash, display_name, created_at, updated_at
        FROM users
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// Get user by username or email (both case-insensitive)
pub async fn get_user_by_login(
    pool: &SqlitePool,
    username_or_email: &str,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        r#"
        SELECT id, username, email, password_hash, display_name, created_at, updated_at
        FROM users
        WHERE username = ?1 OR email = ?1
        "#,
    )
    .bind(username_or_email)
    .fetch_optional(pool)
    .await
}

/// Fetch a user or fail with 404
pub async fn require_user(pool: &SqlitePool, id: Uuid) -> BackendResult<User> {
    get_user_by_id(pool, id)
        .await?
        .ok_or_else(|| BackendError::not_found("User not found"))
}

/// Users whose username starts with `prefix`, excluding `exclude`
pub async fn search_users(
    pool: &SqlitePool,
    prefix: &str,
    exclude: Uuid,
) -> Result<Vec<User>, sqlx::Error> {
    let pattern = format!("{}%", escape_like(prefix.trim()));
    sqlx::query_as::<_, User>(
        r#"
        SELECT id, username, email, password_hash, display_name, created_at, updated_at
        FROM users
        WHERE username LIKE ? ESCAPE '\' AND id != ?
        ORDER BY username ASC
        LIMIT ?
        "#,
    )
    .bind(pattern)
    .bind(exclude)
    .bind(SEARCH_LIMIT)
    .fetch_all(pool)
    .await
}

fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Hash a password on the blocking pool
pub async fn hash_password(password: String, cost: u32) -> BackendResult<String> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| BackendError::state(format!("Password hashing task failed: {}", e)))?
        .map_err(BackendError::from)
}

/// Check a password against a stored hash on the blocking pool
pub async fn verify_password(password: String, hash: String) -> BackendResult<bool> {
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| BackendError::state(format!("Password verification task failed: {}", e)))?
        .map_err(BackendError::from)
}
