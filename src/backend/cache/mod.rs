//! Cache Module
//!
//! In-process key/value store with per-entry TTLs. It holds the short-lived
//! state that does not belong in the database:
//!
//! - `refresh:{user}:{jti}` - live refresh-token sessions
//! - `rotated:{jti}` - the pair issued when a refresh token was rotated
//! - `revoked:{jti}` - access tokens revoked before their expiry
//! - `presence:{user}` / `last_seen:{user}` - online state
//! - `rate:msg:{user}` - message rate-limit counters
//! - `client_msg:{user}:{client_id}` - message de-duplication
//! - `typing:{room}:{user}` - typing-indicator throttle

pub mod store;

pub use store::CacheStore;

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

/// Interval between sweeps of expired entries
pub const PURGE_INTERVAL: Duration = Duration::from_secs(60);

/// Spawn the periodic sweep that drops expired entries
pub fn spawn_purge_task(cache: Arc<CacheStore>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            let removed = cache.purge_expired();
            if removed > 0 {
                tracing::debug!("[Cache] Purged {} expired entries", removed);
            }
        }
    })
}
