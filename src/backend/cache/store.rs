/**
 * TTL Key/Value Store
 *
 * A `DashMap` of string values with optional expiry. Expired entries are
 * invisible to every read and removed lazily or by `purge_expired`.
 *
 * Values are strings; structured values go through `set_json`/`get_json`.
 * Counters created by `incr` are stored as decimal strings.
 */

use std::time::{Duration, Instant};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{de::DeserializeOwned, Serialize};

#[derive(Debug, Clone)]
struct CacheEntry {
    value: String,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn new(value: String, ttl: Option<Duration>) -> Self {
        Self {
            value,
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        matches!(self.expires_at, Some(at) if at <= now)
    }
}

/// Concurrent key/value store with TTLs
#[derive(Debug, Default)]
pub struct CacheStore {
    entries: DashMap<String, CacheEntry>,
}

impl CacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value for `key`, unless missing or expired
    pub fn get(&self, key: &str) -> Option<String> {
        let now = Instant::now();
        let value = {
            let entry = self.entries.get(key)?;
            if entry.is_expired(now) {
                None
            } else {
                Some(entry.value.clone())
            }
        };
        if value.is_none() {
            self.entries.remove_if(key, |_, e| e.is_expired(now));
        }
        value
    }

    /// Store `value`; `None` keeps it until deleted
    pub fn set(&self, key: impl Into<String>, value: impl Into<String>, ttl: Option<Duration>) {
        self.entries
            .insert(key.into(), CacheEntry::new(value.into(), ttl));
    }

    /// Remove `key`, returning whether a live entry existed
    pub fn delete(&self, key: &str) -> bool {
        let now = Instant::now();
        matches!(self.entries.remove(key), Some((_, entry)) if !entry.is_expired(now))
    }

    /// Atomically remove and return the live value for `key`
    ///
    /// Of several concurrent callers at most one gets `Some`.
    pub fn take(&self, key: &str) -> Option<String> {
        let now = Instant::now();
        match self.entries.remove(key) {
            Some((_, entry)) if !entry.is_expired(now) => Some(entry.value),
            _ => None,
        }
    }

    /// Store `value` only if `key` has no live entry
    ///
    /// Returns `None` when the value was stored, otherwise the value already
    /// present. Of several concurrent callers exactly one stores.
    pub fn set_if_absent(
        &self,
        key: impl Into<String>,
        value: impl Into<String>,
        ttl: Option<Duration>,
    ) -> Option<String> {
        let now = Instant::now();
        match self.entries.entry(key.into()) {
            Entry::Occupied(mut occupied) if occupied.get().is_expired(now) => {
                occupied.insert(CacheEntry::new(value.into(), ttl));
                None
            }
            Entry::Occupied(occupied) => Some(occupied.get().value.clone()),
            Entry::Vacant(vacant) => {
                vacant.insert(CacheEntry::new(value.into(), ttl));
                None
            }
        }
    }

    pub fn exists(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Increment the counter at `key`, creating it at 1 with `ttl`
    ///
    /// The TTL is applied only when the counter is created, so a window
    /// started by the first increment is not extended by later ones.
    pub fn incr(&self, key: &str, ttl: Duration) -> u64 {
        let now = Instant::now();
        let mut entry = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| CacheEntry::new("0".to_string(), Some(ttl)));
        if entry.is_expired(now) {
            *entry = CacheEntry::new("0".to_string(), Some(ttl));
        }
        let next = entry.value.parse::<u64>().unwrap_or(0) + 1;
        entry.value = next.to_string();
        next
    }

    /// Remove every key starting with `prefix`; returns how many were removed
    pub fn delete_prefix(&self, prefix: &str) -> usize {
        let keys: Vec<String> = self
            .entries
            .iter()
            .filter(|e| e.key().starts_with(prefix))
            .map(|e| e.key().clone())
            .collect();
        keys.iter()
            .filter(|key| self.entries.remove(key.as_str()).is_some())
            .count()
    }

    /// Live keys starting with `prefix`
    pub fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        let now = Instant::now();
        self.entries
            .iter()
            .filter(|e| e.key().starts_with(prefix) && !e.value().is_expired(now))
            .map(|e| e.key().clone())
            .collect()
    }

    /// Drop expired entries; returns how many were removed
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, e| !e.is_expired(now));
        before.saturating_sub(self.entries.len())
    }

    pub fn set_json<T: Serialize>(
        &self,
        key: impl Into<String>,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<(), serde_json::Error> {
        let raw = serde_json::to_string(value)?;
        self.set(key, raw, ttl);
        Ok(())
    }

    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, serde_json::Error> {
        self.get(key).map(|raw| serde_json::from_str(&raw)).transpose()
    }

    /// Number of stored entries, including expired ones not yet purged
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
