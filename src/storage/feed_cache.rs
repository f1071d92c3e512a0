use std::sync::Arc;
use std::time::Duration;

use super::kv::KeyValueStore;
use super::types::{CacheEntry, StoreError};
use crate::config::Config;

/// Returns true iff `entry` is younger than `ttl` at `now_ms`.
///
/// The window is half-open: an entry written at `T` is fresh for every
/// `now` in `[T, T + ttl)` and stale from `T + ttl` on.
pub fn is_fresh(entry: &CacheEntry, now_ms: i64, ttl: Duration) -> bool {
    let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
    now_ms.saturating_sub(entry.fetched_at_ms) < ttl_ms
}

/// Single-slot cache of the last successfully fetched feed body.
///
/// Every write replaces the slot wholesale. Read failures (backend errors or
/// a slot that no longer decodes) are reported as a miss so a damaged cache
/// can never block a fresh fetch.
#[derive(Clone)]
pub struct FeedCache {
    store: Arc<dyn KeyValueStore>,
    key: String,
    ttl: Duration,
}

impl FeedCache {
    pub fn new(store: Arc<dyn KeyValueStore>, key: impl Into<String>, ttl: Duration) -> Self {
        Self {
            store,
            key: key.into(),
            ttl,
        }
    }

    /// Builds a cache using the slot name and TTL from `config`.
    pub fn from_config(store: Arc<dyn KeyValueStore>, config: &Config) -> Self {
        Self::new(store, config.cache_key.clone(), config.cache_ttl())
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the stored entry, or `None` if nothing usable was ever written.
    pub async fn read(&self) -> Option<CacheEntry> {
        let raw = match self.store.get(&self.key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "Failed to read feed cache, treating as miss");
                return None;
            }
        };

        match serde_json::from_str::<CacheEntry>(&raw) {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "Discarding malformed feed cache entry");
                None
            }
        }
    }

    /// Overwrites the slot with `payload` stamped at `now_ms`.
    pub async fn write(&self, payload: &str, now_ms: i64) -> Result<(), StoreError> {
        let entry = CacheEntry {
            fetched_at_ms: now_ms,
            raw_payload: payload.to_string(),
        };
        let encoded = serde_json::to_string(&entry)?;
        self.store.set(&self.key, &encoded).await?;
        tracing::debug!(key = %self.key, bytes = payload.len(), "Feed cache updated");
        Ok(())
    }

    /// Empties the slot.
    pub async fn clear(&self) -> Result<(), StoreError> {
        self.store.remove(&self.key).await
    }

    /// [`is_fresh`] against this cache's TTL.
    pub fn is_fresh(&self, entry: &CacheEntry, now_ms: i64) -> bool {
        is_fresh(entry, now_ms, self.ttl)
    }
}
