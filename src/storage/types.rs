use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Errors raised by key-value storage backends and the feed cache.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Another process holds the cache database
    #[error("Cache database is locked by another process")]
    Locked,

    /// Schema setup failed
    #[error("Cache migration failed: {0}")]
    Migration(String),

    /// Generic database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A cache entry could not be encoded or decoded
    #[error("Malformed cache entry: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Check if a sqlx error indicates database locking
    pub(crate) fn from_sqlx(err: sqlx::Error) -> Self {
        let error_string = err.to_string().to_lowercase();

        // SQLITE_BUSY (5): database is locked
        // SQLITE_LOCKED (6): database table is locked
        if error_string.contains("database is locked")
            || error_string.contains("database table is locked")
            || error_string.contains("sqlite_busy")
            || error_string.contains("sqlite_locked")
        {
            return StoreError::Locked;
        }

        StoreError::Database(err)
    }
}

// ============================================================================
// Cache Types
// ============================================================================

/// The single cached feed payload.
///
/// Serialized as `{"time": <epoch millis>, "data": "<raw xml>"}` so the slot
/// stays readable by anything else that shares the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// When the payload was fetched, in milliseconds since the Unix epoch
    #[serde(rename = "time")]
    pub fetched_at_ms: i64,
    /// Feed body exactly as received
    #[serde(rename = "data")]
    pub raw_payload: String,
}
