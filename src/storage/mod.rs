mod feed_cache;
mod kv;
mod schema;
mod types;

pub use feed_cache::{is_fresh, FeedCache};
pub use kv::{KeyValueStore, MemoryStore};
pub use schema::SqliteStore;
pub use types::{CacheEntry, StoreError};
