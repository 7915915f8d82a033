//! String-keyed result cache.
//!
//! A [`CacheBackend`] stores string values under a [`CacheKey`]. Expiry is
//! checked lazily on read: a stale entry is deleted and reported as missing.
//! [`FileCache`] is durable and shared between processes, [`MemoryCache`] is
//! volatile and process-local. Call sites go through [`Cached`], which pairs
//! a backend with a namespace and a [`CachePolicy`].

mod cached;
mod file_cache;
mod key;
mod memory_cache;

pub use cached::{CachePolicy, Cached};
pub use file_cache::FileCache;
pub use key::{CacheKey, MAX_NAME_BYTES};
pub use memory_cache::MemoryCache;

use chrono::{DateTime, Utc};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache entry not found")]
    NotFound,

    #[error("cache I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub trait CacheBackend: Send + Sync {
    /// Returns the stored value, or [`CacheError::NotFound`] when there is no
    /// entry or the entry is older than `ttl`. Stale entries are removed.
    fn get(&self, key: &CacheKey, ttl: Option<Duration>) -> Result<String, CacheError>;

    fn put(&self, key: &CacheKey, value: &str) -> Result<(), CacheError>;

    /// All values currently stored in `namespace`, regardless of age.
    fn values(&self, namespace: &str) -> Result<Vec<String>, CacheError>;
}

pub(crate) fn is_expired(written_at: DateTime<Utc>, now: DateTime<Utc>, ttl: Duration) -> bool {
    match chrono::Duration::from_std(ttl) {
        Ok(ttl) => now - written_at > ttl,
        Err(_) => false,
    }
}
