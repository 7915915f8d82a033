use super::{CacheBackend, CacheError, CacheKey};
use crate::server::metrics;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    Forever,
    Days(u32),
}

impl CachePolicy {
    pub fn ttl(&self) -> Option<Duration> {
        match self {
            CachePolicy::Forever => None,
            CachePolicy::Days(days) => Some(Duration::from_secs(*days as u64 * SECONDS_PER_DAY)),
        }
    }
}

/// A cached computation: one namespace, one expiry policy.
///
/// Values are strings; callers encode composite results themselves.
#[derive(Clone)]
pub struct Cached {
    backend: Arc<dyn CacheBackend>,
    namespace: &'static str,
    policy: CachePolicy,
}

impl Cached {
    pub fn new(backend: Arc<dyn CacheBackend>, namespace: &'static str, policy: CachePolicy) -> Self {
        Self {
            backend,
            namespace,
            policy,
        }
    }

    pub fn namespace(&self) -> &'static str {
        self.namespace
    }

    pub fn policy(&self) -> CachePolicy {
        self.policy
    }

    pub fn key<S: AsRef<str>>(&self, args: &[S]) -> CacheKey {
        CacheKey::new(self.namespace, args)
    }

    /// Cached value for `args`, if present and fresh. Unreadable entries count
    /// as misses.
    pub fn lookup<S: AsRef<str>>(&self, args: &[S]) -> Option<String> {
        let key = self.key(args);
        match self.backend.get(&key, self.policy.ttl()) {
            Ok(value) => {
                metrics::record_cache_lookup(self.namespace, "hit");
                Some(value)
            }
            Err(CacheError::NotFound) => {
                metrics::record_cache_lookup(self.namespace, "miss");
                None
            }
            Err(e) => {
                warn!("Unreadable cache entry {}: {}", key, e);
                metrics::record_cache_lookup(self.namespace, "error");
                None
            }
        }
    }

    pub fn store<S: AsRef<str>>(&self, args: &[S], value: &str) -> Result<(), CacheError> {
        self.backend.put(&self.key(args), value)
    }

    /// Returns the cached value for `args`, or runs `compute`, stores its
    /// result and returns it. Errors from `compute` are not cached. A failed
    /// write is logged; the computed value is still returned.
    pub async fn get_or_compute<S, F, Fut, E>(&self, args: &[S], compute: F) -> Result<String, E>
    where
        S: AsRef<str>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, E>>,
    {
        if let Some(value) = self.lookup(args) {
            return Ok(value);
        }

        let value = compute().await?;
        if let Err(e) = self.store(args, &value) {
            warn!("Failed to write cache entry {}: {}", self.key(args), e);
        }
        Ok(value)
    }
}
