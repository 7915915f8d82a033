use super::{is_expired, CacheBackend, CacheError, CacheKey};
use crate::clock::Clock;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Process-local backend, used for memoizing cheap lookups such as username
/// existence checks.
pub struct MemoryCache {
    entries: Mutex<HashMap<CacheKey, (String, DateTime<Utc>)>>,
    clock: Arc<dyn Clock>,
}

impl MemoryCache {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
        }
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CacheBackend for MemoryCache {
    fn get(&self, key: &CacheKey, ttl: Option<Duration>) -> Result<String, CacheError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let (value, written_at) = entries.get(key).cloned().ok_or(CacheError::NotFound)?;

        if let Some(ttl) = ttl {
            if is_expired(written_at, self.clock.now(), ttl) {
                entries.remove(key);
                return Err(CacheError::NotFound);
            }
        }
        Ok(value)
    }

    fn put(&self, key: &CacheKey, value: &str) -> Result<(), CacheError> {
        let now = self.clock.now();
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.clone(), (value.to_string(), now));
        Ok(())
    }

    fn values(&self, namespace: &str) -> Result<Vec<String>, CacheError> {
        let namespace = CacheKey::new::<&str>(namespace, &[]);
        Ok(self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(key, _)| key.namespace() == namespace.namespace())
            .map(|(_, (value, _))| value.clone())
            .collect())
    }
}
