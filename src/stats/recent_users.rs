use crate::cache::{CacheBackend, CacheError, CachePolicy, Cached};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

pub const RECENT_USERS_NAMESPACE: &str = "recent_users";

/// How many distinct users are remembered.
pub const MAX_RECENT_USERS: usize = 10;

const LIST_KEY: [&str; 1] = ["latest"];

/// Users whose stats were looked up lately, most recent first, stored in the
/// durable cache as one username per line.
pub struct RecentUsers {
    cache: Cached,
    write_lock: Mutex<()>,
}

impl RecentUsers {
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self {
            cache: Cached::new(backend, RECENT_USERS_NAMESPACE, CachePolicy::Forever),
            write_lock: Mutex::new(()),
        }
    }

    pub fn list(&self) -> Vec<String> {
        self.cache
            .lookup(&LIST_KEY)
            .map(|value| {
                value
                    .lines()
                    .filter(|line| !line.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Moves `username` to the front, dropping the oldest entries beyond
    /// [`MAX_RECENT_USERS`].
    pub async fn record(&self, username: &str) -> Result<(), CacheError> {
        let _guard = self.write_lock.lock().await;

        let mut users = self.list();
        if users.first().map(String::as_str) == Some(username) {
            return Ok(());
        }
        users.retain(|user| user != username);
        users.insert(0, username.to_string());
        users.truncate(MAX_RECENT_USERS);

        debug!("Recent users: {}", users.join(", "));
        self.cache.store(&LIST_KEY, &users.join("\n"))
    }
}
