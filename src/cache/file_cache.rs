use super::{is_expired, CacheBackend, CacheError, CacheKey};
use crate::clock::Clock;
use chrono::{DateTime, Utc};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tempfile::NamedTempFile;
use tracing::debug;

/// Prefix `tempfile` gives to in-flight writes; never a committed entry.
const TEMP_PREFIX: &str = ".tmp";

/// Durable backend laid out as `{root}/{namespace}/{name}`, one file per
/// entry holding the raw value. The file's modification time is the entry's
/// write time, stamped from the cache's clock rather than the filesystem's.
pub struct FileCache {
    root: PathBuf,
    clock: Arc<dyn Clock>,
}

impl FileCache {
    pub fn new(root: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Self {
        Self {
            root: root.into(),
            clock,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.root.join(key.namespace()).join(key.name())
    }
}

impl CacheBackend for FileCache {
    fn get(&self, key: &CacheKey, ttl: Option<Duration>) -> Result<String, CacheError> {
        let path = self.path_for(key);

        let metadata = match fs::metadata(&path) {
            Ok(m) => m,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(CacheError::NotFound),
            Err(e) => return Err(e.into()),
        };

        if let Some(ttl) = ttl {
            let written_at: DateTime<Utc> = metadata.modified()?.into();
            if is_expired(written_at, self.clock.now(), ttl) {
                debug!("Cache entry {} expired (written at {})", key, written_at);
                match fs::remove_file(&path) {
                    Ok(()) => {}
                    Err(e) if e.kind() == ErrorKind::NotFound => {}
                    Err(e) => return Err(e.into()),
                }
                return Err(CacheError::NotFound);
            }
        }

        match fs::read_to_string(&path) {
            Ok(value) => Ok(value),
            // Removed by another process between stat and read
            Err(e) if e.kind() == ErrorKind::NotFound => Err(CacheError::NotFound),
            Err(e) => Err(e.into()),
        }
    }

    fn put(&self, key: &CacheKey, value: &str) -> Result<(), CacheError> {
        let dir = self.root.join(key.namespace());
        fs::create_dir_all(&dir)?;

        // Readers only ever see the old file or the complete new one.
        let mut tmp = NamedTempFile::new_in(&dir)?;
        tmp.write_all(value.as_bytes())?;
        tmp.flush()?;
        tmp.as_file()
            .set_modified(SystemTime::from(self.clock.now()))?;
        tmp.persist(dir.join(key.name()))
            .map_err(|e| CacheError::Io(e.error))?;
        Ok(())
    }

    fn values(&self, namespace: &str) -> Result<Vec<String>, CacheError> {
        let dir = self.root.join(CacheKey::new::<&str>(namespace, &[]).namespace());
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut values = Vec::new();
        for entry in entries {
            let entry = entry?;
            if entry.file_name().to_string_lossy().starts_with(TEMP_PREFIX) {
                continue;
            }
            match fs::read_to_string(entry.path()) {
                Ok(value) => values.push(value),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => debug!("Skipping unreadable cache file {:?}: {}", entry.path(), e),
            }
        }
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use tempfile::TempDir;

    fn make_cache() -> (FileCache, Arc<ManualClock>, TempDir) {
        let dir = TempDir::new().unwrap();
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let cache = FileCache::new(dir.path(), clock.clone());
        (cache, clock, dir)
    }

    #[test]
    fn put_then_get_returns_value() {
        let (cache, _clock, _dir) = make_cache();
        let key = CacheKey::new("album_details", &["Björk", "Homogenic"]);

        cache.put(&key, "10,https://img/x.png").unwrap();

        assert_eq!(cache.get(&key, None).unwrap(), "10,https://img/x.png");
        assert_eq!(
            cache.get(&key, Some(Duration::from_secs(60))).unwrap(),
            "10,https://img/x.png"
        );
    }

    #[test]
    fn stores_multiline_and_empty_values_exactly() {
        let (cache, _clock, _dir) = make_cache();
        let key = CacheKey::new("raw", &["a"]);
        let value = "[{\"a\": 1}]\n\ttrailing ";

        cache.put(&key, value).unwrap();
        assert_eq!(cache.get(&key, None).unwrap(), value);

        let empty_key = CacheKey::new("raw", &["b"]);
        cache.put(&empty_key, "").unwrap();
        assert_eq!(cache.get(&empty_key, None).unwrap(), "");
    }

    #[test]
    fn missing_entry_is_not_found() {
        let (cache, _clock, _dir) = make_cache();
        let key = CacheKey::new("album_details", &["nobody", "nothing"]);
        assert!(matches!(cache.get(&key, None), Err(CacheError::NotFound)));
    }

    #[test]
    fn expired_entry_is_deleted() {
        let (cache, clock, _dir) = make_cache();
        let key = CacheKey::new("album_stats_one_day", &["rj", "7"]);
        let one_day = Duration::from_secs(86_400);

        cache.put(&key, "[]").unwrap();
        assert_eq!(cache.get(&key, Some(one_day)).unwrap(), "[]");

        clock.advance(chrono::Duration::days(1) + chrono::Duration::minutes(1));

        assert!(matches!(
            cache.get(&key, Some(one_day)),
            Err(CacheError::NotFound)
        ));
        assert!(!cache.path_for(&key).exists());
    }

    #[test]
    fn expiry_follows_the_clock_not_the_filesystem() {
        let dir = TempDir::new().unwrap();
        let clock = Arc::new(ManualClock::at_date(
            chrono::NaiveDate::from_ymd_opt(2020, 3, 1).unwrap(),
        ));
        let cache = FileCache::new(dir.path(), clock.clone());
        let key = CacheKey::new("album_stats_one_day", &["rj", "7"]);
        let one_day = Duration::from_secs(86_400);

        cache.put(&key, "[]").unwrap();
        let written_at: DateTime<Utc> = fs::metadata(cache.path_for(&key))
            .unwrap()
            .modified()
            .unwrap()
            .into();
        assert_eq!(written_at, clock.now());

        clock.advance(chrono::Duration::hours(23));
        assert_eq!(cache.get(&key, Some(one_day)).unwrap(), "[]");

        clock.advance(chrono::Duration::hours(2));
        assert!(matches!(
            cache.get(&key, Some(one_day)),
            Err(CacheError::NotFound)
        ));
    }

    #[test]
    fn entries_without_ttl_never_expire() {
        let (cache, clock, _dir) = make_cache();
        let key = CacheKey::new("album_details", &["a", "b"]);

        cache.put(&key, "12,").unwrap();
        clock.advance(chrono::Duration::days(3650));

        assert_eq!(cache.get(&key, None).unwrap(), "12,");
    }

    #[test]
    fn overwrite_replaces_value() {
        let (cache, _clock, _dir) = make_cache();
        let key = CacheKey::new("album_details", &["a", "b"]);

        cache.put(&key, "12,").unwrap();
        cache.put(&key, "9,cover").unwrap();

        assert_eq!(cache.get(&key, None).unwrap(), "9,cover");
    }

    #[test]
    fn values_lists_namespace_contents() {
        let (cache, _clock, _dir) = make_cache();
        cache
            .put(&CacheKey::new("album_details", &["a", "b"]), "10,")
            .unwrap();
        cache
            .put(&CacheKey::new("album_details", &["c", "d"]), "14,x")
            .unwrap();
        cache.put(&CacheKey::new("other", &["e"]), "zzz").unwrap();

        let mut values = cache.values("album_details").unwrap();
        values.sort();
        assert_eq!(values, vec!["10,".to_string(), "14,x".to_string()]);

        assert!(cache.values("never_written").unwrap().is_empty());
    }
}
