use super::AlbumDetails;
use crate::cache::{CacheBackend, CacheError};
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::info;

pub const DEFAULT_AVERAGE_TRACK_COUNT: u32 = 12;

/// Albums with this many tracks or fewer are singles or EPs and say nothing
/// about album length.
pub const MIN_ALBUM_TRACKS: u32 = 2;

/// Fallback track count for albums whose length is unknown.
#[derive(Debug)]
pub struct AverageTrackCount {
    value: AtomicU32,
}

impl Default for AverageTrackCount {
    fn default() -> Self {
        Self::new(DEFAULT_AVERAGE_TRACK_COUNT)
    }
}

impl AverageTrackCount {
    pub fn new(value: u32) -> Self {
        Self {
            value: AtomicU32::new(value),
        }
    }

    pub fn get(&self) -> u32 {
        self.value.load(Ordering::Relaxed)
    }

    /// Rounded mean of the real album lengths stored in `namespace`. Estimated
    /// entries are skipped. Keeps the current value when there are none.
    pub fn recompute(&self, backend: &dyn CacheBackend, namespace: &str) -> Result<u32, CacheError> {
        let counts: Vec<u32> = backend
            .values(namespace)?
            .iter()
            .filter_map(|value| AlbumDetails::decode(value))
            .filter(|details| !details.estimated)
            .map(|details| details.track_count)
            .filter(|count| *count > MIN_ALBUM_TRACKS)
            .collect();

        if counts.is_empty() {
            return Ok(self.get());
        }

        let sum: u64 = counts.iter().map(|c| *c as u64).sum();
        let average = (sum as f64 / counts.len() as f64).round() as u32;
        info!(
            "Average track count is {} over {} albums",
            average,
            counts.len()
        );
        self.value.store(average, Ordering::Relaxed);
        Ok(average)
    }
}
