use super::average::MIN_ALBUM_TRACKS;
use super::{AlbumDetails, AverageTrackCount};
use crate::cache::{CacheBackend, CacheError, CachePolicy, Cached};
use crate::error::StatsResult;
use crate::fetch::FetchError;
use crate::lastfm::AlbumMetadataSource;
use std::sync::Arc;
use tracing::{debug, warn};

pub const ALBUM_DETAILS_NAMESPACE: &str = "album_details";

/// Track count and cover for an album, cached forever.
///
/// Albums whose length is unknown, or that look like singles, get the
/// current average track count, marked as estimated. An album page that
/// doesn't exist is remembered as such; other HTTP failures fall back to the
/// average without being cached, so the album is looked up again next time.
pub struct AlbumDetailsProvider {
    source: Arc<dyn AlbumMetadataSource>,
    backend: Arc<dyn CacheBackend>,
    cache: Cached,
    average: Arc<AverageTrackCount>,
}

impl AlbumDetailsProvider {
    pub fn new(
        source: Arc<dyn AlbumMetadataSource>,
        backend: Arc<dyn CacheBackend>,
        average: Arc<AverageTrackCount>,
    ) -> Self {
        Self {
            source,
            cache: Cached::new(backend.clone(), ALBUM_DETAILS_NAMESPACE, CachePolicy::Forever),
            backend,
            average,
        }
    }

    pub fn average(&self) -> &AverageTrackCount {
        &self.average
    }

    pub fn cache(&self) -> &Cached {
        &self.cache
    }

    /// Recomputes the fallback track count from every cached album.
    pub fn recompute_average(&self) -> Result<u32, CacheError> {
        self.average
            .recompute(self.backend.as_ref(), ALBUM_DETAILS_NAMESPACE)
    }

    pub async fn details(&self, artist: &str, album: &str) -> StatsResult<AlbumDetails> {
        let args = [artist, album];
        if let Some(value) = self.cache.lookup(&args) {
            match AlbumDetails::decode(&value) {
                Some(details) => return Ok(details),
                None => warn!("Discarding malformed album details {:?} for {} - {}", value, artist, album),
            }
        }

        let (details, cacheable) = match self.source.album_page(artist, album).await {
            Ok(page) => {
                let cover_url = page.cover_url.unwrap_or_default();
                let details = match page.track_count.filter(|count| *count > MIN_ALBUM_TRACKS) {
                    Some(track_count) => AlbumDetails::new(track_count, cover_url),
                    None => AlbumDetails::estimated(self.average.get(), cover_url),
                };
                (details, true)
            }
            Err(FetchError::Status { status: 404, .. }) => {
                debug!("No album page for {} - {}", artist, album);
                (AlbumDetails::estimated(self.average.get(), ""), true)
            }
            Err(FetchError::Status { status, url }) => {
                warn!("HTTP {} from {}, using average track count", status, url);
                (AlbumDetails::estimated(self.average.get(), ""), false)
            }
            Err(e) => return Err(e.into()),
        };

        if cacheable {
            if let Err(e) = self.cache.store(&args, &details.encode()) {
                warn!("Failed to cache album details for {} - {}: {}", artist, album, e);
            }
        }
        Ok(details)
    }
}
