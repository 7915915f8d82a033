//! In-memory stand-ins for last.fm
//!
//! Every user gets the same chart regardless of the requested range, which
//! keeps expected values easy to compute.

use super::constants::*;
use albumscrobbles::error::{StatsError, StatsResult};
use albumscrobbles::fetch::FetchError;
use albumscrobbles::lastfm::{AccountDirectory, AlbumMetadataSource, AlbumPage, ChartSource};
use albumscrobbles::period::ChartRange;
use albumscrobbles::stats::RawAlbumEntry;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub struct FakeCharts {
    charts: HashMap<String, Vec<RawAlbumEntry>>,
    requests: AtomicUsize,
    ranges: Mutex<Vec<ChartRange>>,
}

impl FakeCharts {
    pub fn new() -> Self {
        let test_chart = vec![
            RawAlbumEntry::new(LONG_ALBUM, LONG_ALBUM_ARTIST, LONG_ALBUM_SCROBBLES, 1),
            RawAlbumEntry::new(SHORT_ALBUM, SHORT_ALBUM_ARTIST, SHORT_ALBUM_SCROBBLES, 2),
            RawAlbumEntry::new(MISSING_ALBUM, MISSING_ALBUM_ARTIST, MISSING_ALBUM_SCROBBLES, 3),
        ];
        Self {
            charts: HashMap::from([
                (TEST_USER.to_string(), test_chart.clone()),
                (NEW_USER.to_string(), test_chart),
                (SILENT_USER.to_string(), Vec::new()),
            ]),
            requests: AtomicUsize::new(0),
            ranges: Mutex::new(Vec::new()),
        }
    }

    /// Number of chart requests that reached "last.fm"
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    pub fn requested_ranges(&self) -> Vec<ChartRange> {
        self.ranges.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChartSource for FakeCharts {
    async fn fetch_chart(
        &self,
        username: &str,
        range: &ChartRange,
    ) -> StatsResult<Vec<RawAlbumEntry>> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        self.ranges.lock().unwrap().push(*range);
        self.charts
            .get(username)
            .cloned()
            .ok_or_else(|| StatsError::NotFound(format!("User {} not found", username)))
    }
}

pub struct FakeAlbumPages {
    pages: HashMap<(String, String), AlbumPage>,
}

impl FakeAlbumPages {
    pub fn new() -> Self {
        let key = |artist: &str, album: &str| (artist.to_string(), album.to_string());
        Self {
            pages: HashMap::from([
                (
                    key(LONG_ALBUM_ARTIST, LONG_ALBUM),
                    AlbumPage {
                        track_count: Some(LONG_ALBUM_TRACKS),
                        cover_url: None,
                    },
                ),
                (
                    key(SHORT_ALBUM_ARTIST, SHORT_ALBUM),
                    AlbumPage {
                        track_count: Some(SHORT_ALBUM_TRACKS),
                        cover_url: Some(SHORT_ALBUM_COVER.to_string()),
                    },
                ),
            ]),
        }
    }
}

#[async_trait]
impl AlbumMetadataSource for FakeAlbumPages {
    async fn album_page(&self, artist: &str, album: &str) -> Result<AlbumPage, FetchError> {
        self.pages
            .get(&(artist.to_string(), album.to_string()))
            .cloned()
            .ok_or_else(|| FetchError::Status {
                url: format!("{}/music/{}/{}", LASTFM_URL, artist, album),
                status: 404,
            })
    }
}

pub struct FakeDirectory {
    start_years: HashMap<String, i32>,
}

impl FakeDirectory {
    pub fn new() -> Self {
        Self {
            start_years: HashMap::from([
                (TEST_USER.to_string(), TEST_USER_START_YEAR),
                (SILENT_USER.to_string(), TEST_USER_START_YEAR),
                (NEW_USER.to_string(), TODAY.0),
            ]),
        }
    }
}

#[async_trait]
impl AccountDirectory for FakeDirectory {
    async fn username_exists(&self, username: &str) -> StatsResult<bool> {
        Ok(self.start_years.contains_key(username))
    }

    async fn account_start_year(&self, username: &str) -> StatsResult<i32> {
        self.start_years
            .get(username)
            .copied()
            .ok_or_else(|| StatsError::NotFound(format!("User {} not found", username)))
    }
}
