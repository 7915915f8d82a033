//! last.fm access.
//!
//! Three seams separate the stats pipeline from last.fm:
//! - [`ChartSource`]: ranked albums for a user and range, either scraped
//!   from the library page ([`WebChartSource`]) or read from the JSON API
//!   ([`ApiChartSource`]).
//! - [`AlbumMetadataSource`]: track count and cover for an album.
//! - [`AccountDirectory`]: username existence and account start year.

mod api;
mod directory;
pub mod parsing;
mod web;

pub use api::ApiChartSource;
pub use directory::{is_valid_username, LastFmDirectory};
pub use web::{album_url, library_url, WebAlbumMetadata, WebChartSource};

use crate::error::StatsResult;
use crate::fetch::FetchError;
use crate::period::ChartRange;
use crate::stats::RawAlbumEntry;
use async_trait::async_trait;

pub const DEFAULT_WEB_BASE_URL: &str = "https://www.last.fm";
pub const DEFAULT_API_BASE_URL: &str = "https://ws.audioscrobbler.com/2.0/";

/// Upstream ranked album chart.
#[async_trait]
pub trait ChartSource: Send + Sync {
    /// Entries in upstream order. An unknown user is `StatsError::NotFound`.
    async fn fetch_chart(&self, username: &str, range: &ChartRange)
        -> StatsResult<Vec<RawAlbumEntry>>;
}

/// What an album page says about the album. Either field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlbumPage {
    pub track_count: Option<u32>,
    pub cover_url: Option<String>,
}

#[async_trait]
pub trait AlbumMetadataSource: Send + Sync {
    /// HTTP errors are returned as-is so the caller can choose a fallback.
    async fn album_page(&self, artist: &str, album: &str) -> Result<AlbumPage, FetchError>;
}

#[async_trait]
pub trait AccountDirectory: Send + Sync {
    async fn username_exists(&self, username: &str) -> StatsResult<bool>;

    /// Year of the account's first scrobble.
    async fn account_start_year(&self, username: &str) -> StatsResult<i32>;
}
