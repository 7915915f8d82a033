//! Scraping transport: last.fm's public HTML pages.

use super::parsing::{parse_album_page, parse_library_chart};
use super::{AlbumMetadataSource, AlbumPage, ChartSource};
use crate::error::StatsResult;
use crate::fetch::{FetchError, HttpFetcher};
use crate::period::{ChartRange, Preset};
use crate::stats::RawAlbumEntry;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Path segment encoding used by last.fm music URLs: spaces become `+`,
/// everything else reserved is percent-encoded.
fn music_path_segment(name: &str) -> String {
    name.split(' ')
        .map(|part| urlencoding::encode(part).into_owned())
        .collect::<Vec<_>>()
        .join("+")
}

pub fn library_url(base_url: &str, username: &str, range: &ChartRange) -> String {
    let query = match range {
        ChartRange::Preset(Preset::AllTime) => "date_preset=ALL".to_string(),
        ChartRange::Preset(preset) => {
            format!("date_preset=LAST_{}_DAYS", preset.days().unwrap_or_default())
        }
        ChartRange::Interval { from, to } => format!(
            "from={}&to={}",
            from.format("%Y-%m-%d"),
            to.format("%Y-%m-%d")
        ),
    };
    format!(
        "{}/user/{}/library/albums?{}",
        base_url,
        urlencoding::encode(username),
        query
    )
}

pub fn album_url(base_url: &str, artist: &str, album: &str) -> String {
    format!(
        "{}/music/{}/{}",
        base_url,
        music_path_segment(artist),
        music_path_segment(album)
    )
}

pub struct WebChartSource {
    fetcher: Arc<dyn HttpFetcher>,
    base_url: String,
    max_items: usize,
}

impl WebChartSource {
    pub fn new(fetcher: Arc<dyn HttpFetcher>, base_url: impl Into<String>, max_items: usize) -> Self {
        Self {
            fetcher,
            base_url: base_url.into(),
            max_items,
        }
    }
}

#[async_trait]
impl ChartSource for WebChartSource {
    async fn fetch_chart(
        &self,
        username: &str,
        range: &ChartRange,
    ) -> StatsResult<Vec<RawAlbumEntry>> {
        let url = library_url(&self.base_url, username, range);
        debug!("Scraping {}", url);
        let page = self.fetcher.get_text(&url).await?;
        Ok(parse_library_chart(&page, self.max_items))
    }
}

pub struct WebAlbumMetadata {
    fetcher: Arc<dyn HttpFetcher>,
    base_url: String,
}

impl WebAlbumMetadata {
    pub fn new(fetcher: Arc<dyn HttpFetcher>, base_url: impl Into<String>) -> Self {
        Self {
            fetcher,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl AlbumMetadataSource for WebAlbumMetadata {
    async fn album_page(&self, artist: &str, album: &str) -> Result<AlbumPage, FetchError> {
        let url = album_url(&self.base_url, artist, album);
        debug!("Fetching album details from {}", url);
        let page = self.fetcher.get_text(&url).await?;
        Ok(parse_album_page(&page))
    }
}
