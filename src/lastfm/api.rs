//! JSON API transport (`ws.audioscrobbler.com/2.0`).

use super::ChartSource;
use crate::error::{StatsError, StatsResult};
use crate::fetch::HttpFetcher;
use crate::period::{ChartRange, Preset};
use crate::stats::RawAlbumEntry;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

/// last.fm error code for an unknown user.
const ERROR_INVALID_RESOURCE: u32 = 6;

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::Many(items) => items,
            OneOrMany::One(item) => vec![item],
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TextOrNumber {
    Text(String),
    Number(u64),
}

impl TextOrNumber {
    fn into_text(self) -> String {
        match self {
            TextOrNumber::Text(s) => s,
            TextOrNumber::Number(n) => n.to_string(),
        }
    }
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: u32,
    message: String,
}

#[derive(Deserialize)]
struct TopAlbumsResponse {
    topalbums: AlbumList,
}

#[derive(Deserialize)]
struct WeeklyAlbumChartResponse {
    weeklyalbumchart: AlbumList,
}

#[derive(Deserialize)]
struct AlbumList {
    #[serde(default)]
    album: Option<OneOrMany<ApiAlbum>>,
}

#[derive(Deserialize)]
struct ApiAlbum {
    name: String,
    playcount: TextOrNumber,
    artist: ApiArtist,
    #[serde(rename = "@attr")]
    attr: RankAttr,
}

#[derive(Deserialize)]
struct ApiArtist {
    // gettopalbums uses `name`, getweeklyalbumchart uses `#text`
    #[serde(alias = "#text")]
    name: String,
}

#[derive(Deserialize)]
struct RankAttr {
    rank: TextOrNumber,
}

#[derive(Deserialize)]
struct UserInfoResponse {
    user: UserInfo,
}

#[derive(Deserialize)]
struct UserInfo {
    registered: Registered,
}

#[derive(Deserialize)]
struct Registered {
    unixtime: TextOrNumber,
}

pub fn api_period(preset: Preset) -> &'static str {
    match preset {
        Preset::Days7 => "7day",
        Preset::Days30 => "1month",
        Preset::Days90 => "3month",
        Preset::Days180 => "6month",
        Preset::Days365 => "12month",
        Preset::AllTime => "overall",
    }
}

fn unix_start_of(date: NaiveDate) -> i64 {
    date.and_time(NaiveTime::MIN).and_utc().timestamp()
}

fn check_api_error(body: &str) -> StatsResult<()> {
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(err) if err.error == ERROR_INVALID_RESOURCE => Err(StatsError::NotFound(err.message)),
        Ok(err) => Err(StatsError::Parse(format!(
            "last.fm API error {}: {}",
            err.error, err.message
        ))),
        Err(_) => Ok(()),
    }
}

fn into_entries(list: AlbumList, max_items: usize) -> StatsResult<Vec<RawAlbumEntry>> {
    let mut entries = Vec::new();
    for album in list.album.map(OneOrMany::into_vec).unwrap_or_default() {
        let rank: u32 = album
            .attr
            .rank
            .into_text()
            .parse()
            .map_err(|_| StatsError::Parse(format!("bad rank for {}", album.name)))?;
        if rank as usize > max_items {
            continue;
        }
        entries.push(RawAlbumEntry::new(
            album.name,
            album.artist.name,
            album.playcount.into_text(),
            rank,
        ));
    }
    Ok(entries)
}

pub fn parse_top_albums(body: &str, max_items: usize) -> StatsResult<Vec<RawAlbumEntry>> {
    check_api_error(body)?;
    let response: TopAlbumsResponse = serde_json::from_str(body)?;
    into_entries(response.topalbums, max_items)
}

pub fn parse_weekly_album_chart(body: &str, max_items: usize) -> StatsResult<Vec<RawAlbumEntry>> {
    check_api_error(body)?;
    let response: WeeklyAlbumChartResponse = serde_json::from_str(body)?;
    into_entries(response.weeklyalbumchart, max_items)
}

pub fn parse_registration_year(body: &str) -> StatsResult<i32> {
    use chrono::Datelike;

    check_api_error(body)?;
    let response: UserInfoResponse = serde_json::from_str(body)?;
    let unixtime: i64 = response
        .user
        .registered
        .unixtime
        .into_text()
        .parse()
        .map_err(|_| StatsError::Parse("bad registration time".to_string()))?;
    chrono::DateTime::from_timestamp(unixtime, 0)
        .map(|t| t.year())
        .ok_or_else(|| StatsError::Parse(format!("registration time out of range: {}", unixtime)))
}

pub fn user_info_url(base_url: &str, api_key: &str, username: &str) -> String {
    format!(
        "{}?method=user.getinfo&user={}&api_key={}&format=json",
        base_url,
        urlencoding::encode(username),
        api_key
    )
}

pub struct ApiChartSource {
    fetcher: Arc<dyn HttpFetcher>,
    base_url: String,
    api_key: String,
    max_items: usize,
}

impl ApiChartSource {
    pub fn new(
        fetcher: Arc<dyn HttpFetcher>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        max_items: usize,
    ) -> Self {
        Self {
            fetcher,
            base_url: base_url.into(),
            api_key: api_key.into(),
            max_items,
        }
    }

    pub fn chart_url(&self, username: &str, range: &ChartRange) -> String {
        let user = urlencoding::encode(username);
        match range {
            ChartRange::Preset(preset) => format!(
                "{}?method=user.gettopalbums&user={}&api_key={}&period={}&format=json&limit={}",
                self.base_url,
                user,
                self.api_key,
                api_period(*preset),
                self.max_items
            ),
            ChartRange::Interval { from, to } => format!(
                "{}?method=user.getweeklyalbumchart&user={}&api_key={}&from={}&to={}&format=json",
                self.base_url,
                user,
                self.api_key,
                unix_start_of(*from),
                unix_start_of(*to + chrono::Duration::days(1)),
            ),
        }
    }
}

#[async_trait]
impl ChartSource for ApiChartSource {
    async fn fetch_chart(
        &self,
        username: &str,
        range: &ChartRange,
    ) -> StatsResult<Vec<RawAlbumEntry>> {
        let url = self.chart_url(username, range);
        debug!("Querying last.fm API for {} ({})", username, range);
        let body = self.fetcher.get_text(&url).await?;
        match range {
            ChartRange::Preset(_) => parse_top_albums(&body, self.max_items),
            ChartRange::Interval { .. } => parse_weekly_album_chart(&body, self.max_items),
        }
    }
}
