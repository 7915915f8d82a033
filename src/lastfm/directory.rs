use super::api::{parse_registration_year, user_info_url};
use super::parsing::parse_start_year;
use super::AccountDirectory;
use crate::cache::{CacheBackend, CachePolicy, Cached};
use crate::error::{StatsError, StatsResult};
use crate::fetch::HttpFetcher;
use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use std::sync::Arc;
use tracing::debug;

lazy_static! {
    // 2 to 15 characters, leading letter
    static ref USERNAME: Regex = Regex::new(r"^[a-zA-Z][a-zA-Z0-9_-]{1,14}$").expect("valid regex");
}

pub fn is_valid_username(username: &str) -> bool {
    USERNAME.is_match(username)
}

struct ApiAccess {
    base_url: String,
    api_key: String,
}

/// Answers account questions from last.fm profile pages, or from
/// `user.getinfo` when API access is configured.
///
/// Existence checks are memoized in a volatile backend for a day; start years
/// never change and go to the durable cache.
pub struct LastFmDirectory {
    fetcher: Arc<dyn HttpFetcher>,
    web_base_url: String,
    api: Option<ApiAccess>,
    exists: Cached,
    start_year: Cached,
}

impl LastFmDirectory {
    pub fn new(
        fetcher: Arc<dyn HttpFetcher>,
        web_base_url: impl Into<String>,
        memo: Arc<dyn CacheBackend>,
        durable: Arc<dyn CacheBackend>,
    ) -> Self {
        Self {
            fetcher,
            web_base_url: web_base_url.into(),
            api: None,
            exists: Cached::new(memo, "username_exists", CachePolicy::Days(1)),
            start_year: Cached::new(durable, "account_start_year", CachePolicy::Forever),
        }
    }

    pub fn with_api(mut self, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        self.api = Some(ApiAccess {
            base_url: base_url.into(),
            api_key: api_key.into(),
        });
        self
    }

    fn profile_url(&self, username: &str) -> String {
        format!(
            "{}/user/{}",
            self.web_base_url,
            urlencoding::encode(username)
        )
    }

    async fn lookup_start_year(&self, username: &str) -> StatsResult<String> {
        let year = match &self.api {
            Some(api) => {
                let body = self
                    .fetcher
                    .get_text(&user_info_url(&api.base_url, &api.api_key, username))
                    .await?;
                parse_registration_year(&body)?
            }
            None => {
                let page = self.fetcher.get_text(&self.profile_url(username)).await?;
                parse_start_year(&page).ok_or_else(|| {
                    StatsError::Parse(format!("no start year on profile of {}", username))
                })?
            }
        };
        Ok(year.to_string())
    }
}

#[async_trait]
impl AccountDirectory for LastFmDirectory {
    async fn username_exists(&self, username: &str) -> StatsResult<bool> {
        if !is_valid_username(username) {
            debug!("Rejecting malformed username {:?}", username);
            return Ok(false);
        }

        let value = self
            .exists
            .get_or_compute(&[username], || async {
                let url = self.profile_url(username);
                match self.fetcher.get_status(&url).await? {
                    200 => Ok("true".to_string()),
                    404 => Ok("false".to_string()),
                    status => Err(StatsError::UpstreamHttp { status, url }),
                }
            })
            .await?;
        Ok(value == "true")
    }

    async fn account_start_year(&self, username: &str) -> StatsResult<i32> {
        let value = self
            .start_year
            .get_or_compute(&[username], || self.lookup_start_year(username))
            .await?;
        value
            .trim()
            .parse()
            .map_err(|_| StatsError::Parse(format!("bad cached start year {:?}", value)))
    }
}
