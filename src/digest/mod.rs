//! Periodic digests: the text sent to subscribers and the RSS feed built
//! from the same content.

mod rss;

pub use rss::{feed_schedule, render_feed, FeedItem, FEED_DAYS};

use crate::error::{StatsError, StatsResult};
use crate::period::{most_recent_period, CalendarPeriod, PeriodKind};
use crate::stats::StatsService;
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Digest {
    pub subject: String,
    pub permalink: String,
    pub lastfm_link: String,
    pub body: String,
}

impl Digest {
    /// Plain text e-mail body.
    pub fn email_text(&self) -> String {
        format!(
            "{}.\n\n{}\n\nFor more information go to\n- {}\n- or {}\n",
            self.subject, self.body, self.permalink, self.lastfm_link
        )
    }

    /// HTML used as the RSS item description.
    pub fn html(&self) -> String {
        let link = |url: &str| format!("<a href=\"{}\">{}</a>", url, url);
        format!(
            "{}<br><br>For more information go to<br>- {}<br>- or {}",
            self.body.replace('\n', "<br>"),
            link(&self.permalink),
            link(&self.lastfm_link)
        )
    }
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// How a period is named in a digest subject: "week 5", "March", "2021".
pub fn period_label(period: &CalendarPeriod) -> String {
    match (period.month, period.week) {
        (_, Some(week)) => format!("week {}", week),
        (Some(month), None) => NaiveDate::from_ymd_opt(period.year, month, 1)
            .map(|d| d.format("%B").to_string())
            .unwrap_or_else(|| month.to_string()),
        (None, None) => period.year.to_string(),
    }
}

pub fn permalink(public_url: &str, username: &str, period: &CalendarPeriod) -> String {
    let mut link = format!(
        "{}/v1/stat?username={}&year={}",
        public_url,
        urlencoding::encode(username),
        period.year
    );
    if let Some(month) = period.month {
        link.push_str(&format!("&month={}", month));
    }
    if let Some(week) = period.week {
        link.push_str(&format!("&week={}", week));
    }
    link
}

pub struct DigestBuilder {
    stats: Arc<StatsService>,
    public_url: String,
    lastfm_base_url: String,
}

impl DigestBuilder {
    pub fn new(
        stats: Arc<StatsService>,
        public_url: impl Into<String>,
        lastfm_base_url: impl Into<String>,
    ) -> Self {
        Self {
            stats,
            public_url: public_url.into().trim_end_matches('/').to_string(),
            lastfm_base_url: lastfm_base_url.into(),
        }
    }

    pub async fn digest_for(&self, username: &str, period: CalendarPeriod) -> StatsResult<Digest> {
        let kind = period.kind();
        let stats = self.stats.period_stats(username, period).await?;

        let body = match stats.first() {
            Some(top) => format!(
                "Your top album last {} was\n    {} by {}",
                kind, top.album_name, top.artist_name
            ),
            None => format!("You didn't listen to any music last {}!", kind),
        };

        Ok(Digest {
            subject: format!(
                "{}, here are your real album stats for {}",
                capitalize(username),
                period_label(&period)
            ),
            permalink: permalink(&self.public_url, username, &period),
            lastfm_link: format!(
                "{}/user/{}/listening-report/{}",
                self.lastfm_base_url,
                urlencoding::encode(username),
                kind
            ),
            body,
        })
    }

    /// Digest for the last complete period of `kind`.
    pub async fn latest(&self, username: &str, kind: PeriodKind) -> StatsResult<Digest> {
        let period = most_recent_period(kind, self.stats.clock().today());
        self.digest_for(username, period).await
    }

    /// RSS document with one item per digest published in the last
    /// [`FEED_DAYS`] days. Periods the account cannot have data for are left
    /// out.
    pub async fn feed(&self, username: &str) -> StatsResult<String> {
        let today = self.stats.clock().today();
        let mut items = Vec::new();

        for (published, period) in feed_schedule(today) {
            let digest = match self.digest_for(username, period).await {
                Ok(digest) => digest,
                Err(StatsError::Validation(reason)) => {
                    debug!("No feed item for {}: {}", period, reason);
                    continue;
                }
                Err(e) => return Err(e),
            };
            items.push(FeedItem {
                title: digest.subject.clone(),
                link: digest.permalink.clone(),
                description: digest.html(),
                published,
            });
        }

        Ok(render_feed(username, &self.public_url, &items))
    }
}
