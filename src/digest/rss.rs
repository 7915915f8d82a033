use crate::period::CalendarPeriod;
use chrono::{Datelike, NaiveDate, NaiveTime, Weekday};
use rss::{ChannelBuilder, Item, ItemBuilder};

/// How far back the feed looks for published digests.
pub const FEED_DAYS: i64 = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedItem {
    pub title: String,
    pub link: String,
    pub description: String,
    pub published: NaiveDate,
}

/// Digests published in the [`FEED_DAYS`] days before `today`, oldest
/// first: a yearly one on January 1st, a monthly one on the 1st of each
/// month and a weekly one every Monday, each covering the period that ended
/// the day before.
pub fn feed_schedule(today: NaiveDate) -> Vec<(NaiveDate, CalendarPeriod)> {
    let mut schedule = Vec::new();
    for days_ago in (1..=FEED_DAYS).rev() {
        let day = today - chrono::Duration::days(days_ago);
        let yesterday = day - chrono::Duration::days(1);

        if day.month() == 1 && day.day() == 1 {
            schedule.push((day, CalendarPeriod::year(yesterday.year())));
        }
        if day.day() == 1 {
            schedule.push((day, CalendarPeriod::month(yesterday.year(), yesterday.month())));
        }
        if day.weekday() == Weekday::Mon {
            let week = yesterday.iso_week();
            schedule.push((day, CalendarPeriod::week(week.year(), week.week())));
        }
    }
    schedule
}

/// RSS 2.0 document for `username`'s digests.
pub fn render_feed(username: &str, public_url: &str, items: &[FeedItem]) -> String {
    let items: Vec<Item> = items
        .iter()
        .map(|item| {
            ItemBuilder::default()
                .title(item.title.clone())
                .link(item.link.clone())
                .description(item.description.clone())
                .pub_date(item.published.and_time(NaiveTime::MIN).and_utc().to_rfc2822())
                .build()
        })
        .collect();

    ChannelBuilder::default()
        .title(format!("Albumscrobbles feed for {}", username))
        .link(format!(
            "{}/v1/feed/{}",
            public_url,
            urlencoding::encode(username)
        ))
        .description("Your real album stats per week, month and year.")
        .items(items)
        .build()
        .to_string()
}
