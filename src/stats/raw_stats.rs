use super::RawAlbumEntry;
use crate::cache::{CacheBackend, CachePolicy, Cached};
use crate::clock::Clock;
use crate::error::StatsResult;
use crate::lastfm::ChartSource;
use crate::period::{ChartRange, Preset};
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{debug, warn};

/// Which cache an album chart lives in. Each tier has its own namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheTier {
    /// Intervals that are over: the chart can no longer change.
    Forever,
    OneDay,
    OneMonth,
    OneYear,
}

impl CacheTier {
    pub fn namespace(&self) -> &'static str {
        match self {
            CacheTier::Forever => "album_stats",
            CacheTier::OneDay => "album_stats_one_day",
            CacheTier::OneMonth => "album_stats_one_month",
            CacheTier::OneYear => "album_stats_one_year",
        }
    }

    pub fn policy(&self) -> CachePolicy {
        match self {
            CacheTier::Forever => CachePolicy::Forever,
            CacheTier::OneDay => CachePolicy::Days(1),
            CacheTier::OneMonth => CachePolicy::Days(30),
            CacheTier::OneYear => CachePolicy::Days(365),
        }
    }
}

pub fn cache_tier(range: &ChartRange, today: NaiveDate) -> CacheTier {
    match range {
        ChartRange::Interval { .. } if range.is_complete(today) => CacheTier::Forever,
        ChartRange::Interval { .. } => CacheTier::OneDay,
        ChartRange::Preset(Preset::AllTime) => CacheTier::OneYear,
        ChartRange::Preset(preset) => match preset.days() {
            Some(days) if days < 180 => CacheTier::OneDay,
            _ => CacheTier::OneMonth,
        },
    }
}

/// Album charts for a user and range, read through a tiered cache.
pub struct RawStatsFetcher {
    source: Arc<dyn ChartSource>,
    clock: Arc<dyn Clock>,
    max_items: usize,
    forever: Cached,
    one_day: Cached,
    one_month: Cached,
    one_year: Cached,
}

impl RawStatsFetcher {
    pub fn new(
        source: Arc<dyn ChartSource>,
        backend: Arc<dyn CacheBackend>,
        clock: Arc<dyn Clock>,
        max_items: usize,
    ) -> Self {
        let cached = |tier: CacheTier| Cached::new(backend.clone(), tier.namespace(), tier.policy());
        Self {
            source,
            clock,
            max_items,
            forever: cached(CacheTier::Forever),
            one_day: cached(CacheTier::OneDay),
            one_month: cached(CacheTier::OneMonth),
            one_year: cached(CacheTier::OneYear),
        }
    }

    fn cache_for(&self, tier: CacheTier) -> &Cached {
        match tier {
            CacheTier::Forever => &self.forever,
            CacheTier::OneDay => &self.one_day,
            CacheTier::OneMonth => &self.one_month,
            CacheTier::OneYear => &self.one_year,
        }
    }

    pub async fn get_raw_stats(
        &self,
        username: &str,
        range: &ChartRange,
    ) -> StatsResult<Vec<RawAlbumEntry>> {
        let tier = cache_tier(range, self.clock.today());
        let cache = self.cache_for(tier);
        let mut args = vec![username.to_string()];
        args.extend(range.cache_args());

        if let Some(value) = cache.lookup(&args) {
            match serde_json::from_str::<Vec<RawAlbumEntry>>(&value) {
                Ok(entries) => return Ok(entries),
                Err(e) => warn!("Discarding corrupt chart {}: {}", cache.key(&args), e),
            }
        }

        debug!("Fetching {} chart for {} ({:?})", range, username, tier);
        let mut entries = self.source.fetch_chart(username, range).await?;
        entries.retain(|entry| entry.rank as usize <= self.max_items);
        entries.truncate(self.max_items);

        let encoded = serde_json::to_string(&entries)?;
        if let Err(e) = cache.store(&args, &encoded) {
            warn!("Failed to cache chart {}: {}", cache.key(&args), e);
        }
        Ok(entries)
    }
}
