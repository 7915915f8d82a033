use super::{
    rank_by_album_plays, CorrectedAlbumStat, EnrichmentEngine, RawAlbumEntry, RawStatsFetcher,
    RecentUsers,
};
use crate::clock::Clock;
use crate::error::{StatsError, StatsResult};
use crate::lastfm::AccountDirectory;
use crate::period::{
    CalendarPeriod, ChartRange, Period, PeriodResolver, Preset, ResolvedPeriod, SubPeriod,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Where a random result came from.
#[derive(Debug, Clone, Serialize)]
pub struct BlastInfo {
    pub name: &'static str,
    pub range: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserStats {
    pub username: String,
    pub period: String,
    pub stats: Vec<CorrectedAlbumStat>,
    /// Top album by raw scrobbles, to compare with the corrected ranking.
    pub original_top_album: Option<RawAlbumEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blast: Option<BlastInfo>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OverviewBlock {
    #[serde(flatten)]
    pub period: CalendarPeriod,
    pub top_album: Option<CorrectedAlbumStat>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecentUser {
    pub username: String,
    /// Top corrected album of all time.
    pub top_album: Option<CorrectedAlbumStat>,
}

/// Entry point for everything that wants corrected album stats: the web
/// handlers, the digest and the CLI.
pub struct StatsService {
    directory: Arc<dyn AccountDirectory>,
    fetcher: Arc<RawStatsFetcher>,
    resolver: PeriodResolver,
    engine: Arc<EnrichmentEngine>,
    recent: Arc<RecentUsers>,
    clock: Arc<dyn Clock>,
}

impl StatsService {
    pub fn new(
        directory: Arc<dyn AccountDirectory>,
        fetcher: Arc<RawStatsFetcher>,
        engine: Arc<EnrichmentEngine>,
        recent: Arc<RecentUsers>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            resolver: PeriodResolver::new(directory.clone(), fetcher.clone(), clock.clone()),
            directory,
            fetcher,
            engine,
            recent,
            clock,
        }
    }

    pub fn engine(&self) -> &Arc<EnrichmentEngine> {
        &self.engine
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub async fn username_exists(&self, username: &str) -> StatsResult<bool> {
        self.directory.username_exists(username).await
    }

    pub async fn account_start_year(&self, username: &str) -> StatsResult<i32> {
        self.directory.account_start_year(username).await
    }

    pub async fn get_raw_stats(
        &self,
        username: &str,
        range: &ChartRange,
    ) -> StatsResult<Vec<RawAlbumEntry>> {
        self.fetcher.get_raw_stats(username, range).await
    }

    pub async fn enrich(&self, entries: Vec<RawAlbumEntry>) -> Vec<CorrectedAlbumStat> {
        self.engine.enrich(entries).await
    }

    pub async fn resolve_period(&self, username: &str, period: &Period) -> StatsResult<ResolvedPeriod> {
        self.resolver.resolve(username, period).await
    }

    async fn ensure_user(&self, username: &str) -> StatsResult<()> {
        if self.username_exists(username).await? {
            Ok(())
        } else {
            Err(StatsError::NotFound(format!("User {} not found", username)))
        }
    }

    pub async fn user_stats(&self, username: &str, period: &Period) -> StatsResult<UserStats> {
        period.validate(self.clock.today())?;
        self.ensure_user(username).await?;

        let (entries, blast) = match self.resolve_period(username, period).await? {
            ResolvedPeriod::Range(range) => (self.get_raw_stats(username, &range).await?, None),
            ResolvedPeriod::Blast(blast) => (
                blast.entries,
                Some(BlastInfo {
                    name: blast.name,
                    range: blast.range.to_string(),
                }),
            ),
            ResolvedPeriod::Grid(_) => {
                return Err(StatsError::validation(
                    "Overview periods have no single ranking",
                ))
            }
        };

        let original_top_album = entries
            .iter()
            .max_by_key(|entry| (entry.scrobbles().unwrap_or(0), std::cmp::Reverse(entry.rank)))
            .cloned();
        let mut stats = self.enrich(entries).await;
        rank_by_album_plays(&mut stats);
        info!(
            "Computed {} album stats for {} over {}",
            stats.len(),
            username,
            period
        );

        Ok(UserStats {
            username: username.to_string(),
            period: match &blast {
                Some(blast) => format!("{} ({})", blast.name, blast.range),
                None => period.to_string(),
            },
            stats,
            original_top_album,
            blast,
        })
    }

    /// Ranked corrected stats for a calendar year, month or week.
    pub async fn period_stats(
        &self,
        username: &str,
        period: CalendarPeriod,
    ) -> StatsResult<Vec<CorrectedAlbumStat>> {
        Ok(self
            .user_stats(username, &Period::calendar(period))
            .await?
            .stats)
    }

    pub async fn overview(
        &self,
        username: &str,
        year: Option<i32>,
        per_week: bool,
    ) -> StatsResult<Vec<SubPeriod>> {
        let period = Period::Overview { year, per_week };
        period.validate(self.clock.today())?;
        self.ensure_user(username).await?;

        match self.resolve_period(username, &period).await? {
            ResolvedPeriod::Grid(cells) => Ok(cells),
            other => Err(StatsError::Parse(format!(
                "overview resolved to {:?}",
                other
            ))),
        }
    }

    /// Top corrected album of one overview cell. Periods that are not over
    /// yet have none.
    pub async fn overview_block(
        &self,
        username: &str,
        period: CalendarPeriod,
    ) -> StatsResult<OverviewBlock> {
        Period::calendar(period).validate(self.clock.today())?;
        let complete = ChartRange::from_calendar(&period)
            .map(|range| range.is_complete(self.clock.today()))
            .unwrap_or(false);

        let top_album = if complete {
            self.period_stats(username, period).await?.into_iter().next()
        } else {
            None
        };
        Ok(OverviewBlock { period, top_album })
    }

    /// Remembers `username` as looked up. Failures only cost the entry.
    pub async fn record_visit(&self, username: &str) {
        if let Err(e) = self.recent.record(username).await {
            warn!("Failed to record recent user {}: {}", username, e);
        }
    }

    /// Recently looked up users with their all-time top album. Users whose
    /// stats cannot be computed right now are left out.
    pub async fn recent_users(&self) -> Vec<RecentUser> {
        let mut users = Vec::new();
        for username in self.recent.list() {
            match self
                .user_stats(&username, &Period::Preset(Preset::AllTime))
                .await
            {
                Ok(stats) => users.push(RecentUser {
                    username,
                    top_album: stats.stats.into_iter().next(),
                }),
                Err(e) => warn!("Skipping recent user {}: {}", username, e),
            }
        }
        users
    }
}
