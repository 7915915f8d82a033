use super::calendar::{weeks_in_year, CalendarPeriod};
use super::random::{pick_random_interval, RandomPick};
use super::{ChartRange, Period};
use crate::clock::Clock;
use crate::error::{StatsError, StatsResult};
use crate::lastfm::AccountDirectory;
use crate::stats::{RawAlbumEntry, RawStatsFetcher};
use chrono::Datelike;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

/// Random intervals sampled before giving up on finding listening data.
pub const MAX_RANDOM_ATTEMPTS: usize = 10;

#[derive(Debug, Clone)]
pub enum ResolvedPeriod {
    Range(ChartRange),
    Blast(BlastFromThePast),
    Grid(Vec<SubPeriod>),
}

/// A sampled random interval together with the data found in it. `entries`
/// is empty when every attempt came back empty.
#[derive(Debug, Clone)]
pub struct BlastFromThePast {
    pub name: &'static str,
    pub range: ChartRange,
    pub entries: Vec<RawAlbumEntry>,
}

/// One cell of the overview grid. `range` is `None` while the period is not
/// over yet; such cells are shown without data.
#[derive(Debug, Clone, Serialize)]
pub struct SubPeriod {
    #[serde(flatten)]
    pub period: CalendarPeriod,
    #[serde(skip)]
    pub range: Option<ChartRange>,
}

impl SubPeriod {
    fn new(period: CalendarPeriod, today: chrono::NaiveDate) -> Self {
        let range = ChartRange::from_calendar(&period).filter(|r| r.is_complete(today));
        Self { period, range }
    }

    pub fn is_complete(&self) -> bool {
        self.range.is_some()
    }
}

pub struct PeriodResolver {
    directory: Arc<dyn AccountDirectory>,
    fetcher: Arc<RawStatsFetcher>,
    clock: Arc<dyn Clock>,
}

impl PeriodResolver {
    pub fn new(
        directory: Arc<dyn AccountDirectory>,
        fetcher: Arc<RawStatsFetcher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            directory,
            fetcher,
            clock,
        }
    }

    pub async fn resolve(&self, username: &str, period: &Period) -> StatsResult<ResolvedPeriod> {
        let today = self.clock.today();
        period.validate(today)?;

        match *period {
            Period::Preset(preset) => Ok(ResolvedPeriod::Range(ChartRange::Preset(preset))),
            Period::Custom { from, to } => Ok(ResolvedPeriod::Range(ChartRange::interval(from, to))),
            Period::Year(year) => self.calendar_range(username, CalendarPeriod::year(year)).await,
            Period::Month { year, month } => {
                self.calendar_range(username, CalendarPeriod::month(year, month))
                    .await
            }
            Period::Week { year, week } => {
                self.calendar_range(username, CalendarPeriod::week(year, week))
                    .await
            }
            Period::Overview { year, per_week } => self.overview(username, year, per_week).await,
            Period::Random => self.random(username).await.map(ResolvedPeriod::Blast),
        }
    }

    async fn calendar_range(
        &self,
        username: &str,
        period: CalendarPeriod,
    ) -> StatsResult<ResolvedPeriod> {
        let start_year = self.directory.account_start_year(username).await?;
        if period.year < start_year {
            return Err(StatsError::validation(format!(
                "{} is before {} started scrobbling ({})",
                period, username, start_year
            )));
        }

        ChartRange::from_calendar(&period)
            .map(ResolvedPeriod::Range)
            .ok_or_else(|| StatsError::validation(format!("Invalid period: {}", period)))
    }

    async fn overview(
        &self,
        username: &str,
        year: Option<i32>,
        per_week: bool,
    ) -> StatsResult<ResolvedPeriod> {
        let today = self.clock.today();
        let start_year = self.directory.account_start_year(username).await?;

        let periods: Vec<CalendarPeriod> = match year {
            None => (start_year..today.year()).map(CalendarPeriod::year).collect(),
            Some(year) if year < start_year => {
                return Err(StatsError::validation(format!(
                    "{} is before {} started scrobbling ({})",
                    year, username, start_year
                )))
            }
            Some(year) if per_week => (1..=weeks_in_year(year))
                .map(|week| CalendarPeriod::week(year, week))
                .collect(),
            Some(year) => (1..=12).map(|month| CalendarPeriod::month(year, month)).collect(),
        };

        Ok(ResolvedPeriod::Grid(
            periods
                .into_iter()
                .map(|p| SubPeriod::new(p, today))
                .collect(),
        ))
    }

    async fn random(&self, username: &str) -> StatsResult<BlastFromThePast> {
        let today = self.clock.today();
        let start_year = self.directory.account_start_year(username).await?;
        let last_year = today.year() - 1;
        if start_year > last_year {
            return Err(StatsError::validation(format!(
                "{} has been scrobbling for less than a year",
                username
            )));
        }

        let mut last_pick: Option<RandomPick> = None;
        for attempt in 1..=MAX_RANDOM_ATTEMPTS {
            let pick = {
                let mut rng = rand::rng();
                pick_random_interval(&mut rng, start_year, last_year, today)
            };
            let Some(pick) = pick else {
                continue;
            };
            debug!(
                "Trying {} ({}) for {}, attempt {}",
                pick.name(),
                pick.range,
                username,
                attempt
            );

            let entries = self.fetcher.get_raw_stats(username, &pick.range).await?;
            if !entries.is_empty() {
                return Ok(BlastFromThePast {
                    name: pick.name(),
                    range: pick.range,
                    entries,
                });
            }
            last_pick = Some(pick);
        }

        info!(
            "No listening data found for {} after {} random intervals",
            username, MAX_RANDOM_ATTEMPTS
        );
        let pick = last_pick.ok_or_else(|| {
            StatsError::validation(format!("No valid random interval for {}", username))
        })?;
        Ok(BlastFromThePast {
            name: pick.name(),
            range: pick.range,
            entries: Vec::new(),
        })
    }
}
