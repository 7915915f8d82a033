//! Listening periods.
//!
//! A [`Period`] is what a caller asks for. The [`PeriodResolver`] turns it
//! into something fetchable: a single [`ChartRange`], a random historical
//! range with its data, or a grid of sub-periods for the overview page.

mod calendar;
mod random;
mod resolver;

pub use calendar::{
    iso_week_range, month_range, most_recent_period, weeks_in_year, year_range, CalendarPeriod,
    PeriodKind,
};
pub use random::{pick_random_interval, RandomPick, RandomShape};
pub use resolver::{BlastFromThePast, PeriodResolver, ResolvedPeriod, SubPeriod, MAX_RANDOM_ATTEMPTS};

use crate::error::{StatsError, StatsResult};
use chrono::{Datelike, NaiveDate};
use std::fmt;

/// Rolling windows offered by the upstream library page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Preset {
    Days7,
    Days30,
    Days90,
    Days180,
    Days365,
    AllTime,
}

impl Preset {
    pub fn from_days(days: u32) -> Option<Self> {
        match days {
            7 => Some(Preset::Days7),
            30 => Some(Preset::Days30),
            90 => Some(Preset::Days90),
            180 => Some(Preset::Days180),
            365 => Some(Preset::Days365),
            _ => None,
        }
    }

    /// `None` for all time.
    pub fn days(&self) -> Option<u32> {
        match self {
            Preset::Days7 => Some(7),
            Preset::Days30 => Some(30),
            Preset::Days90 => Some(90),
            Preset::Days180 => Some(180),
            Preset::Days365 => Some(365),
            Preset::AllTime => None,
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.days() {
            Some(days) => write!(f, "the last {} days", days),
            None => write!(f, "all time"),
        }
    }
}

/// A concrete, fetchable chart window. Interval bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChartRange {
    Preset(Preset),
    Interval { from: NaiveDate, to: NaiveDate },
}

impl ChartRange {
    pub fn interval(from: NaiveDate, to: NaiveDate) -> Self {
        ChartRange::Interval { from, to }
    }

    pub fn from_calendar(period: &CalendarPeriod) -> Option<Self> {
        period
            .date_range()
            .map(|(from, to)| ChartRange::Interval { from, to })
    }

    /// Arguments identifying this range in a cache key.
    pub fn cache_args(&self) -> Vec<String> {
        match self {
            ChartRange::Preset(preset) => match preset.days() {
                Some(days) => vec![days.to_string()],
                None => vec!["all".to_string()],
            },
            ChartRange::Interval { from, to } => vec![from.to_string(), to.to_string()],
        }
    }

    /// An interval whose last day is today or later may still gain scrobbles.
    pub fn is_complete(&self, today: NaiveDate) -> bool {
        match self {
            ChartRange::Preset(_) => false,
            ChartRange::Interval { to, .. } => *to < today,
        }
    }
}

impl fmt::Display for ChartRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChartRange::Preset(preset) => write!(f, "{}", preset),
            ChartRange::Interval { from, to } => write!(f, "{} -> {}", from, to),
        }
    }
}

/// What a caller can ask statistics for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Preset(Preset),
    Custom { from: NaiveDate, to: NaiveDate },
    Random,
    Year(i32),
    Month { year: i32, month: u32 },
    Week { year: i32, week: u32 },
    Overview { year: Option<i32>, per_week: bool },
}

impl Period {
    pub fn calendar(period: CalendarPeriod) -> Self {
        match (period.month, period.week) {
            (_, Some(week)) => Period::Week {
                year: period.year,
                week,
            },
            (Some(month), None) => Period::Month {
                year: period.year,
                month,
            },
            (None, None) => Period::Year(period.year),
        }
    }

    /// The year this period is anchored to, if any.
    pub fn year(&self) -> Option<i32> {
        match self {
            Period::Year(year) | Period::Month { year, .. } | Period::Week { year, .. } => {
                Some(*year)
            }
            Period::Overview { year, .. } => *year,
            Period::Preset(_) | Period::Custom { .. } | Period::Random => None,
        }
    }

    /// Checks that need no upstream data: future years, month and week
    /// numbers, empty custom ranges.
    pub fn validate(&self, today: NaiveDate) -> StatsResult<()> {
        if let Some(year) = self.year() {
            // Weeks are numbered within the ISO week year, which may already
            // be the next one in the last days of December.
            let current_year = match self {
                Period::Week { .. } => today.iso_week().year(),
                _ => today.year(),
            };
            if year > current_year {
                return Err(StatsError::validation(format!(
                    "Year {} is in the future",
                    year
                )));
            }
        }

        match *self {
            Period::Month { month, .. } if !(1..=12).contains(&month) => Err(
                StatsError::validation(format!("Invalid month: {}", month)),
            ),
            Period::Week { year, week } if week == 0 || week > weeks_in_year(year) => Err(
                StatsError::validation(format!("Invalid week {} for year {}", week, year)),
            ),
            Period::Custom { from, to } if from > to => Err(StatsError::validation(format!(
                "Range start {} is after its end {}",
                from, to
            ))),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Period::Preset(preset) => write!(f, "{}", preset),
            Period::Custom { from, to } => write!(f, "{} -> {}", from, to),
            Period::Random => write!(f, "a blast from the past"),
            Period::Year(year) => write!(f, "{}", CalendarPeriod::year(year)),
            Period::Month { year, month } => write!(f, "{}", CalendarPeriod::month(year, month)),
            Period::Week { year, week } => write!(f, "{}", CalendarPeriod::week(year, week)),
            Period::Overview { year: None, .. } => write!(f, "overview"),
            Period::Overview {
                year: Some(year), ..
            } => write!(f, "overview of {}", year),
        }
    }
}
