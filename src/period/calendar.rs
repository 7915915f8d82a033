//! Calendar arithmetic for years, months and ISO weeks.

use chrono::{Datelike, Months, NaiveDate, Weekday};
use serde::Serialize;
use std::fmt;

pub fn year_range(year: i32) -> Option<(NaiveDate, NaiveDate)> {
    Some((
        NaiveDate::from_ymd_opt(year, 1, 1)?,
        NaiveDate::from_ymd_opt(year, 12, 31)?,
    ))
}

pub fn month_range(year: i32, month: u32) -> Option<(NaiveDate, NaiveDate)> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let last = first.checked_add_months(Months::new(1))?.pred_opt()?;
    Some((first, last))
}

/// Monday to Sunday of ISO week `week` of ISO year `year`.
pub fn iso_week_range(year: i32, week: u32) -> Option<(NaiveDate, NaiveDate)> {
    let monday = NaiveDate::from_isoywd_opt(year, week, Weekday::Mon)?;
    let sunday = NaiveDate::from_isoywd_opt(year, week, Weekday::Sun)?;
    Some((monday, sunday))
}

/// 52 or 53. December 28th always falls in the last ISO week of its year.
pub fn weeks_in_year(year: i32) -> u32 {
    NaiveDate::from_ymd_opt(year, 12, 28)
        .map(|d| d.iso_week().week())
        .unwrap_or(52)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PeriodKind {
    Year,
    Month,
    Week,
}

impl fmt::Display for PeriodKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeriodKind::Year => write!(f, "year"),
            PeriodKind::Month => write!(f, "month"),
            PeriodKind::Week => write!(f, "week"),
        }
    }
}

/// A completed calendar period. `week` is an ISO week, in which case `year`
/// is the ISO week-numbering year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CalendarPeriod {
    pub year: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub month: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub week: Option<u32>,
}

impl CalendarPeriod {
    pub fn year(year: i32) -> Self {
        Self {
            year,
            month: None,
            week: None,
        }
    }

    pub fn month(year: i32, month: u32) -> Self {
        Self {
            year,
            month: Some(month),
            week: None,
        }
    }

    pub fn week(year: i32, week: u32) -> Self {
        Self {
            year,
            month: None,
            week: Some(week),
        }
    }

    pub fn kind(&self) -> PeriodKind {
        match (self.month, self.week) {
            (_, Some(_)) => PeriodKind::Week,
            (Some(_), None) => PeriodKind::Month,
            (None, None) => PeriodKind::Year,
        }
    }

    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        match (self.month, self.week) {
            (_, Some(week)) => iso_week_range(self.year, week),
            (Some(month), None) => month_range(self.year, month),
            (None, None) => year_range(self.year),
        }
    }
}

impl fmt::Display for CalendarPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.month, self.week) {
            (_, Some(week)) => write!(f, "week {} of {}", week, self.year),
            (Some(month), None) => match NaiveDate::from_ymd_opt(self.year, month, 1) {
                Some(d) => write!(f, "{}", d.format("%B %Y")),
                None => write!(f, "{}-{:02}", self.year, month),
            },
            (None, None) => write!(f, "{}", self.year),
        }
    }
}

/// The most recent fully elapsed period of `kind` as seen on `today`.
pub fn most_recent_period(kind: PeriodKind, today: NaiveDate) -> CalendarPeriod {
    match kind {
        PeriodKind::Year => CalendarPeriod::year(today.year() - 1),
        PeriodKind::Month => {
            let last_month = today
                .checked_sub_months(Months::new(1))
                .unwrap_or(today);
            CalendarPeriod::month(last_month.year(), last_month.month())
        }
        PeriodKind::Week => {
            let last_week = (today - chrono::Duration::days(7)).iso_week();
            CalendarPeriod::week(last_week.year(), last_week.week())
        }
    }
}
