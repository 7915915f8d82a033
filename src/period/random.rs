//! "Blast from the past": random historical intervals.

use super::calendar::{iso_week_range, month_range, weeks_in_year, year_range};
use super::ChartRange;
use chrono::{Datelike, NaiveDate};
use rand::Rng;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RandomShape {
    RandomMonth,
    RandomWeek,
    ThisMonthInHistory,
    ThisWeekInHistory,
    RandomYear,
}

impl RandomShape {
    pub const ALL: [RandomShape; 5] = [
        RandomShape::RandomMonth,
        RandomShape::RandomWeek,
        RandomShape::ThisMonthInHistory,
        RandomShape::ThisWeekInHistory,
        RandomShape::RandomYear,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            RandomShape::RandomMonth => "a random month",
            RandomShape::RandomWeek => "a random week",
            RandomShape::ThisMonthInHistory => "this month in history",
            RandomShape::ThisWeekInHistory => "this week in history",
            RandomShape::RandomYear => "a random year",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RandomPick {
    pub shape: RandomShape,
    pub year: i32,
    pub range: ChartRange,
}

impl RandomPick {
    pub fn name(&self) -> &'static str {
        self.shape.name()
    }
}

/// Picks a shape uniformly, then a year in `first_year..=last_year` and an
/// offset within it. The caller guarantees `first_year <= last_year`.
pub fn pick_random_interval<R: Rng + ?Sized>(
    rng: &mut R,
    first_year: i32,
    last_year: i32,
    today: NaiveDate,
) -> Option<RandomPick> {
    let shape = RandomShape::ALL[rng.random_range(0..RandomShape::ALL.len())];
    let year = rng.random_range(first_year..=last_year);

    let (from, to) = match shape {
        RandomShape::RandomMonth => month_range(year, rng.random_range(1..=12))?,
        RandomShape::RandomWeek => iso_week_range(year, rng.random_range(1..=weeks_in_year(year)))?,
        RandomShape::ThisMonthInHistory => month_range(year, today.month())?,
        RandomShape::ThisWeekInHistory => {
            let week = today.iso_week().week().min(weeks_in_year(year));
            iso_week_range(year, week)?
        }
        RandomShape::RandomYear => year_range(year)?,
    };

    Some(RandomPick {
        shape,
        year,
        range: ChartRange::interval(from, to),
    })
}
