//! Named comparison windows and the range selector.

use crate::domain::error::PerfError;
use crate::domain::price::PricePoint;
use chrono::{Datelike, Months, NaiveDate};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Range {
    Ytd,
    OneYear,
    ThreeYears,
    FiveYears,
    TenYears,
}

impl Range {
    pub const ALL: [Range; 5] = [
        Range::Ytd,
        Range::OneYear,
        Range::ThreeYears,
        Range::FiveYears,
        Range::TenYears,
    ];

    pub fn token(self) -> &'static str {
        match self {
            Range::Ytd => "ytd",
            Range::OneYear => "1y",
            Range::ThreeYears => "3y",
            Range::FiveYears => "5y",
            Range::TenYears => "10y",
        }
    }

    /// Whole years covered by the window, `None` for year-to-date.
    pub fn years(self) -> Option<u32> {
        match self {
            Range::Ytd => None,
            Range::OneYear => Some(1),
            Range::ThreeYears => Some(3),
            Range::FiveYears => Some(5),
            Range::TenYears => Some(10),
        }
    }

    /// Year-over-year tables need at least three years of data.
    pub fn supports_yoy(self) -> bool {
        self.years().is_some_and(|y| y >= 3)
    }

    /// First date (inclusive) of the window ending at `anchor`.
    ///
    /// Year windows subtract calendar years, so a Feb 29 anchor lands on
    /// Feb 28 in a non-leap year.
    pub fn start_boundary(self, anchor: NaiveDate) -> NaiveDate {
        match self.years() {
            None => NaiveDate::from_ymd_opt(anchor.year(), 1, 1).unwrap_or(anchor),
            Some(n) => anchor
                .checked_sub_months(Months::new(12 * n))
                .unwrap_or(NaiveDate::MIN),
        }
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for Range {
    type Err = PerfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ytd" => Ok(Range::Ytd),
            "1y" => Ok(Range::OneYear),
            "3y" => Ok(Range::ThreeYears),
            "5y" => Ok(Range::FiveYears),
            "10y" => Ok(Range::TenYears),
            _ => Err(PerfError::UnknownRange {
                token: s.to_string(),
            }),
        }
    }
}

/// Suffix of `points` that falls inside `range`, anchored to the last point.
///
/// `points` must be ascending by date.
pub fn select_range(points: &[PricePoint], range: Range) -> &[PricePoint] {
    let Some(last) = points.last() else {
        return points;
    };
    let start = range.start_boundary(last.date);
    let idx = points.partition_point(|p| p.date < start);
    &points[idx..]
}
