//! Year-over-year returns from an aligned series.

use crate::domain::align::{AlignedChart, AlignedSeries};
use crate::domain::error::PerfError;
use crate::domain::range::Range;
use chrono::{Datelike, NaiveDate};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct YoyRow {
    pub year: i32,
    pub return_pct: f64,
}

/// One value per calendar year: the last non-empty value dated in that year.
pub fn yearly_snapshots(labels: &[NaiveDate], values: &[Option<f64>]) -> BTreeMap<i32, f64> {
    labels
        .iter()
        .zip(values)
        .filter_map(|(date, value)| value.map(|v| (date.year(), v)))
        .collect()
}

/// Annual returns between consecutive snapshot years.
///
/// Refused with [`PerfError::UnsupportedRange`] for windows shorter than
/// three years. Years with no snapshot are skipped; a pair where either
/// snapshot is zero produces no row.
pub fn yoy(
    labels: &[NaiveDate],
    values: &[Option<f64>],
    range: Range,
) -> Result<Vec<YoyRow>, PerfError> {
    if !range.supports_yoy() {
        return Err(PerfError::UnsupportedRange {
            range: range.to_string(),
        });
    }

    let snapshots: Vec<(i32, f64)> = yearly_snapshots(labels, values).into_iter().collect();
    let rows = snapshots
        .windows(2)
        .filter_map(|pair| {
            let (_, prev) = pair[0];
            let (year, curr) = pair[1];
            if prev == 0.0 || curr == 0.0 {
                return None;
            }
            Some(YoyRow {
                year,
                return_pct: (curr / prev - 1.0) * 100.0,
            })
        })
        .collect();
    Ok(rows)
}

/// [`yoy`] for one series of an aligned chart.
pub fn yoy_for_series(
    chart: &AlignedChart,
    series: &AlignedSeries,
    range: Range,
) -> Result<Vec<YoyRow>, PerfError> {
    yoy(&chart.labels, &series.values, range)
}
