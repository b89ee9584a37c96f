//! Multi-series alignment onto one shared date axis.

use crate::domain::composite::CompositeSeries;
use chrono::NaiveDate;
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq)]
pub struct AlignedSeries {
    pub label: String,
    /// One entry per chart label. `None` until the series has started.
    pub values: Vec<Option<f64>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlignedChart {
    pub labels: Vec<NaiveDate>,
    pub series: Vec<AlignedSeries>,
}

impl AlignedChart {
    /// Nothing to plot.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn series_by_label(&self, label: &str) -> Option<&AlignedSeries> {
        self.series.iter().find(|s| s.label == label)
    }
}

/// Sorted union of every date present in `series`.
pub fn build_unified_timeline(series: &[CompositeSeries]) -> Vec<NaiveDate> {
    let unique_dates: BTreeSet<NaiveDate> = series
        .iter()
        .flat_map(|s| s.points.iter().map(|p| p.date))
        .collect();
    unique_dates.into_iter().collect()
}

/// Put every non-empty series on the union of all dates.
///
/// Dates before a series' first point are `None`; from the first point on,
/// dates the series does not have carry its last value forward. Empty
/// series are dropped, and if none are left the chart is empty.
pub fn align_all(series: &[CompositeSeries]) -> AlignedChart {
    let non_empty: Vec<&CompositeSeries> = series.iter().filter(|s| !s.is_empty()).collect();
    if non_empty.is_empty() {
        return AlignedChart::default();
    }

    let labels = build_unified_timeline(series);

    let aligned = non_empty
        .into_iter()
        .map(|s| {
            let mut cursor = 0usize;
            let mut last: Option<f64> = None;
            let values = labels
                .iter()
                .map(|date| {
                    while let Some(p) = s.points.get(cursor).filter(|p| p.date <= *date) {
                        last = Some(p.value);
                        cursor += 1;
                    }
                    last
                })
                .collect();
            AlignedSeries {
                label: s.label.clone(),
                values,
            }
        })
        .collect();

    AlignedChart {
        labels,
        series: aligned,
    }
}
