//! Composite series builder.
//!
//! A basket becomes one base-100 curve in two passes. Each asset is first
//! indexed to 100 at its own first close inside the window, then the assets
//! are blended date by date using only the weight of assets that have
//! started trading ([`blend_normalized`]). The blend is indexed to 100 again
//! at its own first date ([`rebase_to_100`]), so a composite always starts at
//! exactly 100 no matter which assets were excluded or started late.

use crate::domain::basket::Basket;
use crate::domain::price::PricePoint;
use crate::domain::range::{select_range, Range};
use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// A basket's normalized performance curve. Empty means "insufficient data".
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeSeries {
    pub label: String,
    pub points: Vec<SeriesPoint>,
}

impl CompositeSeries {
    pub fn new(label: impl Into<String>, points: Vec<SeriesPoint>) -> Self {
        Self {
            label: label.into(),
            points,
        }
    }

    pub fn empty(label: impl Into<String>) -> Self {
        Self::new(label, Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|p| p.date)
    }

    pub fn last_value(&self) -> Option<f64> {
        self.points.last().map(|p| p.value)
    }
}

/// One asset after per-asset indexing.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedAsset {
    pub symbol: String,
    /// Fraction of the basket, i.e. percentage / 100.
    pub weight: f64,
    pub points: Vec<SeriesPoint>,
}

/// Index `points` to 100 at the first close.
///
/// Returns `None` when there is no usable base: no points, or a first close
/// that is zero or not finite.
pub fn normalize_asset(points: &[PricePoint]) -> Option<Vec<SeriesPoint>> {
    let base = points.first()?.close;
    if base == 0.0 || !base.is_finite() {
        return None;
    }
    Some(
        points
            .iter()
            .map(|p| SeriesPoint {
                date: p.date,
                value: p.close / base * 100.0,
            })
            .collect(),
    )
}

/// Trim, filter and index every asset of `basket`.
///
/// Assets with no data in the window, a non-positive weight or no usable
/// base close are left out.
pub fn prepare_assets(
    basket: &Basket,
    histories: &HashMap<String, Vec<PricePoint>>,
    range: Range,
) -> Vec<NormalizedAsset> {
    basket
        .assets
        .iter()
        .filter_map(|asset| {
            if asset.weight.is_nan() || asset.weight <= 0.0 {
                return None;
            }
            let history = histories.get(&asset.symbol)?;
            let trimmed = select_range(history, range);
            let points = normalize_asset(trimmed)?;
            Some(NormalizedAsset {
                symbol: asset.symbol.clone(),
                weight: asset.weight / 100.0,
                points,
            })
        })
        .collect()
}

/// Weighted blend of already-indexed assets on the union of their dates.
///
/// Every asset carries its last known value forward across dates where it
/// has no observation. Only assets that have started contribute, and the sum
/// is divided by their combined weight, so a late starter neither drags
/// down nor inflates the dates before its first point. Dates before any
/// asset starts are not emitted.
pub fn blend_normalized(assets: &[NormalizedAsset]) -> Vec<SeriesPoint> {
    let dates: BTreeSet<NaiveDate> = assets
        .iter()
        .flat_map(|a| a.points.iter().map(|p| p.date))
        .collect();

    let mut cursors = vec![0usize; assets.len()];
    let mut last_known: Vec<Option<f64>> = vec![None; assets.len()];
    let mut blended = Vec::with_capacity(dates.len());

    for date in dates {
        let mut weighted = 0.0;
        let mut active_weight = 0.0;

        for (i, asset) in assets.iter().enumerate() {
            if let Some(p) = asset.points.get(cursors[i]).filter(|p| p.date == date) {
                last_known[i] = Some(p.value);
                cursors[i] += 1;
            }
            if let Some(value) = last_known[i] {
                weighted += value * asset.weight;
                active_weight += asset.weight;
            }
        }

        if active_weight > 0.0 {
            blended.push(SeriesPoint {
                date,
                value: weighted / active_weight,
            });
        }
    }

    blended
}

/// Index a series to 100 at its own first point.
///
/// An empty input, or a first value of zero or non-finite, yields an empty
/// series.
pub fn rebase_to_100(points: &[SeriesPoint]) -> Vec<SeriesPoint> {
    let Some(base) = points.first().map(|p| p.value) else {
        return Vec::new();
    };
    if base == 0.0 || !base.is_finite() {
        return Vec::new();
    }
    points
        .iter()
        .map(|p| SeriesPoint {
            date: p.date,
            value: p.value / base * 100.0,
        })
        .collect()
}

/// Build the composite curve of `basket` over `range`.
///
/// Missing histories, excluded assets and empty windows are not errors: if
/// nothing survives the series is simply empty.
pub fn build_composite(
    basket: &Basket,
    histories: &HashMap<String, Vec<PricePoint>>,
    range: Range,
) -> CompositeSeries {
    let assets = prepare_assets(basket, histories, range);
    if assets.is_empty() {
        return CompositeSeries::empty(basket.label.clone());
    }
    let blended = blend_normalized(&assets);
    CompositeSeries::new(basket.label.clone(), rebase_to_100(&blended))
}
