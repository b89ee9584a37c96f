//! Per-basket period returns for the performance table.

use crate::domain::basket::Basket;
use crate::domain::composite::build_composite;
use crate::domain::price::PricePoint;
use crate::domain::range::Range;
use std::collections::HashMap;

/// Total return in percent for the short windows, `None` when a window has
/// no data.
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodReturns {
    pub label: String,
    pub ytd: Option<f64>,
    pub one_year: Option<f64>,
    pub three_years: Option<f64>,
}

/// Return over `range`: last composite value minus the 100 base.
pub fn period_return(
    basket: &Basket,
    histories: &HashMap<String, Vec<PricePoint>>,
    range: Range,
) -> Option<f64> {
    build_composite(basket, histories, range)
        .last_value()
        .map(|v| v - 100.0)
}

pub fn period_returns(
    basket: &Basket,
    histories: &HashMap<String, Vec<PricePoint>>,
) -> PeriodReturns {
    PeriodReturns {
        label: basket.label.clone(),
        ytd: period_return(basket, histories, Range::Ytd),
        one_year: period_return(basket, histories, Range::OneYear),
        three_years: period_return(basket, histories, Range::ThreeYears),
    }
}

/// `+12.34%`, `-5.00%`, or `-` when missing.
pub fn format_pct(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => {
            let sign = if v > 0.0 { "+" } else { "" };
            format!("{sign}{v:.2}%")
        }
        _ => "-".to_string(),
    }
}
