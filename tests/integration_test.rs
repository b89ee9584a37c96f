//! Integration tests across composition, alignment, caching and comparison.
//!
//! Tests cover:
//! - Composite curves for single, equal-calendar and late-starting baskets
//! - Alignment of series with disjoint calendars
//! - Cache miss, hit and incremental refresh through mock provider and store
//! - Year-over-year extraction and range refusal
//! - Comparison fan-out with per-symbol failures
//! - Property checks on composites and aligned charts

mod common;

use approx::assert_relative_eq;
use basketperf::adapters::ticker_resolver::TickerResolver;
use basketperf::domain::align::align_all;
use basketperf::domain::basket::{Basket, WeightedAsset};
use basketperf::domain::comparison::Comparison;
use basketperf::domain::composite::{build_composite, CompositeSeries, SeriesPoint};
use basketperf::domain::error::PerfError;
use basketperf::domain::history_cache::{HistoryCache, ONE_DAY_SECS};
use basketperf::domain::price::{merge_by_date, InstrumentHistory};
use basketperf::domain::range::Range;
use basketperf::domain::yoy::yoy;
use chrono::NaiveDate;
use common::*;
use proptest::prelude::*;
use std::sync::Arc;

mod composite_curves {
    use super::*;

    #[test]
    fn single_asset_is_proportional_to_closes() {
        let closes = [50.0, 55.0, 45.0, 60.0];
        let histories = closes_map(&[("AAPL", daily("2024-03-01", &closes))]);

        let series = build_composite(&Basket::single("AAPL"), &histories, Range::Ytd);

        assert_eq!(series.points.len(), 4);
        assert_eq!(series.points[0].value, 100.0);
        for (p, c) in series.points.iter().zip(closes) {
            assert_relative_eq!(p.value, c / 50.0 * 100.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn same_calendar_basket_is_weighted_sum() {
        let histories = closes_map(&[
            ("AAA", daily("2024-02-01", &[10.0, 12.0, 11.0])),
            ("BBB", daily("2024-02-01", &[200.0, 180.0, 220.0])),
        ]);
        let basket = Basket::new(
            "mix",
            vec![WeightedAsset::new("AAA", 70.0), WeightedAsset::new("BBB", 30.0)],
        );

        let series = build_composite(&basket, &histories, Range::OneYear);

        let expected = [
            100.0,
            0.7 * 120.0 + 0.3 * 90.0,
            0.7 * 110.0 + 0.3 * 110.0,
        ];
        assert_eq!(series.points.len(), 3);
        for (p, e) in series.points.iter().zip(expected) {
            assert_relative_eq!(p.value, e, epsilon = 1e-9);
        }
    }

    #[test]
    fn identical_halves_equal_the_series() {
        let closes = [80.0, 84.0, 82.0, 90.0];
        let histories = closes_map(&[
            ("AAA", daily("2024-01-02", &closes)),
            ("BBB", daily("2024-01-02", &closes)),
        ]);
        let basket = Basket::new(
            "halves",
            vec![WeightedAsset::new("AAA", 50.0), WeightedAsset::new("BBB", 50.0)],
        );

        let blended = build_composite(&basket, &histories, Range::Ytd);
        let single = build_composite(&Basket::single("AAA"), &histories, Range::Ytd);

        assert_eq!(blended.points.len(), single.points.len());
        for (a, b) in blended.points.iter().zip(&single.points) {
            assert_eq!(a.date, b.date);
            assert_relative_eq!(a.value, b.value, epsilon = 1e-9);
        }
    }

    #[test]
    fn late_starter_does_not_truncate_history() {
        let histories = closes_map(&[
            (
                "OLD",
                vec![
                    point("2021-01-04", 100.0),
                    point("2023-01-03", 120.0),
                    point("2025-01-02", 140.0),
                    point("2026-01-02", 150.0),
                ],
            ),
            (
                "NEW",
                vec![point("2025-01-02", 10.0), point("2026-01-02", 12.0)],
            ),
        ]);
        let basket = Basket::new(
            "late",
            vec![WeightedAsset::new("OLD", 50.0), WeightedAsset::new("NEW", 50.0)],
        );

        let series = build_composite(&basket, &histories, Range::TenYears);

        assert_eq!(series.first_date(), Some(date("2021-01-04")));
        assert_eq!(series.points.last().unwrap().date, date("2026-01-02"));
        assert_eq!(series.points[0].value, 100.0);
        // Before NEW starts, the curve follows OLD alone.
        assert_relative_eq!(series.points[1].value, 120.0, epsilon = 1e-9);
    }

    #[test]
    fn missing_history_yields_empty_series() {
        let histories = closes_map(&[]);
        let series = build_composite(&Basket::single("NOPE"), &histories, Range::Ytd);
        assert!(series.is_empty());
    }
}

mod alignment {
    use super::*;

    fn series(label: &str, rows: &[(&str, f64)]) -> CompositeSeries {
        CompositeSeries::new(
            label,
            rows.iter()
                .map(|(d, v)| SeriesPoint {
                    date: date(d),
                    value: *v,
                })
                .collect(),
        )
    }

    #[test]
    fn disjoint_calendars_share_one_axis() {
        let a = series("A", &[("2024-01-02", 100.0), ("2024-01-04", 104.0)]);
        let b = series("B", &[("2024-01-03", 100.0), ("2024-01-05", 98.0)]);

        let chart = align_all(&[a, b]);

        assert_eq!(
            chart.labels,
            vec![
                date("2024-01-02"),
                date("2024-01-03"),
                date("2024-01-04"),
                date("2024-01-05"),
            ]
        );
        let a = chart.series_by_label("A").unwrap();
        let b = chart.series_by_label("B").unwrap();
        assert_eq!(a.values, vec![Some(100.0), Some(100.0), Some(104.0), Some(104.0)]);
        assert_eq!(b.values, vec![None, Some(100.0), Some(100.0), Some(98.0)]);
    }

    #[test]
    fn empty_series_are_dropped() {
        let a = series("A", &[("2024-01-02", 100.0)]);
        let chart = align_all(&[a, CompositeSeries::empty("B")]);

        assert_eq!(chart.series.len(), 1);
        assert!(align_all(&[CompositeSeries::empty("B")]).is_empty());
    }
}

mod history_caching {
    use super::*;

    #[tokio::test]
    async fn stale_record_requests_only_missing_days() {
        let provider = Arc::new(
            MockProvider::new().with_points(
                "MSFT",
                vec![
                    point("2024-05-01", 400.0),
                    point("2024-05-02", 401.0),
                    point("2024-05-03", 405.0),
                    point("2024-05-06", 410.0),
                ],
            ),
        );
        let cached = InstrumentHistory::new(
            "MSFT",
            "mock",
            at("2024-05-02T22:00:00Z"),
            vec![point("2024-05-01", 400.0), point("2024-05-02", 401.0)],
        );
        let store = Arc::new(MemoryStore::default().with_history(cached));
        let cache = HistoryCache::new(provider.clone(), store.clone());
        let now = at("2024-05-06T21:00:00Z");

        let history = cache.get_at("MSFT", now).await.unwrap();

        let calls = provider.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].1, midnight(date("2024-05-03")));
        assert_eq!(calls[0].2, now.timestamp() + ONE_DAY_SECS);
        assert_eq!(history.points.len(), 4);
        assert_eq!(history.last_date(), Some(date("2024-05-06")));
        assert_eq!(store.get_record("MSFT").unwrap().points.len(), 4);
    }

    #[tokio::test]
    async fn second_lookup_same_day_skips_provider() {
        let provider = Arc::new(
            MockProvider::new().with_points("AAPL", daily("2024-05-01", &[1.0, 2.0, 3.0])),
        );
        let cache = HistoryCache::new(provider.clone(), Arc::new(MemoryStore::default()));
        let now = at("2024-05-03T20:00:00Z");

        let first = cache.get_at("AAPL", now).await.unwrap();
        let second = cache.get_at("AAPL", now).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(provider.calls().len(), 1);
        assert_eq!(provider.calls()[0].1, 0);
    }

    #[tokio::test]
    async fn provider_failure_leaves_store_untouched() {
        let provider = Arc::new(MockProvider::new().with_error("BAD", "upstream returned 404"));
        let store = Arc::new(MemoryStore::default());
        let cache = HistoryCache::new(provider, store.clone());

        let err = cache.get_at("BAD", at("2024-05-03T20:00:00Z")).await.unwrap_err();

        assert!(matches!(err, PerfError::Provider { .. }));
        assert!(store.get_record("BAD").is_none());
    }

    #[test]
    fn merging_is_idempotent() {
        let a = daily("2024-01-01", &[1.0, 2.0, 3.0]);
        let once = merge_by_date(&a, &a);
        assert_eq!(once, a);
        assert_eq!(merge_by_date(&once, &a), once);
    }
}

mod year_over_year {
    use super::*;

    fn year_ends(first_year: i32, values: &[f64]) -> (Vec<NaiveDate>, Vec<Option<f64>>) {
        let labels = (0..values.len())
            .map(|i| NaiveDate::from_ymd_opt(first_year + i as i32, 12, 31).unwrap())
            .collect();
        (labels, values.iter().map(|v| Some(*v)).collect())
    }

    #[test]
    fn five_rows_from_six_year_ends() {
        let (labels, values) = year_ends(2019, &[100.0, 112.0, 126.0, 138.0, 152.0, 168.0]);

        let rows = yoy(&labels, &values, Range::FiveYears).unwrap();

        assert_eq!(rows.len(), 5);
        assert_eq!(rows[0].year, 2020);
        assert_relative_eq!(rows[0].return_pct, 12.0, epsilon = 1e-9);
    }

    #[test]
    fn short_ranges_are_refused() {
        let (labels, values) = year_ends(2019, &[100.0, 112.0]);
        for range in [Range::Ytd, Range::OneYear] {
            assert!(matches!(
                yoy(&labels, &values, range),
                Err(PerfError::UnsupportedRange { .. })
            ));
        }
    }
}

mod comparison_fan_out {
    use super::*;

    fn build(provider: MockProvider, groups: MemoryGroups) -> Comparison {
        let cache = HistoryCache::new(Arc::new(provider), Arc::new(MemoryStore::default()));
        Comparison::new(cache, Arc::new(TickerResolver::default()), Arc::new(groups))
    }

    #[tokio::test]
    async fn one_failing_symbol_does_not_sink_the_group() {
        let provider = MockProvider::new()
            .with_points("AAPL", daily("2024-03-01", &[100.0, 110.0]))
            .with_points("MSFT", daily("2024-03-01", &[300.0, 330.0]))
            .with_error("NVDA", "upstream returned 500");
        let groups = MemoryGroups::default().with_group(
            "Tech",
            &[("AAPL", 40.0), ("MSFT", 40.0), ("NVDA", 20.0)],
        );
        let comparison = build(provider, groups);

        let report = comparison.compare(&["tech", "aapl"], Range::Ytd).await.unwrap();

        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].symbol, "NVDA");
        assert_eq!(report.failures[0].reason, "upstream returned 500");
        let tech = report.chart.series_by_label("Tech").unwrap();
        assert_relative_eq!(tech.values[1].unwrap(), 110.0, epsilon = 1e-9);
        assert_eq!(report.chart.series.len(), 2);
    }

    #[tokio::test]
    async fn each_distinct_symbol_is_fetched_once() {
        let provider = Arc::new(
            MockProvider::new()
                .with_points("AAPL", daily("2024-03-01", &[1.0, 2.0]))
                .with_points("MSFT", daily("2024-03-01", &[1.0, 2.0])),
        );
        let cache = HistoryCache::new(provider.clone(), Arc::new(MemoryStore::default()));
        let comparison = Comparison::new(
            cache,
            Arc::new(TickerResolver::default()),
            Arc::new(MemoryGroups::default().with_group("Pair", &[("AAPL", 50.0), ("MSFT", 50.0)])),
        );

        comparison
            .compare(&["pair", "AAPL", "MSFT"], Range::Ytd)
            .await
            .unwrap();

        let mut fetched: Vec<String> = provider.calls().into_iter().map(|c| c.0).collect();
        fetched.sort();
        assert_eq!(fetched, vec!["AAPL".to_string(), "MSFT".to_string()]);
    }

    fn provider_reason(err: PerfError) -> (String, String) {
        match err {
            PerfError::Provider { symbol, reason } => (symbol, reason),
            other => panic!("expected Provider error, got: {other}"),
        }
    }

    #[tokio::test]
    async fn failed_basket_surfaces_provider_reason() {
        let comparison = build(
            MockProvider::new().with_error("AAPL", "upstream returned 500"),
            MemoryGroups::default(),
        );

        let err = comparison
            .get_composite(&Basket::single("AAPL"), Range::Ytd)
            .await
            .unwrap_err();
        assert_eq!(
            provider_reason(err),
            ("AAPL".to_string(), "upstream returned 500".to_string())
        );

        let err = comparison.yoy("AAPL", Range::FiveYears).await.unwrap_err();
        assert_eq!(provider_reason(err).1, "upstream returned 500");

        let err = comparison.compare(&["AAPL"], Range::Ytd).await.unwrap_err();
        assert_eq!(provider_reason(err).1, "upstream returned 500");
    }

    #[tokio::test]
    async fn partial_basket_failure_rides_along_with_the_curve() {
        let comparison = build(
            MockProvider::new()
                .with_points("AAPL", daily("2024-03-01", &[100.0, 110.0]))
                .with_error("NVDA", "timeout"),
            MemoryGroups::default().with_group("Mix", &[("AAPL", 50.0), ("NVDA", 50.0)]),
        );
        let basket = comparison.resolve_entry("mix").unwrap();

        let composite = comparison.get_composite(&basket, Range::Ytd).await.unwrap();

        assert_eq!(composite.series.points.len(), 2);
        assert_eq!(composite.failures.len(), 1);
        assert_eq!(composite.failures[0].symbol, "NVDA");
        assert_eq!(composite.failures[0].reason, "timeout");
    }

    #[tokio::test]
    async fn empty_histories_without_failures_is_insufficient_data() {
        let comparison = build(
            MockProvider::new().with_points("AAPL", Vec::new()),
            MemoryGroups::default(),
        );

        let err = comparison.compare(&["AAPL"], Range::Ytd).await.unwrap_err();
        assert!(matches!(err, PerfError::InsufficientData { .. }));
    }
}

proptest! {
    #[test]
    fn composite_starts_at_100(closes in prop::collection::vec(1.0f64..1000.0, 1..60)) {
        let histories = closes_map(&[("X", daily("2024-01-01", &closes))]);
        let series = build_composite(&Basket::single("X"), &histories, Range::TenYears);

        prop_assert_eq!(series.points.len(), closes.len());
        prop_assert!((series.points[0].value - 100.0).abs() < 1e-9);
    }

    #[test]
    fn aligned_series_match_label_count(
        a in prop::collection::vec(1.0f64..500.0, 1..30),
        b in prop::collection::vec(1.0f64..500.0, 1..30),
        offset in 0i64..40,
    ) {
        let start_b = date("2024-01-01") + chrono::Duration::days(offset);
        let histories = closes_map(&[
            ("A", daily("2024-01-01", &a)),
            ("B", daily(&start_b.to_string(), &b)),
        ]);
        let composites = vec![
            build_composite(&Basket::single("A"), &histories, Range::TenYears),
            build_composite(&Basket::single("B"), &histories, Range::TenYears),
        ];

        let chart = align_all(&composites);

        prop_assert_eq!(chart.series.len(), 2);
        for s in &chart.series {
            prop_assert_eq!(s.values.len(), chart.labels.len());
            let first = s.values.iter().position(|v| v.is_some()).unwrap();
            prop_assert!(s.values[first..].iter().all(|v| v.is_some()));
        }
    }
}
