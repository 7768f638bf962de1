//! End-to-end tests for the weekly metrics worker.
//!
//! These tests drive the real `MetricsWorker` against in-memory stores that
//! implement the same `ResultsStore`/`MetricsStore` traits as the warehouse
//! client, so every production code path runs except the actual ClickHouse
//! transport.

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use pipeline_core::{AggregateRecord, MetricFamily, ReferenceZone};
use worker::MetricsWorker;

use integration_tests::fixtures;
use integration_tests::mocks::{InMemoryMetricsStore, InMemoryResultsStore};

fn worker_over(
    results: &InMemoryResultsStore,
    store: &InMemoryMetricsStore,
) -> MetricsWorker {
    MetricsWorker::new(
        Arc::new(results.clone()),
        Arc::new(store.clone()),
        ReferenceZone::default(),
    )
}

/// Fresh backfill: three weeks of data, no aggregates yet. Every non-empty
/// week lands in all three tables.
#[tokio::test]
async fn test_fresh_backfill_inserts_every_week() {
    let results = InMemoryResultsStore::new();
    let store = InMemoryMetricsStore::new();
    let zone = ReferenceZone::default();

    let base = fixtures::base_instant();
    results.seed(fixtures::passing_result(base));
    results.seed(fixtures::failing_result(base + Duration::days(7)));
    results.seed(fixtures::passing_result(base + Duration::days(14)));

    // "Now" lands in the third week.
    let now = base + Duration::days(14) + Duration::hours(2);
    let summary = worker_over(&results, &store).run_at(now).await.unwrap();

    assert_eq!(summary.weeks_scanned, 3);
    assert_eq!(summary.weeks_skipped, 0);
    assert_eq!(summary.weeks_empty, 0);
    assert_eq!(summary.records_inserted, 9);
    assert_eq!(summary.records_updated, 0);
    assert_eq!(store.total_rows(), 9);

    // Each family carries one row per week.
    for family in MetricFamily::ALL {
        let windows: Vec<_> = store.rows(family).iter().map(|r| r.window()).collect();
        assert_eq!(windows.len(), 3);
        for (i, w) in windows.iter().enumerate() {
            assert_eq!(w.start, zone.week_start(base) + Duration::days(7 * i as i64));
        }
    }
}

/// A second run over unchanged data reprocesses only the current week, and
/// never duplicates rows.
#[tokio::test]
async fn test_rerun_updates_only_current_week() {
    let results = InMemoryResultsStore::new();
    let store = InMemoryMetricsStore::new();
    let zone = ReferenceZone::default();

    let base = fixtures::base_instant();
    results.seed(fixtures::passing_result(base));
    results.seed(fixtures::failing_result(base + Duration::days(7)));

    let now = base + Duration::days(7) + Duration::hours(1);
    let worker = worker_over(&results, &store);

    let first = worker.run_at(now).await.unwrap();
    assert_eq!(first.records_inserted, 6);

    let second = worker.run_at(now).await.unwrap();
    assert_eq!(second.weeks_scanned, 2);
    assert_eq!(second.weeks_skipped, 1, "closed week must be skipped");
    assert_eq!(second.records_inserted, 0);
    assert_eq!(second.records_updated, 3, "current week is always refreshed");

    // Still exactly one row per (table, window).
    assert_eq!(store.total_rows(), 6);
    for family in MetricFamily::ALL {
        for window in zone.week_ranges(base, now) {
            assert_eq!(
                store.rows_for_window(family, window).len(),
                1,
                "one row per table per window"
            );
        }
    }
}

/// A week missing from any one table is reprocessed into all three, so a
/// partially written family can never stay inconsistent.
#[tokio::test]
async fn test_partial_table_forces_full_week_reprocess() {
    let results = InMemoryResultsStore::new();
    let store = InMemoryMetricsStore::new();
    let zone = ReferenceZone::default();

    let base = fixtures::base_instant();
    results.seed(fixtures::passing_result(base));
    results.seed(fixtures::passing_result(base + Duration::days(7)));

    let now = base + Duration::days(7) + Duration::hours(1);
    let worker = worker_over(&results, &store);
    worker.run_at(now).await.unwrap();

    // Simulate a past partial failure: the closed week's confidence row is
    // gone, the other two tables still have it.
    let closed = zone.window_of(base);
    store.remove_window(MetricFamily::Confidence, closed);
    assert_eq!(store.rows_for_window(MetricFamily::Confidence, closed).len(), 0);

    let summary = worker.run_at(now).await.unwrap();
    assert_eq!(summary.weeks_skipped, 0, "incomplete week must not be skipped");
    // Closed week: 1 insert (confidence) + 2 updates; current week: 3 updates.
    assert_eq!(summary.records_inserted, 1);
    assert_eq!(summary.records_updated, 5);

    for family in MetricFamily::ALL {
        assert_eq!(store.rows_for_window(family, closed).len(), 1);
    }
}

/// Updates rewrite the payload but preserve the existing row id.
#[tokio::test]
async fn test_update_preserves_row_id() {
    let results = InMemoryResultsStore::new();
    let store = InMemoryMetricsStore::new();
    let zone = ReferenceZone::default();

    let base = fixtures::base_instant();
    results.seed(fixtures::passing_result(base));

    let now = base + Duration::hours(3);
    let worker = worker_over(&results, &store);
    worker.run_at(now).await.unwrap();

    let window = zone.window_of(base);
    let before = store.rows_for_window(MetricFamily::ClassFrequency, window);
    assert_eq!(before.len(), 1);
    let original_id = before[0].id();

    // New data arrives inside the same (current) week.
    results.seed(fixtures::failing_result(base + Duration::hours(1)));
    worker.run_at(now).await.unwrap();

    let after = store.rows_for_window(MetricFamily::ClassFrequency, window);
    assert_eq!(after.len(), 1);
    assert_eq!(after[0].id(), original_id, "update must not change the row id");

    match &after[0] {
        AggregateRecord::ClassFrequency(r) => {
            assert_eq!(r.pass_count, 1);
            assert_eq!(r.fail_count, 1);
        }
        other => panic!("unexpected record: {:?}", other),
    }
}

/// Weeks with no source rows write nothing, in any table.
#[tokio::test]
async fn test_empty_weeks_write_nothing() {
    let results = InMemoryResultsStore::new();
    let store = InMemoryMetricsStore::new();

    let base = fixtures::base_instant();
    results.seed(fixtures::passing_result(base));
    // Nothing for two weeks, then one more row.
    results.seed(fixtures::passing_result(base + Duration::days(21)));

    let now = base + Duration::days(21) + Duration::hours(1);
    let summary = worker_over(&results, &store).run_at(now).await.unwrap();

    assert_eq!(summary.weeks_scanned, 4);
    assert_eq!(summary.weeks_empty, 2);
    assert_eq!(summary.records_inserted, 6);
    assert_eq!(store.total_rows(), 6);
}

/// An empty results table is a no-op run, not an error.
#[tokio::test]
async fn test_no_results_is_a_noop() {
    let results = InMemoryResultsStore::new();
    let store = InMemoryMetricsStore::new();

    let summary = worker_over(&results, &store)
        .run_at(Utc.with_ymd_and_hms(2024, 6, 10, 0, 0, 0).unwrap())
        .await
        .unwrap();

    assert_eq!(summary.weeks_scanned, 0);
    assert_eq!(store.total_rows(), 0);
}

/// A store failure surfaces as an error instead of a partial success.
#[tokio::test]
async fn test_store_failure_fails_the_run() {
    let results = InMemoryResultsStore::new();
    let store = InMemoryMetricsStore::new();

    results.seed(fixtures::passing_result(fixtures::base_instant()));
    store.set_should_fail(true);

    let err = worker_over(&results, &store)
        .run_at(fixtures::base_instant() + Duration::hours(1))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("mock metrics store failure"));
}
