//! End-to-end scenarios over typed records.

use adreport_core::{
    run, FieldValue, MergeMode, Metrics, PipelineInput, Record, ReportConfig, SourceBatch,
    WindowStrategy,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

/// A print/tap record shaped like the flattened JSON events.
fn event(day: &str, user: i64, prop: &str) -> Record {
    Record::from([
        ("day".to_string(), FieldValue::Date(date(day))),
        ("user_id".to_string(), FieldValue::Int(user)),
        ("value_prop".to_string(), FieldValue::Str(prop.to_string())),
        ("position".to_string(), FieldValue::Int(1)),
    ])
}

/// A payment record shaped like the CSV rows.
fn payment(day: &str, user: i64, prop: &str, total: i64) -> Record {
    Record::from([
        ("pay_date".to_string(), FieldValue::Date(date(day))),
        ("user_id".to_string(), FieldValue::Int(user)),
        ("value_prop".to_string(), FieldValue::Str(prop.to_string())),
        ("total".to_string(), FieldValue::Decimal(Decimal::from(total))),
    ])
}

fn cents_payment(day: &str, user: i64, prop: &str, cents: i64) -> Record {
    let mut record = payment(day, user, prop, 0);
    record.insert("total".to_string(), FieldValue::Decimal(Decimal::new(cents, 2)));
    record
}

fn batch(rename_from: &str, records: Vec<Record>) -> SourceBatch {
    SourceBatch {
        rename: BTreeMap::from([(rename_from.to_string(), "date".to_string())]),
        records,
    }
}

fn input(prints: Vec<Record>, taps: Vec<Record>, pays: Vec<Record>) -> PipelineInput {
    PipelineInput {
        impressions: batch("day", prints),
        clicks: batch("day", taps),
        payments: batch("pay_date", pays),
    }
}

fn unfiltered() -> ReportConfig {
    ReportConfig {
        filter_output: false,
        ..ReportConfig::default()
    }
}

#[test]
fn test_single_day_without_clicks() {
    let input = input(
        vec![event("2024-01-01", 1, "propA")],
        vec![],
        vec![payment("2024-01-01", 1, "propA", 10)],
    );

    let report = run(ReportConfig::default(), &input).unwrap();

    assert_eq!(report.window_days, 21);
    assert_eq!(report.rows.len(), 1);
    let row = &report.rows[0];
    assert_eq!(row.key.date, date("2024-01-01"));
    assert_eq!(
        row.current,
        Metrics {
            impressions: 1,
            clicks: 0,
            payments_qty: 1,
            total: Decimal::from(10),
        }
    );
    assert!(row.prev.is_zero());
}

#[test]
fn test_previous_impression_counted() {
    let input = input(
        vec![event("2024-01-01", 5, "propB"), event("2024-01-10", 5, "propB")],
        vec![],
        vec![],
    );

    let report = run(unfiltered(), &input).unwrap();

    let rows = report.rows_for(5, "propB");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].key.date, date("2024-01-10"));
    assert_eq!(rows[0].prev.impressions, 1);
    assert_eq!(rows[1].prev.impressions, 0);
}

#[test]
fn test_output_filter_uses_impressions_max_date() {
    let input = input(
        vec![
            event("2024-01-24", 1, "p"),
            event("2024-01-25", 1, "p"),
            event("2024-02-01", 2, "p"),
        ],
        vec![],
        // A later payment must not move the cut-off.
        vec![payment("2024-02-20", 2, "p", 1)],
    );

    let report = run(ReportConfig::default(), &input).unwrap();

    let dates: Vec<NaiveDate> = report.rows.iter().map(|r| r.key.date).collect();
    assert_eq!(dates, vec![date("2024-01-25"), date("2024-02-01")]);
    // History still includes the filtered-out day.
    assert_eq!(report.rows[0].prev.impressions, 1);
    assert_eq!(report.facts.len(), 3);
}

#[test]
fn test_clicks_only_group_dropped_unless_full_outer() {
    let input = input(
        vec![event("2024-01-01", 1, "p")],
        vec![event("2024-01-01", 2, "p")],
        vec![],
    );

    let left = run(unfiltered(), &input).unwrap();
    assert_eq!(left.rows.len(), 1);

    let full = run(
        ReportConfig {
            merge: MergeMode::FullOuter,
            ..unfiltered()
        },
        &input,
    )
    .unwrap();
    assert_eq!(full.rows.len(), 2);
    assert_eq!(full.rows[1].current.clicks, 1);
    assert_eq!(full.rows[1].current.impressions, 0);
}

#[test]
fn test_input_order_does_not_matter() {
    let prints = vec![
        event("2024-01-01", 1, "a"),
        event("2024-01-03", 1, "a"),
        event("2024-01-03", 1, "a"),
        event("2024-01-02", 2, "b"),
        event("2024-01-09", 2, "b"),
    ];
    let taps = vec![event("2024-01-03", 1, "a"), event("2024-01-09", 2, "b")];
    let pays = vec![payment("2024-01-01", 1, "a", 4), payment("2024-01-09", 2, "b", 6)];

    let forward = run(unfiltered(), &input(prints.clone(), taps.clone(), pays.clone())).unwrap();

    let mut prints_rev = prints;
    prints_rev.reverse();
    let mut taps_rev = taps;
    taps_rev.reverse();
    let mut pays_rev = pays;
    pays_rev.reverse();
    let backward = run(unfiltered(), &input(prints_rev, taps_rev, pays_rev)).unwrap();

    assert_eq!(forward, backward);
}

#[test]
fn test_rerun_is_identical_across_strategies() {
    let input = input(
        (1..=28)
            .map(|d| event(&format!("2024-02-{:02}", d), i64::from(d % 3), "p"))
            .collect(),
        vec![event("2024-02-05", 2, "p")],
        vec![
            payment("2024-02-10", 1, "p", 12),
            cents_payment("2024-02-01", 1, "p", 150),
        ],
    );

    let first = run(ReportConfig::default(), &input).unwrap();
    let second = run(ReportConfig::default(), &input).unwrap();
    let reference = run(
        ReportConfig {
            strategy: WindowStrategy::SelfJoin,
            ..ReportConfig::default()
        },
        &input,
    )
    .unwrap();

    assert_eq!(first, second);
    assert_eq!(first, reference);

    let render = |rows: &[adreport_core::ReportRow]| -> Vec<String> {
        rows.iter()
            .map(|row| format!("{} {} {}", row.key, row.current.total, row.prev.total))
            .collect()
    };
    assert_eq!(render(&first.rows), render(&reference.rows));
}

#[test]
fn test_invalid_config_fails_before_work() {
    let config = ReportConfig {
        lookback_periods: 0,
        ..ReportConfig::default()
    };
    assert!(run(config, &PipelineInput::default()).is_err());
}
