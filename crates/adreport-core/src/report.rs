//! Report assembler: joins daily facts with their trailing-window totals.

use crate::merge::DailyFact;
use crate::metrics::Metrics;
use crate::record::GroupKey;
use crate::window::{window_start, WindowAggregate};
use chrono::NaiveDate;
use std::collections::HashMap;

/// One output row: same-day metrics followed by the windowed metrics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRow {
    pub key: GroupKey,
    pub current: Metrics,
    pub prev: Metrics,
}

/// Restricts the report to the most recent reporting period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodFilter {
    /// Latest date observed in the impressions stream.
    pub max_date: Option<NaiveDate>,
    /// Period length in days.
    pub period: u32,
}

impl PeriodFilter {
    /// Keeps rows with `date > max_date - period`. Without a max date
    /// nothing is retained.
    pub fn retains(&self, date: NaiveDate) -> bool {
        match self.max_date {
            Some(max_date) => date > window_start(max_date, i64::from(self.period)),
            None => false,
        }
    }
}

/// Output column names, in order, for a window of `window_days`.
pub fn report_columns(window_days: i64) -> Vec<String> {
    let mut columns: Vec<String> = [
        "date",
        "user_id",
        "value_prop",
        "impressions",
        "clicks",
        "payments_qty",
        "total",
    ]
    .iter()
    .map(|c| c.to_string())
    .collect();

    for metric in ["impressions", "clicks", "payments", "total"] {
        columns.push(format!("{}_prev_{}_days", metric, window_days));
    }
    columns
}

/// Left-join facts to aggregates on the full group key, optionally keeping
/// only the latest period. Unmatched aggregates become zero. Output is
/// sorted by group key.
pub fn assemble(
    facts: &[DailyFact],
    aggregates: &[WindowAggregate],
    filter: Option<PeriodFilter>,
) -> Vec<ReportRow> {
    let by_key: HashMap<&GroupKey, &Metrics> =
        aggregates.iter().map(|a| (&a.key, &a.prev)).collect();

    let mut rows: Vec<ReportRow> = facts
        .iter()
        .filter(|fact| filter.map_or(true, |f| f.retains(fact.key.date)))
        .map(|fact| ReportRow {
            key: fact.key.clone(),
            current: fact.metrics,
            prev: by_key.get(&fact.key).map(|m| **m).unwrap_or_default(),
        })
        .collect();

    rows.sort_by(|a, b| a.key.cmp(&b.key));
    tracing::info!(rows = rows.len(), filtered = filter.is_some(), "assembled report");
    rows
}
