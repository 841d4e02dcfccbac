//! Trailing-window aggregation.
//!
//! For every daily fact keyed `(date, user_id, value_prop)`, sums the
//! metrics of all facts of the same `(user_id, value_prop)` whose date lies
//! in the half-open window `[date - W, date)`. The current day is never
//! counted, and a fact with no history still gets an all-zero aggregate.
//!
//! Two formulations are provided:
//!
//! - [`sliding_window`] partitions by `(user_id, value_prop)`, sorts each
//!   partition by date and keeps a running sum between two pointers, so
//!   each partition is traversed once. Partitions are independent and are
//!   processed in parallel.
//! - [`self_join`] pairs every fact with every fact of its partition and
//!   filters on the date range. Quadratic in partition size; kept as the
//!   reference the sliding window is checked against.

use crate::config::WindowStrategy;
use crate::merge::DailyFact;
use crate::metrics::Metrics;
use crate::record::{GroupKey, PartitionKey};
use chrono::{NaiveDate, TimeDelta};
use rayon::prelude::*;
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Windowed totals for one group key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowAggregate {
    pub key: GroupKey,
    pub prev: Metrics,
}

/// Compute one aggregate per fact using the chosen strategy.
pub fn aggregate(facts: &[DailyFact], window_days: i64, strategy: WindowStrategy) -> Vec<WindowAggregate> {
    let aggregates = match strategy {
        WindowStrategy::SlidingWindow => sliding_window(facts, window_days),
        WindowStrategy::SelfJoin => self_join(facts, window_days),
    };
    tracing::info!(
        aggregates = aggregates.len(),
        window_days,
        strategy = %strategy,
        "computed trailing-window aggregates"
    );
    aggregates
}

/// First date inside the window ending (exclusively) at `date`.
pub fn window_start(date: NaiveDate, window_days: i64) -> NaiveDate {
    TimeDelta::try_days(window_days)
        .and_then(|span| date.checked_sub_signed(span))
        .unwrap_or(NaiveDate::MIN)
}

fn partitions(facts: &[DailyFact]) -> HashMap<PartitionKey, Vec<&DailyFact>> {
    let mut partitions: HashMap<PartitionKey, Vec<&DailyFact>> = HashMap::new();
    for fact in facts {
        partitions.entry(fact.key.partition()).or_default().push(fact);
    }
    partitions
}

/// Partition + two-pointer formulation. Output is sorted by group key.
pub fn sliding_window(facts: &[DailyFact], window_days: i64) -> Vec<WindowAggregate> {
    let partitions = partitions(facts);
    tracing::debug!(partitions = partitions.len(), "sliding window over partitions");

    let mut aggregates: Vec<WindowAggregate> = partitions
        .into_par_iter()
        .flat_map_iter(|(_, mut rows)| {
            rows.sort_by_key(|fact| fact.key.date);
            slide(&rows, window_days)
        })
        .collect();

    aggregates.sort_by(|a, b| a.key.cmp(&b.key));
    aggregates
}

/// Single pass over one date-sorted partition.
///
/// `rows[lo..hi]` always holds exactly the rows with
/// `window_start(date) <= row.date < date` for the current row, and `sum`
/// is their total. Both pointers only move forward.
fn slide(rows: &[&DailyFact], window_days: i64) -> Vec<WindowAggregate> {
    let mut out = Vec::with_capacity(rows.len());
    let mut sum = Metrics::default();
    let mut scales = LiveScales::default();
    let (mut lo, mut hi) = (0usize, 0usize);

    for fact in rows {
        let date = fact.key.date;
        let start = window_start(date, window_days);

        while hi < rows.len() && rows[hi].key.date < date {
            sum += &rows[hi].metrics;
            scales.add(rows[hi].metrics.total);
            hi += 1;
        }
        while lo < hi && rows[lo].key.date < start {
            sum -= &rows[lo].metrics;
            scales.remove(rows[lo].metrics.total);
            lo += 1;
        }
        // Subtraction never lowers the scale; match a fresh sum of rows[lo..hi].
        sum.total.rescale(scales.max());

        out.push(WindowAggregate {
            key: fact.key.clone(),
            prev: sum,
        });
    }

    out
}

/// Largest scale a `Decimal` can carry.
const MAX_DECIMAL_SCALE: usize = 28;

/// How many in-window totals carry each `Decimal` scale.
///
/// A sum of decimals has the largest scale among its terms, so the running
/// sum is rescaled to the largest scale still present after rows leave.
#[derive(Debug, Default)]
struct LiveScales {
    counts: [u32; MAX_DECIMAL_SCALE + 1],
}

impl LiveScales {
    fn add(&mut self, total: Decimal) {
        self.counts[total.scale() as usize] += 1;
    }

    fn remove(&mut self, total: Decimal) {
        self.counts[total.scale() as usize] -= 1;
    }

    fn max(&self) -> u32 {
        self.counts.iter().rposition(|&n| n > 0).unwrap_or(0) as u32
    }
}

/// Self-join with range predicate. Output is sorted by group key.
pub fn self_join(facts: &[DailyFact], window_days: i64) -> Vec<WindowAggregate> {
    let partitions = partitions(facts);

    let mut aggregates: Vec<WindowAggregate> = facts
        .iter()
        .map(|fact| {
            let date = fact.key.date;
            let start = window_start(date, window_days);
            let mut prev = Metrics::default();
            if let Some(others) = partitions.get(&fact.key.partition()) {
                for other in others {
                    if other.key.date >= start && other.key.date < date {
                        prev += &other.metrics;
                    }
                }
            }
            WindowAggregate {
                key: fact.key.clone(),
                prev,
            }
        })
        .collect();

    aggregates.sort_by(|a, b| a.key.cmp(&b.key));
    aggregates
}
