//! Stream merger: joins the three normalized streams into daily facts.

use crate::config::MergeMode;
use crate::error::{CoreError, Result};
use crate::metrics::Metrics;
use crate::normalize::{NormalizedRow, SourceKind};
use crate::record::GroupKey;
use std::collections::{BTreeMap, HashMap};

/// One row of the daily fact table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyFact {
    pub key: GroupKey,
    pub metrics: Metrics,
}

/// Left-join impressions with clicks and payments on the full group key
/// (or union all three under [`MergeMode::FullOuter`]), zero-filling
/// absent metrics. Output is sorted by group key.
pub fn merge(
    impressions: &[NormalizedRow],
    clicks: &[NormalizedRow],
    payments: &[NormalizedRow],
    mode: MergeMode,
) -> Result<Vec<DailyFact>> {
    let impressions = index_unique(SourceKind::Impressions, impressions)?;
    let clicks = index_unique(SourceKind::Clicks, clicks)?;
    let payments = index_unique(SourceKind::Payments, payments)?;

    let mut facts: BTreeMap<&GroupKey, Metrics> = BTreeMap::new();

    for (key, row) in &impressions {
        facts.entry(*key).or_default().impressions = row.count;
    }

    let mut dropped = 0usize;
    for (key, row) in &clicks {
        match fact_slot(&mut facts, *key, mode) {
            Some(metrics) => metrics.clicks = row.count,
            None => dropped += 1,
        }
    }
    for (key, row) in &payments {
        match fact_slot(&mut facts, *key, mode) {
            Some(metrics) => {
                metrics.payments_qty = row.count;
                metrics.total = row.total;
            }
            None => dropped += 1,
        }
    }

    if dropped > 0 {
        tracing::warn!(
            dropped,
            mode = %mode,
            "click/payment groups without a same-day impression were dropped"
        );
    }
    tracing::info!(facts = facts.len(), "merged daily facts");

    Ok(facts
        .into_iter()
        .map(|(key, metrics)| DailyFact {
            key: key.clone(),
            metrics,
        })
        .collect())
}

fn fact_slot<'m, 'k>(
    facts: &'m mut BTreeMap<&'k GroupKey, Metrics>,
    key: &'k GroupKey,
    mode: MergeMode,
) -> Option<&'m mut Metrics> {
    match mode {
        MergeMode::ImpressionsDriven => facts.get_mut(key),
        MergeMode::FullOuter => Some(facts.entry(key).or_default()),
    }
}

fn index_unique(kind: SourceKind, rows: &[NormalizedRow]) -> Result<HashMap<&GroupKey, &NormalizedRow>> {
    let mut index = HashMap::with_capacity(rows.len());
    for row in rows {
        if index.insert(&row.key, row).is_some() {
            return Err(CoreError::duplicate_key(kind.as_str(), row.key.clone()));
        }
    }
    Ok(index)
}
