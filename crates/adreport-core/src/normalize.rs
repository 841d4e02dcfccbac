//! Event normalizer: raw typed records to one row per group per day.

use crate::error::{CoreError, Result};
use crate::record::{FieldValue, GroupKey, Record};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};

pub const DATE: &str = "date";
pub const USER_ID: &str = "user_id";
pub const VALUE_PROP: &str = "value_prop";
pub const TOTAL: &str = "total";

/// The three event sources a report is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SourceKind {
    Impressions,
    Clicks,
    Payments,
}

impl SourceKind {
    pub const ALL: [SourceKind; 3] = [SourceKind::Impressions, SourceKind::Clicks, SourceKind::Payments];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Impressions => "impressions",
            SourceKind::Clicks => "clicks",
            SourceKind::Payments => "payments",
        }
    }

    /// Canonical fields a record of this kind must carry after renaming.
    pub fn required_fields(&self) -> &'static [&'static str] {
        match self {
            SourceKind::Impressions | SourceKind::Clicks => &[DATE, USER_ID, VALUE_PROP],
            SourceKind::Payments => &[DATE, USER_ID, VALUE_PROP, TOTAL],
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A group key with its per-day metrics for one source.
///
/// `count` is the number of raw events in the group. `total` is the summed
/// payment amount and stays zero for impressions and clicks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedRow {
    pub key: GroupKey,
    pub count: u64,
    pub total: Decimal,
}

/// Maps canonical field names back to the source's own field names.
#[derive(Debug, Clone)]
struct FieldResolver<'a> {
    sources: HashMap<&'a str, &'a str>,
}

impl<'a> FieldResolver<'a> {
    fn new(kind: SourceKind, rename: &'a BTreeMap<String, String>) -> Result<Self> {
        let mut sources = HashMap::new();
        for (from, to) in rename {
            if let Some(previous) = sources.insert(to.as_str(), from.as_str()) {
                return Err(CoreError::config(format!(
                    "{}: fields '{}' and '{}' are both renamed to '{}'",
                    kind, previous, from, to
                )));
            }
        }
        Ok(Self { sources })
    }

    fn source_name<'b>(&self, canonical: &'b str) -> &'b str
    where
        'a: 'b,
    {
        self.sources.get(canonical).copied().unwrap_or(canonical)
    }
}

/// Rename, group by `(date, user_id, value_prop)` and count (and for
/// payments, sum `total`). Output is sorted by group key.
pub fn normalize(
    kind: SourceKind,
    rename: &BTreeMap<String, String>,
    records: &[Record],
) -> Result<Vec<NormalizedRow>> {
    let resolver = FieldResolver::new(kind, rename)?;
    let mut groups: BTreeMap<GroupKey, (u64, Decimal)> = BTreeMap::new();

    for (index, record) in records.iter().enumerate() {
        let reader = RecordReader {
            kind,
            index,
            record,
            resolver: &resolver,
        };

        let key = GroupKey {
            date: reader.date(DATE)?,
            user_id: reader.int(USER_ID)?,
            value_prop: reader.string(VALUE_PROP)?,
        };
        let amount = match kind {
            SourceKind::Payments => reader.amount(TOTAL)?,
            SourceKind::Impressions | SourceKind::Clicks => Decimal::ZERO,
        };

        let entry = groups.entry(key).or_insert((0, Decimal::ZERO));
        entry.0 += 1;
        entry.1 += amount;
    }

    tracing::info!(
        source = kind.as_str(),
        records = records.len(),
        groups = groups.len(),
        "normalized source"
    );

    Ok(groups
        .into_iter()
        .map(|(key, (count, total))| NormalizedRow { key, count, total })
        .collect())
}

/// Latest date in a normalized stream.
pub fn max_date(rows: &[NormalizedRow]) -> Option<NaiveDate> {
    rows.iter().map(|row| row.key.date).max()
}

struct RecordReader<'r> {
    kind: SourceKind,
    index: usize,
    record: &'r Record,
    resolver: &'r FieldResolver<'r>,
}

impl<'r> RecordReader<'r> {
    fn get(&self, canonical: &str) -> Result<&'r FieldValue> {
        let name = self.resolver.source_name(canonical);
        self.record
            .get(name)
            .ok_or_else(|| CoreError::missing_field(self.kind.as_str(), canonical, self.index))
    }

    fn mismatch(&self, canonical: &str, expected: &str, found: &FieldValue) -> CoreError {
        CoreError::schema_mismatch(
            self.kind.as_str(),
            canonical,
            self.index,
            expected,
            found.type_name(),
        )
    }

    fn date(&self, canonical: &str) -> Result<NaiveDate> {
        match self.get(canonical)? {
            FieldValue::Date(d) => Ok(*d),
            other => Err(self.mismatch(canonical, "date", other)),
        }
    }

    fn int(&self, canonical: &str) -> Result<i64> {
        match self.get(canonical)? {
            FieldValue::Int(i) => Ok(*i),
            other => Err(self.mismatch(canonical, "int64", other)),
        }
    }

    fn string(&self, canonical: &str) -> Result<String> {
        match self.get(canonical)? {
            FieldValue::Str(s) => Ok(s.clone()),
            other => Err(self.mismatch(canonical, "string", other)),
        }
    }

    /// Null amounts are skipped by the sum but the event still counts.
    fn amount(&self, canonical: &str) -> Result<Decimal> {
        match self.get(canonical)? {
            FieldValue::Decimal(d) => Ok(*d),
            FieldValue::Int(i) => Ok(Decimal::from(*i)),
            FieldValue::Null => Ok(Decimal::ZERO),
            other => Err(self.mismatch(canonical, "decimal", other)),
        }
    }
}
