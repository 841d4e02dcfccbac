//! Typed records and the group key shared by every table.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::fmt;

/// A single typed field value, as produced by ingestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Date(NaiveDate),
    Int(i64),
    Decimal(Decimal),
    Str(String),
    Null,
}

impl FieldValue {
    /// Name of the value's type, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldValue::Date(_) => "date",
            FieldValue::Int(_) => "int64",
            FieldValue::Decimal(_) => "decimal",
            FieldValue::Str(_) => "string",
            FieldValue::Null => "null",
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Date(d) => write!(f, "{}", d),
            FieldValue::Int(i) => write!(f, "{}", i),
            FieldValue::Decimal(d) => write!(f, "{}", d),
            FieldValue::Str(s) => write!(f, "{}", s),
            FieldValue::Null => write!(f, "null"),
        }
    }
}

/// One raw event after ingestion: field name to typed value.
pub type Record = BTreeMap<String, FieldValue>;

/// `(date, user_id, value_prop)`: the grouping and join key of every table.
///
/// Field order matters: the derived `Ord` sorts by date first, which is
/// the order reports are emitted in.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupKey {
    pub date: NaiveDate,
    pub user_id: i64,
    pub value_prop: String,
}

impl GroupKey {
    pub fn new(date: NaiveDate, user_id: i64, value_prop: impl Into<String>) -> Self {
        Self {
            date,
            user_id,
            value_prop: value_prop.into(),
        }
    }

    /// The `(user_id, value_prop)` pair the trailing window partitions on.
    pub fn partition(&self) -> PartitionKey {
        PartitionKey {
            user_id: self.user_id,
            value_prop: self.value_prop.clone(),
        }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.date, self.user_id, self.value_prop)
    }
}

/// A `(user_id, value_prop)` pair.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PartitionKey {
    pub user_id: i64,
    pub value_prop: String,
}
