//! Core of the ad events report.
//!
//! Three event streams (impressions, clicks, payments) are normalized to one
//! row per `(date, user_id, value_prop)`, merged into a daily fact table and
//! enriched with trailing-window totals over the preceding `W` days.
//!
//! This crate is table-in, table-out: it never touches the filesystem.
//! Reading sources and writing exports live in `adreport-io`.
//!
//! ```rust
//! use adreport_core::{run, FieldValue, PipelineInput, Record, ReportConfig, SourceBatch};
//! use chrono::NaiveDate;
//!
//! let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
//! let print = Record::from([
//!     ("date".to_string(), FieldValue::Date(day)),
//!     ("user_id".to_string(), FieldValue::Int(1)),
//!     ("value_prop".to_string(), FieldValue::Str("point".to_string())),
//! ]);
//! let input = PipelineInput {
//!     impressions: SourceBatch { records: vec![print], ..SourceBatch::default() },
//!     ..PipelineInput::default()
//! };
//!
//! let report = run(ReportConfig::default(), &input).unwrap();
//! assert_eq!(report.rows.len(), 1);
//! assert_eq!(report.rows[0].current.impressions, 1);
//! ```

pub mod config;
pub mod error;
pub mod merge;
pub mod metrics;
pub mod normalize;
pub mod pipeline;
pub mod record;
pub mod report;
pub mod window;

pub use config::{MergeMode, ReportConfig, WindowStrategy};
pub use error::{CoreError, Result};
pub use merge::{merge, DailyFact};
pub use metrics::Metrics;
pub use normalize::{max_date, normalize, NormalizedRow, SourceKind};
pub use pipeline::{run, Pipeline, PipelineInput, Report, SourceBatch};
pub use record::{FieldValue, GroupKey, PartitionKey, Record};
pub use report::{assemble, report_columns, PeriodFilter, ReportRow};
pub use window::{aggregate, self_join, sliding_window, WindowAggregate};
