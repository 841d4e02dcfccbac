//! End-to-end run: normalize, merge, aggregate, assemble.

use crate::config::ReportConfig;
use crate::error::Result;
use crate::merge::{merge, DailyFact};
use crate::normalize::{max_date, normalize, NormalizedRow, SourceKind};
use crate::record::Record;
use crate::report::{assemble, report_columns, PeriodFilter, ReportRow};
use crate::window::aggregate;
use std::collections::BTreeMap;

/// Typed records of one source plus its rename map.
#[derive(Debug, Clone, Default)]
pub struct SourceBatch {
    /// Source field name to canonical field name.
    pub rename: BTreeMap<String, String>,
    pub records: Vec<Record>,
}

/// The three sources of a run.
#[derive(Debug, Clone, Default)]
pub struct PipelineInput {
    pub impressions: SourceBatch,
    pub clicks: SourceBatch,
    pub payments: SourceBatch,
}

impl PipelineInput {
    pub fn source(&self, kind: SourceKind) -> &SourceBatch {
        match kind {
            SourceKind::Impressions => &self.impressions,
            SourceKind::Clicks => &self.clicks,
            SourceKind::Payments => &self.payments,
        }
    }
}

/// The finished report table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub window_days: i64,
    /// The full daily fact table, before output filtering.
    pub facts: Vec<DailyFact>,
    pub rows: Vec<ReportRow>,
}

impl Report {
    pub fn columns(&self) -> Vec<String> {
        report_columns(self.window_days)
    }

    /// Rows of one `(user_id, value_prop)` pair, most recent first.
    pub fn rows_for(&self, user_id: i64, value_prop: &str) -> Vec<&ReportRow> {
        let mut rows: Vec<&ReportRow> = self
            .rows
            .iter()
            .filter(|row| row.key.user_id == user_id && row.key.value_prop == value_prop)
            .collect();
        rows.sort_by(|a, b| b.key.date.cmp(&a.key.date));
        rows
    }
}

/// Normalized streams, ready to be merged and aggregated.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: ReportConfig,
    impressions: Vec<NormalizedRow>,
    clicks: Vec<NormalizedRow>,
    payments: Vec<NormalizedRow>,
}

impl Pipeline {
    /// Validate the configuration and normalize all three sources.
    pub fn new(config: ReportConfig, input: &PipelineInput) -> Result<Self> {
        config.validate()?;

        let normalize_source = |kind: SourceKind| {
            let batch = input.source(kind);
            normalize(kind, &batch.rename, &batch.records)
        };

        Ok(Self {
            impressions: normalize_source(SourceKind::Impressions)?,
            clicks: normalize_source(SourceKind::Clicks)?,
            payments: normalize_source(SourceKind::Payments)?,
            config,
        })
    }

    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    pub fn stream(&self, kind: SourceKind) -> &[NormalizedRow] {
        match kind {
            SourceKind::Impressions => &self.impressions,
            SourceKind::Clicks => &self.clicks,
            SourceKind::Payments => &self.payments,
        }
    }

    pub fn run(&self) -> Result<Report> {
        let window_days = self.config.window_days();

        let facts = merge(&self.impressions, &self.clicks, &self.payments, self.config.merge)?;
        let aggregates = aggregate(&facts, window_days, self.config.strategy);

        let filter = self.config.filter_output.then(|| PeriodFilter {
            max_date: max_date(&self.impressions),
            period: self.config.period,
        });
        let rows = assemble(&facts, &aggregates, filter);

        Ok(Report {
            window_days,
            facts,
            rows,
        })
    }
}

/// Run the whole transformation on already-typed input.
pub fn run(config: ReportConfig, input: &PipelineInput) -> Result<Report> {
    Pipeline::new(config, input)?.run()
}
