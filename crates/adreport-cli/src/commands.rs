//! The `run` and `track` subcommands.

use adreport_core::window::window_start;
use adreport_core::{max_date, MergeMode, Pipeline, SourceKind, WindowStrategy};
use adreport_io::{
    find_config, format_rows, load_input, write_csv, write_parquet_partitioned, ProjectConfig,
};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use std::fmt::Write;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to adreport.yml, or the directory holding it
    #[arg(long, default_value = ".")]
    pub config: PathBuf,

    /// Days in one reporting period
    #[arg(long)]
    pub period: Option<u32>,

    /// Number of periods in the trailing window
    #[arg(long)]
    pub lookback_periods: Option<u32>,

    /// Keep every date instead of only the most recent period
    #[arg(long)]
    pub no_filter: bool,

    /// Keep clicks and payments that have no same-day impression
    #[arg(long)]
    pub full_outer: bool,

    /// Window computation: sliding or self-join
    #[arg(long)]
    pub strategy: Option<WindowStrategy>,

    /// Override the Parquet output directory
    #[arg(long)]
    pub parquet_dir: Option<PathBuf>,

    /// Override the CSV output path
    #[arg(long)]
    pub csv: Option<PathBuf>,

    /// Display report rows after the run
    #[arg(long)]
    pub show_results: bool,

    /// Maximum number of rows shown with --show-results
    #[arg(long, default_value = "20")]
    pub limit: usize,
}

impl RunArgs {
    /// Apply command-line overrides on top of the file config.
    pub fn apply(&self, config: &mut ProjectConfig) -> Result<()> {
        if let Some(period) = self.period {
            config.report.period = period;
        }
        if let Some(lookback) = self.lookback_periods {
            config.report.lookback_periods = lookback;
        }
        if self.no_filter {
            config.report.filter_output = false;
        }
        if self.full_outer {
            config.report.merge = MergeMode::FullOuter;
        }
        if let Some(strategy) = self.strategy {
            config.report.strategy = strategy;
        }
        if let Some(ref dir) = self.parquet_dir {
            config.output.parquet_dir = Some(dir.clone());
        }
        if let Some(ref path) = self.csv {
            config.output.csv_path = Some(path.clone());
        }

        config
            .report
            .validate()
            .with_context(|| "Invalid report settings")?;
        Ok(())
    }
}

#[derive(Parser, Debug, Clone)]
pub struct TrackArgs {
    /// Path to adreport.yml, or the directory holding it
    #[arg(long, default_value = ".")]
    pub config: PathBuf,

    #[arg(long)]
    pub user_id: i64,

    #[arg(long)]
    pub value_prop: String,
}

/// What a run produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub facts: usize,
    pub rows: usize,
    pub parquet_rows: Option<usize>,
    pub csv_rows: Option<usize>,
}

/// Load `adreport.yml` and resolve its relative paths against its directory.
pub fn load_project(path: &Path) -> Result<ProjectConfig> {
    let config_path = find_config(path);
    let mut config = ProjectConfig::load(&config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;

    let base_dir = config_path.parent().unwrap_or_else(|| Path::new("."));
    config.resolve_paths(base_dir);
    Ok(config)
}

pub fn run(args: &RunArgs) -> Result<RunSummary> {
    let mut config = load_project(&args.config)?;
    args.apply(&mut config)?;

    let report_config = &config.report;
    println!(
        "Period: {} days, lookback: {} periods ({} days), merge: {}, strategy: {}",
        report_config.period,
        report_config.lookback_periods,
        report_config.window_days(),
        report_config.merge,
        report_config.strategy
    );

    let input = load_input(&config).with_context(|| "Failed to read event sources")?;
    println!(
        "Read {} impressions, {} clicks, {} payments",
        input.impressions.records.len(),
        input.clicks.records.len(),
        input.payments.records.len()
    );

    let report = adreport_core::run(config.report.clone(), &input)
        .with_context(|| "Failed to build report")?;

    println!(
        "✓ {} daily facts, {} report rows",
        report.facts.len(),
        report.rows.len()
    );

    if args.show_results {
        let rows: Vec<_> = report.rows.iter().collect();
        println!("\n{}", format_rows(&report, &rows, args.limit)?);
    }

    let mut summary = RunSummary {
        facts: report.facts.len(),
        rows: report.rows.len(),
        ..RunSummary::default()
    };

    if let Some(ref dir) = config.output.parquet_dir {
        let written = write_parquet_partitioned(&report, dir)?;
        println!("✓ Wrote {} rows to {}", written, dir.display());
        summary.parquet_rows = Some(written);
    }

    if let Some(ref path) = config.output.csv_path {
        let written = write_csv(&report, path)?;
        println!("✓ Wrote {} rows to {}", written, path.display());
        summary.csv_rows = Some(written);
    }

    Ok(summary)
}

/// Per-source rows and report rows of one `(user_id, value_prop)` pair,
/// most recent date first.
pub fn track(args: &TrackArgs) -> Result<String> {
    let config = load_project(&args.config)?;
    let input = load_input(&config).with_context(|| "Failed to read event sources")?;
    let pipeline =
        Pipeline::new(config.report.clone(), &input).with_context(|| "Failed to build report")?;

    let mut out = String::new();

    for kind in SourceKind::ALL {
        let mut rows: Vec<_> = pipeline
            .stream(kind)
            .iter()
            .filter(|row| row.key.user_id == args.user_id && row.key.value_prop == args.value_prop)
            .collect();
        rows.sort_by(|a, b| b.key.date.cmp(&a.key.date));

        writeln!(out, "{} ({} days)", kind, rows.len())?;
        for row in rows {
            match kind {
                SourceKind::Payments => {
                    writeln!(out, "  {}  count={}  total={}", row.key.date, row.count, row.total)?
                }
                _ => writeln!(out, "  {}  count={}", row.key.date, row.count)?,
            }
        }
    }

    let report = pipeline.run().with_context(|| "Failed to build report")?;
    let rows = report.rows_for(args.user_id, &args.value_prop);
    writeln!(out, "\nreport ({} rows)", rows.len())?;
    if !rows.is_empty() {
        writeln!(out, "{}", format_rows(&report, &rows, rows.len())?)?;
    }

    if let Some(last) = max_date(pipeline.stream(SourceKind::Impressions)) {
        let (first, last) = reported_period(last, config.report.period);
        writeln!(out, "\nreported period: {} .. {}", first, last)?;
    }

    Ok(out)
}

/// First and last day kept by the output filter when the newest impression
/// is on `last`. Saturates at the earliest representable date.
pub fn reported_period(last: NaiveDate, period: u32) -> (NaiveDate, NaiveDate) {
    let first = window_start(last, i64::from(period) - 1);
    (first, last)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_reported_period_spans_one_period() {
        let (first, last) = reported_period(date("2020-11-30"), 7);
        assert_eq!(first, date("2020-11-24"));
        assert_eq!(last, date("2020-11-30"));

        assert_eq!(reported_period(date("2020-11-30"), 1).0, date("2020-11-30"));
    }

    #[test]
    fn test_reported_period_huge_period_saturates() {
        let (first, _) = reported_period(date("2020-11-30"), u32::MAX);
        assert_eq!(first, NaiveDate::MIN);
    }
}
