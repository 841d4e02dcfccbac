//! Writes a generated dataset in the layout `adreport` reads.

use crate::events::{generate_day_seeds, AdEvent, DayEvents, DayGenerator, Payment, UserPool};
use adreport_core::ReportConfig;
use adreport_io::{
    ColumnType, IngestFormat, OutputConfig, ProjectConfig, SourceDescriptor, Sources, CONFIG_FILE,
};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use rayon::prelude::*;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub const PRINTS_FILE: &str = "prints.json";
pub const TAPS_FILE: &str = "taps.json";
pub const PAYS_FILE: &str = "pays.csv";

/// Row counts of a written dataset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DatasetSummary {
    pub prints: usize,
    pub taps: usize,
    pub pays: usize,
}

#[derive(Serialize)]
struct EventLine<'a> {
    day: NaiveDate,
    event_data: EventData<'a>,
    user_id: i64,
}

#[derive(Serialize)]
struct EventData<'a> {
    position: i64,
    value_prop: &'a str,
}

#[derive(Serialize)]
struct PayRow<'a> {
    pay_date: NaiveDate,
    total: Decimal,
    user_id: i64,
    value_prop: &'a str,
}

/// Generate `num_days` of events starting at `start_date` and write them,
/// with a matching `adreport.yml`, into `output_dir`.
///
/// Days are generated in parallel and written in date order, so the same
/// seed always produces identical files.
pub fn write_dataset(
    output_dir: &Path,
    seed: u64,
    num_users: usize,
    num_days: u32,
    start_date: NaiveDate,
) -> Result<DatasetSummary> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory: {:?}", output_dir))?;

    let user_pool = UserPool::new(seed, num_users);
    let day_seeds = generate_day_seeds(seed, num_days);

    let days: Vec<_> = day_seeds
        .into_iter()
        .enumerate()
        .map(|(i, day_seed)| (start_date + chrono::Duration::days(i as i64), day_seed))
        .collect();

    let generated: Vec<DayEvents> = days
        .par_iter()
        .map(|(date, day_seed)| -> Result<DayEvents> {
            Ok(DayGenerator::new(user_pool.clone(), *day_seed, *date)?.generate())
        })
        .collect::<Result<_>>()?;

    let summary = DatasetSummary {
        prints: write_events(&output_dir.join(PRINTS_FILE), generated.iter().flat_map(|d| &d.prints))?,
        taps: write_events(&output_dir.join(TAPS_FILE), generated.iter().flat_map(|d| &d.taps))?,
        pays: write_payments(&output_dir.join(PAYS_FILE), generated.iter().flat_map(|d| &d.pays))?,
    };

    let config_path = output_dir.join(CONFIG_FILE);
    let yaml = serde_yaml::to_string(&dataset_config()).context("Failed to serialize config")?;
    fs::write(&config_path, yaml)
        .with_context(|| format!("Failed to write config: {:?}", config_path))?;

    Ok(summary)
}

/// Write impressions or clicks as newline-delimited JSON.
fn write_events<'a>(path: &Path, events: impl Iterator<Item = &'a AdEvent>) -> Result<usize> {
    let file =
        File::create(path).with_context(|| format!("Failed to create events file: {:?}", path))?;
    let mut writer = BufWriter::new(file);
    let mut count = 0;

    for event in events {
        let line = EventLine {
            day: event.day,
            event_data: EventData {
                position: event.position,
                value_prop: event.value_prop,
            },
            user_id: event.user_id,
        };
        serde_json::to_writer(&mut writer, &line).context("Failed to serialize event")?;
        writer.write_all(b"\n")?;
        count += 1;
    }

    writer
        .flush()
        .with_context(|| format!("Failed to write events file: {:?}", path))?;
    Ok(count)
}

fn write_payments<'a>(path: &Path, pays: impl Iterator<Item = &'a Payment>) -> Result<usize> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create payments file: {:?}", path))?;
    let mut count = 0;

    for pay in pays {
        writer
            .serialize(PayRow {
                pay_date: pay.pay_date,
                total: pay.total,
                user_id: pay.user_id,
                value_prop: pay.value_prop,
            })
            .context("Failed to write payment row")?;
        count += 1;
    }

    // An empty file still needs its header.
    if count == 0 {
        writer.write_record(["pay_date", "total", "user_id", "value_prop"])?;
    }

    writer
        .flush()
        .with_context(|| format!("Failed to write payments file: {:?}", path))?;
    Ok(count)
}

/// Config describing the files written by [`write_dataset`].
pub fn dataset_config() -> ProjectConfig {
    let event_source = |path: &str| SourceDescriptor {
        path: PathBuf::from(path),
        format: IngestFormat::Jsonl,
        unnest: true,
        rename: BTreeMap::from([("day".to_string(), "date".to_string())]),
        schema: BTreeMap::from([
            ("day".to_string(), ColumnType::Date),
            ("position".to_string(), ColumnType::Int64),
            ("user_id".to_string(), ColumnType::Int64),
            ("value_prop".to_string(), ColumnType::String),
        ]),
    };

    ProjectConfig {
        report: ReportConfig::default(),
        sources: Sources {
            impressions: event_source(PRINTS_FILE),
            clicks: event_source(TAPS_FILE),
            payments: SourceDescriptor {
                path: PathBuf::from(PAYS_FILE),
                format: IngestFormat::Csv,
                unnest: false,
                rename: BTreeMap::from([("pay_date".to_string(), "date".to_string())]),
                schema: BTreeMap::from([
                    ("pay_date".to_string(), ColumnType::Date),
                    ("total".to_string(), ColumnType::Decimal),
                    ("user_id".to_string(), ColumnType::Int64),
                    ("value_prop".to_string(), ColumnType::String),
                ]),
            },
        },
        output: OutputConfig {
            parquet_dir: Some(PathBuf::from("outputs/parquet_partitioned")),
            csv_path: Some(PathBuf::from("outputs/report.csv")),
        },
    }
}
