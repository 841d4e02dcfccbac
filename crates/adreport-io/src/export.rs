//! Report writers: Hive-partitioned Parquet, CSV, and pretty-printed tables.

use adreport_core::{Report, ReportRow};
use anyhow::{bail, Context, Result};
use arrow::array::{ArrayRef, Date32Array, Decimal128Array, Int64Array, StringBuilder, UInt64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use arrow::util::pretty;
use chrono::{Datelike, NaiveDate};
use parquet::arrow::ArrowWriter;
use parquet::file::properties::WriterProperties;
use parquet::format::SortingColumn;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::path::Path;
use std::sync::Arc;

/// Days from 0001-01-01 to 1970-01-01.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Largest scale a `Decimal` can carry.
const MAX_DECIMAL_SCALE: u32 = 28;

fn days_since_epoch(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE
}

/// Smallest scale that represents every amount in the report exactly.
fn decimal_scale(rows: &[ReportRow]) -> u32 {
    rows.iter()
        .flat_map(|row| [row.current.total.scale(), row.prev.total.scale()])
        .max()
        .unwrap_or(0)
        .min(MAX_DECIMAL_SCALE)
}

/// Mantissa of `value` at `scale`. Fails when the amount cannot carry that
/// many fractional digits, since `rescale` would silently keep fewer.
fn to_decimal128(value: Decimal, scale: u32) -> Result<i128> {
    let mut rescaled = value;
    rescaled.rescale(scale);
    if rescaled.scale() != scale {
        bail!("Amount {} cannot be written with {} decimal places", value, scale);
    }
    Ok(rescaled.mantissa())
}

/// Arrow schema of the report. `include_date` is false for partitioned
/// files, where the date lives in the directory name.
pub fn report_schema(columns: &[String], scale: u32, include_date: bool) -> Schema {
    let types = [
        DataType::Date32,
        DataType::Int64,
        DataType::Utf8,
        DataType::UInt64,
        DataType::UInt64,
        DataType::UInt64,
        DataType::Decimal128(38, scale as i8),
        DataType::UInt64,
        DataType::UInt64,
        DataType::UInt64,
        DataType::Decimal128(38, scale as i8),
    ];
    let skip = if include_date { 0 } else { 1 };

    Schema::new(
        columns
            .iter()
            .zip(types)
            .skip(skip)
            .map(|(name, data_type)| Field::new(name, data_type, false))
            .collect::<Vec<_>>(),
    )
}

fn rows_to_record_batch(
    rows: &[&ReportRow],
    schema: Arc<Schema>,
    scale: u32,
    include_date: bool,
) -> Result<RecordBatch> {
    let mut value_props = StringBuilder::new();
    for row in rows {
        value_props.append_value(&row.key.value_prop);
    }

    let u64_column = |f: fn(&ReportRow) -> u64| -> ArrayRef {
        Arc::new(UInt64Array::from(rows.iter().map(|r| f(r)).collect::<Vec<_>>()))
    };
    let decimal_column = |f: fn(&ReportRow) -> Decimal| -> Result<ArrayRef> {
        let values = rows
            .iter()
            .map(|r| to_decimal128(f(r), scale))
            .collect::<Result<Vec<i128>>>()?;
        let array = Decimal128Array::from(values)
            .with_precision_and_scale(38, scale as i8)
            .context("Failed to build decimal column")?;
        Ok(Arc::new(array))
    };

    let mut columns: Vec<ArrayRef> = Vec::with_capacity(11);
    if include_date {
        columns.push(Arc::new(Date32Array::from(
            rows.iter().map(|r| days_since_epoch(r.key.date)).collect::<Vec<_>>(),
        )));
    }
    columns.push(Arc::new(Int64Array::from(
        rows.iter().map(|r| r.key.user_id).collect::<Vec<_>>(),
    )));
    columns.push(Arc::new(value_props.finish()));
    columns.push(u64_column(|r| r.current.impressions));
    columns.push(u64_column(|r| r.current.clicks));
    columns.push(u64_column(|r| r.current.payments_qty));
    columns.push(decimal_column(|r| r.current.total)?);
    columns.push(u64_column(|r| r.prev.impressions));
    columns.push(u64_column(|r| r.prev.clicks));
    columns.push(u64_column(|r| r.prev.payments_qty));
    columns.push(decimal_column(|r| r.prev.total)?);

    RecordBatch::try_new(schema, columns).context("Failed to create record batch")
}

/// The full report as a single Arrow batch, date column included.
pub fn report_to_record_batch(report: &Report) -> Result<RecordBatch> {
    let scale = decimal_scale(&report.rows);
    let schema = Arc::new(report_schema(&report.columns(), scale, true));
    let rows: Vec<&ReportRow> = report.rows.iter().collect();
    rows_to_record_batch(&rows, schema, scale, true)
}

/// Render report rows as a text table, at most `limit` rows.
pub fn format_rows(report: &Report, rows: &[&ReportRow], limit: usize) -> Result<String> {
    let scale = decimal_scale(&report.rows);
    let schema = Arc::new(report_schema(&report.columns(), scale, true));
    let shown = &rows[..rows.len().min(limit)];
    let batch = rows_to_record_batch(shown, schema, scale, true)?;
    let table = pretty::pretty_format_batches(&[batch]).context("Failed to format report")?;
    Ok(table.to_string())
}

/// Write one Parquet file per date under `output_dir/date=YYYY-MM-DD/`.
///
/// The destination is cleared first. Inside each file rows are ordered by
/// `value_prop` then `impressions`, both descending, and the order is
/// recorded as a sorting-columns hint. Returns the number of rows written.
pub fn write_parquet_partitioned(report: &Report, output_dir: &Path) -> Result<usize> {
    if output_dir.exists() {
        fs::remove_dir_all(output_dir)
            .with_context(|| format!("Failed to clear output directory: {:?}", output_dir))?;
    }
    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory: {:?}", output_dir))?;

    let scale = decimal_scale(&report.rows);
    let schema = Arc::new(report_schema(&report.columns(), scale, false));

    let mut by_date: BTreeMap<NaiveDate, Vec<&ReportRow>> = BTreeMap::new();
    for row in &report.rows {
        by_date.entry(row.key.date).or_default().push(row);
    }

    let mut written = 0;
    for (date, mut rows) in by_date {
        rows.sort_by(|a, b| {
            b.key
                .value_prop
                .cmp(&a.key.value_prop)
                .then(b.current.impressions.cmp(&a.current.impressions))
                .then(a.key.user_id.cmp(&b.key.user_id))
        });
        written += write_partition(output_dir, date, &rows, schema.clone(), scale)?;
    }

    tracing::info!(rows = written, path = %output_dir.display(), "wrote parquet report");
    Ok(written)
}

fn write_partition(
    output_dir: &Path,
    date: NaiveDate,
    rows: &[&ReportRow],
    schema: Arc<Schema>,
    scale: u32,
) -> Result<usize> {
    let partition_dir = output_dir.join(format!("date={}", date));
    fs::create_dir_all(&partition_dir)
        .with_context(|| format!("Failed to create partition directory: {:?}", partition_dir))?;

    let file_path = partition_dir.join("data.parquet");
    let file = File::create(&file_path)
        .with_context(|| format!("Failed to create parquet file: {:?}", file_path))?;

    let batch = rows_to_record_batch(rows, schema.clone(), scale, false)?;

    // Column indexes without the date: value_prop = 1, impressions = 2.
    let sorting = vec![
        SortingColumn::new(1, true, false),
        SortingColumn::new(2, true, false),
    ];
    let props = WriterProperties::builder()
        .set_compression(parquet::basic::Compression::SNAPPY)
        .set_sorting_columns(Some(sorting))
        .build();

    let mut writer = ArrowWriter::try_new(file, schema, Some(props))
        .context("Failed to create Parquet writer")?;

    writer
        .write(&batch)
        .context("Failed to write record batch")?;
    writer.close().context("Failed to close Parquet writer")?;

    Ok(rows.len())
}

/// Write the report as a CSV file readable by spreadsheet tools.
pub fn write_csv(report: &Report, path: &Path) -> Result<usize> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory: {:?}", parent))?;
    }
    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("Failed to create CSV file: {:?}", path))?;

    writer.write_record(report.columns()).context("Failed to write CSV header")?;
    for row in &report.rows {
        writer
            .write_record([
                row.key.date.format("%Y-%m-%d").to_string(),
                row.key.user_id.to_string(),
                row.key.value_prop.clone(),
                row.current.impressions.to_string(),
                row.current.clicks.to_string(),
                row.current.payments_qty.to_string(),
                row.current.total.to_string(),
                row.prev.impressions.to_string(),
                row.prev.clicks.to_string(),
                row.prev.payments_qty.to_string(),
                row.prev.total.to_string(),
            ])
            .context("Failed to write CSV row")?;
    }
    writer.flush().context("Failed to flush CSV file")?;

    tracing::info!(rows = report.rows.len(), path = %path.display(), "wrote csv report");
    Ok(report.rows.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use adreport_core::{DailyFact, GroupKey, Metrics};
    use parquet::file::reader::{FileReader, SerializedFileReader};
    use tempfile::TempDir;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn row(d: &str, user: i64, prop: &str, impressions: u64, total: Decimal) -> ReportRow {
        ReportRow {
            key: GroupKey::new(date(d), user, prop),
            current: Metrics {
                impressions,
                clicks: 0,
                payments_qty: 1,
                total,
            },
            prev: Metrics {
                impressions: 2,
                ..Metrics::default()
            },
        }
    }

    #[test]
    fn test_decimal_mantissa_at_scale() {
        assert_eq!(to_decimal128(Decimal::new(105, 1), 2).unwrap(), 1050);
        assert_eq!(to_decimal128(Decimal::from(4), 2).unwrap(), 400);
    }

    #[test]
    fn test_unrepresentable_scale_rejected() {
        let mut report = report();
        report.rows[0].current.total = Decimal::from(i64::MAX);
        report.rows[1].current.total = Decimal::new(1, 20);

        let err = report_to_record_batch(&report).unwrap_err();

        assert!(err.to_string().contains("cannot be written with 20 decimal places"));
    }

    fn report() -> Report {
        let rows = vec![
            row("2024-01-01", 1, "point", 3, Decimal::new(1050, 2)),
            row("2024-01-01", 2, "prepaid", 5, Decimal::from(4)),
            row("2024-01-02", 1, "point", 1, Decimal::new(1, 1)),
        ];
        let facts = rows
            .iter()
            .map(|r| DailyFact {
                key: r.key.clone(),
                metrics: r.current,
            })
            .collect();
        Report {
            window_days: 21,
            facts,
            rows,
        }
    }

    #[test]
    fn test_days_since_epoch() {
        assert_eq!(days_since_epoch(date("1970-01-01")), 0);
        assert_eq!(days_since_epoch(date("1970-01-11")), 10);
    }

    #[test]
    fn test_record_batch_shape() {
        let batch = report_to_record_batch(&report()).unwrap();

        assert_eq!(batch.num_rows(), 3);
        assert_eq!(batch.num_columns(), 11);
        assert_eq!(batch.schema().field(7).name(), "impressions_prev_21_days");
        assert_eq!(batch.schema().field(6).data_type(), &DataType::Decimal128(38, 2));

        let totals = batch
            .column(6)
            .as_any()
            .downcast_ref::<Decimal128Array>()
            .unwrap();
        assert_eq!(totals.value(0), 1050);
        assert_eq!(totals.value(1), 400);
        assert_eq!(totals.value(2), 10);
    }

    #[test]
    fn test_parquet_partitions_by_date() {
        let temp_dir = TempDir::new().unwrap();
        let out = temp_dir.path().join("parquet");
        // Stale content from an earlier run must disappear.
        fs::create_dir_all(out.join("date=1999-01-01")).unwrap();

        let written = write_parquet_partitioned(&report(), &out).unwrap();

        assert_eq!(written, 3);
        assert!(!out.join("date=1999-01-01").exists());
        let first = out.join("date=2024-01-01").join("data.parquet");
        assert!(first.exists());
        assert!(out.join("date=2024-01-02").join("data.parquet").exists());

        let reader = SerializedFileReader::new(File::open(&first).unwrap()).unwrap();
        let metadata = reader.metadata();
        assert_eq!(metadata.file_metadata().num_rows(), 2);
        assert_eq!(metadata.file_metadata().schema_descr().num_columns(), 10);
        let sorting = metadata.row_group(0).sorting_columns().unwrap();
        assert_eq!(sorting.len(), 2);
        assert_eq!(sorting[0].column_idx, 1);
        assert!(sorting[0].descending);
    }

    #[test]
    fn test_parquet_output_is_deterministic() {
        let temp_dir = TempDir::new().unwrap();
        let a = temp_dir.path().join("a");
        let b = temp_dir.path().join("b");

        write_parquet_partitioned(&report(), &a).unwrap();
        write_parquet_partitioned(&report(), &b).unwrap();

        for day in ["2024-01-01", "2024-01-02"] {
            let file = format!("date={}", day);
            let bytes1 = fs::read(a.join(&file).join("data.parquet")).unwrap();
            let bytes2 = fs::read(b.join(&file).join("data.parquet")).unwrap();
            assert_eq!(bytes1, bytes2, "Files for {} should be identical", day);
        }
    }

    #[test]
    fn test_csv_export() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("excel").join("report.csv");

        write_csv(&report(), &path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("date,user_id,value_prop,impressions"));
        assert!(lines[0].ends_with("total_prev_21_days"));
        assert_eq!(lines[1], "2024-01-01,1,point,3,0,1,10.50,2,0,0,0");
    }

    #[test]
    fn test_format_rows_limits_output() {
        let report = report();
        let rows: Vec<&ReportRow> = report.rows.iter().collect();

        let table = format_rows(&report, &rows, 1).unwrap();

        assert!(table.contains("point"));
        assert!(!table.contains("prepaid"));
    }
}
