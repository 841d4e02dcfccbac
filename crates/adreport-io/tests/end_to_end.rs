//! Integration test: files on disk to exported report.

use adreport_core::{run, Pipeline, SourceKind};
use adreport_io::{find_config, load_input, write_csv, write_parquet_partitioned, ProjectConfig};
use rust_decimal::Decimal;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const CONFIG: &str = r#"
report:
  period: 7
  lookback_periods: 3
sources:
  impressions:
    path: input/prints.json
    format: jsonl
    unnest: true
    rename: { day: date }
    schema: { day: date, position: int64, user_id: int64, value_prop: string }
  clicks:
    path: input/taps.json
    format: jsonl
    unnest: true
    rename: { day: date }
    schema: { day: date, position: int64, user_id: int64, value_prop: string }
  payments:
    path: input/pays.csv
    format: csv
    rename: { pay_date: date }
    schema: { pay_date: date, total: decimal, user_id: int64, value_prop: string }
output:
  parquet_dir: outputs/parquet_partitioned
  csv_path: outputs/excel/report.csv
"#;

fn print(day: &str, user: i64, prop: &str, position: i64) -> String {
    format!(
        "{{\"day\":\"{}\",\"event_data\":{{\"position\":{},\"value_prop\":\"{}\"}},\"user_id\":{}}}\n",
        day, position, prop, user
    )
}

fn seed_project(dir: &Path) {
    fs::create_dir_all(dir.join("input")).unwrap();
    fs::write(dir.join("adreport.yml"), CONFIG).unwrap();

    let prints = [
        print("2020-11-01", 2, "cellphone_recharge", 0),
        print("2020-11-01", 2, "cellphone_recharge", 2),
        print("2020-11-10", 2, "cellphone_recharge", 1),
        print("2020-11-30", 2, "cellphone_recharge", 0),
        print("2020-11-30", 7, "point", 3),
        // Outside the 21-day window of 2020-11-30.
        print("2020-11-08", 7, "point", 1),
    ]
    .concat();
    fs::write(dir.join("input/prints.json"), prints).unwrap();

    let taps = [
        print("2020-11-10", 2, "cellphone_recharge", 0),
        print("2020-11-30", 2, "cellphone_recharge", 0),
        // No impression for this key.
        print("2020-11-30", 9, "send_money", 0),
    ]
    .concat();
    fs::write(dir.join("input/taps.json"), taps).unwrap();

    fs::write(
        dir.join("input/pays.csv"),
        "pay_date,total,user_id,value_prop\n\
         2020-11-10,12.50,2,cellphone_recharge\n\
         2020-11-10,7.50,2,cellphone_recharge\n\
         2020-11-30,3.00,7,point\n",
    )
    .unwrap();
}

fn load(dir: &Path) -> ProjectConfig {
    let config_path = find_config(dir);
    let mut config = ProjectConfig::load(&config_path).unwrap();
    config.resolve_paths(dir);
    config
}

#[test]
fn test_report_from_files() {
    let temp_dir = TempDir::new().unwrap();
    seed_project(temp_dir.path());
    let config = load(temp_dir.path());

    let input = load_input(&config).unwrap();
    let report = run(config.report.clone(), &input).unwrap();

    // Only 2020-11-30 is within the last 7 days of the impressions.
    assert_eq!(report.rows.len(), 2);

    let recharge = report.rows_for(2, "cellphone_recharge");
    assert_eq!(recharge.len(), 1);
    let row = recharge[0];
    assert_eq!(row.current.impressions, 1);
    assert_eq!(row.current.clicks, 1);
    // 2020-11-01 is more than 21 days back.
    assert_eq!(row.prev.impressions, 1);
    assert_eq!(row.prev.clicks, 1);
    assert_eq!(row.prev.payments_qty, 2);
    assert_eq!(row.prev.total, Decimal::new(2000, 2));

    let point = report.rows_for(7, "point");
    assert_eq!(point[0].current.payments_qty, 1);
    assert!(point[0].prev.is_zero());

    assert!(report.rows_for(9, "send_money").is_empty());
}

#[test]
fn test_exports_written() {
    let temp_dir = TempDir::new().unwrap();
    seed_project(temp_dir.path());
    let config = load(temp_dir.path());

    let input = load_input(&config).unwrap();
    let report = run(config.report.clone(), &input).unwrap();

    let parquet_dir = config.output.parquet_dir.as_ref().unwrap();
    let csv_path = config.output.csv_path.as_ref().unwrap();
    assert_eq!(write_parquet_partitioned(&report, parquet_dir).unwrap(), 2);
    assert_eq!(write_csv(&report, csv_path).unwrap(), 2);

    assert!(parquet_dir.join("date=2020-11-30").join("data.parquet").exists());
    assert!(!parquet_dir.join("date=2020-11-01").exists());

    let csv = fs::read_to_string(csv_path).unwrap();
    assert!(csv.contains("2020-11-30,2,cellphone_recharge,1,1,0,0,1,1,2,20.00"));
}

#[test]
fn test_pipeline_exposes_normalized_streams() {
    let temp_dir = TempDir::new().unwrap();
    seed_project(temp_dir.path());
    let config = load(temp_dir.path());

    let input = load_input(&config).unwrap();
    let pipeline = Pipeline::new(config.report.clone(), &input).unwrap();

    let impressions = pipeline.stream(SourceKind::Impressions);
    assert_eq!(impressions.len(), 5);
    assert_eq!(impressions[0].count, 2);
    assert_eq!(pipeline.stream(SourceKind::Payments)[0].count, 2);
}

#[test]
fn test_bad_format_fails_at_load() {
    let temp_dir = TempDir::new().unwrap();
    seed_project(temp_dir.path());
    let broken = CONFIG.replace("format: csv", "format: parquet");
    fs::write(temp_dir.path().join("adreport.yml"), broken).unwrap();

    let err = ProjectConfig::load(&find_config(temp_dir.path())).unwrap_err();

    assert!(err.to_string().contains("Failed to load configuration file"));
}
