//! Reading event sources and writing reports.
//!
//! Sources are newline-delimited JSON or CSV files described in
//! `adreport.yml`; every value is cast to the declared schema before it
//! reaches `adreport-core`. Reports are written as Hive-partitioned Parquet
//! and as CSV.

pub mod config;
pub mod error;
pub mod export;
pub mod ingest;

pub use config::{
    find_config, ColumnType, IngestFormat, OutputConfig, ProjectConfig, SourceDescriptor, Sources,
    CONFIG_FILE,
};
pub use error::{ConfigError, IngestError};
pub use export::{format_rows, report_to_record_batch, write_csv, write_parquet_partitioned};
pub use ingest::{load_input, read_source};
