use adreport_core::CoreError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration file: {path}\n{source}")]
    Load {
        path: PathBuf,
        source: anyhow::Error,
    },

    #[error("Source '{source_name}' is misconfigured: {message}")]
    InvalidSource { source_name: String, message: String },

    #[error(transparent)]
    Report(#[from] CoreError),
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}:{line}: invalid JSON record: {source}")]
    Json {
        path: PathBuf,
        line: u64,
        #[source]
        source: serde_json::Error,
    },

    #[error("{path}: invalid CSV: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{path}:{line}: cannot cast field '{field}' value {value} to {expected}")]
    Cast {
        path: PathBuf,
        line: u64,
        field: String,
        value: String,
        expected: String,
    },

    #[error("{path}:{line}: unnesting '{parent}' would overwrite field '{field}'")]
    DuplicateField {
        path: PathBuf,
        line: u64,
        parent: String,
        field: String,
    },
}
