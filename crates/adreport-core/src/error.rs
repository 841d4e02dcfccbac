//! Core error types.

use crate::record::GroupKey;
use thiserror::Error;

/// Errors raised while turning typed records into a report.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Invalid run configuration or source descriptor.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// A record lacks a field the source kind requires.
    #[error("Missing field '{field}' in {source_name} record {index}")]
    MissingField {
        source_name: String,
        field: String,
        index: usize,
    },

    /// A field holds a value of the wrong type.
    #[error("Schema mismatch for '{field}' in {source_name} record {index}: expected {expected}, found {found}")]
    SchemaMismatch {
        source_name: String,
        field: String,
        index: usize,
        expected: String,
        found: String,
    },

    /// Two rows of one normalized stream share a group key.
    #[error("Duplicate group key in {source_name}: {key}")]
    DuplicateGroupKey { source_name: String, key: GroupKey },
}

impl CoreError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a missing field error.
    pub fn missing_field(source_name: impl Into<String>, field: impl Into<String>, index: usize) -> Self {
        Self::MissingField {
            source_name: source_name.into(),
            field: field.into(),
            index,
        }
    }

    /// Create a schema mismatch error.
    pub fn schema_mismatch(
        source_name: impl Into<String>,
        field: impl Into<String>,
        index: usize,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        Self::SchemaMismatch {
            source_name: source_name.into(),
            field: field.into(),
            index,
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Create a duplicate group key error.
    pub fn duplicate_key(source_name: impl Into<String>, key: GroupKey) -> Self {
        Self::DuplicateGroupKey {
            source_name: source_name.into(),
            key,
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
