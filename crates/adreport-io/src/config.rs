use crate::error::ConfigError;
use adreport_core::{ReportConfig, SourceKind};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "adreport.yml";

/// Supported source file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestFormat {
    /// Newline-delimited JSON, one object per line.
    Jsonl,
    /// Comma-separated values with a header row.
    Csv,
}

/// Declared type of a source field; values are cast to it on read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Date,
    #[serde(alias = "int")]
    Int64,
    Decimal,
    #[serde(alias = "str")]
    String,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Date => "date",
            ColumnType::Int64 => "int64",
            ColumnType::Decimal => "decimal",
            ColumnType::String => "string",
        }
    }
}

/// Where and how to read one event source.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SourceDescriptor {
    pub path: PathBuf,
    pub format: IngestFormat,
    /// Flatten nested objects into their parent (JSON only).
    #[serde(default)]
    pub unnest: bool,
    /// Source field name to canonical field name.
    #[serde(default)]
    pub rename: BTreeMap<String, String>,
    /// Fields to keep, by name after unnesting, with their types.
    pub schema: BTreeMap<String, ColumnType>,
}

impl SourceDescriptor {
    /// Check that after renaming, the schema provides every field the
    /// source kind needs.
    pub fn validate(&self, kind: SourceKind) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidSource {
            source_name: kind.as_str().to_string(),
            message,
        };

        if self.unnest && self.format == IngestFormat::Csv {
            return Err(invalid("'unnest' only applies to jsonl sources".to_string()));
        }

        for from in self.rename.keys() {
            if !self.schema.contains_key(from) {
                return Err(invalid(format!("renamed field '{}' is not in the schema", from)));
            }
        }

        let canonical: Vec<&str> = self
            .schema
            .keys()
            .map(|name| self.rename.get(name).unwrap_or(name).as_str())
            .collect();

        for required in kind.required_fields() {
            if !canonical.contains(required) {
                return Err(invalid(format!(
                    "no schema field provides '{}' (schema: {})",
                    required,
                    self.schema.keys().cloned().collect::<Vec<_>>().join(", ")
                )));
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Sources {
    pub impressions: SourceDescriptor,
    pub clicks: SourceDescriptor,
    pub payments: SourceDescriptor,
}

impl Sources {
    pub fn get(&self, kind: SourceKind) -> &SourceDescriptor {
        match kind {
            SourceKind::Impressions => &self.impressions,
            SourceKind::Clicks => &self.clicks,
            SourceKind::Payments => &self.payments,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    /// Hive-partitioned Parquet destination (cleared on every run).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parquet_dir: Option<PathBuf>,
    /// Spreadsheet-friendly CSV report.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub csv_path: Option<PathBuf>,
}

/// Contents of `adreport.yml`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    #[serde(default)]
    pub report: ReportConfig,
    pub sources: Sources,
    #[serde(default)]
    pub output: OutputConfig,
}

impl ProjectConfig {
    /// Load and validate a config file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Load {
            path: path.to_path_buf(),
            source: e.into(),
        })?;

        let config: ProjectConfig = serde_yaml::from_str(&content).map_err(|e| ConfigError::Load {
            path: path.to_path_buf(),
            source: e.into(),
        })?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.report.validate()?;
        for kind in SourceKind::ALL {
            self.sources.get(kind).validate(kind)?;
        }
        Ok(())
    }

    /// Resolve relative paths against the directory holding the config file.
    pub fn resolve_paths(&mut self, base_dir: &Path) {
        for source in [
            &mut self.sources.impressions,
            &mut self.sources.clicks,
            &mut self.sources.payments,
        ] {
            source.path = base_dir.join(&source.path);
        }
        if let Some(dir) = self.output.parquet_dir.as_mut() {
            *dir = base_dir.join(&*dir);
        }
        if let Some(path) = self.output.csv_path.as_mut() {
            *path = base_dir.join(&*path);
        }
    }
}

/// Config file location: the path itself if it is a file, otherwise
/// `adreport.yml` inside it.
pub fn find_config(path: &Path) -> PathBuf {
    if path.is_dir() {
        path.join(CONFIG_FILE)
    } else {
        path.to_path_buf()
    }
}
