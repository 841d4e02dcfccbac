//! Source readers: JSONL and CSV files to typed records.

use crate::config::{ColumnType, IngestFormat, ProjectConfig, SourceDescriptor};
use crate::error::IngestError;
use adreport_core::{FieldValue, PipelineInput, Record, SourceBatch, SourceKind};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::{Map, Value};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::str::FromStr;

/// Read every record of a source, cast to its declared schema.
pub fn read_source(source: &SourceDescriptor) -> Result<Vec<Record>, IngestError> {
    match source.format {
        IngestFormat::Jsonl => read_jsonl(source),
        IngestFormat::Csv => read_csv(source),
    }
}

/// Read all three sources of a project into pipeline input.
pub fn load_input(config: &ProjectConfig) -> Result<PipelineInput, IngestError> {
    let batch = |kind: SourceKind| -> Result<SourceBatch, IngestError> {
        let source = config.sources.get(kind);
        let records = read_source(source)?;
        tracing::info!(
            source = kind.as_str(),
            path = %source.path.display(),
            records = records.len(),
            "read source"
        );
        Ok(SourceBatch {
            rename: source.rename.clone(),
            records,
        })
    };

    Ok(PipelineInput {
        impressions: batch(SourceKind::Impressions)?,
        clicks: batch(SourceKind::Clicks)?,
        payments: batch(SourceKind::Payments)?,
    })
}

fn open(path: &Path) -> Result<File, IngestError> {
    File::open(path).map_err(|source| IngestError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn read_jsonl(source: &SourceDescriptor) -> Result<Vec<Record>, IngestError> {
    let path = source.path.as_path();
    let reader = BufReader::new(open(path)?);
    let mut records = Vec::new();

    for (idx, line) in reader.lines().enumerate() {
        let line_no = idx as u64 + 1;
        let line = line.map_err(|source| IngestError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        if line.trim().is_empty() {
            continue;
        }

        let object: Map<String, Value> =
            serde_json::from_str(&line).map_err(|source| IngestError::Json {
                path: path.to_path_buf(),
                line: line_no,
                source,
            })?;
        let object = if source.unnest {
            unnest(object, path, line_no)?
        } else {
            object
        };

        let mut record = Record::new();
        for (field, column_type) in &source.schema {
            let value = match object.get(field) {
                Some(value) => cast_json(value, *column_type),
                None => Some(FieldValue::Null),
            };
            let value = value.ok_or_else(|| IngestError::Cast {
                path: path.to_path_buf(),
                line: line_no,
                field: field.clone(),
                value: object.get(field).map(|v| v.to_string()).unwrap_or_default(),
                expected: column_type.as_str().to_string(),
            })?;
            record.insert(field.clone(), value);
        }
        records.push(record);
    }

    Ok(records)
}

/// Replace each object-valued field with its own fields, one level deep.
fn unnest(object: Map<String, Value>, path: &Path, line: u64) -> Result<Map<String, Value>, IngestError> {
    let mut flat = Map::new();
    let mut nested = Vec::new();

    for (field, value) in object {
        match value {
            Value::Object(children) => nested.push((field, children)),
            other => {
                flat.insert(field, other);
            }
        }
    }

    for (parent, children) in nested {
        for (field, value) in children {
            if flat.contains_key(&field) {
                return Err(IngestError::DuplicateField {
                    path: path.to_path_buf(),
                    line,
                    parent,
                    field,
                });
            }
            flat.insert(field, value);
        }
    }

    Ok(flat)
}

fn cast_json(value: &Value, column_type: ColumnType) -> Option<FieldValue> {
    match value {
        Value::Null => Some(FieldValue::Null),
        Value::String(s) => cast_str(s, column_type),
        Value::Number(n) => match column_type {
            ColumnType::Int64 => n.as_i64().map(FieldValue::Int),
            ColumnType::Decimal => cast_str(&n.to_string(), column_type),
            ColumnType::Date | ColumnType::String => None,
        },
        Value::Bool(_) | Value::Array(_) | Value::Object(_) => None,
    }
}

fn cast_str(raw: &str, column_type: ColumnType) -> Option<FieldValue> {
    let raw = raw.trim();
    match column_type {
        ColumnType::Date => NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok().map(FieldValue::Date),
        ColumnType::Int64 => raw.parse::<i64>().ok().map(FieldValue::Int),
        ColumnType::Decimal => Decimal::from_str(raw)
            .or_else(|_| Decimal::from_scientific(raw))
            .ok()
            .map(FieldValue::Decimal),
        ColumnType::String => Some(FieldValue::Str(raw.to_string())),
    }
}

fn read_csv(source: &SourceDescriptor) -> Result<Vec<Record>, IngestError> {
    let path = source.path.as_path();
    let csv_error = |source| IngestError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::Reader::from_reader(open(path)?);
    let headers = reader.headers().map_err(csv_error)?.clone();

    // Schema field -> column index; absent columns read as null.
    let columns: Vec<(&String, ColumnType, Option<usize>)> = source
        .schema
        .iter()
        .map(|(field, column_type)| (field, *column_type, headers.iter().position(|h| h == field)))
        .collect();

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row.map_err(csv_error)?;
        let line = row.position().map(|p| p.line()).unwrap_or_default();

        let mut record = Record::new();
        for (field, column_type, idx) in &columns {
            let raw = idx.and_then(|i| row.get(i)).unwrap_or("");
            let value = if raw.is_empty() {
                FieldValue::Null
            } else {
                cast_str(raw, *column_type).ok_or_else(|| IngestError::Cast {
                    path: path.to_path_buf(),
                    line,
                    field: field.to_string(),
                    value: raw.to_string(),
                    expected: column_type.as_str().to_string(),
                })?
            };
            record.insert(field.to_string(), value);
        }
        records.push(record);
    }

    Ok(records)
}
