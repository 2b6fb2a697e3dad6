// Archive index records and the converter from raw index exports.

use std::fs;
use std::path::Path;

use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ArchiveError, Result};

pub const HEADER: [&str; 3] = ["original", "timestamp", "endkey"];

const TIMESTAMP_LEN: usize = 14;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexRecord {
    pub original_url: String,
    /// `YYYYMMDDHHMMSS`
    pub timestamp: String,
    pub end_key: String,
}

impl IndexRecord {
    pub fn new(
        original_url: impl Into<String>,
        timestamp: impl Into<String>,
        end_key: impl Into<String>,
    ) -> Self {
        Self {
            original_url: original_url.into(),
            timestamp: timestamp.into(),
            end_key: end_key.into(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.original_url.trim().is_empty() {
            return Err(ArchiveError::MalformedRecord {
                reason: "original URL is empty".to_string(),
            });
        }
        if !is_timestamp(&self.timestamp) {
            return Err(ArchiveError::MalformedRecord {
                reason: format!(
                    "timestamp {:?} for {} is not {} digits",
                    self.timestamp, self.original_url, TIMESTAMP_LEN
                ),
            });
        }
        Ok(())
    }

    fn to_row(&self) -> [&str; 3] {
        [&self.original_url, &self.timestamp, &self.end_key]
    }
}

pub fn is_timestamp(value: &str) -> bool {
    value.len() == TIMESTAMP_LEN && value.bytes().all(|b| b.is_ascii_digit())
}

fn is_header(row: &Value) -> bool {
    match row.as_array() {
        Some(fields) => {
            fields.len() == HEADER.len()
                && fields
                    .iter()
                    .zip(HEADER.iter())
                    .all(|(field, name)| field.as_str() == Some(*name))
        }
        None => false,
    }
}

fn field_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Normalizes raw export rows: strips a leading header row and drops rows
/// with fewer than two fields. Field contents are not validated here.
pub fn convert_rows(rows: &[Value]) -> Vec<IndexRecord> {
    let rows = match rows.first() {
        Some(first) if is_header(first) => &rows[1..],
        _ => rows,
    };

    let mut records = Vec::with_capacity(rows.len());
    for (position, row) in rows.iter().enumerate() {
        let fields = row.as_array().map(Vec::as_slice).unwrap_or(&[]);
        if fields.len() < 2 {
            warn!(
                "Skipping index row {}: expected at least 2 fields, found {}",
                position + 1,
                fields.len()
            );
            continue;
        }

        records.push(IndexRecord {
            original_url: field_text(&fields[0]),
            timestamp: field_text(&fields[1]),
            end_key: fields.get(2).map(field_text).unwrap_or_default(),
        });
    }
    records
}

pub fn parse_index(json: &str) -> std::result::Result<Vec<IndexRecord>, serde_json::Error> {
    let rows: Vec<Value> = serde_json::from_str(json)?;
    Ok(convert_rows(&rows))
}

/// Reads and converts an index file. Any failure here is fatal for a run.
pub fn read_index<P: AsRef<Path>>(path: P) -> Result<Vec<IndexRecord>> {
    let path_ref = path.as_ref();
    let input_error = |message: String| ArchiveError::InputRead {
        path: path_ref.to_path_buf(),
        message,
    };

    let json = fs::read_to_string(path_ref).map_err(|e| input_error(e.to_string()))?;
    parse_index(&json).map_err(|e| input_error(format!("invalid index JSON: {}", e)))
}

/// Like [`read_index`], but an index with no records is an error too.
pub fn load_records<P: AsRef<Path>>(path: P) -> Result<Vec<IndexRecord>> {
    let path_ref = path.as_ref();
    let records = read_index(path_ref)?;
    if records.is_empty() {
        return Err(ArchiveError::InputRead {
            path: path_ref.to_path_buf(),
            message: "No valid URLs found in input file".to_string(),
        });
    }
    Ok(records)
}

pub fn write_index<P: AsRef<Path>>(records: &[IndexRecord], path: P) -> Result<()> {
    let path_ref = path.as_ref();
    let mut rows: Vec<[&str; 3]> = Vec::with_capacity(records.len() + 1);
    rows.push(HEADER);
    rows.extend(records.iter().map(IndexRecord::to_row));

    let json = serde_json::to_string_pretty(&rows)
        .map_err(|e| ArchiveError::filesystem(path_ref, e.into()))?;
    fs::write(path_ref, json).map_err(|e| ArchiveError::filesystem(path_ref, e))
}
