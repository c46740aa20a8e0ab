//! Log file formats
//!
//! Rows are written as CSV or as JSON Lines, picked from the file extension.

use std::fs;
use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};

use super::{LogError, LogRecord};

/// Header row written once when a CSV log is created
pub const CSV_HEADER: &str =
    "timestamp,rpm,speed_kmh,coolant_temp_c,fuel_level_pct,battery_voltage_v";

const CSV_COLUMNS: usize = 6;

/// Supported log file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Comma-separated values
    Csv,
    /// One JSON object per line
    JsonLines,
}

impl LogFormat {
    /// Detect format from file extension
    pub fn from_extension(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_lowercase().as_str() {
            "csv" => Some(LogFormat::Csv),
            "jsonl" | "ndjson" => Some(LogFormat::JsonLines),
            _ => None,
        }
    }

    /// Format for a path, CSV when the extension is unknown
    pub fn for_path(path: &Path) -> Self {
        Self::from_extension(path).unwrap_or(LogFormat::Csv)
    }

    /// Get the file extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            LogFormat::Csv => "csv",
            LogFormat::JsonLines => "jsonl",
        }
    }

    /// Line written at the top of a new file, if any
    pub fn header(&self) -> Option<&'static str> {
        match self {
            LogFormat::Csv => Some(CSV_HEADER),
            LogFormat::JsonLines => None,
        }
    }
}

/// Render one record as a line, without the trailing newline
pub fn format_record(format: LogFormat, record: &LogRecord) -> Result<String, LogError> {
    match format {
        LogFormat::Csv => Ok(format!(
            "{},{:.0},{:.2},{:.1},{:.2},{:.2}",
            record.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            record.rpm,
            record.speed_kmh,
            record.coolant_temp_c,
            record.fuel_level_pct,
            record.battery_voltage_v,
        )),
        LogFormat::JsonLines => Ok(serde_json::to_string(record)?),
    }
}

/// Parse one CSV data row
///
/// `line` is the 1-based line number used in error messages.
pub fn parse_csv_row(row: &str, line: usize) -> Result<LogRecord, LogError> {
    let fields: Vec<&str> = row.trim().split(',').collect();
    if fields.len() != CSV_COLUMNS {
        return Err(LogError::MalformedRow {
            line,
            message: format!("expected {CSV_COLUMNS} columns, found {}", fields.len()),
        });
    }

    let timestamp = DateTime::parse_from_rfc3339(fields[0])
        .map_err(|e| LogError::MalformedRow {
            line,
            message: format!("bad timestamp '{}': {e}", fields[0]),
        })?
        .with_timezone(&Utc);

    let number = |idx: usize| -> Result<f64, LogError> {
        fields[idx].parse::<f64>().map_err(|e| LogError::MalformedRow {
            line,
            message: format!("bad number '{}': {e}", fields[idx]),
        })
    };

    Ok(LogRecord {
        timestamp,
        rpm: number(1)?,
        speed_kmh: number(2)?,
        coolant_temp_c: number(3)?,
        fuel_level_pct: number(4)?,
        battery_voltage_v: number(5)?,
    })
}

/// Read every record of a log file, in append order
pub fn read_records<P: AsRef<Path>>(path: P) -> Result<Vec<LogRecord>, LogError> {
    let path = path.as_ref();
    let format = LogFormat::for_path(path);
    let content = fs::read_to_string(path)?;

    let mut records = Vec::new();
    for (idx, row) in content.lines().enumerate() {
        let line = idx + 1;
        if row.trim().is_empty() {
            continue;
        }
        match format {
            LogFormat::Csv => {
                if row.trim() == CSV_HEADER {
                    continue;
                }
                records.push(parse_csv_row(row, line)?);
            }
            LogFormat::JsonLines => records.push(serde_json::from_str(row)?),
        }
    }
    Ok(records)
}
