//! Telemetry Logging
//!
//! Persists periodic vehicle and sensor samples as append-only rows.

mod format;
mod recorder;

pub use format::{format_record, parse_csv_row, read_records, LogFormat, CSV_HEADER};
pub use recorder::{open_sink, FileSink, LoggerStats, NullSink, RecordSink, TelemetryLogger};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sensors::SensorReading;
use crate::vehicle::VehicleState;

/// Errors raised by log sinks and readers
#[derive(Error, Debug)]
pub enum LogError {
    /// Log file could not be opened, written or read
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON Lines row failed to encode or decode
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV row with the wrong shape or an unparsable value
    #[error("Malformed row {line}: {message}")]
    MalformedRow {
        /// 1-based line number in the file
        line: usize,
        /// What was wrong with the row
        message: String,
    },
}

/// One persisted telemetry row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    /// Wall-clock start of the log session plus simulated elapsed time
    pub timestamp: DateTime<Utc>,
    /// Engine speed (rev/min)
    pub rpm: f64,
    /// Vehicle speed (km/h)
    pub speed_kmh: f64,
    /// Coolant temperature (°C)
    pub coolant_temp_c: f64,
    /// Fuel level (%)
    pub fuel_level_pct: f64,
    /// Battery voltage (V)
    pub battery_voltage_v: f64,
}

impl LogRecord {
    /// Build a record from one vehicle snapshot and one sensor sample
    pub fn new(session_start: DateTime<Utc>, vehicle: &VehicleState, sensors: &SensorReading) -> Self {
        let offset = chrono::Duration::milliseconds((vehicle.elapsed_s * 1000.0).round() as i64);
        Self {
            timestamp: session_start + offset,
            rpm: vehicle.rpm,
            speed_kmh: vehicle.speed_kmh,
            coolant_temp_c: sensors.coolant_temp_c,
            fuel_level_pct: sensors.fuel_level_pct,
            battery_voltage_v: sensors.battery_voltage_v,
        }
    }
}
