//! Telemetry logger / recorder
//!
//! Samples sensors for each vehicle snapshot it is handed and appends the
//! resulting row to a sink. When the destination cannot be opened at startup
//! the logger runs against a no-op sink instead of failing.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use super::format::{format_record, LogFormat};
use super::{LogError, LogRecord};
use crate::sensors::SensorSource;
use crate::vehicle::VehicleState;

/// Destination for telemetry rows
pub trait RecordSink: Send {
    /// Append one record durably
    fn append(&mut self, record: &LogRecord) -> Result<(), LogError>;

    /// False for sinks that discard everything
    fn is_active(&self) -> bool {
        true
    }
}

/// Appends rows to a file, one flush per row
pub struct FileSink {
    path: PathBuf,
    format: LogFormat,
    writer: BufWriter<File>,
}

impl FileSink {
    /// Open `path` for appending, creating parent directories and the header
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, LogError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let format = LogFormat::for_path(&path);
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let fresh = file.metadata()?.len() == 0;
        let mut writer = BufWriter::new(file);

        if fresh {
            if let Some(header) = format.header() {
                writeln!(writer, "{header}")?;
                writer.flush()?;
            }
        }

        Ok(Self {
            path,
            format,
            writer,
        })
    }

    /// File being written
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordSink for FileSink {
    fn append(&mut self, record: &LogRecord) -> Result<(), LogError> {
        let line = format_record(self.format, record)?;
        writeln!(self.writer, "{line}")?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Sink used when logging is unavailable
#[derive(Debug, Default)]
pub struct NullSink;

impl RecordSink for NullSink {
    fn append(&mut self, _record: &LogRecord) -> Result<(), LogError> {
        Ok(())
    }

    fn is_active(&self) -> bool {
        false
    }
}

/// Open the log destination, falling back to a [`NullSink`]
pub fn open_sink<P: AsRef<Path>>(path: P) -> Box<dyn RecordSink> {
    let path = path.as_ref();
    match FileSink::open(path) {
        Ok(sink) => {
            info!(path = %path.display(), "Telemetry log opened");
            Box::new(sink)
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Telemetry log unavailable, logging disabled");
            Box::new(NullSink)
        }
    }
}

/// Counters reported when the logger shuts down
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoggerStats {
    /// Rows appended
    pub written: u64,
    /// Intervals skipped because the write failed
    pub skipped: u64,
}

/// Periodic telemetry logger
pub struct TelemetryLogger {
    sink: Box<dyn RecordSink>,
    sensors: Arc<SensorSource>,
    session_start: DateTime<Utc>,
    stats: LoggerStats,
    /// A write failure has been reported and not yet recovered from
    failing: bool,
}

impl TelemetryLogger {
    /// Create a logger writing to `sink`
    pub fn new(sink: Box<dyn RecordSink>, sensors: Arc<SensorSource>) -> Self {
        Self::with_session_start(sink, sensors, Utc::now())
    }

    /// Create a logger whose timestamps count from `session_start`
    pub fn with_session_start(
        sink: Box<dyn RecordSink>,
        sensors: Arc<SensorSource>,
        session_start: DateTime<Utc>,
    ) -> Self {
        Self {
            sink,
            sensors,
            session_start,
            stats: LoggerStats::default(),
            failing: false,
        }
    }

    /// Whether rows actually reach a destination
    pub fn is_active(&self) -> bool {
        self.sink.is_active()
    }

    /// Sample sensors for `vehicle` and append one row
    ///
    /// A failed write skips this interval; only the first failure of a streak
    /// is reported.
    pub fn record(&mut self, vehicle: &VehicleState) -> Option<LogRecord> {
        let reading = self.sensors.sample(vehicle);
        let record = LogRecord::new(self.session_start, vehicle, &reading);

        match self.sink.append(&record) {
            Ok(()) => {
                if self.failing {
                    info!("Telemetry log writes recovered");
                    self.failing = false;
                }
                self.stats.written += 1;
                Some(record)
            }
            Err(e) => {
                if !self.failing {
                    warn!(error = %e, "Telemetry log write failed, skipping interval");
                    self.failing = true;
                }
                self.stats.skipped += 1;
                None
            }
        }
    }

    /// Rows written and skipped so far
    pub fn stats(&self) -> LoggerStats {
        self.stats
    }
}
