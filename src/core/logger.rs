//! Sample logging
//!
//! Appends every monitor poll to a file as plain text, CSV or JSON lines.

use crate::core::history::Sample;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Log format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Plain text
    #[default]
    Text,
    /// CSV with header
    Csv,
    /// JSON lines
    #[serde(alias = "jsonl")]
    Json,
}

impl LogFormat {
    /// Get file extension for format
    pub fn extension(&self) -> &'static str {
        match self {
            LogFormat::Text => "txt",
            LogFormat::Csv => "csv",
            LogFormat::Json => "jsonl",
        }
    }
}

/// A single log entry: a sample or a failed poll
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// Time of the poll
    pub timestamp: DateTime<Local>,
    /// Poll number
    pub index: u64,
    /// Gauge that was read
    pub gauge: u8,
    /// Pressure, absent for failed polls
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    /// Status code, absent for failed polls
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u8>,
    /// Status text or error message
    pub message: String,
}

impl LogEntry {
    /// Entry for a sample
    pub fn from_sample(sample: &Sample) -> Self {
        Self {
            timestamp: sample.timestamp,
            index: sample.index,
            gauge: sample.gauge,
            value: Some(sample.reading.value),
            status_code: Some(sample.reading.status_code()),
            message: sample.reading.status_text().to_string(),
        }
    }

    /// Entry for a poll that failed
    pub fn failure(index: u64, gauge: u8, error: &str) -> Self {
        Self {
            timestamp: Local::now(),
            index,
            gauge,
            value: None,
            status_code: None,
            message: error.to_string(),
        }
    }

    /// Format as text
    pub fn to_text(&self) -> String {
        let stamp = self.timestamp.format("%Y-%m-%d %H:%M:%S%.3f");
        match (self.value, self.status_code) {
            (Some(value), Some(code)) => format!(
                "[{stamp}] #{} gauge {} {:.4e} [{}] {}",
                self.index, self.gauge, value, code, self.message
            ),
            _ => format!(
                "[{stamp}] #{} gauge {} ERROR {}",
                self.index, self.gauge, self.message
            ),
        }
    }

    /// Format as CSV
    pub fn to_csv(&self) -> String {
        let value = self.value.map(|v| format!("{v:e}")).unwrap_or_default();
        let code = self.status_code.map(|c| c.to_string()).unwrap_or_default();
        format!(
            "\"{}\",{},{},{},{},\"{}\"",
            self.timestamp.format("%Y-%m-%d %H:%M:%S%.3f"),
            self.index,
            self.gauge,
            value,
            code,
            self.message.replace('"', "\"\"")
        )
    }

    /// Format as JSON line
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Format for the given log format
    pub fn render(&self, format: LogFormat) -> String {
        match format {
            LogFormat::Text => self.to_text(),
            LogFormat::Csv => self.to_csv(),
            LogFormat::Json => self.to_json(),
        }
    }
}

/// CSV header line
pub const CSV_HEADER: &str = "Timestamp,Index,Gauge,Value,StatusCode,Message";

/// File logger for monitor samples
pub struct SampleLogger {
    file: Option<BufWriter<File>>,
    format: LogFormat,
    path: Option<PathBuf>,
    lines_logged: usize,
}

impl Default for SampleLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl SampleLogger {
    /// Create new logger (not logging to file yet)
    pub fn new() -> Self {
        Self {
            file: None,
            format: LogFormat::Text,
            path: None,
            lines_logged: 0,
        }
    }

    /// Start appending to a file
    pub fn start(&mut self, path: &Path, format: LogFormat) -> io::Result<()> {
        let fresh = !path.exists() || std::fs::metadata(path)?.len() == 0;
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let mut writer = BufWriter::new(file);

        if format == LogFormat::Csv && fresh {
            writeln!(writer, "{CSV_HEADER}")?;
        }

        self.file = Some(writer);
        self.format = format;
        self.path = Some(path.to_path_buf());
        self.lines_logged = 0;
        tracing::debug!(path = %path.display(), ?format, "sample log started");
        Ok(())
    }

    /// Stop logging
    pub fn stop(&mut self) {
        if let Some(ref mut file) = self.file {
            let _ = file.flush();
        }
        self.file = None;
    }

    /// Is currently logging
    pub fn is_logging(&self) -> bool {
        self.file.is_some()
    }

    /// Get log path
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Lines written since start
    pub fn lines_logged(&self) -> usize {
        self.lines_logged
    }

    /// Log a sample
    pub fn log_sample(&mut self, sample: &Sample) -> io::Result<()> {
        self.write_entry(&LogEntry::from_sample(sample))
    }

    /// Log a failed poll
    pub fn log_failure(&mut self, index: u64, gauge: u8, error: &str) -> io::Result<()> {
        self.write_entry(&LogEntry::failure(index, gauge, error))
    }

    fn write_entry(&mut self, entry: &LogEntry) -> io::Result<()> {
        let Some(ref mut file) = self.file else {
            return Ok(());
        };
        writeln!(file, "{}", entry.render(self.format))?;
        self.lines_logged += 1;
        file.flush()
    }
}

impl Drop for SampleLogger {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Generate log filename with timestamp
pub fn generate_log_filename(prefix: &str, format: LogFormat) -> String {
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    format!("{}_{}.{}", prefix, timestamp, format.extension())
}
