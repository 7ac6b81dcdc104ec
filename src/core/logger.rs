//! Session transcript logging
//!
//! Records every command written to the board and every line read back,
//! with timestamps, in one of several formats.

use chrono::{DateTime, Local};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

/// Shared handle to a transcript
pub type Logger = Arc<Mutex<SessionLogger>>;

/// Transcript format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Plain text
    #[default]
    Text,
    /// Hex dump
    Hex,
    /// CSV with timestamp
    Csv,
    /// JSON lines
    JsonLines,
}

impl LogFormat {
    /// Get file extension for format
    pub fn extension(&self) -> &'static str {
        match self {
            LogFormat::Text => "txt",
            LogFormat::Hex => "hex",
            LogFormat::Csv => "csv",
            LogFormat::JsonLines => "jsonl",
        }
    }
}

/// Traffic direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// Command written to the board
    Sent,
    /// Reply line consumed by a verb
    Received,
    /// Line discarded while resynchronizing
    Drained,
    /// Local annotation
    Info,
}

impl Direction {
    fn label(&self) -> &'static str {
        match self {
            Direction::Sent => "TX",
            Direction::Received => "RX",
            Direction::Drained => "DR",
            Direction::Info => "##",
        }
    }
}

/// A single transcript entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// Local time the line was recorded
    pub timestamp: DateTime<Local>,
    /// Traffic direction
    pub direction: Direction,
    /// Line content without terminator
    pub text: String,
}

impl LogEntry {
    /// Create new entry stamped now
    pub fn new(direction: Direction, text: &str) -> Self {
        Self {
            timestamp: Local::now(),
            direction,
            text: text.to_string(),
        }
    }

    /// Format as text
    pub fn to_text(&self, show_timestamp: bool) -> String {
        if show_timestamp {
            format!(
                "[{}] {} {}",
                self.timestamp.format("%Y-%m-%d %H:%M:%S%.3f"),
                self.direction.label(),
                self.text
            )
        } else {
            format!("{} {}", self.direction.label(), self.text)
        }
    }

    /// Format as hex
    pub fn to_hex(&self, show_timestamp: bool) -> String {
        let hex: Vec<String> = self.text.bytes().map(|b| format!("{:02X}", b)).collect();
        let hex = hex.join(" ");

        if show_timestamp {
            format!(
                "[{}] {} {}",
                self.timestamp.format("%Y-%m-%d %H:%M:%S%.3f"),
                self.direction.label(),
                hex
            )
        } else {
            format!("{} {}", self.direction.label(), hex)
        }
    }

    /// Format as CSV
    pub fn to_csv(&self) -> String {
        format!(
            "\"{}\",\"{}\",\"{}\",\"{}\"",
            self.timestamp.format("%Y-%m-%d %H:%M:%S%.3f"),
            self.direction.label(),
            hex::encode_upper(self.text.as_bytes()),
            self.text.replace('"', "\"\"")
        )
    }

    /// Format as JSON line
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    fn render(&self, format: LogFormat, show_timestamp: bool) -> String {
        match format {
            LogFormat::Text => self.to_text(show_timestamp),
            LogFormat::Hex => self.to_hex(show_timestamp),
            LogFormat::Csv => self.to_csv(),
            LogFormat::JsonLines => self.to_json(),
        }
    }
}

/// Transcript writer
pub struct SessionLogger {
    file: Option<BufWriter<File>>,
    format: LogFormat,
    lines_logged: usize,
}

impl Default for SessionLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionLogger {
    /// Create a logger with no file attached
    pub fn new() -> Self {
        Self {
            file: None,
            format: LogFormat::Text,
            lines_logged: 0,
        }
    }

    /// Create a shared logger already writing to `path`
    pub fn shared(path: &Path, format: LogFormat) -> io::Result<Logger> {
        let mut logger = Self::new();
        logger.start(path, format)?;
        Ok(Arc::new(Mutex::new(logger)))
    }

    /// Start appending to a file
    pub fn start(&mut self, path: &Path, format: LogFormat) -> io::Result<()> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let mut writer = BufWriter::new(file);

        if format == LogFormat::Csv {
            writeln!(writer, "Timestamp,Direction,Hex,Text")?;
        }

        self.file = Some(writer);
        self.format = format;
        self.lines_logged = 0;
        Ok(())
    }

    /// Flush and detach the file
    pub fn stop(&mut self) {
        if let Some(ref mut file) = self.file {
            let _ = file.flush();
        }
        self.file = None;
    }

    /// Record a line
    pub fn log(&mut self, direction: Direction, text: &str) {
        let Some(ref mut file) = self.file else {
            return;
        };

        let line = LogEntry::new(direction, text).render(self.format, true);
        if let Err(e) = writeln!(file, "{}", line) {
            tracing::warn!("Transcript write failed: {}", e);
        }
        self.lines_logged += 1;

        if self.lines_logged % 100 == 0 {
            let _ = file.flush();
        }
    }

    /// Record an annotation
    pub fn log_info(&mut self, message: &str) {
        self.log(Direction::Info, message);
    }

    /// Lines written to the file so far
    pub fn lines_logged(&self) -> usize {
        self.lines_logged
    }
}

impl Drop for SessionLogger {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Generate transcript filename with timestamp
pub fn generate_log_filename(prefix: &str, format: LogFormat) -> String {
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    format!("{}_{}.{}", prefix, timestamp, format.extension())
}
