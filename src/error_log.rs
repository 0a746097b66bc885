//! Append-only error log.
//!
//! One line per failed run: `[<local ISO-8601 timestamp>] <message>`. The
//! file is opened, appended to and closed on every call; this program never
//! reads it back.

use chrono::Local;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Local time with microseconds, e.g. `2025-01-31T10:00:00.123456`.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// Handle on the error log file.
#[derive(Debug, Clone)]
pub struct ErrorLog {
    path: PathBuf,
}

impl ErrorLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `message` as a single timestamped line.
    ///
    /// Newlines inside `message` are flattened so each failure stays on one line.
    pub fn append(&self, message: &str) -> std::io::Result<()> {
        let timestamp = Local::now().format(TIMESTAMP_FORMAT).to_string();
        let line = format_entry(&timestamp, message);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())
    }
}

fn format_entry(timestamp: &str, message: &str) -> String {
    let flat = message.replace("\r\n", " ").replace('\n', " ");
    format!("[{timestamp}] {flat}\n")
}
