//! Append-only audit file.
//!
//! One CSV-ish line per event, quoted, CRLF-terminated:
//! ```text
//! '2024-01-05 06:00:00','ZONE1','Start','600'
//! '2024-01-05 06:10:04','ZONE1','Stop','604'
//! ```
//! The file is opened per write so it can be rotated underneath us.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use crate::app::events::AuditEvent;
use crate::app::ports::AuditSink;
use crate::error::SinkError;

pub struct EventLogFile {
    path: PathBuf,
}

impl EventLogFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Render one event as a log line, timestamp in local time.
pub fn format_line(event: &AuditEvent) -> String {
    let at: DateTime<Local> = event.timestamp.into();
    format!(
        "'{}','{}','{}','{}'\r\n",
        at.format("%Y-%m-%d %H:%M:%S"),
        event.zone,
        event.operation.as_str(),
        event.duration
    )
}

impl AuditSink for EventLogFile {
    fn record(&mut self, event: &AuditEvent) -> Result<(), SinkError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(format_line(event).as_bytes())?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "event-log-file"
    }
}
