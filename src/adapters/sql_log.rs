//! Relational audit sink (SQLite).
//!
//! Start rows carry the requested duration, Stop rows the measured one:
//!
//! | column              | Start     | Stop     |
//! |---------------------|-----------|----------|
//! | `duration`          | requested | NULL     |
//! | `measured_duration` | NULL      | measured |

use std::path::Path;

use chrono::{DateTime, Local};
use rusqlite::{Connection, params};

use crate::app::events::{AuditEvent, AuditOperation};
use crate::app::ports::AuditSink;
use crate::error::SinkError;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS retic_logs (
    id                INTEGER PRIMARY KEY AUTOINCREMENT,
    zone              TEXT    NOT NULL,
    operation         TEXT    NOT NULL,
    duration          INTEGER,
    measured_duration INTEGER,
    time              TEXT    NOT NULL
)";

pub struct SqlEventLog {
    conn: Connection,
}

impl SqlEventLog {
    /// Open (or create) the database file and make sure the table exists.
    pub fn open(path: &Path) -> Result<Self, SinkError> {
        Self::with_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, SinkError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, SinkError> {
        conn.execute(SCHEMA, [])?;
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl AuditSink for SqlEventLog {
    fn record(&mut self, event: &AuditEvent) -> Result<(), SinkError> {
        let (requested, measured) = match event.operation {
            AuditOperation::Start => (Some(event.duration as i64), None),
            AuditOperation::Stop => (None, Some(event.duration as i64)),
        };
        let at: DateTime<Local> = event.timestamp.into();
        self.conn.execute(
            "INSERT INTO retic_logs (zone, operation, duration, measured_duration, time)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                event.zone,
                event.operation.as_str(),
                requested,
                measured,
                at.format("%Y-%m-%d %H:%M:%S").to_string(),
            ],
        )?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "sql"
    }
}
