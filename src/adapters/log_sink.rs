//! Log-based audit sink.
//!
//! Implements [`AuditSink`] by writing each Start/Stop record through the
//! `log` facade.  Always installed, so the audit trail survives even when
//! no file or database sink is configured.

use log::info;

use crate::app::events::AuditEvent;
use crate::app::ports::AuditSink;
use crate::error::SinkError;

pub struct LogAuditSink;

impl LogAuditSink {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LogAuditSink {
    fn default() -> Self {
        Self::new()
    }
}

impl AuditSink for LogAuditSink {
    fn record(&mut self, event: &AuditEvent) -> Result<(), SinkError> {
        info!(
            "AUDIT | {} | {} | {}",
            event.zone,
            event.operation.as_str(),
            event.duration
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}
