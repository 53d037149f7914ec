//! Outbound audit events.
//!
//! The activation sequence emits these through the
//! [`AuditSink`](super::ports::AuditSink) port.  Adapters on the other
//! side decide what to do with them: log line, append-only file,
//! relational store.  Nothing keeps them in memory after emission.

use std::time::SystemTime;

use log::warn;

use super::ports::AuditSink;

/// Which end of an activation an event marks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditOperation {
    Start,
    Stop,
}

impl AuditOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Start => "Start",
            Self::Stop => "Stop",
        }
    }
}

/// One Start or Stop record.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEvent {
    pub zone: String,
    pub operation: AuditOperation,
    pub timestamp: SystemTime,
    /// Requested units for `Start`, measured elapsed units for `Stop`.
    pub duration: u64,
}

impl AuditEvent {
    pub fn start(zone: &str, requested: u64) -> Self {
        Self {
            zone: zone.to_string(),
            operation: AuditOperation::Start,
            timestamp: SystemTime::now(),
            duration: requested,
        }
    }

    pub fn stop(zone: &str, measured: u64) -> Self {
        Self {
            zone: zone.to_string(),
            operation: AuditOperation::Stop,
            timestamp: SystemTime::now(),
            duration: measured,
        }
    }
}

/// Fan-out over every configured sink.
///
/// A failing sink is logged and skipped; the others still receive the
/// event and the caller never sees the error.
#[derive(Default)]
pub struct AuditLog {
    sinks: Vec<Box<dyn AuditSink>>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    pub fn with_sink(mut self, sink: impl AuditSink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    pub fn push(&mut self, sink: Box<dyn AuditSink>) {
        self.sinks.push(sink);
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    pub fn emit(&mut self, event: &AuditEvent) {
        for sink in &mut self.sinks {
            if let Err(e) = sink.record(event) {
                warn!(
                    "audit sink '{}' failed on {} {}: {}",
                    sink.name(),
                    event.zone,
                    event.operation.as_str(),
                    e
                );
            }
        }
    }
}
