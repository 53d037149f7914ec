//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Controller (domain)
//! ```
//!
//! Driven adapters (GPIO, audit sinks) implement these traits.  The
//! [`Controller`](super::controller::Controller) owns them as trait
//! objects on its worker thread, so the domain core never touches
//! hardware directly.  The protocol engine reaches the controller through
//! [`ControlPort`], which keeps it testable against a mock.

use std::collections::BTreeMap;

use crate::error::{ActuatorError, SinkError};

use super::events::AuditEvent;
use super::status::StatusSnapshot;

// ───────────────────────────────────────────────────────────────
// Actuator port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Output level of a relay pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

impl From<Level> for embedded_hal::digital::PinState {
    fn from(level: Level) -> Self {
        match level {
            Level::Low => Self::Low,
            Level::High => Self::High,
        }
    }
}

/// Write-side port: the activation sequence drives relays through this.
///
/// Exclusively owned by the worker thread while an activation runs.
pub trait ActuatorPort {
    fn set(&mut self, pin: u8, level: Level) -> Result<(), ActuatorError>;
}

impl<T: ActuatorPort + ?Sized> ActuatorPort for Box<T> {
    fn set(&mut self, pin: u8, level: Level) -> Result<(), ActuatorError> {
        (**self).set(pin, level)
    }
}

// ───────────────────────────────────────────────────────────────
// Audit sink port (driven adapter: domain → logging collaborators)
// ───────────────────────────────────────────────────────────────

/// Receives Start/Stop records.  Failures are reported back to the
/// caller, which logs them; they never reach the valve sequence.
pub trait AuditSink: Send {
    fn record(&mut self, event: &AuditEvent) -> Result<(), SinkError>;

    /// Short name used in failure logs.
    fn name(&self) -> &'static str;
}

// ───────────────────────────────────────────────────────────────
// Control port (driving adapter: protocol → domain)
// ───────────────────────────────────────────────────────────────

/// The controller operations exposed to the command protocol.
///
/// Every method must return promptly; none of them waits on actuation.
pub trait ControlPort {
    /// Queue an activation.  Returns `false` if the zone is unknown.
    fn enqueue(&self, zone: &str, duration_secs: u32) -> bool;

    fn current_status(&self) -> StatusSnapshot;

    fn cancel_current(&self);

    fn cancel_all(&self);

    fn stations(&self) -> BTreeMap<String, String>;
}

impl<T: ControlPort + ?Sized> ControlPort for std::sync::Arc<T> {
    fn enqueue(&self, zone: &str, duration_secs: u32) -> bool {
        (**self).enqueue(zone, duration_secs)
    }

    fn current_status(&self) -> StatusSnapshot {
        (**self).current_status()
    }

    fn cancel_current(&self) {
        (**self).cancel_current();
    }

    fn cancel_all(&self) {
        (**self).cancel_all();
    }

    fn stations(&self) -> BTreeMap<String, String> {
        (**self).stations()
    }
}
