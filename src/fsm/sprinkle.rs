//! `Sprinkle`: one open → wait → close cycle for a single zone.
//!
//! The guard owns the closing half of the sequence.  Once `activate()`
//! has touched a relay, `deactivate()` runs exactly once: either from
//! [`Sprinkle::run`] on the normal path, or from `Drop` if the sequence
//! is abandoned (panic, early return), in which case a warning is logged.
//!
//! ## Relay ordering
//!
//! ```text
//!   master ▔▔▔▔▔▔▔▔▔▔▔▔▔▔▔▔▔▔▔▔▔▔▔▔▔╲_______________
//!   zone   ___╱▔▔▔▔▔▔▔▔▔▔▔▔▔▔▔▔▔▔▔▔▔▔▔▔▔▔▔▔╲______
//!          │settle│     duration      │ drain │
//! ```
//!
//! The master opens first and closes first; the zone stays open through
//! the drain delay so the main line bleeds off through it.  Actuator
//! failures are logged and the sequence carries on, so a failed open
//! still ends with a close attempt on every pin.

use std::time::{Duration, Instant};

use log::{debug, error, info, warn};

use crate::app::cancel::CancelToken;
use crate::app::events::{AuditEvent, AuditLog};
use crate::app::ports::{ActuatorPort, Level};
use crate::config::TimingConfig;
use crate::topology::Valve;

use super::Phase;

/// Everything the sequence needs to know about one activation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationPlan {
    pub zone: String,
    pub zone_pin: u8,
    pub master_pin: Option<u8>,
    pub duration_secs: u32,
}

impl ActivationPlan {
    pub fn for_valve(valve: &Valve, duration_secs: u32) -> Self {
        Self {
            zone: valve.zone.clone(),
            zone_pin: valve.pin,
            master_pin: valve.master_pin(),
            duration_secs,
        }
    }
}

/// How the wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationOutcome {
    /// Full duration elapsed.
    Completed,
    /// Cancel token tripped before the duration elapsed.
    Cancelled,
}

/// Scoped activation of one zone (and its master, if any).
pub struct Sprinkle<'a, A: ActuatorPort + ?Sized> {
    plan: ActivationPlan,
    timing: TimingConfig,
    actuator: &'a mut A,
    audit: &'a mut AuditLog,
    phase: Phase,
    started: Option<Instant>,
    closed: bool,
}

impl<'a, A: ActuatorPort + ?Sized> Sprinkle<'a, A> {
    pub fn new(
        plan: ActivationPlan,
        timing: TimingConfig,
        actuator: &'a mut A,
        audit: &'a mut AuditLog,
    ) -> Self {
        debug!("New sprinkler job created: {}", plan.zone);
        Self {
            plan,
            timing,
            actuator,
            audit,
            phase: Phase::Idle,
            started: None,
            closed: false,
        }
    }

    /// Run the whole cycle.  Closes the valves before returning.
    pub fn run(mut self, cancel: &CancelToken) -> ActivationOutcome {
        debug!(
            "Sprinkler started: pin {} for {}",
            self.plan.zone_pin, self.plan.duration_secs
        );
        self.activate();
        let outcome = self.wait(cancel);
        self.deactivate();
        if outcome == ActivationOutcome::Cancelled {
            debug!("Sprinkler cancelled: {}", self.plan.zone);
        }
        debug!("Sprinkler stopped: pin {}", self.plan.zone_pin);
        outcome
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn plan(&self) -> &ActivationPlan {
        &self.plan
    }

    fn enter(&mut self, phase: Phase) {
        debug!("{}: {} -> {}", self.plan.zone, self.phase, phase);
        self.phase = phase;
    }

    fn drive(&mut self, pin: u8, level: Level) {
        debug!("{} valve: {}", if level == Level::High { "Opening" } else { "Closing" }, pin);
        if let Err(e) = self.actuator.set(pin, level) {
            error!("{}: pin {} -> {:?} failed: {}", self.plan.zone, pin, level, e);
        }
    }

    /// Open master (then settle), open zone, emit Start.
    pub fn activate(&mut self) {
        if self.phase != Phase::Idle {
            return;
        }
        self.started = Some(Instant::now());

        if let Some(master) = self.plan.master_pin {
            self.enter(Phase::MasterOpening);
            self.drive(master, Level::High);
            std::thread::sleep(self.timing.settle());
        }

        self.enter(Phase::ZoneOpening);
        self.drive(self.plan.zone_pin, Level::High);

        self.audit.emit(&AuditEvent::start(
            &self.plan.zone,
            u64::from(self.plan.duration_secs),
        ));
        self.enter(Phase::Waiting);
    }

    /// Block for the requested duration or until `cancel` trips.
    ///
    /// This is the only cancellable suspension point in the sequence;
    /// the settle and drain delays always run to completion.
    pub fn wait(&mut self, cancel: &CancelToken) -> ActivationOutcome {
        let duration = self.timing.unit() * self.plan.duration_secs;
        if cancel.wait_timeout(duration) {
            ActivationOutcome::Cancelled
        } else {
            ActivationOutcome::Completed
        }
    }

    /// Close master (then drain), close zone, emit Stop.  Runs once.
    pub fn deactivate(&mut self) {
        if self.closed || self.phase == Phase::Idle {
            return;
        }
        self.closed = true;

        if let Some(master) = self.plan.master_pin {
            self.enter(Phase::MasterClosing);
            self.drive(master, Level::Low);
            std::thread::sleep(self.timing.drain());
        }

        self.enter(Phase::ZoneClosing);
        self.drive(self.plan.zone_pin, Level::Low);

        let elapsed = self.started.map_or(Duration::ZERO, |t| t.elapsed());
        let measured = to_units(elapsed, self.timing.unit());
        self.audit.emit(&AuditEvent::stop(&self.plan.zone, measured));
        info!("{} closed after {} units", self.plan.zone, measured);
        self.enter(Phase::Complete);
    }
}

impl<A: ActuatorPort + ?Sized> Drop for Sprinkle<'_, A> {
    fn drop(&mut self) {
        if self.phase != Phase::Idle && !self.closed {
            self.deactivate();
            warn!("Sprinkler stopped abnormally: {}", self.plan.zone);
        }
    }
}

/// Elapsed time rounded to the nearest whole unit.
fn to_units(elapsed: Duration, unit: Duration) -> u64 {
    let unit_ms = unit.as_millis().max(1);
    ((elapsed.as_millis() + unit_ms / 2) / unit_ms) as u64
}
