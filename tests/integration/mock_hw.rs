//! Mock relays and audit sink for integration tests.
//!
//! Records every actuator call with a timestamp so tests can assert on
//! ordering and the delays between calls without touching real GPIO.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use retic::app::events::{AuditEvent, AuditLog, AuditOperation};
use retic::app::ports::{ActuatorPort, AuditSink, Level};
use retic::config::{TimingConfig, ValveSection};
use retic::error::{ActuatorError, SinkError};
use retic::{Controller, Topology};

// ── Actuator call record ──────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelayCall {
    pub pin: u8,
    pub level: Level,
    pub at: Instant,
}

// ── MockRelays ────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct MockRelays {
    calls: Arc<Mutex<Vec<RelayCall>>>,
    failing: Arc<Mutex<Option<u8>>>,
}

#[allow(dead_code)]
impl MockRelays {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_pin(&self, pin: u8) {
        *self.failing.lock().unwrap() = Some(pin);
    }

    pub fn calls(&self) -> Vec<RelayCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn sequence(&self) -> Vec<(u8, Level)> {
        self.calls().iter().map(|c| (c.pin, c.level)).collect()
    }

    /// Pins currently driven high.
    pub fn open_pins(&self) -> Vec<u8> {
        let mut state = BTreeMap::new();
        for c in self.calls() {
            state.insert(c.pin, c.level);
        }
        state
            .into_iter()
            .filter(|(_, l)| *l == Level::High)
            .map(|(p, _)| p)
            .collect()
    }
}

impl ActuatorPort for MockRelays {
    fn set(&mut self, pin: u8, level: Level) -> Result<(), ActuatorError> {
        self.calls.lock().unwrap().push(RelayCall {
            pin,
            level,
            at: Instant::now(),
        });
        if *self.failing.lock().unwrap() == Some(pin) {
            return Err(ActuatorError::GpioWriteFailed(pin));
        }
        Ok(())
    }
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<AuditEvent>>>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn summary(&self) -> Vec<(String, AuditOperation)> {
        self.events()
            .into_iter()
            .map(|e| (e.zone, e.operation))
            .collect()
    }

    pub fn stops(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| e.operation == AuditOperation::Stop)
            .count()
    }
}

impl AuditSink for RecordingSink {
    fn record(&mut self, event: &AuditEvent) -> Result<(), SinkError> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

/// Sink that always fails.
pub struct BrokenSink;

impl AuditSink for BrokenSink {
    fn record(&mut self, _event: &AuditEvent) -> Result<(), SinkError> {
        Err(SinkError::File(std::io::Error::other("disk full")))
    }

    fn name(&self) -> &'static str {
        "broken"
    }
}

// ── Fixtures ──────────────────────────────────────────────────

/// Test time unit.
pub const UNIT_MS: u64 = 20;

pub fn timing() -> TimingConfig {
    TimingConfig {
        unit_ms: UNIT_MS,
        idle_poll_ms: 5,
        shutdown_grace_ms: 3000,
        ..TimingConfig::default()
    }
}

pub fn units(n: u64) -> Duration {
    Duration::from_millis(UNIT_MS * n)
}

pub fn section(name: &str, pin: u8, master: Option<&str>) -> ValveSection {
    ValveSection {
        name: name.into(),
        description: format!("{name} description"),
        pin,
        master: master.map(str::to_string),
    }
}

/// ZONE1 (pin 1) and ZONE2 (pin 2) behind MASTER (pin 9); ZONE3 (pin 3) standalone.
pub fn garden() -> Topology {
    let mut sections = BTreeMap::new();
    sections.insert("master".to_string(), section("master", 9, None));
    sections.insert("zone1".to_string(), section("zone1", 1, Some("master")));
    sections.insert("zone2".to_string(), section("zone2", 2, Some("master")));
    sections.insert("zone3".to_string(), section("zone3", 3, None));
    Topology::resolve(&sections).unwrap()
}

pub struct Rig {
    pub controller: Controller,
    pub relays: MockRelays,
    pub sink: RecordingSink,
}

pub fn rig(topology: Topology) -> Rig {
    let relays = MockRelays::new();
    let sink = RecordingSink::new();
    let audit = AuditLog::new().with_sink(sink.clone());
    let controller = Controller::start(topology, relays.clone(), audit, timing()).unwrap();
    Rig {
        controller,
        relays,
        sink,
    }
}

/// Poll `cond` for up to five seconds.
pub fn wait_for(mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    false
}
