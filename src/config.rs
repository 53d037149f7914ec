//! System configuration parameters
//!
//! Everything tunable for the controller: where to listen, where audit
//! events go, activation timing, which GPIO backend to drive and the
//! raw valve sections that [`topology`](crate::topology) resolves.
//! Loaded once at startup from a JSON file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Core system configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub timing: TimingConfig,
    pub actuator: ActuatorBackend,
    /// Valve sections keyed by section name.
    pub valves: BTreeMap<String, ValveSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Largest datagram accepted; longer payloads are truncated by the socket.
    pub max_datagram: usize,
    /// Datagrams accepted per second before the listener starts dropping.
    pub rate_limit_per_sec: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8888,
            max_datagram: 1024,
            rate_limit_per_sec: 20,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default log filter when `RUST_LOG` is unset.
    pub level: String,
    /// Append-only audit file.
    pub event_log_file: Option<PathBuf>,
    /// SQLite database for the relational audit sink.
    pub sql_db: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            event_log_file: None,
            sql_db: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Length of one time unit in milliseconds (a second in production).
    pub unit_ms: u64,
    /// Units between master-high and zone-high.
    pub settle_units: u32,
    /// Units between master-low and zone-low.
    pub drain_units: u32,
    /// Worker wake-up interval while the queue is empty.
    pub idle_poll_ms: u64,
    /// Upper bound on how long `shutdown()` waits for the worker.
    pub shutdown_grace_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            unit_ms: 1000,
            settle_units: 1,
            drain_units: 3,
            idle_poll_ms: 1000,
            shutdown_grace_ms: 10_000,
        }
    }
}

impl TimingConfig {
    pub fn unit(&self) -> Duration {
        Duration::from_millis(self.unit_ms)
    }

    pub fn settle(&self) -> Duration {
        self.unit() * self.settle_units
    }

    pub fn drain(&self) -> Duration {
        self.unit() * self.drain_units
    }

    pub fn idle_poll(&self) -> Duration {
        Duration::from_millis(self.idle_poll_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

/// Which GPIO backend the binary drives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActuatorBackend {
    /// In-memory relays that only log transitions.
    #[default]
    Simulated,
    /// Linux `/sys/class/gpio`.
    Sysfs,
}

/// One raw valve section as written in the config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValveSection {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub pin: u8,
    /// Section name of the master relay feeding this valve.
    #[serde(default)]
    pub master: Option<String>,
}

impl SystemConfig {
    /// Read and validate a config file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_json(&raw)
    }

    /// Parse and validate a config document.
    pub fn from_json(raw: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(raw).map_err(|e| Error::Config(format!("parse error: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the controller cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(Error::Config("server.port must be non-zero".into()));
        }
        if self.server.max_datagram == 0 {
            return Err(Error::Config("server.max_datagram must be non-zero".into()));
        }
        if self.server.rate_limit_per_sec == 0 {
            return Err(Error::Config("server.rate_limit_per_sec must be non-zero".into()));
        }
        if self.timing.unit_ms == 0 {
            return Err(Error::Config("timing.unit_ms must be non-zero".into()));
        }
        if self.timing.idle_poll_ms == 0 {
            return Err(Error::Config("timing.idle_poll_ms must be non-zero".into()));
        }
        if self.valves.is_empty() {
            return Err(Error::Config("no valves configured".into()));
        }
        Ok(())
    }
}
