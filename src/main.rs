//! Reticulation controller: main entry point.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  GpioBank<SimRelay|SysfsPin>   LogAuditSink  EventLogFile      │
//! │  (ActuatorPort)                SqlEventLog   (AuditSink)       │
//! │  UDP listener ─▶ CommandEngine (ControlPort client)            │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │         Controller (queue + worker + Sprinkle)         │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc;

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use tracing_subscriber::EnvFilter;

use retic::adapters::event_log::EventLogFile;
use retic::adapters::gpio::GpioBank;
use retic::adapters::log_sink::LogAuditSink;
use retic::adapters::sql_log::SqlEventLog;
use retic::app::events::AuditLog;
use retic::app::ports::ActuatorPort;
use retic::config::{ActuatorBackend, LoggingConfig, SystemConfig};
use retic::drivers::sysfs_gpio::SYSFS_GPIO_ROOT;
use retic::rpc::engine::CommandEngine;
use retic::rpc::transport;
use retic::{Controller, Topology};

#[derive(Parser)]
#[command(name = "retic")]
#[command(about = "Queued irrigation valve controller with a UDP JSON protocol", long_about = None)]
struct Args {
    /// Path to the JSON configuration file
    #[arg(long, short, default_value = "retic.json")]
    config: PathBuf,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // ── 1. Configuration + logging ────────────────────────────
    let config = SystemConfig::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    init_logging(&config.logging);
    info!("retic v{} starting", env!("CARGO_PKG_VERSION"));

    // ── 2. Topology ───────────────────────────────────────────
    let topology = Topology::resolve(&config.valves).context("resolving valve topology")?;
    info!("{} zones configured", topology.len());

    // ── 3. Adapters ───────────────────────────────────────────
    let actuator = build_actuator(config.actuator, &topology)?;
    let audit = build_audit_log(&config.logging);

    // ── 4. Controller + listener ──────────────────────────────
    let controller = Arc::new(Controller::start(topology, actuator, audit, config.timing)?);
    let mut listener = transport::spawn(&config.server, CommandEngine::new(controller.clone()))
        .with_context(|| format!("binding {}:{}", config.server.host, config.server.port))?;

    // ── 5. Wait for SIGINT/SIGTERM ────────────────────────────
    let (stop_tx, stop_rx) = mpsc::channel();
    ctrlc::set_handler(move || {
        let _ = stop_tx.send(());
    })
    .context("installing signal handler")?;

    if stop_rx.recv().is_err() {
        warn!("signal channel closed unexpectedly");
    }
    info!("shutdown requested");

    listener.stop();
    controller.shutdown();
    info!("retic stopped");
    Ok(())
}

/// `RUST_LOG` wins; otherwise the configured level.  `log` records from the
/// library are bridged into the subscriber.
fn init_logging(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn build_actuator(
    backend: ActuatorBackend,
    topology: &Topology,
) -> Result<Box<dyn ActuatorPort + Send>> {
    let pins = topology.pins();
    Ok(match backend {
        ActuatorBackend::Simulated => {
            info!("actuator: simulated relays on pins {:?}", pins);
            let mut bank = GpioBank::simulated(pins);
            bank.close_all();
            Box::new(bank)
        }
        ActuatorBackend::Sysfs => {
            info!("actuator: sysfs GPIO on pins {:?}", pins);
            let mut bank = GpioBank::sysfs(Path::new(SYSFS_GPIO_ROOT), pins)
                .context("exporting GPIO pins")?;
            bank.close_all();
            Box::new(bank)
        }
    })
}

/// Sinks that fail to open are skipped with a warning; the controller
/// runs with whatever remains.
fn build_audit_log(logging: &LoggingConfig) -> AuditLog {
    let mut audit = AuditLog::new().with_sink(LogAuditSink::new());
    if let Some(path) = &logging.event_log_file {
        info!("audit file: {}", path.display());
        audit.push(Box::new(EventLogFile::new(path.clone())));
    }
    if let Some(path) = &logging.sql_db {
        match SqlEventLog::open(path) {
            Ok(sink) => {
                info!("audit database: {}", path.display());
                audit.push(Box::new(sink));
            }
            Err(e) => warn!("audit database {} unavailable: {}", path.display(), e),
        }
    }
    audit
}
