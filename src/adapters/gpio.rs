//! GPIO adapter: a bank of relay outputs behind [`ActuatorPort`].
//!
//! Owns one `OutputPin` per configured pin number.  This is the only
//! module that turns a domain `(pin, Level)` into a driver call.

use std::collections::BTreeMap;
use std::io;
use std::path::Path;

use embedded_hal::digital::OutputPin;
use log::{debug, error, warn};

use crate::app::ports::{ActuatorPort, Level};
use crate::drivers::sim_relay::SimRelay;
use crate::drivers::sysfs_gpio::SysfsPin;
use crate::error::ActuatorError;

pub struct GpioBank<P: OutputPin> {
    outputs: BTreeMap<u8, P>,
}

impl<P: OutputPin> GpioBank<P> {
    pub fn new() -> Self {
        Self {
            outputs: BTreeMap::new(),
        }
    }

    pub fn with_output(mut self, pin: u8, output: P) -> Self {
        self.outputs.insert(pin, output);
        self
    }

    pub fn output(&self, pin: u8) -> Option<&P> {
        self.outputs.get(&pin)
    }

    pub fn pins(&self) -> impl Iterator<Item = u8> + '_ {
        self.outputs.keys().copied()
    }

    /// Drive every output low.  Used at startup so no valve is left open
    /// from a previous run.
    pub fn close_all(&mut self) {
        for (pin, output) in &mut self.outputs {
            if let Err(e) = output.set_low() {
                warn!("gpio {}: close at startup failed: {:?}", pin, e);
            }
        }
    }
}

impl<P: OutputPin> Default for GpioBank<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl GpioBank<SimRelay> {
    pub fn simulated(pins: impl IntoIterator<Item = u8>) -> Self {
        pins.into_iter()
            .fold(Self::new(), |bank, pin| bank.with_output(pin, SimRelay::new(pin)))
    }
}

impl GpioBank<SysfsPin> {
    pub fn sysfs(root: &Path, pins: impl IntoIterator<Item = u8>) -> io::Result<Self> {
        let mut bank = Self::new();
        for pin in pins {
            bank = bank.with_output(pin, SysfsPin::export(root, pin)?);
        }
        Ok(bank)
    }
}

impl<P: OutputPin> ActuatorPort for GpioBank<P> {
    fn set(&mut self, pin: u8, level: Level) -> Result<(), ActuatorError> {
        let output = self
            .outputs
            .get_mut(&pin)
            .ok_or(ActuatorError::UnknownPin(pin))?;
        debug!("gpio {} <- {:?}", pin, level);
        output.set_state(level.into()).map_err(|e| {
            error!("gpio {}: {:?}", pin, e);
            ActuatorError::GpioWriteFailed(pin)
        })
    }
}
