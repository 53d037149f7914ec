//! In-memory relay for hosts without GPIO.
//!
//! Tracks the output level and logs each transition, so a controller
//! running with `"actuator": "simulated"` still shows every valve move
//! in its log.

use core::convert::Infallible;

use embedded_hal::digital::{ErrorType, OutputPin, PinState};
use log::info;

#[derive(Debug)]
pub struct SimRelay {
    pin: u8,
    state: PinState,
    transitions: u32,
}

impl SimRelay {
    pub fn new(pin: u8) -> Self {
        Self {
            pin,
            state: PinState::Low,
            transitions: 0,
        }
    }

    pub fn is_high(&self) -> bool {
        self.state == PinState::High
    }

    /// Number of level changes since construction.
    pub fn transitions(&self) -> u32 {
        self.transitions
    }

    fn drive(&mut self, state: PinState) {
        if state != self.state {
            self.transitions += 1;
            info!(
                "relay {} -> {}",
                self.pin,
                if state == PinState::High { "ON" } else { "OFF" }
            );
        }
        self.state = state;
    }
}

impl ErrorType for SimRelay {
    type Error = Infallible;
}

impl OutputPin for SimRelay {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.drive(PinState::Low);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.drive(PinState::High);
        Ok(())
    }
}
