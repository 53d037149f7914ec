//! Linux sysfs GPIO output (`/sys/class/gpio`).
//!
//! ```text
//!  <root>/export             ◀── "<pin>"     (only if gpio<pin>/ is absent)
//!  <root>/gpio<pin>/direction ◀── "out"
//!  <root>/gpio<pin>/value     ◀── "0" | "1"
//! ```
//!
//! Relay boards on the reticulation controller are active-high: `1` opens
//! the valve.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use embedded_hal::digital::{ErrorKind, ErrorType, OutputPin};
use log::debug;

/// Default sysfs GPIO class directory.
pub const SYSFS_GPIO_ROOT: &str = "/sys/class/gpio";

/// Write to a `value` file failed.
#[derive(Debug)]
pub struct SysfsError {
    pub pin: u8,
    pub source: io::Error,
}

impl fmt::Display for SysfsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gpio{}: {}", self.pin, self.source)
    }
}

impl std::error::Error for SysfsError {}

impl embedded_hal::digital::Error for SysfsError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

#[derive(Debug)]
pub struct SysfsPin {
    pin: u8,
    value_path: PathBuf,
}

impl SysfsPin {
    /// Export `pin` under `root` (if needed) and configure it as an output.
    pub fn export(root: &Path, pin: u8) -> io::Result<Self> {
        let dir = root.join(format!("gpio{pin}"));
        if !dir.exists() {
            debug!("exporting gpio{}", pin);
            fs::write(root.join("export"), pin.to_string())?;
        }
        fs::write(dir.join("direction"), "out")?;
        Ok(Self {
            pin,
            value_path: dir.join("value"),
        })
    }

    pub fn pin(&self) -> u8 {
        self.pin
    }

    fn write(&self, value: &str) -> Result<(), SysfsError> {
        fs::write(&self.value_path, value).map_err(|source| SysfsError {
            pin: self.pin,
            source,
        })
    }
}

impl ErrorType for SysfsPin {
    type Error = SysfsError;
}

impl OutputPin for SysfsPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.write("0")
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.write("1")
    }
}
