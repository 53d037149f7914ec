//! Relay output drivers.
//!
//! Both implement `embedded_hal::digital::OutputPin`, so the
//! [`GpioBank`](crate::adapters::gpio::GpioBank) adapter is written once
//! against the trait.

pub mod sim_relay;
pub mod sysfs_gpio;
