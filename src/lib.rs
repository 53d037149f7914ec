//! Reticulation controller library.
//!
//! Exposes the queue, activation sequence, protocol stack and adapters
//! for the `retic` binary and for integration testing against mock
//! hardware.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod drivers;
pub mod error;
pub mod fsm;
pub mod rpc;
pub mod topology;

pub use app::controller::Controller;
pub use config::SystemConfig;
pub use error::{Error, Result};
pub use topology::Topology;
