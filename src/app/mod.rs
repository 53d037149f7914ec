//! Application core: queue, worker and domain types.
//!
//! Everything here is transport-agnostic.  Relays are reached only
//! through [`ports::ActuatorPort`] and audit records leave only through
//! [`ports::AuditSink`], so the whole layer runs against mocks in tests.

pub mod cancel;
pub mod commands;
pub mod controller;
pub mod events;
pub mod ports;
pub mod status;
