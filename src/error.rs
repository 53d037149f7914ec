//! Unified error types for the reticulation controller.
//!
//! A single `Error` enum that every subsystem can convert into, keeping
//! startup error handling uniform.  Only configuration and topology errors
//! are fatal; actuator, protocol and sink errors are logged where they
//! occur and never leave the worker loop or the listener.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible operation in the controller funnels into this type.
#[derive(Debug)]
pub enum Error {
    /// Configuration is invalid or could not be loaded.
    Config(String),
    /// The valve topology could not be resolved.
    Topology(TopologyError),
    /// An actuator command failed.
    Actuator(ActuatorError),
    /// An inbound request could not be decoded.
    Protocol(ProtocolError),
    /// An audit sink failed.
    Sink(SinkError),
    /// Socket, file or thread creation failure.
    Io(std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Topology(e) => write!(f, "topology: {e}"),
            Self::Actuator(e) => write!(f, "actuator: {e}"),
            Self::Protocol(e) => write!(f, "protocol: {e}"),
            Self::Sink(e) => write!(f, "sink: {e}"),
            Self::Io(e) => write!(f, "io: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Topology(e) => Some(e),
            Self::Actuator(e) => Some(e),
            Self::Protocol(e) => Some(e),
            Self::Sink(e) => Some(e),
            Self::Io(e) => Some(e),
            Self::Config(_) => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

// ---------------------------------------------------------------------------
// Topology errors
// ---------------------------------------------------------------------------

/// Static topology problems.  All of them are fatal at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopologyError {
    /// No valve sections were configured at all.
    Empty,
    /// `section` names a master section that does not exist.
    UnknownMaster { section: String, master: String },
    /// `section` names itself as its master.
    SelfMaster(String),
    /// `master` is used as a master but declares a master of its own.
    NestedMaster { master: String, parent: String },
    /// Two zones fold to the same upper-cased zone id.
    DuplicateZone(String),
    /// A zone drives the same pin as a master relay.
    SharedPin { zone: String, pin: u8 },
}

impl fmt::Display for TopologyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "no valves configured"),
            Self::UnknownMaster { section, master } => {
                write!(f, "[{section}] references unknown master [{master}]")
            }
            Self::SelfMaster(section) => write!(f, "[{section}] names itself as master"),
            Self::NestedMaster { master, parent } => {
                write!(f, "master [{master}] declares its own master [{parent}]")
            }
            Self::DuplicateZone(zone) => write!(f, "duplicate zone id {zone}"),
            Self::SharedPin { zone, pin } => {
                write!(f, "zone {zone} shares pin {pin} with a master relay")
            }
        }
    }
}

impl std::error::Error for TopologyError {}

impl From<TopologyError> for Error {
    fn from(e: TopologyError) -> Self {
        Self::Topology(e)
    }
}

// ---------------------------------------------------------------------------
// Actuator errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorError {
    /// No output is bound to this pin number.
    UnknownPin(u8),
    /// The GPIO driver rejected the write.
    GpioWriteFailed(u8),
}

impl fmt::Display for ActuatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownPin(pin) => write!(f, "no output bound to pin {pin}"),
            Self::GpioWriteFailed(pin) => write!(f, "GPIO write failed on pin {pin}"),
        }
    }
}

impl std::error::Error for ActuatorError {}

impl From<ActuatorError> for Error {
    fn from(e: ActuatorError) -> Self {
        Self::Actuator(e)
    }
}

// ---------------------------------------------------------------------------
// Protocol errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Payload is not a JSON object.
    Malformed(String),
    /// The request has no `OPERATION` field.
    MissingOperation,
    /// A field required by the request's `TYPE` is absent.
    MissingField(&'static str),
    /// `OPERATION`/`TYPE` pair is not one we serve.
    Unrecognized { operation: String, kind: String },
    /// `DURATION` is not a positive whole number of seconds.
    InvalidDuration(String),
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed(msg) => write!(f, "malformed request: {msg}"),
            Self::MissingOperation => write!(f, "request contains no OPERATION"),
            Self::MissingField(field) => write!(f, "missing field {field}"),
            Self::Unrecognized { operation, kind } => {
                write!(f, "unrecognized request {operation}/{kind}")
            }
            Self::InvalidDuration(raw) => write!(f, "invalid duration {raw:?}"),
        }
    }
}

impl std::error::Error for ProtocolError {}

impl From<ProtocolError> for Error {
    fn from(e: ProtocolError) -> Self {
        Self::Protocol(e)
    }
}

// ---------------------------------------------------------------------------
// Sink errors
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum SinkError {
    /// Append-only audit file could not be written.
    File(std::io::Error),
    /// Relational store rejected the insert.
    Sql(rusqlite::Error),
}

impl fmt::Display for SinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(e) => write!(f, "event log file: {e}"),
            Self::Sql(e) => write!(f, "event log database: {e}"),
        }
    }
}

impl From<std::io::Error> for SinkError {
    fn from(e: std::io::Error) -> Self {
        Self::File(e)
    }
}

impl From<rusqlite::Error> for SinkError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Sql(e)
    }
}

impl std::error::Error for SinkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::File(e) => Some(e),
            Self::Sql(e) => Some(e),
        }
    }
}

impl From<SinkError> for Error {
    fn from(e: SinkError) -> Self {
        Self::Sink(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
